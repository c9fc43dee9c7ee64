//! Seams to the host engine.
//!
//! Physics, navigation, fades, haptics, projection and the post-process block
//! all live outside this crate. Hosts hand implementations to
//! [`crate::avatar::VrAvatar::tick`] through [`crate::avatar::Services`].

use std::time::Duration;

use bitflags::bitflags;
use cgmath::{Vector2, Vector3};

use crate::{climb::Hand, math::Pose, vignette::VignetteParameters};

/// Identifies a scene actor for self-collision exclusion and hit reporting
pub type ActorId = u64;

bitflags! {
    /// Collision channels a query tests against.
    pub struct CollisionMask: u32 {
        const WORLD_STATIC = 1 << 0;
        const WORLD_DYNAMIC = 1 << 1;
        const PAWN = 1 << 3;
        const CLIMBABLE = 1 << 4;
    }
}

/// Point where a path or trace first touched geometry
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Impact {
    pub point: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub actor: Option<ActorId>,
}

/// Input to the ballistic path service
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathQuery {
    pub origin: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub gravity_scale: f32,
    pub sim_time: f32,
    pub sim_frequency: f32,
    pub collision_mask: CollisionMask,
    pub ignore_actor: Option<ActorId>,
}

impl PathQuery {
    /// Number of fixed steps the simulation takes, at least one
    pub fn step_count(&self) -> usize {
        (self.sim_time * self.sim_frequency).ceil().max(1.0) as usize
    }
}

/// Sampled trajectory and the first impact along it, if any
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathPrediction {
    pub points: Vec<Vector3<f32>>,
    pub impact: Option<Impact>,
}

/// Forward simulation of a launched projectile.
pub trait BallisticPathService {
    /// `None` means the simulation could not run at all.
    fn predict(&self, query: &PathQuery) -> Option<PathPrediction>;
}

/// "Nearest point on a navigable surface" query.
pub trait NavigableSurface {
    /// Closest navigable point whose offset from `point` lies inside `search_extent`
    /// (half sizes per axis), or `None`.
    fn snap_to_surface(
        &self,
        point: Vector3<f32>,
        search_extent: Vector3<f32>,
    ) -> Option<Vector3<f32>>;
}

pub trait LineTrace {
    fn trace_line(
        &self,
        start: Vector3<f32>,
        end: Vector3<f32>,
        channel: CollisionMask,
    ) -> Option<Impact>;
}

/// Controller rumble description
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HapticEffect {
    pub amplitude: f32,
    pub duration: Duration,
}

/// Best-effort controller rumble.
pub trait HapticPulse {
    fn play(&mut self, effect: HapticEffect, hand: Hand);
}

/// Camera fade overlay. Alpha 0 is transparent, 1 is opaque.
pub trait ScreenFade {
    fn fade(&mut self, from_alpha: f32, to_alpha: f32, duration: Duration, color: Vector3<f32>);
}

/// World-to-screen projection for the active view.
pub trait ScreenProjection {
    /// Pixel coordinates of `world` as seen from `camera`, `None` if it is behind the view
    fn project(&self, camera: &Pose, world: Vector3<f32>) -> Option<Vector2<f32>>;

    fn viewport_size(&self) -> Vector2<f32>;
}

/// The post-process material parameter block the vignette writes into.
pub trait VignetteSink {
    fn set_vignette(&mut self, parameters: &VignetteParameters);
}
