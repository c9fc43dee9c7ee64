use std::path::Path;
use std::time::Duration;

use cgmath::{vec3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    climb::Hand,
    error::{LocomotionError, LocomotionResult},
    services::{CollisionMask, HapticEffect},
    vignette::CurveKey,
};

/// How the teleport destination is found
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingMode {
    /// Ballistic arc launched from the aiming hand
    Arc,
    /// Straight trace along the camera's forward vector
    Line,
}

/// Configuration for the teleport system
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportConfig {
    pub enabled: bool,
    pub targeting: TargetingMode,
    pub aim_hand: Hand,
    /// Launch speed of the arc, cm/s
    pub launch_speed: f32,
    pub gravity_scale: f32,
    /// Seconds of flight the arc simulation covers
    pub sim_time: f32,
    /// Arc samples per simulated second
    pub sim_frequency: f32,
    pub collision_mask: u32,
    pub line_trace_reach: f32,
    /// Half sizes of the box searched for a navigable point around an impact
    pub nav_search_extent: Vector3<f32>,
    /// Smallest accepted up component of a surface normal for line targeting
    pub min_surface_normal_z: f32,
    /// Seconds for each half of the fade
    pub fade_duration: f32,
    pub fade_color: Vector3<f32>,
    /// Re-check the captured destination against the nav surface before relocating
    pub revalidate_on_commit: bool,
}

impl Default for TeleportConfig {
    fn default() -> Self {
        TeleportConfig {
            enabled: true,
            targeting: TargetingMode::Arc,
            aim_hand: Hand::Right,
            launch_speed: 1000.0,
            gravity_scale: 1.0,
            sim_time: 2.0,
            sim_frequency: 15.0,
            collision_mask: (CollisionMask::WORLD_STATIC | CollisionMask::WORLD_DYNAMIC).bits(),
            line_trace_reach: 1000.0,
            nav_search_extent: vec3(100.0, 100.0, 100.0),
            min_surface_normal_z: 0.9,
            fade_duration: 0.5,
            fade_color: vec3(0.0, 0.0, 0.0),
            revalidate_on_commit: false,
        }
    }
}

impl TeleportConfig {
    pub fn fade_duration(&self) -> Duration {
        seconds(self.fade_duration)
    }

    pub fn collision_mask(&self) -> CollisionMask {
        CollisionMask::from_bits_truncate(self.collision_mask)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimbConfig {
    /// Tag an overlapped object must carry to be gripped
    pub climbable_tag: String,
    pub haptic_amplitude: f32,
    /// Seconds
    pub haptic_duration: f32,
}

impl Default for ClimbConfig {
    fn default() -> Self {
        ClimbConfig {
            climbable_tag: "Climbable".to_string(),
            haptic_amplitude: 0.6,
            haptic_duration: 0.1,
        }
    }
}

impl ClimbConfig {
    pub fn haptic_effect(&self) -> HapticEffect {
        HapticEffect {
            amplitude: self.haptic_amplitude,
            duration: seconds(self.haptic_duration),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VignetteConfig {
    /// Distance along the motion direction of the point the vignette centres on
    pub probe_distance: f32,
    /// Speeds at or below this keep the vignette centred
    pub min_speed: f32,
    /// Speed (cm/s) to radius response. `None` disables the vignette.
    pub curve: Option<Vec<CurveKey>>,
}

impl Default for VignetteConfig {
    fn default() -> Self {
        VignetteConfig {
            probe_distance: 1000.0,
            min_speed: 1.0e-4,
            curve: Some(vec![
                CurveKey::new(0.0, 1.0),
                CurveKey::new(100.0, 0.6),
                CurveKey::new(300.0, 0.25),
            ]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Half the standing height; the body origin sits this far above the feet
    pub half_height: f32,
    pub max_walk_speed: f32,
    /// Keep the body under the headset as the player walks around the room
    pub camera_correction: bool,
}

impl Default for BodyConfig {
    fn default() -> Self {
        BodyConfig {
            half_height: 90.0,
            max_walk_speed: 300.0,
            camera_correction: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub teleport: TeleportConfig,
    pub climb: ClimbConfig,
    pub vignette: VignetteConfig,
    pub body: BodyConfig,
}

impl LocomotionConfig {
    pub fn load(path: &Path) -> LocomotionResult<Self> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LocomotionError::from_io_error(&display, e))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> LocomotionResult<Self> {
        let config: LocomotionConfig = serde_json::from_str(json)
            .map_err(|e| LocomotionError::from_parse_error("locomotion config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LocomotionResult<()> {
        let teleport = &self.teleport;
        positive("teleport.launch_speed", teleport.launch_speed)?;
        positive("teleport.sim_time", teleport.sim_time)?;
        positive("teleport.sim_frequency", teleport.sim_frequency)?;
        positive("teleport.line_trace_reach", teleport.line_trace_reach)?;
        effect_seconds("teleport.fade_duration", teleport.fade_duration)?;
        let extent = teleport.nav_search_extent;
        if extent.x < 0.0 || extent.y < 0.0 || extent.z < 0.0 {
            return Err(LocomotionError::validation(
                "teleport.nav_search_extent",
                "extents must not be negative",
            ));
        }
        if !(0.0..=1.0).contains(&teleport.min_surface_normal_z) {
            return Err(LocomotionError::validation(
                "teleport.min_surface_normal_z",
                "must be a cosine in [0, 1]",
            ));
        }

        if self.climb.climbable_tag.is_empty() {
            return Err(LocomotionError::validation(
                "climb.climbable_tag",
                "must not be empty",
            ));
        }

        non_negative("climb.haptic_amplitude", self.climb.haptic_amplitude)?;
        effect_seconds("climb.haptic_duration", self.climb.haptic_duration)?;

        if let Some(keys) = &self.vignette.curve {
            crate::vignette::ResponseCurve::new(keys.clone())?;
        }
        non_negative("vignette.min_speed", self.vignette.min_speed)?;

        positive("body.half_height", self.body.half_height)?;
        non_negative("body.max_walk_speed", self.body.max_walk_speed)?;
        Ok(())
    }
}

/// Longest fade or haptic pulse a config may ask for, in seconds
pub const MAX_EFFECT_SECONDS: f32 = 60.0;

/// Seconds as a `Duration`, clamped into `[0, MAX_EFFECT_SECONDS]`
fn seconds(value: f32) -> Duration {
    let value = if value.is_finite() { value } else { 0.0 };
    Duration::from_secs_f32(value.clamp(0.0, MAX_EFFECT_SECONDS))
}

fn effect_seconds(item: &str, value: f32) -> LocomotionResult<()> {
    non_negative(item, value)?;
    if value > MAX_EFFECT_SECONDS {
        return Err(LocomotionError::validation(
            item,
            format!("must be at most {} seconds, got {}", MAX_EFFECT_SECONDS, value),
        ));
    }
    Ok(())
}

fn positive(item: &str, value: f32) -> LocomotionResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(LocomotionError::validation(
            item,
            format!("must be positive, got {}", value),
        ))
    }
}

fn non_negative(item: &str, value: f32) -> LocomotionResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(LocomotionError::validation(
            item,
            format!("must not be negative, got {}", value),
        ))
    }
}
