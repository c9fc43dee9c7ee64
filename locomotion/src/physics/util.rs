use cgmath::Vector3;
use rapier3d::prelude::*;

use crate::{math::UP, services::PathQuery};

pub fn nvec_to_cgmath(vec: Vector<Real>) -> Vector3<f32> {
    Vector3 {
        x: vec.x,
        y: vec.y,
        z: vec.z,
    }
}

pub fn npoint_to_cgvec(point: Point<Real>) -> Vector3<f32> {
    Vector3 {
        x: point.x,
        y: point.y,
        z: point.z,
    }
}

pub fn vec_to_npoint(vec: Vector3<f32>) -> Point<Real> {
    point![vec.x, vec.y, vec.z]
}

pub fn vec_to_nvec(vec: Vector3<f32>) -> Vector<Real> {
    vector![vec.x, vec.y, vec.z]
}

/// Position of a launched projectile `time` seconds into its flight
pub fn position_at_time(query: &PathQuery, gravity: f32, time: f32) -> Vector3<f32> {
    query.origin + query.velocity * time - UP * (0.5 * gravity * query.gravity_scale * time * time)
}

/// Fixed-step sample times of a query, excluding launch
pub fn sample_times(query: &PathQuery) -> impl Iterator<Item = f32> {
    let steps = query.step_count();
    let dt = query.sim_time / steps as f32;
    (1..=steps).map(move |i| i as f32 * dt)
}
