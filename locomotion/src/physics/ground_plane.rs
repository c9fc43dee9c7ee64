use cgmath::Vector3;

use super::{util::position_at_time, util::sample_times, GRAVITY};
use crate::{
    math::UP,
    services::{BallisticPathService, Impact, PathPrediction, PathQuery},
};

/// Ballistic predictor against an infinite horizontal plane.
///
/// Used where no collision scene exists, and as a reference for tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPlaneBallistics {
    pub ground_height: f32,
    pub gravity: f32,
}

impl GroundPlaneBallistics {
    pub fn new(ground_height: f32) -> Self {
        GroundPlaneBallistics {
            ground_height,
            gravity: GRAVITY,
        }
    }

    /// Time at which the projectile comes down through the ground plane, if it does
    fn landing_time(&self, query: &PathQuery) -> Option<f32> {
        // Solve: z0 + vz*t - 0.5*g*t^2 = ground
        let a = 0.5 * self.gravity * query.gravity_scale;
        let b = -query.velocity.z;
        let c = self.ground_height - query.origin.z;

        if a.abs() <= f32::EPSILON {
            // No gravity: a straight line, landing only when heading down
            return if b > 0.0 { Some(-c / b) } else { None };
        }

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t1 = (-b + sqrt_discriminant) / (2.0 * a);
        let t2 = (-b - sqrt_discriminant) / (2.0 * a);
        let t = t1.max(t2);
        if t >= 0.0 {
            Some(t)
        } else {
            None
        }
    }
}

impl BallisticPathService for GroundPlaneBallistics {
    fn predict(&self, query: &PathQuery) -> Option<PathPrediction> {
        let finite = |v: Vector3<f32>| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
        if !finite(query.origin) || !finite(query.velocity) || !query.sim_time.is_finite() {
            return None;
        }

        let mut points = vec![query.origin];
        if query.origin.z <= self.ground_height {
            let impact = Impact {
                point: query.origin,
                normal: UP,
                actor: None,
            };
            return Some(PathPrediction {
                points,
                impact: Some(impact),
            });
        }

        let landing = self
            .landing_time(query)
            .filter(|t| *t <= query.sim_time);

        for time in sample_times(query) {
            match landing {
                Some(landing) if time >= landing => {
                    let mut point = position_at_time(query, self.gravity, landing);
                    point.z = self.ground_height;
                    points.push(point);
                    return Some(PathPrediction {
                        points,
                        impact: Some(Impact {
                            point,
                            normal: UP,
                            actor: None,
                        }),
                    });
                }
                _ => points.push(position_at_time(query, self.gravity, time)),
            }
        }

        Some(PathPrediction {
            points,
            impact: None,
        })
    }
}
