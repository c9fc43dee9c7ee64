use cgmath::{InnerSpace, Vector3, Zero};

use crate::{
    config::TeleportConfig,
    math::safe_normalize,
    services::{ActorId, BallisticPathService, CollisionMask, Impact, PathQuery},
};

/// Predicted arc for one frame. Never carried over to the next.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArcPrediction {
    /// Points along the arc
    pub points: Vec<Vector3<f32>>,
    /// First impact, if the arc touched anything
    pub impact: Option<Impact>,
}

impl ArcPrediction {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn arc_length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).magnitude())
            .sum()
    }
}

/// Normalizes aiming input into a ballistic query and shapes the result.
#[derive(Clone, Debug, PartialEq)]
pub struct ArcPredictor {
    launch_speed: f32,
    gravity_scale: f32,
    sim_time: f32,
    sim_frequency: f32,
    collision_mask: CollisionMask,
}

impl ArcPredictor {
    pub fn new(config: &TeleportConfig) -> Self {
        ArcPredictor {
            launch_speed: config.launch_speed,
            gravity_scale: config.gravity_scale,
            sim_time: config.sim_time,
            sim_frequency: config.sim_frequency,
            collision_mask: config.collision_mask(),
        }
    }

    /// Aim direction scaled to the launch speed; zero for a degenerate aim
    pub fn launch_velocity(&self, aim_direction: Vector3<f32>) -> Vector3<f32> {
        safe_normalize(aim_direction)
            .map(|direction| direction * self.launch_speed)
            .unwrap_or_else(Vector3::zero)
    }

    pub fn query(
        &self,
        origin: Vector3<f32>,
        aim_direction: Vector3<f32>,
        ignore_actor: Option<ActorId>,
    ) -> PathQuery {
        PathQuery {
            origin,
            velocity: self.launch_velocity(aim_direction),
            gravity_scale: self.gravity_scale,
            sim_time: self.sim_time,
            sim_frequency: self.sim_frequency,
            collision_mask: self.collision_mask,
            ignore_actor,
        }
    }

    /// Predict the arc. Total failure of the service, or an aim with no
    /// direction, yields an empty prediction.
    pub fn predict(
        &self,
        service: &dyn BallisticPathService,
        origin: Vector3<f32>,
        aim_direction: Vector3<f32>,
        ignore_actor: Option<ActorId>,
    ) -> ArcPrediction {
        if safe_normalize(aim_direction).is_none() {
            return ArcPrediction::empty();
        }

        let query = self.query(origin, aim_direction, ignore_actor);
        match service.predict(&query) {
            Some(prediction) => ArcPrediction {
                points: prediction.points,
                impact: prediction.impact,
            },
            None => {
                tracing::trace!("ballistic prediction unavailable");
                ArcPrediction::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::PathPrediction;
    use cgmath::vec3;
    use std::cell::RefCell;

    struct Recorder {
        queries: RefCell<Vec<PathQuery>>,
        result: Option<PathPrediction>,
    }

    impl BallisticPathService for Recorder {
        fn predict(&self, query: &PathQuery) -> Option<PathPrediction> {
            self.queries.borrow_mut().push(*query);
            self.result.clone()
        }
    }

    fn recorder(result: Option<PathPrediction>) -> Recorder {
        Recorder {
            queries: RefCell::new(Vec::new()),
            result,
        }
    }

    #[test]
    fn test_velocity_is_aim_times_launch_speed() {
        let predictor = ArcPredictor::new(&TeleportConfig::default());
        let service = recorder(Some(PathPrediction::default()));

        predictor.predict(&service, vec3(0.0, 0.0, 100.0), vec3(0.0, 3.0, 4.0), Some(7));

        let queries = service.queries.borrow();
        assert_eq!(queries.len(), 1);
        assert!((queries[0].velocity - vec3(0.0, 600.0, 800.0)).magnitude() < 1.0e-3);
        assert_eq!(queries[0].ignore_actor, Some(7));
        assert_eq!(queries[0].step_count(), 30);
    }

    #[test]
    fn test_service_failure_is_no_path() {
        let predictor = ArcPredictor::new(&TeleportConfig::default());
        let prediction =
            predictor.predict(&recorder(None), vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), None);
        assert!(prediction.is_empty());
        assert!(prediction.impact.is_none());
    }

    #[test]
    fn test_degenerate_aim_skips_service() {
        let predictor = ArcPredictor::new(&TeleportConfig::default());
        let service = recorder(Some(PathPrediction::default()));
        let prediction = predictor.predict(&service, vec3(0.0, 0.0, 0.0), Vector3::zero(), None);
        assert!(prediction.is_empty());
        assert!(service.queries.borrow().is_empty());
    }

    #[test]
    fn test_arc_length() {
        let prediction = ArcPrediction {
            points: vec![vec3(0.0, 0.0, 0.0), vec3(3.0, 4.0, 0.0), vec3(3.0, 4.0, 10.0)],
            impact: None,
        };
        assert_eq!(prediction.arc_length(), 15.0);
    }
}
