use cgmath::{InnerSpace, Vector3};
use rapier3d::prelude::*;

use super::{
    util::{
        npoint_to_cgvec, nvec_to_cgmath, position_at_time, sample_times, vec_to_npoint,
        vec_to_nvec,
    },
    GRAVITY,
};
use crate::{
    logging::SCOPE_PHYSICS,
    services::{
        ActorId, BallisticPathService, CollisionMask, Impact, LineTrace, PathPrediction, PathQuery,
    },
};

/// Static collision geometry answering line traces and ballistic predictions.
///
/// Every collider carries its owning actor in `user_data` so queries can skip
/// the caster and report what they hit.
pub struct RapierScene {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    query_pipeline: QueryPipeline,
    gravity: f32,
}

impl Default for RapierScene {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierScene {
    pub fn new() -> Self {
        RapierScene {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            gravity: GRAVITY,
        }
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Add an axis-aligned box. Call [`RapierScene::refresh`] before querying.
    pub fn add_box(
        &mut self,
        actor: ActorId,
        center: Vector3<f32>,
        half_extents: Vector3<f32>,
        channels: CollisionMask,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(vec_to_nvec(center))
            .collision_groups(InteractionGroups::new(
                Group::from_bits_truncate(channels.bits()),
                Group::ALL,
            ))
            .user_data(actor as u128)
            .build();
        self.collider_set.insert(collider)
    }

    /// Rebuild the acceleration structure after geometry changes
    pub fn refresh(&mut self) {
        self.query_pipeline.update(&self.rigid_body_set, &self.collider_set);
    }

    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    fn cast_segment(
        &self,
        start: Vector3<f32>,
        end: Vector3<f32>,
        channels: CollisionMask,
        ignore_actor: Option<ActorId>,
    ) -> Option<Impact> {
        let delta = end - start;
        if delta.magnitude2() <= f32::EPSILON {
            return None;
        }

        // Ray direction is the full segment, so a time of impact of 1 is its end
        let ray = Ray::new(vec_to_npoint(start), vec_to_nvec(delta));
        let groups =
            InteractionGroups::new(Group::ALL, Group::from_bits_truncate(channels.bits()));
        let not_ignored = |_: ColliderHandle, collider: &Collider| {
            Some(collider.user_data as ActorId) != ignore_actor
        };

        let (handle, intersection) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            1.0,
            true,
            QueryFilter::default().groups(groups).predicate(&not_ignored),
        )?;

        let actor = self
            .collider_set
            .get(handle)
            .map(|collider| collider.user_data as ActorId);

        Some(Impact {
            point: npoint_to_cgvec(ray.point_at(intersection.time_of_impact)),
            normal: nvec_to_cgmath(intersection.normal),
            actor,
        })
    }
}

impl LineTrace for RapierScene {
    fn trace_line(
        &self,
        start: Vector3<f32>,
        end: Vector3<f32>,
        channel: CollisionMask,
    ) -> Option<Impact> {
        self.cast_segment(start, end, channel, None)
    }
}

impl BallisticPathService for RapierScene {
    fn predict(&self, query: &PathQuery) -> Option<PathPrediction> {
        if !query.sim_time.is_finite() || !query.origin.magnitude2().is_finite() {
            return None;
        }

        let mut points = vec![query.origin];
        let mut previous = query.origin;
        for time in sample_times(query) {
            let next = position_at_time(query, self.gravity, time);
            if let Some(impact) =
                self.cast_segment(previous, next, query.collision_mask, query.ignore_actor)
            {
                points.push(impact.point);
                crate::scoped_log!(TRACE, SCOPE_PHYSICS, actor = ?impact.actor, "arc impact");
                return Some(PathPrediction {
                    points,
                    impact: Some(impact),
                });
            }
            points.push(next);
            previous = next;
        }

        Some(PathPrediction {
            points,
            impact: None,
        })
    }
}
