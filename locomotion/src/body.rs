use cgmath::{InnerSpace, Vector3, Zero};

use crate::{
    config::BodyConfig,
    logging::SCOPE_AVATAR,
    math::{flatten, safe_normalize, Pose},
};

/// Body locomotion state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementMode {
    /// Gravity-bound walking
    Grounded,
    /// Free translation, used while climbing
    Flying,
}

/// Which subsystem moved the body on a given tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseWriter {
    Teleport,
    Climb,
    Locomotion,
}

/// The avatar's capsule: pose, velocity and movement mode.
///
/// Tracked devices (headset, hands) report positions relative to a tracking
/// origin which is itself expressed in the body frame.
pub struct Body {
    pose: Pose,
    velocity: Vector3<f32>,
    movement_mode: MovementMode,
    half_height: f32,
    max_walk_speed: f32,
    camera_correction: bool,
    tracking_origin: Vector3<f32>,
    pending_input: Vector3<f32>,
    last_write: Option<(u64, PoseWriter)>,
}

impl Body {
    pub fn new(config: &BodyConfig, pose: Pose) -> Self {
        Body {
            pose,
            velocity: Vector3::zero(),
            movement_mode: MovementMode::Grounded,
            half_height: config.half_height,
            max_walk_speed: config.max_walk_speed,
            camera_correction: config.camera_correction,
            tracking_origin: Vector3::zero(),
            pending_input: Vector3::zero(),
            last_write: None,
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn position(&self) -> Vector3<f32> {
        self.pose.position
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn speed(&self) -> f32 {
        self.velocity.magnitude()
    }

    pub fn movement_mode(&self) -> MovementMode {
        self.movement_mode
    }

    pub(crate) fn set_movement_mode(&mut self, mode: MovementMode) {
        if self.movement_mode != mode {
            crate::scoped_log!(DEBUG, SCOPE_AVATAR, ?mode, "movement mode changed");
        }
        self.movement_mode = mode;
    }

    pub fn half_height(&self) -> f32 {
        self.half_height
    }

    pub fn tracking_origin(&self) -> Vector3<f32> {
        self.tracking_origin
    }

    pub fn tracked_to_world(&self, tracked: Vector3<f32>) -> Vector3<f32> {
        self.pose.transform_point(self.tracking_origin + tracked)
    }

    pub fn tracked_pose_to_world(&self, tracked: &Pose) -> Pose {
        Pose::new(
            self.tracked_to_world(tracked.position),
            self.pose.orientation * tracked.orientation,
        )
    }

    /// Queue walking input along `direction` (flattened onto the ground), `scale` in [-1, 1].
    pub fn add_movement_input(&mut self, direction: Vector3<f32>, scale: f32) {
        if let Some(direction) = safe_normalize(flatten(direction)) {
            self.pending_input += direction * scale.clamp(-1.0, 1.0);
        }
    }

    pub fn last_writer(&self, tick: u64) -> Option<PoseWriter> {
        match self.last_write {
            Some((written, writer)) if written == tick => Some(writer),
            _ => None,
        }
    }

    pub fn has_written(&self, tick: u64) -> bool {
        self.last_writer(tick).is_some()
    }

    /// Move the body. Only the first write of a tick is accepted.
    pub fn write_pose(
        &mut self,
        writer: PoseWriter,
        tick: u64,
        position: Vector3<f32>,
        velocity: Vector3<f32>,
    ) -> bool {
        if let Some(existing) = self.last_writer(tick) {
            tracing::warn!(
                ?writer,
                ?existing,
                tick,
                "rejected second pose write in one tick"
            );
            return false;
        }

        self.pose.position = position;
        self.velocity = velocity;
        self.last_write = Some((tick, writer));
        true
    }

    /// Apply queued walking input and keep the capsule under the headset.
    ///
    /// Walking only happens while grounded. The camera correction shifts the
    /// tracking origin back by the same amount, so tracked devices stay put in
    /// world space.
    pub fn walk(&mut self, tick: u64, dt: f32, hmd: &Pose) -> bool {
        let input = std::mem::replace(&mut self.pending_input, Vector3::zero());

        let mut displacement = Vector3::zero();
        if self.movement_mode == MovementMode::Grounded && dt > 0.0 {
            let input = if input.magnitude2() > 1.0 {
                input.normalize()
            } else {
                input
            };
            displacement = input * self.max_walk_speed * dt;
        }

        let correction = if self.camera_correction {
            flatten(self.tracked_to_world(hmd.position) - self.pose.position)
        } else {
            Vector3::zero()
        };

        if displacement.magnitude2() <= f32::EPSILON && correction.magnitude2() <= f32::EPSILON {
            return false;
        }

        let velocity = if dt > 0.0 {
            displacement / dt
        } else {
            Vector3::zero()
        };
        let target = self.pose.position + displacement + correction;
        if !self.write_pose(PoseWriter::Locomotion, tick, target, velocity) {
            return false;
        }
        self.tracking_origin -= self.pose.inverse_transform_vector(correction);
        true
    }

    /// Settle velocity for a tick in which nothing moved the body
    pub fn end_tick(&mut self, tick: u64) {
        if !self.has_written(tick) {
            self.velocity = Vector3::zero();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::vec3;

    fn body() -> Body {
        Body::new(&BodyConfig::default(), Pose::from_position(vec3(0.0, 0.0, 90.0)))
    }

    #[test]
    fn test_second_write_in_a_tick_is_rejected() {
        let mut body = body();
        assert!(body.write_pose(PoseWriter::Climb, 1, vec3(1.0, 0.0, 90.0), Vector3::zero()));
        assert!(!body.write_pose(
            PoseWriter::Locomotion,
            1,
            vec3(5.0, 0.0, 90.0),
            Vector3::zero()
        ));
        assert_eq!(body.position(), vec3(1.0, 0.0, 90.0));
        assert_eq!(body.last_writer(1), Some(PoseWriter::Climb));

        assert!(body.write_pose(PoseWriter::Teleport, 2, vec3(5.0, 0.0, 90.0), Vector3::zero()));
    }

    #[test]
    fn test_walk_moves_along_flattened_input() {
        let mut config = BodyConfig::default();
        config.camera_correction = false;
        let mut body = Body::new(&config, Pose::default());

        body.add_movement_input(vec3(1.0, 0.0, 1.0), 1.0);
        assert!(body.walk(1, 0.5, &Pose::default()));

        assert_eq!(body.position(), vec3(150.0, 0.0, 0.0));
        assert_eq!(body.velocity(), vec3(300.0, 0.0, 0.0));
    }

    #[test]
    fn test_diagonal_input_is_capped_at_walk_speed() {
        let mut config = BodyConfig::default();
        config.camera_correction = false;
        let mut body = Body::new(&config, Pose::default());

        body.add_movement_input(vec3(1.0, 0.0, 0.0), 1.0);
        body.add_movement_input(vec3(0.0, 1.0, 0.0), 1.0);
        body.walk(1, 1.0, &Pose::default());
        assert!((body.speed() - 300.0).abs() < 1.0e-3);
    }

    #[test]
    fn test_flying_ignores_walk_input() {
        let mut body = body();
        body.set_movement_mode(MovementMode::Flying);
        body.add_movement_input(vec3(1.0, 0.0, 0.0), 1.0);
        assert!(!body.walk(1, 0.1, &Pose::from_position(vec3(0.0, 0.0, 80.0))));
        assert_eq!(body.position(), vec3(0.0, 0.0, 90.0));
    }

    #[test]
    fn test_camera_correction_keeps_tracked_devices_in_place() {
        let mut body = body();
        let hmd = Pose::from_position(vec3(40.0, -10.0, 80.0));
        let hand = vec3(50.0, 20.0, 40.0);
        let camera_before = body.tracked_to_world(hmd.position);
        let hand_before = body.tracked_to_world(hand);

        assert!(body.walk(1, 0.1, &hmd));

        assert_eq!(body.position(), vec3(40.0, -10.0, 90.0));
        assert!((body.tracked_to_world(hmd.position) - camera_before).magnitude() < 1.0e-4);
        assert!((body.tracked_to_world(hand) - hand_before).magnitude() < 1.0e-4);
        // Room-scale motion is not self-motion
        assert_eq!(body.velocity(), Vector3::zero());
    }

    #[test]
    fn test_velocity_clears_on_idle_tick() {
        let mut body = body();
        body.write_pose(PoseWriter::Climb, 1, vec3(0.0, 0.0, 100.0), vec3(0.0, 0.0, 900.0));
        body.end_tick(1);
        assert_eq!(body.speed(), 900.0);
        body.end_tick(2);
        assert_eq!(body.speed(), 0.0);
    }
}
