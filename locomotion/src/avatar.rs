//! Per-frame orchestration of the body, teleport, climbing and vignette.
//!
//! A tick runs in a fixed order:
//! 1. advance the frame timer and dispatch fired events (teleport relocation)
//! 2. apply queued input events in arrival order
//! 3. move the body at most once (teleport, then climb, then walking)
//! 4. refresh teleport targeting
//! 5. push the comfort vignette

use std::time::Duration;

use cgmath::{InnerSpace, Vector3, Zero};

use crate::{
    body::{Body, MovementMode, PoseWriter},
    climb::{ClimbSystem, Hand, OverlapObject},
    config::{LocomotionConfig, TargetingMode},
    error::LocomotionResult,
    logging::SCOPE_AVATAR,
    math::{flatten, Pose},
    services::{
        ActorId, BallisticPathService, HapticPulse, LineTrace, NavigableSurface, ScreenFade,
        ScreenProjection, VignetteSink,
    },
    surface_validator::TargetOutcome,
    teleport::{AimInput, TargetingServices, TeleportController},
    timer::{FrameTimer, TimerEvent},
    vignette::{ComfortVignette, VignetteParameters},
};

/// Discrete input edges and overlap notifications for one frame
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    TeleportTrigger,
    Grip(Hand),
    Release(Hand),
    OverlapBegin { hand: Hand, object: OverlapObject },
    OverlapEnd { hand: Hand, actor: ActorId },
}

/// Everything the host samples for one frame.
///
/// Device poses are in tracking space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub forward_axis: f32,
    pub right_axis: f32,
    pub hmd: Pose,
    /// Indexed by [`Hand::index`]
    pub hands: [Pose; 2],
    pub events: Vec<InputEvent>,
}

/// Host services for one tick. The optional ones degrade to no-ops when absent.
pub struct Services<'a> {
    pub ballistic: &'a dyn BallisticPathService,
    pub nav: &'a dyn NavigableSurface,
    pub trace: &'a dyn LineTrace,
    pub projection: &'a dyn ScreenProjection,
    pub fade: Option<&'a mut dyn ScreenFade>,
    pub haptics: Option<&'a mut dyn HapticPulse>,
    pub post_process: Option<&'a mut dyn VignetteSink>,
}

/// What happened during a tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub tick: u64,
    /// New body position when a teleport committed this tick
    pub relocated: Option<Vector3<f32>>,
    pub pose_writer: Option<PoseWriter>,
    pub target: TargetOutcome,
    pub vignette: Option<VignetteParameters>,
}

pub struct VrAvatar {
    config: LocomotionConfig,
    actor_id: ActorId,
    body: Body,
    teleport: TeleportController,
    climb: ClimbSystem,
    vignette: ComfortVignette,
    timer: FrameTimer,
    tick: u64,
}

impl VrAvatar {
    pub fn new(
        config: LocomotionConfig,
        actor_id: ActorId,
        start: Pose,
    ) -> LocomotionResult<Self> {
        config.validate()?;

        let avatar = VrAvatar {
            body: Body::new(&config.body, start),
            teleport: TeleportController::new(&config.teleport),
            climb: ClimbSystem::new(&config.climb),
            vignette: ComfortVignette::new(&config.vignette),
            timer: FrameTimer::new(),
            tick: 0,
            actor_id,
            config,
        };
        crate::scoped_log!(
            DEBUG,
            SCOPE_AVATAR,
            actor_id,
            position = ?start.position,
            "avatar spawned"
        );
        Ok(avatar)
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn teleport(&self) -> &TeleportController {
        &self.teleport
    }

    pub fn climb(&self) -> &ClimbSystem {
        &self.climb
    }

    pub fn vignette(&self) -> &ComfortVignette {
        &self.vignette
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// World pose of the headset given its tracking-space pose
    pub fn camera_pose(&self, hmd: &Pose) -> Pose {
        self.body.tracked_pose_to_world(hmd)
    }

    pub fn tick(
        &mut self,
        dt: f32,
        input: &FrameInput,
        services: &mut Services<'_>,
    ) -> FrameReport {
        self.tick += 1;
        let tick = self.tick;
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let mut relocated = None;
        let elapsed = Duration::try_from_secs_f32(dt).unwrap_or(Duration::MAX);
        for event in self.timer.advance(elapsed) {
            if let Some(position) = self.dispatch_timer(event, services, tick) {
                relocated = Some(position);
            }
        }

        for event in &input.events {
            self.apply_event(event, input, services);
        }

        self.move_body(tick, dt, input);
        self.body.end_tick(tick);

        let target = self.update_targeting(input, services);

        let camera = self.camera_pose(&input.hmd);
        let vignette = self.vignette.update(
            self.body.velocity(),
            &camera,
            services.projection,
            services.post_process.as_deref_mut(),
        );

        FrameReport {
            tick,
            relocated,
            pose_writer: self.body.last_writer(tick),
            target,
            vignette,
        }
    }

    fn dispatch_timer(
        &mut self,
        event: TimerEvent,
        services: &mut Services<'_>,
        tick: u64,
    ) -> Option<Vector3<f32>> {
        let position = self.teleport.on_timer(
            event,
            services.fade.as_deref_mut(),
            services.nav,
            &mut self.body,
            tick,
        )?;

        // Grab anchors refer to where the body used to be
        if self.climb.climbing_hand().is_some() {
            crate::scoped_log!(DEBUG, SCOPE_AVATAR, "teleport released climbing hands");
        }
        self.climb.release_all(&mut self.body);
        Some(position)
    }

    fn apply_event(
        &mut self,
        event: &InputEvent,
        input: &FrameInput,
        services: &mut Services<'_>,
    ) {
        match event {
            InputEvent::TeleportTrigger => {
                self.teleport
                    .trigger(services.fade.as_deref_mut(), &mut self.timer);
            }
            InputEvent::Grip(hand) => {
                let position = self.hand_position(input, *hand);
                self.climb.grip(*hand, position, &mut self.body);
            }
            InputEvent::Release(hand) => {
                self.climb.release(*hand, &mut self.body);
            }
            InputEvent::OverlapBegin { hand, object } => {
                self.climb
                    .overlap_begin(*hand, object.clone(), services.haptics.as_deref_mut());
            }
            InputEvent::OverlapEnd { hand, actor } => {
                self.climb.overlap_end(*hand, *actor, &mut self.body);
            }
        }
    }

    fn hand_position(&self, input: &FrameInput, hand: Hand) -> Vector3<f32> {
        self.body.tracked_to_world(input.hands[hand.index()].position)
    }

    fn move_body(&mut self, tick: u64, dt: f32, input: &FrameInput) {
        // A relocation already took this tick's write
        if self.body.has_written(tick) {
            return;
        }

        let hand_positions = [
            self.hand_position(input, Hand::Left),
            self.hand_position(input, Hand::Right),
        ];
        if let Some(offset) = self.climb.body_offset(&hand_positions) {
            let velocity = if dt > 0.0 { offset / dt } else { Vector3::zero() };
            if offset.magnitude2() > f32::EPSILON {
                let target = self.body.position() + offset;
                self.body.write_pose(PoseWriter::Climb, tick, target, velocity);
            }
            return;
        }

        if self.body.movement_mode() == MovementMode::Grounded {
            let camera = self.camera_pose(&input.hmd);
            self.body
                .add_movement_input(flatten(camera.forward()), input.forward_axis);
            self.body
                .add_movement_input(flatten(camera.right()), input.right_axis);
        }
        self.body.walk(tick, dt, &input.hmd);
    }

    fn update_targeting(&mut self, input: &FrameInput, services: &Services<'_>) -> TargetOutcome {
        let teleport_config = self.teleport.config();
        let aim_pose = match teleport_config.targeting {
            TargetingMode::Arc => self
                .body
                .tracked_pose_to_world(&input.hands[teleport_config.aim_hand.index()]),
            TargetingMode::Line => self.camera_pose(&input.hmd),
        };
        let aim = AimInput {
            origin: aim_pose.position,
            direction: aim_pose.forward(),
        };
        let targeting = TargetingServices {
            ballistic: services.ballistic,
            nav: services.nav,
            trace: services.trace,
        };
        let anchor = *self.body.pose();
        self.teleport
            .update_targeting(&targeting, &aim, &anchor, Some(self.actor_id))
    }
}
