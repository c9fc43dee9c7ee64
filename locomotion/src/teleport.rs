use cgmath::{Vector3, Zero};

use crate::{
    arc_predictor::{ArcPrediction, ArcPredictor},
    body::{Body, PoseWriter},
    config::{TargetingMode, TeleportConfig},
    logging::SCOPE_TELEPORT,
    math::{align_up_to, safe_normalize, Pose, UP},
    services::{ActorId, BallisticPathService, LineTrace, NavigableSurface, ScreenFade},
    spline_pool::SplineSegmentPool,
    surface_validator::{SurfaceValidator, TargetOutcome},
    timer::{Timer, TimerEvent, TimerHandle},
};

/// Teleport commit state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeleportPhase {
    Idle,
    /// Screen is fading out; relocation fires when the timer does
    Fading,
    /// Relocation in progress. Only observable inside the commit itself.
    Relocating,
}

/// Where the teleport would land, for the renderer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DestinationMarker {
    pub visible: bool,
    pub pose: Pose,
}

impl Default for DestinationMarker {
    fn default() -> Self {
        DestinationMarker {
            visible: false,
            pose: Pose::default(),
        }
    }
}

/// Ray or arc origin for this frame's targeting
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimInput {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

/// World queries targeting needs each frame
pub struct TargetingServices<'a> {
    pub ballistic: &'a dyn BallisticPathService,
    pub nav: &'a dyn NavigableSurface,
    pub trace: &'a dyn LineTrace,
}

/// Continuous destination targeting plus the fade, relocate, fade-in commit.
pub struct TeleportController {
    config: TeleportConfig,
    predictor: ArcPredictor,
    validator: SurfaceValidator,
    phase: TeleportPhase,
    marker: DestinationMarker,
    pool: SplineSegmentPool,
    last_outcome: TargetOutcome,
    captured_destination: Option<Vector3<f32>>,
    pending_timer: Option<TimerHandle>,
}

impl TeleportController {
    pub fn new(config: &TeleportConfig) -> Self {
        TeleportController {
            config: config.clone(),
            predictor: ArcPredictor::new(config),
            validator: SurfaceValidator::new(config),
            phase: TeleportPhase::Idle,
            marker: DestinationMarker::default(),
            pool: SplineSegmentPool::new(),
            last_outcome: TargetOutcome::NoImpact,
            captured_destination: None,
            pending_timer: None,
        }
    }

    pub fn config(&self) -> &TeleportConfig {
        &self.config
    }

    pub fn phase(&self) -> TeleportPhase {
        self.phase
    }

    pub fn marker(&self) -> &DestinationMarker {
        &self.marker
    }

    pub fn pool(&self) -> &SplineSegmentPool {
        &self.pool
    }

    pub fn last_outcome(&self) -> TargetOutcome {
        self.last_outcome
    }

    pub fn captured_destination(&self) -> Option<Vector3<f32>> {
        self.captured_destination
    }

    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.pending_timer
    }

    pub fn has_valid_destination(&self) -> bool {
        self.marker.visible
    }

    /// Run this frame's targeting and refresh the marker and arc segments.
    ///
    /// Runs in every phase; only the commit is gated by the state machine.
    pub fn update_targeting(
        &mut self,
        services: &TargetingServices<'_>,
        aim: &AimInput,
        anchor: &Pose,
        ignore_actor: Option<ActorId>,
    ) -> TargetOutcome {
        if !self.config.enabled {
            self.marker.visible = false;
            self.pool.hide_all();
            self.last_outcome = TargetOutcome::NoImpact;
            return self.last_outcome;
        }

        let (path, outcome) = match self.config.targeting {
            TargetingMode::Arc => {
                let prediction = self.predictor.predict(
                    services.ballistic,
                    aim.origin,
                    aim.direction,
                    ignore_actor,
                );
                let outcome = self.validator.validate_impact(
                    services.nav,
                    prediction.impact.as_ref(),
                    false,
                );
                (prediction, outcome)
            }
            TargetingMode::Line => self.line_target(services, aim),
        };

        match outcome {
            TargetOutcome::Valid { point, normal } => {
                self.marker.visible = true;
                self.marker.pose = Pose::new(point, align_up_to(normal));
            }
            _ => {
                self.marker.visible = false;
            }
        }
        self.pool.update(&path.points, anchor);

        if outcome != self.last_outcome {
            crate::scoped_log!(
                TRACE,
                SCOPE_TELEPORT,
                ?outcome,
                arc_length = path.arc_length(),
                "target changed"
            );
        }
        self.last_outcome = outcome;
        outcome
    }

    fn line_target(
        &self,
        services: &TargetingServices<'_>,
        aim: &AimInput,
    ) -> (ArcPrediction, TargetOutcome) {
        let direction = match safe_normalize(aim.direction) {
            Some(direction) => direction,
            None => return (ArcPrediction::empty(), TargetOutcome::NoImpact),
        };
        let end = aim.origin + direction * self.config.line_trace_reach;
        let impact = services
            .trace
            .trace_line(aim.origin, end, self.config.collision_mask());

        let outcome = self
            .validator
            .validate_impact(services.nav, impact.as_ref(), true);
        let points = match &impact {
            Some(impact) => vec![aim.origin, impact.point],
            None => Vec::new(),
        };
        (ArcPrediction { points, impact }, outcome)
    }

    /// Begin a teleport toward the current marker.
    ///
    /// Ignored unless idle with a visible marker, and when no fade service is
    /// available: the player is never relocated without the screen covered.
    pub fn trigger(
        &mut self,
        fade: Option<&mut (dyn ScreenFade + '_)>,
        timer: &mut dyn Timer,
    ) -> bool {
        if !self.config.enabled || self.phase != TeleportPhase::Idle || !self.marker.visible {
            return false;
        }
        let fade = match fade {
            Some(fade) => fade,
            None => {
                crate::scoped_log!(DEBUG, SCOPE_TELEPORT, "no fade service, trigger ignored");
                return false;
            }
        };

        let duration = self.config.fade_duration();
        self.captured_destination = Some(self.marker.pose.position);
        fade.fade(0.0, 1.0, duration, self.config.fade_color);
        self.pending_timer = Some(timer.after(duration, TimerEvent::TeleportFadeComplete));
        self.phase = TeleportPhase::Fading;

        crate::scoped_log!(
            DEBUG,
            SCOPE_TELEPORT,
            destination = ?self.captured_destination,
            "teleport fading out"
        );
        true
    }

    /// Handle a fired timer. Returns the body's new position if it was relocated.
    pub fn on_timer(
        &mut self,
        event: TimerEvent,
        fade: Option<&mut (dyn ScreenFade + '_)>,
        nav: &dyn NavigableSurface,
        body: &mut Body,
        tick: u64,
    ) -> Option<Vector3<f32>> {
        if event != TimerEvent::TeleportFadeComplete || self.phase != TeleportPhase::Fading {
            return None;
        }
        self.pending_timer = None;
        self.phase = TeleportPhase::Relocating;

        let relocated = self.relocate(nav, body, tick);

        let duration = self.config.fade_duration();
        if let Some(fade) = fade {
            fade.fade(1.0, 0.0, duration, self.config.fade_color);
        }
        self.phase = TeleportPhase::Idle;
        relocated
    }

    fn relocate(
        &mut self,
        nav: &dyn NavigableSurface,
        body: &mut Body,
        tick: u64,
    ) -> Option<Vector3<f32>> {
        let destination = self.captured_destination.take()?;

        // Commit goes to the destination captured at trigger time unless asked to re-check it
        let destination = if self.config.revalidate_on_commit {
            match self.validator.snap(nav, destination) {
                Some(point) => point,
                None => {
                    crate::scoped_log!(
                        DEBUG,
                        SCOPE_TELEPORT,
                        ?destination,
                        "destination no longer navigable, teleport cancelled"
                    );
                    return None;
                }
            }
        } else {
            destination
        };

        let target = destination + UP * body.half_height();
        if !body.write_pose(PoseWriter::Teleport, tick, target, Vector3::zero()) {
            return None;
        }
        crate::scoped_log!(DEBUG, SCOPE_TELEPORT, ?target, "relocated");
        Some(target)
    }
}
