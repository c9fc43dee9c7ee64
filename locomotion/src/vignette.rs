use cgmath::{vec2, Deg, InnerSpace, Rad, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    config::VignetteConfig,
    error::{LocomotionError, LocomotionResult},
    logging::SCOPE_VIGNETTE,
    math::{safe_normalize, Pose},
    services::{ScreenProjection, VignetteSink},
};

/// Normalized screen centre
pub const SCREEN_CENTER: Vector2<f32> = Vector2 { x: 0.5, y: 0.5 };

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

impl CurveKey {
    pub fn new(time: f32, value: f32) -> Self {
        CurveKey { time, value }
    }
}

/// Piecewise-linear curve, clamped to its first and last key outside their range.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseCurve {
    keys: Vec<CurveKey>,
}

impl ResponseCurve {
    pub fn new(keys: Vec<CurveKey>) -> LocomotionResult<Self> {
        if keys.is_empty() {
            return Err(LocomotionError::validation(
                "vignette.curve",
                "needs at least one key",
            ));
        }
        if keys
            .iter()
            .any(|k| !k.time.is_finite() || !k.value.is_finite())
        {
            return Err(LocomotionError::validation(
                "vignette.curve",
                "keys must be finite",
            ));
        }
        if keys.windows(2).any(|pair| pair[1].time <= pair[0].time) {
            return Err(LocomotionError::validation(
                "vignette.curve",
                "key times must be strictly increasing",
            ));
        }
        Ok(ResponseCurve { keys })
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// Clamped linear interpolation. NaN evaluates to the first key.
    pub fn evaluate(&self, time: f32) -> f32 {
        let first = self.keys[0];
        let last = self.keys[self.keys.len() - 1];
        if time.is_nan() || time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        let upper = self.keys.partition_point(|k| k.time <= time);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];
        let alpha = (time - a.time) / (b.time - a.time);
        a.value + (b.value - a.value) * alpha
    }

    /// Smallest and largest value the curve can produce
    pub fn value_range(&self) -> (f32, f32) {
        self.keys
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), k| {
                (lo.min(k.value), hi.max(k.value))
            })
    }
}

/// What the post-process material receives each frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VignetteParameters {
    pub radius: f32,
    /// Normalized screen coordinate, each axis in [0, 1]
    pub focal_point: Vector2<f32>,
}

/// Narrows peripheral vision in proportion to self-motion speed.
pub struct ComfortVignette {
    curve: Option<ResponseCurve>,
    probe_distance: f32,
    min_speed: f32,
    last: Option<VignetteParameters>,
}

impl ComfortVignette {
    /// An invalid curve in `config` disables the vignette rather than failing.
    pub fn new(config: &VignetteConfig) -> Self {
        let curve = config
            .curve
            .clone()
            .and_then(|keys| match ResponseCurve::new(keys) {
                Ok(curve) => Some(curve),
                Err(error) => {
                    tracing::warn!(%error, "vignette curve rejected, vignette disabled");
                    None
                }
            });

        ComfortVignette {
            curve,
            probe_distance: config.probe_distance,
            min_speed: config.min_speed,
            last: None,
        }
    }

    pub fn curve(&self) -> Option<&ResponseCurve> {
        self.curve.as_ref()
    }

    pub fn set_curve(&mut self, curve: Option<ResponseCurve>) {
        self.curve = curve;
    }

    /// Parameters pushed on the most recent frame that had both curve and sink
    pub fn last_parameters(&self) -> Option<VignetteParameters> {
        self.last
    }

    /// Normalized screen point the vignette centres on.
    ///
    /// The probe point lies along the velocity when moving toward the view, and
    /// along the reversed velocity otherwise.
    pub fn focal_point(
        &self,
        velocity: Vector3<f32>,
        camera: &Pose,
        projection: &dyn ScreenProjection,
    ) -> Vector2<f32> {
        if velocity.magnitude() <= self.min_speed {
            return SCREEN_CENTER;
        }
        let direction = match safe_normalize(velocity) {
            Some(direction) => direction,
            None => return SCREEN_CENTER,
        };

        let probe = if direction.dot(camera.forward()) > 0.0 {
            camera.position + direction * self.probe_distance
        } else {
            camera.position - direction * self.probe_distance
        };

        let viewport = projection.viewport_size();
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return SCREEN_CENTER;
        }
        match projection.project(camera, probe) {
            Some(pixel) => vec2(
                (pixel.x / viewport.x).clamp(0.0, 1.0),
                (pixel.y / viewport.y).clamp(0.0, 1.0),
            ),
            None => SCREEN_CENTER,
        }
    }

    /// Compute and push this frame's parameters. A missing curve or sink skips the frame.
    pub fn update(
        &mut self,
        velocity: Vector3<f32>,
        camera: &Pose,
        projection: &dyn ScreenProjection,
        sink: Option<&mut (dyn VignetteSink + '_)>,
    ) -> Option<VignetteParameters> {
        let curve = self.curve.as_ref()?;
        let sink = sink?;

        let speed = velocity.magnitude();
        let parameters = VignetteParameters {
            radius: curve.evaluate(speed),
            focal_point: self.focal_point(velocity, camera, projection),
        };
        crate::scoped_log!(
            TRACE,
            SCOPE_VIGNETTE,
            speed,
            radius = parameters.radius,
            "vignette"
        );

        sink.set_vignette(&parameters);
        self.last = Some(parameters);
        Some(parameters)
    }
}

/// Pinhole projection for a camera looking down its local +X, Y right, Z up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerspectiveProjection {
    pub vertical_fov: Deg<f32>,
    pub viewport: Vector2<f32>,
    pub near: f32,
}

impl PerspectiveProjection {
    pub fn new(vertical_fov: Deg<f32>, viewport: Vector2<f32>) -> Self {
        PerspectiveProjection {
            vertical_fov,
            viewport,
            near: 1.0,
        }
    }
}

impl ScreenProjection for PerspectiveProjection {
    fn project(&self, camera: &Pose, world: Vector3<f32>) -> Option<Vector2<f32>> {
        let local = camera.inverse_transform_point(world);
        if local.x < self.near || self.viewport.y <= 0.0 {
            return None;
        }

        let half_fov: Rad<f32> = (self.vertical_fov * 0.5).into();
        let tan_half = half_fov.0.tan();
        let aspect = self.viewport.x / self.viewport.y;

        let ndc_x = local.y / (local.x * tan_half * aspect);
        let ndc_y = local.z / (local.x * tan_half);

        // Screen Y grows downward
        Some(vec2(
            (ndc_x * 0.5 + 0.5) * self.viewport.x,
            (0.5 - ndc_y * 0.5) * self.viewport.y,
        ))
    }

    fn viewport_size(&self) -> Vector2<f32> {
        self.viewport
    }
}
