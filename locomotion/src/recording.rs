//! Service implementations that remember every call.
//!
//! The simulator prints what they captured; tests assert on it.

use std::time::Duration;

use cgmath::Vector3;

use crate::{
    climb::Hand,
    services::{HapticEffect, HapticPulse, ScreenFade, VignetteSink},
    vignette::VignetteParameters,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FadeCall {
    pub from_alpha: f32,
    pub to_alpha: f32,
    pub duration: Duration,
    pub color: Vector3<f32>,
}

#[derive(Debug, Default)]
pub struct RecordingFade {
    pub calls: Vec<FadeCall>,
}

impl ScreenFade for RecordingFade {
    fn fade(&mut self, from_alpha: f32, to_alpha: f32, duration: Duration, color: Vector3<f32>) {
        tracing::debug!(from_alpha, to_alpha, ?duration, "fade");
        self.calls.push(FadeCall {
            from_alpha,
            to_alpha,
            duration,
            color,
        });
    }
}

#[derive(Debug, Default)]
pub struct RecordingHaptics {
    pub pulses: Vec<(Hand, HapticEffect)>,
}

impl RecordingHaptics {
    pub fn count_for(&self, hand: Hand) -> usize {
        self.pulses.iter().filter(|(h, _)| *h == hand).count()
    }
}

impl HapticPulse for RecordingHaptics {
    fn play(&mut self, effect: HapticEffect, hand: Hand) {
        tracing::debug!(?hand, amplitude = effect.amplitude, "haptic pulse");
        self.pulses.push((hand, effect));
    }
}

#[derive(Debug, Default)]
pub struct RecordingVignetteSink {
    pub pushed: Vec<VignetteParameters>,
}

impl RecordingVignetteSink {
    pub fn latest(&self) -> Option<&VignetteParameters> {
        self.pushed.last()
    }
}

impl VignetteSink for RecordingVignetteSink {
    fn set_vignette(&mut self, parameters: &VignetteParameters) {
        self.pushed.push(*parameters);
    }
}
