//! Locomotion and interaction core for a room-scale VR avatar.
//!
//! Three subsystems drive one body: arc teleport targeting with a fade-covered
//! commit, two-hand climbing, and a comfort vignette that narrows the view
//! during self-motion. [`avatar::VrAvatar`] ticks them in a fixed order against
//! host services injected through [`avatar::Services`].

pub mod arc_predictor;
pub mod avatar;
pub mod body;
pub mod climb;
pub mod config;
pub mod error;
pub mod logging;
pub mod math;
pub mod nav_mesh;
pub mod physics;
pub mod recording;
pub mod services;
pub mod spline_pool;
pub mod surface_validator;
pub mod teleport;
pub mod timer;
pub mod vignette;

pub use avatar::{FrameInput, FrameReport, InputEvent, Services, VrAvatar};
pub use body::{Body, MovementMode, PoseWriter};
pub use climb::{Hand, OverlapObject};
pub use config::{LocomotionConfig, TargetingMode};
pub use error::{LocomotionError, LocomotionResult};
pub use math::Pose;
pub use surface_validator::TargetOutcome;
pub use teleport::TeleportPhase;
