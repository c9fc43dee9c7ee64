//! Service implementations backed by real geometry.

pub mod ground_plane;
pub mod scene;
pub mod util;

/// Standard gravity in cm/s²
pub const GRAVITY: f32 = 980.0;

pub use ground_plane::GroundPlaneBallistics;
pub use scene::RapierScene;
