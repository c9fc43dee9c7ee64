use cgmath::{InnerSpace, One, Quaternion, Rotation, Vector3, Zero};
use serde::{Deserialize, Serialize};

/// World up. The world is Z-up and measured in centimetres.
pub const UP: Vector3<f32> = Vector3 {
    x: 0.0,
    y: 0.0,
    z: 1.0,
};

/// Local forward axis of every pose
pub const FORWARD: Vector3<f32> = Vector3 {
    x: 1.0,
    y: 0.0,
    z: 0.0,
};

/// Local right axis of every pose
pub const RIGHT: Vector3<f32> = Vector3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};

/// Position plus orientation of a body, camera, hand or marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Pose::from_position(Vector3::zero())
    }
}

impl Pose {
    pub fn new(position: Vector3<f32>, orientation: Quaternion<f32>) -> Self {
        Pose {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vector3<f32>) -> Self {
        Pose {
            position,
            orientation: Quaternion::one(),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(FORWARD)
    }

    pub fn right(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(RIGHT)
    }

    pub fn up(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(UP)
    }

    pub fn transform_point(&self, local: Vector3<f32>) -> Vector3<f32> {
        self.position + self.orientation.rotate_vector(local)
    }

    pub fn transform_vector(&self, local: Vector3<f32>) -> Vector3<f32> {
        self.orientation.rotate_vector(local)
    }

    pub fn inverse_transform_point(&self, world: Vector3<f32>) -> Vector3<f32> {
        self.orientation.conjugate().rotate_vector(world - self.position)
    }

    pub fn inverse_transform_vector(&self, world: Vector3<f32>) -> Vector3<f32> {
        self.orientation.conjugate().rotate_vector(world)
    }
}

/// Vector with its vertical component removed
pub fn flatten(v: Vector3<f32>) -> Vector3<f32> {
    v - UP * v.dot(UP)
}

/// Normalized copy of `v`, or `None` when it is too short to have a direction
pub fn safe_normalize(v: Vector3<f32>) -> Option<Vector3<f32>> {
    let magnitude2 = v.magnitude2();
    if magnitude2 <= 1.0e-8 || !magnitude2.is_finite() {
        None
    } else {
        Some(v / magnitude2.sqrt())
    }
}

/// Orientation whose up axis points along `normal`
pub fn align_up_to(normal: Vector3<f32>) -> Quaternion<f32> {
    match safe_normalize(normal) {
        Some(normal) => Quaternion::from_arc(UP, normal, Some(FORWARD)),
        None => Quaternion::one(),
    }
}

/// Smooth tangents through `points`: central differences inside, chords at the ends.
pub fn catmull_rom_tangents(points: &[Vector3<f32>]) -> Vec<Vector3<f32>> {
    let n = points.len();
    match n {
        0 => Vec::new(),
        1 => vec![Vector3::zero()],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    points[1] - points[0]
                } else if i == n - 1 {
                    points[n - 1] - points[n - 2]
                } else {
                    (points[i + 1] - points[i - 1]) * 0.5
                }
            })
            .collect(),
    }
}

/// Cubic Hermite interpolation between two end points and their tangents
pub fn hermite(
    p0: Vector3<f32>,
    m0: Vector3<f32>,
    p1: Vector3<f32>,
    m1: Vector3<f32>,
    t: f32,
) -> Vector3<f32> {
    let t = t.clamp(0.0, 1.0);
    let t2 = t * t;
    let t3 = t2 * t;
    p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
        + m0 * (t3 - 2.0 * t2 + t)
        + p1 * (-2.0 * t3 + 3.0 * t2)
        + m1 * (t3 - t2)
}
