use cgmath::{vec3, InnerSpace, Vector3, Zero};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{
    error::{LocomotionError, LocomotionResult},
    services::NavigableSurface,
};

/// Convex, planar, walkable polygon
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavPolygon {
    pub vertices: Vec<Vector3<f32>>,
}

#[derive(Clone, Debug)]
struct PreparedPolygon {
    vertices: Vec<Vector3<f32>>,
    normal: Vector3<f32>,
}

/// Navigation mesh made of convex polygons, answering "nearest navigable point" queries.
#[derive(Clone, Debug, Default)]
pub struct NavMesh {
    polygons: Vec<PreparedPolygon>,
}

impl NavMesh {
    pub fn new(polygons: Vec<NavPolygon>) -> LocomotionResult<Self> {
        let polygons = polygons
            .into_iter()
            .enumerate()
            .map(|(idx, polygon)| PreparedPolygon::new(idx, polygon.vertices))
            .collect::<LocomotionResult<Vec<_>>>()?;
        Ok(NavMesh { polygons })
    }

    /// Axis-aligned horizontal square centred on `center`
    pub fn square(center: Vector3<f32>, half_size: f32) -> LocomotionResult<Self> {
        Self::new(vec![NavPolygon {
            vertices: vec![
                center + vec3(-half_size, -half_size, 0.0),
                center + vec3(half_size, -half_size, 0.0),
                center + vec3(half_size, half_size, 0.0),
                center + vec3(-half_size, half_size, 0.0),
            ],
        }])
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }
}

impl PreparedPolygon {
    fn new(idx: usize, vertices: Vec<Vector3<f32>>) -> LocomotionResult<Self> {
        let item = format!("nav polygon {}", idx);
        if vertices.len() < 3 {
            return Err(LocomotionError::validation(&item, "needs at least 3 vertices"));
        }

        // Newell's method
        let mut normal = Vector3::zero();
        for i in 0..vertices.len() {
            let a = vertices[i];
            let b = vertices[(i + 1) % vertices.len()];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        if normal.magnitude2() <= f32::EPSILON {
            return Err(LocomotionError::validation(&item, "vertices are degenerate"));
        }
        let mut normal = normal.normalize();
        if normal.z < 0.0 {
            normal = -normal;
        }
        if normal.z < 1.0e-3 {
            return Err(LocomotionError::validation(&item, "polygon is vertical"));
        }

        Ok(PreparedPolygon { vertices, normal })
    }

    fn closest_point(&self, point: Vector3<f32>) -> Vector3<f32> {
        let origin = self.vertices[0];
        let projected = point - self.normal * (point - origin).dot(self.normal);
        if self.contains(projected) {
            return projected;
        }

        let count = self.vertices.len();
        (0..count)
            .map(|i| closest_on_segment(point, self.vertices[i], self.vertices[(i + 1) % count]))
            .min_by_key(|candidate| OrderedFloat((*candidate - point).magnitude2()))
            .unwrap_or(projected)
    }

    /// Same-side test for a point already on the polygon's plane
    fn contains(&self, point: Vector3<f32>) -> bool {
        let mut sign = None;
        let count = self.vertices.len();

        for i in 0..count {
            let v1 = self.vertices[i];
            let v2 = self.vertices[(i + 1) % count];
            let side = (v2 - v1).cross(point - v1).dot(self.normal);

            if side.abs() < 1.0e-4 {
                continue; // On the edge
            }

            let current_sign = side > 0.0;
            match sign {
                None => sign = Some(current_sign),
                Some(prev_sign) if prev_sign != current_sign => return false,
                _ => {}
            }
        }

        true
    }
}

fn closest_on_segment(point: Vector3<f32>, a: Vector3<f32>, b: Vector3<f32>) -> Vector3<f32> {
    let ab = b - a;
    let length2 = ab.magnitude2();
    if length2 <= f32::EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / length2).clamp(0.0, 1.0);
    a + ab * t
}

impl NavigableSurface for NavMesh {
    fn snap_to_surface(
        &self,
        point: Vector3<f32>,
        search_extent: Vector3<f32>,
    ) -> Option<Vector3<f32>> {
        self.polygons
            .iter()
            .map(|polygon| polygon.closest_point(point))
            .filter(|candidate| {
                let offset = *candidate - point;
                offset.x.abs() <= search_extent.x
                    && offset.y.abs() <= search_extent.y
                    && offset.z.abs() <= search_extent.z
            })
            .min_by_key(|candidate| OrderedFloat((*candidate - point).magnitude2()))
    }
}
