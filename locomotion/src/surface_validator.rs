use cgmath::{InnerSpace, Vector3};

use crate::{
    config::TeleportConfig,
    math::{safe_normalize, UP},
    services::{Impact, NavigableSurface},
};

/// Result of validating one frame's candidate destination
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetOutcome {
    /// Snapped onto a navigable surface
    Valid {
        point: Vector3<f32>,
        normal: Vector3<f32>,
    },
    /// The path or trace touched nothing
    NoImpact,
    /// The impact surface is too steep or faces downward
    SteepSurface,
    /// No navigable surface within the search extent
    OffNavigableSurface,
}

impl TargetOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, TargetOutcome::Valid { .. })
    }

    pub fn destination(&self) -> Option<Vector3<f32>> {
        match self {
            TargetOutcome::Valid { point, .. } => Some(*point),
            _ => None,
        }
    }
}

/// Accepts or rejects teleport landing points.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceValidator {
    search_extent: Vector3<f32>,
    min_normal_z: f32,
}

impl SurfaceValidator {
    pub fn new(config: &TeleportConfig) -> Self {
        SurfaceValidator {
            search_extent: config.nav_search_extent,
            min_normal_z: config.min_surface_normal_z,
        }
    }

    pub fn search_extent(&self) -> Vector3<f32> {
        self.search_extent
    }

    /// Snap `point` onto the navigable surface. No fallback to the raw point.
    pub fn snap(&self, nav: &dyn NavigableSurface, point: Vector3<f32>) -> Option<Vector3<f32>> {
        nav.snap_to_surface(point, self.search_extent)
    }

    /// A normal passes when its up component is at least the threshold cosine
    pub fn is_walkable_normal(&self, normal: Vector3<f32>) -> bool {
        safe_normalize(normal)
            .map(|n| n.dot(UP) >= self.min_normal_z)
            .unwrap_or(false)
    }

    /// Validate an arc/trace impact.
    ///
    /// With `check_normal` the surface slope is tested before the nav query runs.
    pub fn validate_impact(
        &self,
        nav: &dyn NavigableSurface,
        impact: Option<&Impact>,
        check_normal: bool,
    ) -> TargetOutcome {
        let impact = match impact {
            Some(impact) => impact,
            None => return TargetOutcome::NoImpact,
        };

        if check_normal && !self.is_walkable_normal(impact.normal) {
            return TargetOutcome::SteepSurface;
        }

        match self.snap(nav, impact.point) {
            Some(point) => TargetOutcome::Valid {
                point,
                normal: safe_normalize(impact.normal).unwrap_or(UP),
            },
            None => TargetOutcome::OffNavigableSurface,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav_mesh::NavMesh;
    use cgmath::vec3;

    fn floor() -> NavMesh {
        NavMesh::square(vec3(0.0, 0.0, 0.0), 500.0).unwrap()
    }

    fn impact(point: Vector3<f32>, normal: Vector3<f32>) -> Impact {
        Impact {
            point,
            normal,
            actor: None,
        }
    }

    #[test]
    fn test_snaps_nearby_point() {
        let validator = SurfaceValidator::new(&TeleportConfig::default());
        let outcome = validator.validate_impact(
            &floor(),
            Some(&impact(vec3(100.0, 50.0, 20.0), UP)),
            false,
        );
        assert_eq!(outcome.destination(), Some(vec3(100.0, 50.0, 0.0)));
    }

    #[test]
    fn test_rejects_point_outside_search_extent() {
        let validator = SurfaceValidator::new(&TeleportConfig::default());
        let outcome = validator.validate_impact(
            &floor(),
            Some(&impact(vec3(100.0, 50.0, 300.0), UP)),
            false,
        );
        assert_eq!(outcome, TargetOutcome::OffNavigableSurface);
    }

    #[test]
    fn test_no_impact_is_distinct_from_invalid_surface() {
        let validator = SurfaceValidator::new(&TeleportConfig::default());
        assert_eq!(
            validator.validate_impact(&floor(), None, true),
            TargetOutcome::NoImpact
        );
    }

    #[test]
    fn test_steep_normal_rejected_before_nav_query() {
        let validator = SurfaceValidator::new(&TeleportConfig::default());
        let wall = vec3(1.0, 0.0, 0.3).normalize();
        let hit = impact(vec3(0.0, 0.0, 0.0), wall);
        let outcome = validator.validate_impact(&floor(), Some(&hit), true);
        assert_eq!(outcome, TargetOutcome::SteepSurface);

        // The same impact passes when slope checking is off
        let outcome = validator.validate_impact(&floor(), Some(&hit), false);
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_normal_threshold_boundary() {
        let validator = SurfaceValidator::new(&TeleportConfig::default());
        let just_flat_enough = vec3((1.0f32 - 0.91 * 0.91).sqrt(), 0.0, 0.91);
        let too_steep = vec3((1.0f32 - 0.89 * 0.89).sqrt(), 0.0, 0.89);
        assert!(validator.is_walkable_normal(just_flat_enough));
        assert!(!validator.is_walkable_normal(too_steep));
        assert!(!validator.is_walkable_normal(-UP));
    }
}
