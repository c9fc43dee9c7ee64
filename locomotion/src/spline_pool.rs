use cgmath::{Vector3, Zero};

use crate::{
    logging::SCOPE_POOL,
    math::{catmull_rom_tangents, hermite, Pose},
};

/// One pooled piece of the visualized arc, in the pool anchor's local frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ArcSegment {
    slot: usize,
    pub start_position: Vector3<f32>,
    pub start_tangent: Vector3<f32>,
    pub end_position: Vector3<f32>,
    pub end_tangent: Vector3<f32>,
    pub visible: bool,
    /// Always false: segments are visuals only
    pub collision_enabled: bool,
}

impl ArcSegment {
    fn new(slot: usize) -> Self {
        ArcSegment {
            slot,
            start_position: Vector3::zero(),
            start_tangent: Vector3::zero(),
            end_position: Vector3::zero(),
            end_tangent: Vector3::zero(),
            visible: false,
            collision_enabled: false,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Point along the segment's curve, `t` in [0, 1]
    pub fn sample(&self, t: f32) -> Vector3<f32> {
        hermite(
            self.start_position,
            self.start_tangent,
            self.end_position,
            self.end_tangent,
            t,
        )
    }
}

/// Arena of arc segments that grows to the longest path seen and never shrinks.
///
/// Unused slots are hidden, not freed, to keep allocation out of the frame loop.
#[derive(Debug, Default)]
pub struct SplineSegmentPool {
    segments: Vec<ArcSegment>,
    spline_points: Vec<Vector3<f32>>,
    visible_count: usize,
}

impl SplineSegmentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay the pool along `world_points`, expressed relative to `anchor`.
    pub fn update(&mut self, world_points: &[Vector3<f32>], anchor: &Pose) {
        if world_points.is_empty() {
            self.hide_all();
            return;
        }

        self.spline_points.clear();
        self.spline_points
            .extend(world_points.iter().map(|p| anchor.inverse_transform_point(*p)));
        let tangents = catmull_rom_tangents(&self.spline_points);

        let required = self.spline_points.len() - 1;
        if self.segments.len() < required {
            crate::scoped_log!(
                DEBUG,
                SCOPE_POOL,
                from = self.segments.len(),
                to = required,
                "growing arc segment pool"
            );
            let start = self.segments.len();
            self.segments.extend((start..required).map(ArcSegment::new));
        }

        for (i, segment) in self.segments.iter_mut().enumerate() {
            if i < required {
                segment.start_position = self.spline_points[i];
                segment.start_tangent = tangents[i];
                segment.end_position = self.spline_points[i + 1];
                segment.end_tangent = tangents[i + 1];
                segment.visible = true;
            } else {
                segment.visible = false;
            }
        }
        self.visible_count = required;
    }

    pub fn hide_all(&mut self) {
        for segment in &mut self.segments {
            segment.visible = false;
        }
        self.visible_count = 0;
    }

    pub fn segments(&self) -> &[ArcSegment] {
        &self.segments
    }

    pub fn visible_segments(&self) -> impl Iterator<Item = &ArcSegment> {
        self.segments.iter().filter(|s| s.visible)
    }

    /// Allocated segments, the high-water mark of the session
    pub fn live_count(&self) -> usize {
        self.segments.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Local-space control points of the last non-empty path
    pub fn spline_points(&self) -> &[Vector3<f32>] {
        &self.spline_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{vec3, InnerSpace};

    fn line(n: usize) -> Vec<Vector3<f32>> {
        (0..n).map(|i| vec3(i as f32, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_three_points_make_two_visible_segments() {
        let mut pool = SplineSegmentPool::new();
        pool.update(&line(3), &Pose::default());

        assert_eq!(pool.live_count(), 2);
        assert_eq!(pool.visible_count(), 2);
        assert_eq!(pool.visible_segments().count(), 2);

        let first = &pool.segments()[0];
        assert_eq!(first.start_position, vec3(0.0, 0.0, 0.0));
        assert_eq!(first.end_position, vec3(1.0, 0.0, 0.0));
        assert_eq!(first.start_tangent, vec3(1.0, 0.0, 0.0));
        assert!(!first.collision_enabled);
    }

    #[test]
    fn test_empty_path_hides_without_freeing() {
        let mut pool = SplineSegmentPool::new();
        pool.update(&line(3), &Pose::default());
        pool.update(&[], &Pose::default());

        assert_eq!(pool.live_count(), 2);
        assert_eq!(pool.visible_count(), 0);
        assert!(pool.segments().iter().all(|s| !s.visible));
        // Geometry from the last real path is left untouched
        assert_eq!(pool.segments()[1].end_position, vec3(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_pool_never_shrinks() {
        let mut pool = SplineSegmentPool::new();
        let mut high_water = 0;
        for n in [5, 2, 9, 0, 1, 4, 12, 3] {
            pool.update(&line(n), &Pose::default());
            high_water = high_water.max(n.saturating_sub(1));
            assert_eq!(pool.live_count(), high_water);
            assert_eq!(pool.visible_count(), n.saturating_sub(1));
        }
        let slots: Vec<usize> = pool.segments().iter().map(ArcSegment::slot).collect();
        assert_eq!(slots, (0..high_water).collect::<Vec<_>>());
        assert_eq!(high_water, 11);
    }

    #[test]
    fn test_single_point_shows_nothing() {
        let mut pool = SplineSegmentPool::new();
        pool.update(&line(4), &Pose::default());
        pool.update(&line(1), &Pose::default());
        assert_eq!(pool.visible_count(), 0);
        assert_eq!(pool.live_count(), 3);
    }

    #[test]
    fn test_points_are_stored_in_anchor_space() {
        let mut pool = SplineSegmentPool::new();
        let anchor = Pose::from_position(vec3(100.0, 0.0, 50.0));
        pool.update(&[vec3(100.0, 0.0, 50.0), vec3(110.0, 0.0, 50.0)], &anchor);

        let segment = &pool.segments()[0];
        assert_eq!(segment.start_position, vec3(0.0, 0.0, 0.0));
        assert_eq!(segment.end_position, vec3(10.0, 0.0, 0.0));
        assert!((segment.sample(0.5) - vec3(5.0, 0.0, 0.0)).magnitude() < 1.0e-4);
    }
}
