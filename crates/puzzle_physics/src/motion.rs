//! Easing curves and spline evaluation for scripted piece motion.
//!
//! Pure functions, no world access, so every curve can be tested in isolation.

use bevy::math::Vec3;

/// Cubic smoothstep, zero slope at both ends.
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Quintic smootherstep: zero velocity and acceleration at both ends.
pub fn smootherstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Uniform Catmull-Rom segment between `p1` and `p2`.
pub fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Curve through `start → rise → above → target`, evaluated over `t ∈ [0, 1]`.
///
/// Phantom end points mirror the first and last legs so the curve leaves the
/// start along the rise direction and arrives at the target from above.
#[derive(Debug, Clone, Copy)]
pub struct PlacementPath {
    points: [Vec3; 6],
}

impl PlacementPath {
    pub fn new(start: Vec3, rise: Vec3, above: Vec3, target: Vec3) -> Self {
        let before = start - (rise - start);
        let after = target + (target - above);
        Self {
            points: [before, start, rise, above, target, after],
        }
    }

    pub fn start(&self) -> Vec3 {
        self.points[1]
    }

    pub fn target(&self) -> Vec3 {
        self.points[4]
    }

    pub fn sample(&self, t: f32) -> Vec3 {
        const SEGMENTS: usize = 3;
        let t = t.clamp(0.0, 1.0);
        if t >= 1.0 {
            return self.target();
        }
        let scaled = t * SEGMENTS as f32;
        let segment = (scaled.floor() as usize).min(SEGMENTS - 1);
        let local = scaled - segment as f32;
        let p = &self.points[segment..segment + 4];
        catmull_rom(p[0], p[1], p[2], p[3], local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        for ease in [smoothstep, smootherstep] {
            assert_eq!(ease(0.0), 0.0);
            assert_eq!(ease(1.0), 1.0);
            assert!((ease(0.5) - 0.5).abs() < 1e-6);
            assert_eq!(ease(-1.0), 0.0);
            assert_eq!(ease(2.0), 1.0);
        }
    }

    #[test]
    fn test_smootherstep_flatter_at_ends() {
        // Near the ends the quintic moves less than the cubic.
        assert!(smootherstep(0.05) < smoothstep(0.05));
        assert!(smootherstep(0.95) > smoothstep(0.95));
    }

    #[test]
    fn test_catmull_rom_passes_through_knots() {
        let p0 = Vec3::new(-1.0, 0.0, 0.0);
        let p1 = Vec3::ZERO;
        let p2 = Vec3::new(1.0, 2.0, 0.0);
        let p3 = Vec3::new(2.0, 2.0, 0.0);
        assert!(catmull_rom(p0, p1, p2, p3, 0.0).distance(p1) < 1e-6);
        assert!(catmull_rom(p0, p1, p2, p3, 1.0).distance(p2) < 1e-6);
    }

    #[test]
    fn test_placement_path_hits_waypoints() {
        let start = Vec3::new(4.0, 0.5, 0.0);
        let rise = Vec3::new(4.0, 3.0, 0.0);
        let above = Vec3::new(0.0, 3.0, 0.0);
        let target = Vec3::new(0.0, 1.0, 0.0);
        let path = PlacementPath::new(start, rise, above, target);

        assert!(path.sample(0.0).distance(start) < 1e-5);
        assert!(path.sample(1.0 / 3.0).distance(rise) < 1e-4);
        assert!(path.sample(2.0 / 3.0).distance(above) < 1e-4);
        assert_eq!(path.sample(1.0), target);
    }

    #[test]
    fn test_placement_path_stays_high_in_middle() {
        let path = PlacementPath::new(
            Vec3::new(4.0, 0.5, 0.0),
            Vec3::new(4.0, 3.0, 0.0),
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        for i in 34..66 {
            let p = path.sample(i as f32 / 100.0);
            assert!(p.y > 2.5, "dipped to {} at t={}", p.y, i as f32 / 100.0);
        }
    }
}
