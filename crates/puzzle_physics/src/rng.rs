//! Seeded randomness for pile and drop jitter.

use bevy::math::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reproducible random source: the same seed always yields the same pile.
#[derive(Debug, Clone)]
pub struct PileRng {
    rng: StdRng,
}

impl PileRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// Uniform value in `[min, max)`.
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    /// Rotation about a random axis by up to `max_angle` radians.
    pub fn tilt(&mut self, max_angle: f32) -> Quat {
        let axis = Vec3::new(
            self.range(-1.0, 1.0),
            self.range(-1.0, 1.0),
            self.range(-1.0, 1.0),
        )
        .try_normalize()
        .unwrap_or(Vec3::Y);
        Quat::from_axis_angle(axis, self.range(-max_angle, max_angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = PileRng::new(1234);
        let mut b = PileRng::new(1234);
        for _ in 0..32 {
            assert_eq!(a.next_f32(), b.next_f32());
        }
    }

    #[test]
    fn test_values_in_unit_interval() {
        let mut rng = PileRng::new(9);
        for _ in 0..1000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = PileRng::new(1);
        let mut b = PileRng::new(2);
        let same = (0..16).filter(|_| a.next_f32() == b.next_f32()).count();
        assert!(same < 16);
    }

    #[test]
    fn test_tilt_is_unit_rotation() {
        let mut rng = PileRng::new(5);
        let q = rng.tilt(0.3);
        assert!((q.length() - 1.0).abs() < 1e-4);
        assert!(q.angle_between(Quat::IDENTITY) <= 0.3 + 1e-4);
    }
}
