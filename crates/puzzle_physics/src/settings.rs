//! Simulation configuration.
//!
//! [`PhysicsSettings`] is supplied once to
//! [`SimulationOrchestrator::initialize`](crate::SimulationOrchestrator::initialize).
//! Changing any value requires re-initializing the world.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{SimulationError, SimulationResult};

/// Physics and choreography parameters for one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Gravity magnitude, applied along -Y (default: 9.81).
    pub gravity: f32,
    /// Fixed physics sub-step length in seconds (default: 1/120).
    pub fixed_timestep: f32,
    /// Maximum sub-steps consumed per `step` call to prevent spiral of death.
    pub max_substeps: u32,
    /// Linear damping applied to every piece body.
    pub linear_damping: f32,
    /// Angular damping applied to every piece body.
    pub angular_damping: f32,
    /// Friction coefficient for sphere and slab colliders.
    pub friction: f32,
    /// Restitution coefficient for sphere and slab colliders.
    pub restitution: f32,
    /// Density of each sphere collider.
    pub density: f32,
    /// Distance below `bounds.min.y` of the ground top when no floor height is given.
    pub ground_offset: f32,
    /// Thickness of the ground slab.
    pub ground_thickness: f32,
    /// Thickness of the mat slab.
    pub mat_thickness: f32,
    /// Fraction of the sphere radius the mat top is lowered by (sphere dimples).
    pub dimple_depth_fraction: f32,
    /// Linear speed below which a piece counts as still.
    pub settle_linear_threshold: f32,
    /// Angular speed below which a piece counts as still.
    pub settle_angular_threshold: f32,
    /// Simulated time before the first settle check.
    pub settle_min_time: f32,
    /// Simulated time between settle checks.
    pub settle_check_interval: f32,
    /// Consecutive positive checks required to declare the pile settled.
    pub settle_consecutive_checks: u32,
    /// Height pieces are raised by before a drop.
    pub drop_height: f32,
    /// Simulated time after which a drop is forced to count as settled.
    pub max_sim_time: f32,
    /// Removal circle margin outside the mat, in sphere radii.
    pub removal_margin: f32,
    /// Seed for pile and drop jitter.
    pub pile_seed: u64,
    /// Iteration cap for synchronous pile seeding.
    pub max_pile_iterations: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            fixed_timestep: 1.0 / 120.0,
            max_substeps: 8,
            linear_damping: 0.3,
            angular_damping: 0.8,
            friction: 0.7,
            restitution: 0.05,
            density: 1.0,
            ground_offset: 0.05,
            ground_thickness: 1.0,
            mat_thickness: 0.1,
            dimple_depth_fraction: 0.15,
            settle_linear_threshold: 0.01,
            settle_angular_threshold: 0.05,
            settle_min_time: 0.5,
            settle_check_interval: 0.1,
            settle_consecutive_checks: 3,
            drop_height: 0.2,
            max_sim_time: 8.0,
            removal_margin: 3.0,
            pile_seed: 42,
            max_pile_iterations: 2400,
        }
    }
}

impl PhysicsSettings {
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_settle_thresholds(mut self, linear: f32, angular: f32) -> Self {
        self.settle_linear_threshold = linear;
        self.settle_angular_threshold = angular;
        self
    }

    pub fn with_drop_height(mut self, drop_height: f32) -> Self {
        self.drop_height = drop_height;
        self
    }

    pub fn with_max_sim_time(mut self, max_sim_time: f32) -> Self {
        self.max_sim_time = max_sim_time;
        self
    }

    pub fn with_pile_seed(mut self, seed: u64) -> Self {
        self.pile_seed = seed;
        self
    }

    pub fn with_removal_margin(mut self, margin: f32) -> Self {
        self.removal_margin = margin;
        self
    }

    /// Gravity as a world-space vector.
    pub fn gravity_vector(&self) -> Vec3 {
        Vec3::new(0.0, -self.gravity, 0.0)
    }

    /// Check the settings can drive a world.
    ///
    /// Thresholds may be zero (an unreachable settle), every duration and
    /// size must be positive and finite.
    pub fn validate(&self) -> SimulationResult<()> {
        let positive = [
            ("fixed_timestep", self.fixed_timestep),
            ("ground_thickness", self.ground_thickness),
            ("mat_thickness", self.mat_thickness),
            ("density", self.density),
            ("settle_check_interval", self.settle_check_interval),
            ("max_sim_time", self.max_sim_time),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimulationError::InvalidSettings(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("gravity", self.gravity),
            ("linear_damping", self.linear_damping),
            ("angular_damping", self.angular_damping),
            ("friction", self.friction),
            ("restitution", self.restitution),
            ("ground_offset", self.ground_offset),
            ("dimple_depth_fraction", self.dimple_depth_fraction),
            ("settle_linear_threshold", self.settle_linear_threshold),
            ("settle_angular_threshold", self.settle_angular_threshold),
            ("settle_min_time", self.settle_min_time),
            ("drop_height", self.drop_height),
            ("removal_margin", self.removal_margin),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimulationError::InvalidSettings(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        if self.max_substeps == 0 {
            return Err(SimulationError::InvalidSettings(
                "max_substeps must be at least 1".into(),
            ));
        }
        if self.settle_consecutive_checks == 0 {
            return Err(SimulationError::InvalidSettings(
                "settle_consecutive_checks must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Axis-aligned bounds of the mat surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl MatBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Half of the horizontal (XZ) diagonal.
    pub fn bounding_radius(&self) -> f32 {
        let half = self.half_extents();
        (half.x * half.x + half.z * half.z).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_validate() {
        assert!(PhysicsSettings::default().validate().is_ok());
    }

    #[test]
    fn test_zero_thresholds_are_allowed() {
        let settings = PhysicsSettings::default().with_settle_thresholds(0.0, 0.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_timestep_rejected() {
        let settings = PhysicsSettings {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("fixed_timestep"), "got {err}");
    }

    #[test]
    fn test_nan_gravity_rejected() {
        let settings = PhysicsSettings::default().with_gravity(f32::NAN);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: PhysicsSettings =
            serde_json::from_str(r#"{ "gravity": 5.0, "pile_seed": 7 }"#).unwrap();
        assert_eq!(settings.gravity, 5.0);
        assert_eq!(settings.pile_seed, 7);
        assert_eq!(settings.max_substeps, PhysicsSettings::default().max_substeps);
    }

    #[test]
    fn test_mat_bounds_radius() {
        let bounds = MatBounds::new(Vec3::new(3.0, 0.0, 4.0), Vec3::new(-3.0, -0.1, -4.0));
        assert_eq!(bounds.min, Vec3::new(-3.0, -0.1, -4.0));
        assert!((bounds.bounding_radius() - 5.0).abs() < 1e-5);
        assert_eq!(bounds.center().x, 0.0);
    }
}
