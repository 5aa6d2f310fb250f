//! Turntable camera around the puzzle mat.
//!
//! Right mouse drag orbits, scroll zooms. Left clicks are left to the panel.

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;

const MIN_ELEVATION: f32 = 0.08;
const MAX_ELEVATION: f32 = 1.45;

#[derive(Component)]
pub struct TurntableCamera {
    pub target: Vec3,
    pub distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub sensitivity: f32,
    /// Fraction of the distance per scroll line.
    pub zoom_step: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl TurntableCamera {
    /// Frame a region of radius `extent` around `target`.
    pub fn framing(target: Vec3, extent: f32) -> Self {
        let distance = (extent * 2.6).max(2.0);
        Self {
            target,
            distance,
            azimuth: 0.6,
            elevation: 0.55,
            sensitivity: 0.006,
            zoom_step: 0.1,
            min_distance: extent.max(0.5),
            max_distance: distance * 6.0,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        self.target
            + Vec3::new(
                horizontal * self.azimuth.sin(),
                self.distance * self.elevation.sin(),
                horizontal * self.azimuth.cos(),
            )
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.target, Vec3::Y)
    }
}

pub fn turntable_camera_system(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mut query: Query<(&mut TurntableCamera, &mut Transform)>,
) {
    for (mut cam, mut transform) in query.iter_mut() {
        if mouse_button.pressed(MouseButton::Right) {
            let delta = mouse_motion.delta;
            cam.azimuth -= delta.x * cam.sensitivity;
            cam.elevation = (cam.elevation + delta.y * cam.sensitivity).clamp(MIN_ELEVATION, MAX_ELEVATION);
        }

        let scroll = mouse_scroll.delta.y;
        if scroll != 0.0 {
            let factor = (1.0 - scroll * cam.zoom_step).max(0.2);
            cam.distance = (cam.distance * factor).clamp(cam.min_distance, cam.max_distance);
        }

        *transform = cam.transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_distance_matches() {
        let cam = TurntableCamera::framing(Vec3::new(1.0, 0.0, -1.0), 3.0);
        assert!((cam.eye().distance(cam.target) - cam.distance).abs() < 1e-4);
        assert!(cam.eye().y > cam.target.y);
    }
}
