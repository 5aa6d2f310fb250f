//! Disassembly choreography.
//!
//! Pieces leave the pile one at a time, highest first, and are parked on a
//! circle outside the mat. Each piece runs four phases:
//!
//! 1. **Lifting**: straight up, smoothstep eased.
//! 2. **Moving**: eased XZ travel with a sine arc on top, so the piece hops
//!    instead of sliding.
//! 3. **Lowering**: eased descent to half a radius above its slot.
//! 4. **Settling**: released to dynamic and left to land under gravity.
//!
//! The next piece starts only after the current one has finished settling
//! and is dynamic again.

use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

use bevy::log::{debug, info};
use bevy::math::{Quat, Vec3};

use crate::motion::{lerp, smoothstep};
use crate::registry::{BodyMode, PieceTransform};
use crate::settings::MatBounds;
use crate::world::RigidBodyWorld;

/// Phase durations at 1x speed, in seconds.
pub const LIFT_DURATION: f32 = 0.35;
pub const MOVE_DURATION: f32 = 0.9;
pub const LOWER_DURATION: f32 = 0.35;
pub const SETTLE_DURATION: f32 = 0.5;

/// Rise during lifting, in sphere radii.
pub const LIFT_HEIGHT_RADII: f32 = 3.0;
/// Extra height of the travel arc, in sphere radii.
pub const ARC_HEIGHT_RADII: f32 = 2.0;
/// Parked centroid height above the ground top, in sphere radii.
/// Tilted tetrahedral pieces reach lower than one radius below their centroid.
pub const PARK_HEIGHT_RADII: f32 = 1.5;
/// Clearance added on top of the parked height, in sphere radii.
pub const PARK_CLEARANCE_RADII: f32 = 0.05;
/// Release height above the parked slot, in sphere radii.
pub const RELEASE_HEIGHT_RADII: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPhase {
    Lifting,
    Moving,
    Lowering,
    Settling,
}

/// The single piece currently in motion.
#[derive(Debug, Clone)]
pub struct ActiveRemoval {
    pub id: String,
    pub phase: RemovalPhase,
    /// Normalized progress through the current phase, 0 to 1.
    pub progress: f32,
    pub start: Vec3,
    pub rotation: Quat,
    /// End of the lift.
    pub lifted: Vec3,
    /// End of the move, directly above the slot.
    pub hover: Vec3,
    /// Parked slot position.
    pub target: Vec3,
    /// Release point for the settling phase.
    pub release: Vec3,
}

/// Ids ordered by descending current height (ties by id).
pub fn removal_order(world: &RigidBodyWorld) -> Vec<String> {
    let mut entries: Vec<(String, f32)> = world
        .pieces()
        .iter()
        .filter_map(|p| world.piece_transform(&p.id).map(|t| (p.id.clone(), t.translation.y)))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().map(|(id, _)| id).collect()
}

/// Bounds around the piece centroids, for worlds set up without a mat.
fn fallback_bounds(world: &RigidBodyWorld) -> MatBounds {
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for piece in world.pieces().iter() {
        if let Some(t) = world.piece_transform(&piece.id) {
            min = min.min(t.translation);
            max = max.max(t.translation);
        }
    }
    if min.x > max.x {
        return MatBounds::new(Vec3::ZERO, Vec3::ZERO);
    }
    MatBounds::new(min, max)
}

#[derive(Debug, Clone)]
pub struct RemovalAnimator {
    queue: VecDeque<String>,
    order: Vec<String>,
    active: Option<ActiveRemoval>,
    total: usize,
    started: usize,
    removed: usize,
    center: Vec3,
    circle_radius: f32,
    ground_top: f32,
    sphere_radius: f32,
    finish_logged: bool,
}

impl RemovalAnimator {
    /// Capture the removal order and parking geometry from the current world.
    pub fn new(world: &RigidBodyWorld) -> Self {
        let order = removal_order(world);
        let sphere_radius = world.sphere_radius();
        let bounds = world.mat_bounds().unwrap_or_else(|| fallback_bounds(world));
        let ground_top = world.ground_top_y().unwrap_or(bounds.min.y);
        let circle_radius = world.removal_circle_radius(&bounds, sphere_radius);

        info!(
            "Removal: {} pieces, circle radius {:.3}, order {:?}",
            order.len(),
            circle_radius,
            order
        );

        Self {
            queue: order.iter().cloned().collect(),
            total: order.len(),
            order,
            active: None,
            started: 0,
            removed: 0,
            center: bounds.center(),
            circle_radius,
            ground_top,
            sphere_radius,
            finish_logged: false,
        }
    }

    /// Removal order fixed at construction.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn removed_count(&self) -> usize {
        self.removed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn active(&self) -> Option<&ActiveRemoval> {
        self.active.as_ref()
    }

    pub fn circle_radius(&self) -> f32 {
        self.circle_radius
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// True once the queue and the active slot are both empty.
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty() && self.active.is_none()
    }

    /// Parked slot for the `index`-th removed piece.
    pub fn slot_position(&self, index: usize) -> Vec3 {
        let angle = if self.total == 0 {
            0.0
        } else {
            index as f32 / self.total as f32 * TAU
        };
        Vec3::new(
            self.center.x + self.circle_radius * angle.cos(),
            self.ground_top + self.sphere_radius * (PARK_HEIGHT_RADII + PARK_CLEARANCE_RADII),
            self.center.z + self.circle_radius * angle.sin(),
        )
    }

    fn begin(&mut self, world: &mut RigidBodyWorld, id: String) {
        let current = world.piece_transform(&id).unwrap_or_default();
        world.set_piece_kinematic(&id);

        let r = self.sphere_radius;
        let target = self.slot_position(self.started);
        let lifted = current.translation + Vec3::Y * (LIFT_HEIGHT_RADII * r);
        let hover = target + Vec3::Y * (LIFT_HEIGHT_RADII * r);
        let release = target + Vec3::Y * (RELEASE_HEIGHT_RADII * r);

        debug!(
            "Removing '{}' ({}/{}) -> slot ({:.3}, {:.3}, {:.3})",
            id,
            self.started + 1,
            self.total,
            target.x,
            target.y,
            target.z
        );

        self.started += 1;
        self.active = Some(ActiveRemoval {
            id,
            phase: RemovalPhase::Lifting,
            progress: 0.0,
            start: current.translation,
            rotation: current.rotation,
            lifted,
            hover,
            target,
            release,
        });
    }

    /// Advance the active piece by `dt` simulated seconds at `speed`.
    ///
    /// Progress accumulates per call, so a speed change mid-phase only
    /// changes the rate from here on. Returns `true` while there is still
    /// work to do.
    pub fn update(&mut self, world: &mut RigidBodyWorld, dt: f32, speed: f32) -> bool {
        if self.active.is_none() {
            match self.queue.pop_front() {
                Some(id) => self.begin(world, id),
                None => {
                    if !self.finish_logged {
                        info!("Removal finished: {}/{} pieces", self.removed, self.total);
                        self.finish_logged = true;
                    }
                    return false;
                }
            }
        }

        let speed = speed.max(f32::EPSILON);
        let arc_height = ARC_HEIGHT_RADII * self.sphere_radius;
        let Some(active) = self.active.as_mut() else {
            return false;
        };

        let duration = match active.phase {
            RemovalPhase::Lifting => LIFT_DURATION,
            RemovalPhase::Moving => MOVE_DURATION,
            RemovalPhase::Lowering => LOWER_DURATION,
            RemovalPhase::Settling => SETTLE_DURATION,
        };
        active.progress = (active.progress + dt.max(0.0) * speed / duration).min(1.0);
        let t = active.progress;
        let eased = smoothstep(t);

        let position = match active.phase {
            RemovalPhase::Lifting => Some(active.start.lerp(active.lifted, eased)),
            RemovalPhase::Moving => {
                let from = active.lifted;
                let to = active.hover;
                Some(Vec3::new(
                    lerp(from.x, to.x, eased),
                    lerp(from.y, to.y, eased) + arc_height * (PI * eased).sin(),
                    lerp(from.z, to.z, eased),
                ))
            }
            RemovalPhase::Lowering => Some(active.hover.lerp(active.release, eased)),
            RemovalPhase::Settling => None,
        };
        if let Some(position) = position {
            world.set_piece_transform(&active.id, PieceTransform::new(position, active.rotation));
        }

        if t < 1.0 {
            return true;
        }

        match active.phase {
            RemovalPhase::Lifting => active.phase = RemovalPhase::Moving,
            RemovalPhase::Moving => active.phase = RemovalPhase::Lowering,
            RemovalPhase::Lowering => {
                world.set_piece_dynamic(&active.id);
                active.phase = RemovalPhase::Settling;
            }
            RemovalPhase::Settling => {
                if world.piece_mode(&active.id) != Some(BodyMode::Dynamic) {
                    world.set_piece_dynamic(&active.id);
                    return true;
                }
                self.removed += 1;
                debug!("Removed '{}' ({}/{})", active.id, self.removed, self.total);
                self.active = None;
                return true;
            }
        }
        active.progress = 0.0;
        true
    }
}
