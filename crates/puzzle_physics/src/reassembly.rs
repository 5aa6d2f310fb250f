//! Reassembly choreography.
//!
//! Pieces go back lowest golden height first. Each follows one continuous
//! spline: up from its waiting spot, across above everything already placed,
//! and down onto its golden transform. Timing uses a quintic ease so the
//! piece starts and stops with near-zero velocity.

use bevy::log::{debug, info};
use bevy::math::{Quat, Vec3};

use crate::motion::{smootherstep, PlacementPath};
use crate::registry::PieceTransform;
use crate::world::RigidBodyWorld;

/// Flight time per piece at 1x speed, in seconds.
pub const PLACEMENT_DURATION: f32 = 1.65;
/// Clearance above the highest relevant point, in sphere radii.
pub const CLEARANCE_MARGIN_RADII: f32 = 3.0;

#[derive(Debug, Clone)]
pub struct ReassemblyPieceState {
    pub id: String,
    /// Where the piece was parked when reassembly began.
    pub waiting: PieceTransform,
    pub target: PieceTransform,
    pub sort_key: f32,
    pub placed: bool,
}

#[derive(Debug, Clone)]
pub struct ActivePlacement {
    pub index: usize,
    /// Normalized flight progress, 0 to 1.
    pub progress: f32,
    pub path: PlacementPath,
    pub clearance_y: f32,
}

/// Ids ordered by ascending golden height (ties by id).
pub fn reassembly_order(world: &RigidBodyWorld) -> Vec<String> {
    let mut entries: Vec<(String, f32)> = world
        .pieces()
        .iter()
        .map(|p| (p.id.clone(), p.golden.translation.y))
        .collect();
    entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().map(|(id, _)| id).collect()
}

#[derive(Debug, Clone)]
pub struct ReassemblyAnimator {
    entries: Vec<ReassemblyPieceState>,
    cursor: usize,
    active: Option<ActivePlacement>,
    highest_placed: Option<f32>,
    margin: f32,
}

impl ReassemblyAnimator {
    /// Capture waiting and target transforms for every piece.
    pub fn new(world: &RigidBodyWorld) -> Self {
        let entries: Vec<ReassemblyPieceState> = reassembly_order(world)
            .into_iter()
            .filter_map(|id| {
                let target = world.golden_transform(&id)?;
                let waiting = world.piece_transform(&id)?;
                Some(ReassemblyPieceState {
                    sort_key: target.translation.y,
                    id,
                    waiting,
                    target,
                    placed: false,
                })
            })
            .collect();

        info!(
            "Reassembly: {} pieces, order {:?}",
            entries.len(),
            entries.iter().map(|e| e.id.as_str()).collect::<Vec<_>>()
        );

        Self {
            entries,
            cursor: 0,
            active: None,
            highest_placed: None,
            margin: CLEARANCE_MARGIN_RADII * world.sphere_radius(),
        }
    }

    pub fn entries(&self) -> &[ReassemblyPieceState] {
        &self.entries
    }

    pub fn order(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn placed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.placed).count()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn active(&self) -> Option<&ActivePlacement> {
        self.active.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.placed)
    }

    /// Flight height for `entry`: above everything placed so far, its own
    /// target and its own waiting spot.
    fn clearance_for(&self, entry: &ReassemblyPieceState) -> f32 {
        let mut top = entry.target.translation.y.max(entry.waiting.translation.y);
        if let Some(placed) = self.highest_placed {
            top = top.max(placed);
        }
        top + self.margin
    }

    fn begin(&mut self, world: &mut RigidBodyWorld, index: usize) {
        let entry = &self.entries[index];
        let clearance_y = self.clearance_for(entry);
        let start = entry.waiting.translation;
        let target = entry.target.translation;
        let path = PlacementPath::new(
            start,
            Vec3::new(start.x, clearance_y, start.z),
            Vec3::new(target.x, clearance_y, target.z),
            target,
        );
        debug!(
            "Placing '{}' ({}/{}), clearance y={:.3}",
            entry.id,
            index + 1,
            self.entries.len(),
            clearance_y
        );
        world.set_piece_kinematic(&entry.id);
        self.active = Some(ActivePlacement {
            index,
            progress: 0.0,
            path,
            clearance_y,
        });
    }

    /// Advance the piece in flight by `dt` simulated seconds at `speed`.
    ///
    /// Returns `true` while pieces remain unplaced.
    pub fn update(&mut self, world: &mut RigidBodyWorld, dt: f32, speed: f32) -> bool {
        if self.active.is_none() {
            if self.cursor >= self.entries.len() {
                return false;
            }
            self.begin(world, self.cursor);
        }
        let Some(active) = self.active.as_mut() else {
            return false;
        };

        let rate = speed.max(f32::EPSILON) / PLACEMENT_DURATION;
        active.progress = (active.progress + dt.max(0.0) * rate).min(1.0);
        let t = active.progress;
        let eased = smootherstep(t);
        let index = active.index;
        let entry = &self.entries[index];

        if t < 1.0 {
            let rotation: Quat = entry.waiting.rotation.slerp(entry.target.rotation, eased);
            world.set_piece_transform(
                &entry.id,
                PieceTransform::new(active.path.sample(eased), rotation),
            );
            return true;
        }

        // Snap to remove spline error; the piece stays kinematic from here on.
        world.set_piece_transform(&entry.id, entry.target);
        let placed_y = entry.target.translation.y;
        debug!("Placed '{}'", entry.id);

        self.entries[index].placed = true;
        self.highest_placed = Some(self.highest_placed.map_or(placed_y, |h| h.max(placed_y)));
        self.active = None;
        self.cursor += 1;
        self.cursor < self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BodyMode;
    use crate::settings::{MatBounds, PhysicsSettings};

    const DT: f32 = 1.0 / 60.0;

    /// Three stacked single-sphere pieces, then moved aside and tilted.
    fn displaced_world() -> RigidBodyWorld {
        let mut world = RigidBodyWorld::new(PhysicsSettings::default()).unwrap();
        let bounds = MatBounds::new(Vec3::new(-1.0, -0.05, -1.0), Vec3::new(1.0, 0.0, 1.0));
        world.create_ground_plane(&bounds, Some(0.0), 0.25);
        world.create_piece_rigid_body("top", &[Vec3::new(0.0, 1.25, 0.0)], 0.25).unwrap();
        world.create_piece_rigid_body("bottom", &[Vec3::new(0.0, 0.25, 0.0)], 0.25).unwrap();
        world.create_piece_rigid_body("middle", &[Vec3::new(0.0, 0.75, 0.0)], 0.25).unwrap();

        for (i, id) in ["top", "bottom", "middle"].iter().enumerate() {
            let angle = i as f32 * 2.0;
            world.set_piece_transform(
                id,
                PieceTransform::new(
                    Vec3::new(3.0 * angle.cos(), 0.25, 3.0 * angle.sin()),
                    Quat::from_rotation_y(0.7 * (i as f32 + 1.0)),
                ),
            );
        }
        world.freeze_all_pieces();
        world
    }

    #[test]
    fn test_order_is_ascending_golden_height() {
        let world = displaced_world();
        assert_eq!(reassembly_order(&world), vec!["bottom", "middle", "top"]);
        let animator = ReassemblyAnimator::new(&world);
        assert_eq!(animator.order(), vec!["bottom", "middle", "top"]);
        assert!(animator.entries().windows(2).all(|w| w[0].sort_key < w[1].sort_key));
    }

    #[test]
    fn test_clearance_above_placed_pieces() {
        let world = displaced_world();
        let mut animator = ReassemblyAnimator::new(&world);
        animator.highest_placed = Some(2.0);
        let entry = animator.entries()[0].clone();
        assert!((animator.clearance_for(&entry) - (2.0 + 0.75)).abs() < 1e-5);

        animator.highest_placed = None;
        let expected = entry.target.translation.y.max(entry.waiting.translation.y) + 0.75;
        assert!((animator.clearance_for(&entry) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_pieces_snap_to_golden() {
        let mut world = displaced_world();
        let mut animator = ReassemblyAnimator::new(&world);

        let mut now = 0.0;
        while !animator.is_complete() {
            animator.update(&mut world, DT, 1.0);
            world.step(DT);
            now += DT;
            assert!(now < 20.0, "reassembly never completed");
        }

        assert_eq!(animator.placed_count(), 3);
        for piece in world.pieces().iter() {
            let t = world.piece_transform(&piece.id).unwrap();
            assert!(
                t.translation.distance(piece.golden.translation) < 1e-5,
                "'{}' not snapped: {:?}",
                piece.id,
                t.translation
            );
            assert!(t.rotation.angle_between(piece.golden.rotation) < 1e-5);
            assert_eq!(world.piece_mode(&piece.id), Some(BodyMode::KinematicPositionBased));
        }
    }

    #[test]
    fn test_flight_starts_and_ends_slowly() {
        let mut world = displaced_world();
        let mut animator = ReassemblyAnimator::new(&world);

        // Sample the first piece across its whole flight.
        let frames = (PLACEMENT_DURATION / DT) as usize;
        let mut positions = vec![world.piece_transform("bottom").unwrap().translation];
        for _ in 0..frames {
            animator.update(&mut world, DT, 1.0);
            positions.push(world.piece_transform("bottom").unwrap().translation);
        }
        let first_step = positions[1].distance(positions[0]);
        let mid = frames / 2;
        let mid_step = positions[mid + 1].distance(positions[mid]);

        println!("first step {:.6}, mid step {:.6}", first_step, mid_step);
        assert!(first_step < mid_step * 0.05);
    }

    #[test]
    fn test_speed_change_mid_flight_keeps_progress() {
        let mut world = displaced_world();
        let mut animator = ReassemblyAnimator::new(&world);

        for _ in 0..20 {
            animator.update(&mut world, DT, 4.0);
        }
        let before = animator.active().unwrap().progress;
        let at = world.piece_transform("bottom").unwrap().translation;

        animator.update(&mut world, DT, 0.5);
        let after = animator.active().unwrap().progress;
        let moved = world.piece_transform("bottom").unwrap().translation.distance(at);

        println!("progress {:.4} -> {:.4}, moved {:.4}", before, after, moved);
        assert!(after > before);
        assert!((after - before - DT * 0.5 / PLACEMENT_DURATION).abs() < 1e-5);
        assert!(moved < 0.1, "piece jumped {} on a speed change", moved);
    }
}
