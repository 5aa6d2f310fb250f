//! Pile seeding and drop elevation.
//!
//! Seeding scatters pieces over the mat in layered grid cells with random
//! orientation, then settles them with a bounded synchronous loop instead of
//! the frame driver. It costs one long frame at startup and yields a
//! deterministic pile for a given seed.

use bevy::log::{debug, info, warn};
use bevy::math::{Quat, Vec3};
use std::f32::consts::PI;

use crate::registry::PieceTransform;
use crate::rng::PileRng;
use crate::settings::MatBounds;
use crate::settle::{SettleDetector, SettleOutcome};
use crate::world::RigidBodyWorld;

/// Horizontal spread applied around the assembly centre before a drop.
pub const ELEVATE_SPREAD: f32 = 1.5;
/// Maximum tilt applied to each piece before a drop, in radians.
pub const ELEVATE_MAX_TILT: f32 = 0.35;

/// Largest distance from any piece centroid to its outer sphere surface.
pub fn piece_extent(world: &RigidBodyWorld) -> f32 {
    let r = world.sphere_radius();
    world
        .pieces()
        .iter()
        .flat_map(|p| p.local_offsets.iter().map(|o| o.length()))
        .fold(0.0_f32, f32::max)
        + r
}

fn shuffle(cells: &mut [usize], rng: &mut PileRng) {
    for i in (1..cells.len()).rev() {
        let j = ((rng.next_f32() * (i + 1) as f32) as usize).min(i);
        cells.swap(i, j);
    }
}

/// Place every piece above the mat in a random cell, layer by layer.
pub fn scatter_pieces(world: &mut RigidBodyWorld, bounds: &MatBounds, rng: &mut PileRng) {
    let extent = piece_extent(world).max(f32::EPSILON);
    let cell = 2.0 * extent;
    let size = bounds.max - bounds.min;
    let cols = ((size.x / cell).floor() as usize).max(1);
    let rows = ((size.z / cell).floor() as usize).max(1);
    let per_layer = cols * rows;
    let cell_w = size.x.max(cell) / cols as f32;
    let cell_d = size.z.max(cell) / rows as f32;
    let slack_x = ((cell_w - cell) * 0.5).max(0.0);
    let slack_z = ((cell_d - cell) * 0.5).max(0.0);

    let floor = bounds.max.y.max(world.ground_top_y().unwrap_or(bounds.max.y));
    let drop_height = world.settings().drop_height;
    let origin_x = bounds.center().x - cols as f32 * cell_w * 0.5;
    let origin_z = bounds.center().z - rows as f32 * cell_d * 0.5;

    let ids = world.pieces().ids();
    let mut cells: Vec<usize> = Vec::new();
    for (i, id) in ids.iter().enumerate() {
        let slot = i % per_layer;
        if slot == 0 {
            cells = (0..per_layer).collect();
            shuffle(&mut cells, rng);
        }
        let layer = i / per_layer;
        let c = cells[slot];
        let (col, row) = (c % cols, c / cols);

        let position = Vec3::new(
            origin_x + (col as f32 + 0.5) * cell_w + rng.range(-slack_x, slack_x),
            floor + extent + drop_height + layer as f32 * cell,
            origin_z + (row as f32 + 0.5) * cell_d + rng.range(-slack_z, slack_z),
        );
        let rotation = rng.tilt(PI);

        world.set_piece_dynamic(id);
        world.set_piece_transform(id, PieceTransform::new(position, rotation));
    }
    debug!(
        "Scattered {} pieces: {}x{} cells, extent {:.3}",
        ids.len(),
        cols,
        rows,
        extent
    );
}

/// Step the world with fixed sub-steps until the pile confirms settled,
/// the settle timeout fires, or `max_iterations` is reached.
pub fn settle_synchronously(world: &mut RigidBodyWorld, max_iterations: u32) -> SettleOutcome {
    let mut detector = SettleDetector::new(world.settings());
    let dt = world.settings().fixed_timestep;
    world.unfreeze_all_pieces();

    for iteration in 0..max_iterations {
        world.step_fixed();
        let outcome = detector.update(dt, || world.are_all_pieces_settled());
        if outcome.is_done() {
            info!(
                "Pile {:?} after {} steps ({:.2}s simulated)",
                outcome,
                iteration + 1,
                detector.elapsed()
            );
            return outcome;
        }
    }
    warn!(
        "Pile seeding hit the iteration cap ({}) before settling",
        max_iterations
    );
    SettleOutcome::TimedOut
}

/// Largest spread up to [`ELEVATE_SPREAD`] that keeps every piece over the
/// mat. Never below 1, so pieces are not pushed together.
fn elevate_spread(world: &RigidBodyWorld, center: Vec3, placed: &[(String, PieceTransform)]) -> f32 {
    let Some(bounds) = world.mat_bounds() else {
        return ELEVATE_SPREAD;
    };
    let margin = piece_extent(world);
    let mut spread = ELEVATE_SPREAD;
    for (_, t) in placed {
        let offset = t.translation - center;
        for (o, c, lo, hi) in [
            (offset.x, center.x, bounds.min.x, bounds.max.x),
            (offset.z, center.z, bounds.min.z, bounds.max.z),
        ] {
            let room = if o > 0.0 { hi - margin - c } else { c - (lo + margin) };
            if o.abs() > f32::EPSILON && room > 0.0 {
                spread = spread.min(room / o.abs());
            }
        }
    }
    spread.max(1.0)
}

/// Spread pieces out, lift them by the drop height, tilt them slightly and
/// hold them in place (gravity off) until the drop.
pub fn elevate_pieces(world: &mut RigidBodyWorld, rng: &mut PileRng) {
    let drop_height = world.settings().drop_height;
    let r = world.sphere_radius();

    let mut placed: Vec<(String, PieceTransform)> = world
        .pieces()
        .ids()
        .into_iter()
        .filter_map(|id| world.piece_transform(&id).map(|t| (id, t)))
        .collect();
    if placed.is_empty() {
        return;
    }
    placed.sort_by(|a, b| a.1.translation.y.total_cmp(&b.1.translation.y).then_with(|| a.0.cmp(&b.0)));

    let center = placed.iter().map(|(_, t)| t.translation).sum::<Vec3>() / placed.len() as f32;
    let spread = elevate_spread(world, center, &placed);

    for (id, current) in placed {
        let offset = current.translation - center;
        let jitter = Vec3::new(rng.range(-0.25, 0.25) * r, 0.0, rng.range(-0.25, 0.25) * r);
        let position = Vec3::new(
            center.x + offset.x * spread,
            current.translation.y + drop_height,
            center.z + offset.z * spread,
        ) + jitter;
        let rotation: Quat = (rng.tilt(ELEVATE_MAX_TILT) * current.rotation).normalize();

        world.set_piece_dynamic(&id);
        world.set_piece_transform(&id, PieceTransform::new(position, rotation));
    }
    world.freeze_all_pieces();
}
