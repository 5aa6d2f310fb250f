//! Rigid body world: the rapier pipeline plus the puzzle's three body classes.
//!
//! - a fixed ground slab large enough to hold the removal circle,
//! - a fixed mat slab, lowered to model spheres resting in dimples,
//! - one compound body per piece, one ball collider per sphere.
//!
//! Stepping uses a fixed timestep with an accumulator, so results do not
//! depend on the caller's frame rate.

use bevy::log::debug;
use bevy::math::{Quat, Vec3};
use rapier3d::prelude as rapier;
use rapier::nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};

use crate::error::{SimulationError, SimulationResult};
use crate::registry::{centroid, BodyMode, Piece, PieceRegistry, PieceTransform};
use crate::settings::{MatBounds, PhysicsSettings};

/// Extra ground beyond the removal circle, in sphere radii.
const GROUND_SLACK_RADII: f32 = 6.0;

pub(crate) fn to_na(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

pub(crate) fn from_na(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_isometry(t: &PieceTransform) -> Isometry3<f32> {
    let q = t.rotation.normalize();
    Isometry3::from_parts(
        Translation3::new(t.translation.x, t.translation.y, t.translation.z),
        UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}

fn from_isometry(iso: &Isometry3<f32>) -> PieceTransform {
    let pos = iso.translation.vector;
    let rot = iso.rotation;
    PieceTransform {
        translation: Vec3::new(pos.x, pos.y, pos.z),
        rotation: Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w),
    }
}

pub struct RigidBodyWorld {
    settings: PhysicsSettings,
    gravity: Vector3<f32>,
    integration_parameters: rapier::IntegrationParameters,
    physics_pipeline: rapier::PhysicsPipeline,
    island_manager: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    rigid_body_set: rapier::RigidBodySet,
    collider_set: rapier::ColliderSet,
    impulse_joint_set: rapier::ImpulseJointSet,
    multibody_joint_set: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
    pieces: PieceRegistry,
    /// Unconsumed time, always below one fixed step after a full `step`.
    accumulator: f32,
    ground: Option<rapier::RigidBodyHandle>,
    mat: Option<rapier::RigidBodyHandle>,
    ground_top_y: Option<f32>,
    mat_bounds: Option<MatBounds>,
    sphere_radius: f32,
}

impl RigidBodyWorld {
    /// Build an empty world. Fails if `settings` cannot drive a simulation.
    pub fn new(settings: PhysicsSettings) -> SimulationResult<Self> {
        settings.validate()?;

        let mut integration_parameters = rapier::IntegrationParameters::default();
        integration_parameters.dt = settings.fixed_timestep;

        Ok(Self {
            gravity: to_na(settings.gravity_vector()),
            settings,
            integration_parameters,
            physics_pipeline: rapier::PhysicsPipeline::new(),
            island_manager: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            rigid_body_set: rapier::RigidBodySet::new(),
            collider_set: rapier::ColliderSet::new(),
            impulse_joint_set: rapier::ImpulseJointSet::new(),
            multibody_joint_set: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            pieces: PieceRegistry::new(),
            accumulator: 0.0,
            ground: None,
            mat: None,
            ground_top_y: None,
            mat_bounds: None,
            sphere_radius: 0.0,
        })
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    pub fn pieces(&self) -> &PieceRegistry {
        &self.pieces
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn ground_top_y(&self) -> Option<f32> {
        self.ground_top_y
    }

    pub fn mat_bounds(&self) -> Option<MatBounds> {
        self.mat_bounds
    }

    /// Radius of the most recently registered spheres.
    pub fn sphere_radius(&self) -> f32 {
        self.sphere_radius
    }

    /// Radius of the circle removed pieces are parked on.
    pub fn removal_circle_radius(&self, bounds: &MatBounds, sphere_radius: f32) -> f32 {
        bounds.bounding_radius() + sphere_radius * self.settings.removal_margin
    }

    fn remove_body(&mut self, handle: rapier::RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    fn insert_fixed_slab(&mut self, center: Vec3, half_extents: Vec3) -> rapier::RigidBodyHandle {
        let body = rapier::RigidBodyBuilder::fixed().translation(to_na(center));
        let handle = self.rigid_body_set.insert(body);
        let collider = rapier::ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .friction(self.settings.friction)
            .restitution(self.settings.restitution);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        handle
    }

    /// Create the ground slab, replacing any previous one.
    ///
    /// The top sits at `floor_top_y` when given, otherwise `ground_offset`
    /// below the mat bounds.
    pub fn create_ground_plane(
        &mut self,
        bounds: &MatBounds,
        floor_top_y: Option<f32>,
        sphere_radius: f32,
    ) -> rapier::RigidBodyHandle {
        if let Some(old) = self.ground.take() {
            self.remove_body(old);
        }

        let top = floor_top_y.unwrap_or(bounds.min.y - self.settings.ground_offset);
        let half_size = self.removal_circle_radius(bounds, sphere_radius)
            + sphere_radius * GROUND_SLACK_RADII;
        let half_thickness = self.settings.ground_thickness * 0.5;
        let center = bounds.center();

        let handle = self.insert_fixed_slab(
            Vec3::new(center.x, top - half_thickness, center.z),
            Vec3::new(half_size, half_thickness, half_size),
        );

        debug!("Ground plane: top y={:.4}, half size={:.3}", top, half_size);
        self.ground = Some(handle);
        self.ground_top_y = Some(top);
        self.sphere_radius = sphere_radius;
        handle
    }

    /// Create the mat slab, replacing any previous one.
    pub fn create_placemat_collider(
        &mut self,
        bounds: &MatBounds,
        sphere_radius: f32,
    ) -> rapier::RigidBodyHandle {
        if let Some(old) = self.mat.take() {
            self.remove_body(old);
        }

        let top = bounds.max.y - self.settings.dimple_depth_fraction * sphere_radius;
        let half_thickness = self.settings.mat_thickness * 0.5;
        let half = bounds.half_extents();
        let center = bounds.center();

        let handle = self.insert_fixed_slab(
            Vec3::new(center.x, top - half_thickness, center.z),
            Vec3::new(half.x.max(sphere_radius), half_thickness, half.z.max(sphere_radius)),
        );

        debug!("Placemat: top y={:.4}, half extents=({:.3}, {:.3})", top, half.x, half.z);
        self.mat = Some(handle);
        self.mat_bounds = Some(*bounds);
        self.sphere_radius = sphere_radius;
        handle
    }

    /// Create one compound body at the centroid of `sphere_positions`.
    ///
    /// The body never sleeps: kinematic and dynamic phases interleave and a
    /// sleeping body would miss the next mode switch.
    pub fn create_piece_rigid_body(
        &mut self,
        id: &str,
        sphere_positions: &[Vec3],
        sphere_radius: f32,
    ) -> SimulationResult<rapier::RigidBodyHandle> {
        let center =
            centroid(sphere_positions).ok_or_else(|| SimulationError::EmptyPiece(id.to_string()))?;
        if !(sphere_radius.is_finite() && sphere_radius > 0.0) {
            return Err(SimulationError::InvalidRadius(sphere_radius));
        }

        if let Some(old) = self.pieces.get(id).map(|p| p.body) {
            self.remove_body(old);
        }

        let body = rapier::RigidBodyBuilder::dynamic()
            .translation(to_na(center))
            .linear_damping(self.settings.linear_damping)
            .angular_damping(self.settings.angular_damping)
            .can_sleep(false)
            .ccd_enabled(true);
        let handle = self.rigid_body_set.insert(body);

        let local_offsets: Vec<Vec3> = sphere_positions.iter().map(|p| *p - center).collect();
        for offset in &local_offsets {
            let collider = rapier::ColliderBuilder::ball(sphere_radius)
                .translation(to_na(*offset))
                .friction(self.settings.friction)
                .restitution(self.settings.restitution)
                .density(self.settings.density);
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        }

        debug!(
            "Piece '{}': {} spheres, centroid ({:.3}, {:.3}, {:.3})",
            id,
            local_offsets.len(),
            center.x,
            center.y,
            center.z
        );

        self.pieces.insert(Piece {
            id: id.to_string(),
            local_offsets,
            body: handle,
            golden: PieceTransform::from_translation(center),
            mode: BodyMode::Dynamic,
        });
        self.sphere_radius = sphere_radius;
        Ok(handle)
    }

    /// Advance the simulation by `delta` seconds of wall time.
    ///
    /// Runs zero or more fixed sub-steps, capped at `max_substeps`. Time
    /// beyond the cap is dropped rather than carried into the next call.
    ///
    /// Returns the simulated time actually advanced.
    pub fn step(&mut self, delta: f32) -> f32 {
        for piece in self.pieces.iter() {
            if let Some(body) = self.rigid_body_set.get_mut(piece.body) {
                body.wake_up(true);
            }
        }

        self.accumulator += delta.max(0.0);

        let fixed = self.settings.fixed_timestep;
        let mut steps = 0;
        while self.accumulator >= fixed && steps < self.settings.max_substeps {
            self.step_fixed();
            self.accumulator -= fixed;
            steps += 1;
        }
        if steps == self.settings.max_substeps && self.accumulator >= fixed {
            self.accumulator %= fixed;
        }
        steps as f32 * fixed
    }

    /// Run exactly one fixed sub-step, bypassing the accumulator.
    pub fn step_fixed(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    fn body_mut(&mut self, id: &str) -> Option<&mut rapier::RigidBody> {
        let handle = self.pieces.get(id)?.body;
        self.rigid_body_set.get_mut(handle)
    }

    fn body(&self, id: &str) -> Option<&rapier::RigidBody> {
        let handle = self.pieces.get(id)?.body;
        self.rigid_body_set.get(handle)
    }

    fn set_gravity_scale_all(&mut self, scale: f32) {
        for piece in self.pieces.iter() {
            if let Some(body) = self.rigid_body_set.get_mut(piece.body) {
                body.set_linvel(Vector3::zeros(), true);
                body.set_angvel(Vector3::zeros(), true);
                body.set_gravity_scale(scale, true);
            }
        }
    }

    /// Zero all piece velocities and switch gravity off.
    pub fn freeze_all_pieces(&mut self) {
        self.set_gravity_scale_all(0.0);
    }

    /// Zero all piece velocities and switch gravity back on.
    pub fn unfreeze_all_pieces(&mut self) {
        self.set_gravity_scale_all(1.0);
    }

    fn set_piece_sensors(&mut self, id: &str, sensor: bool) {
        let Some(handle) = self.pieces.get(id).map(|p| p.body) else {
            return;
        };
        let colliders: Vec<rapier::ColliderHandle> = match self.rigid_body_set.get(handle) {
            Some(body) => body.colliders().to_vec(),
            None => return,
        };
        for collider in colliders {
            if let Some(collider) = self.collider_set.get_mut(collider) {
                collider.set_sensor(sensor);
            }
        }
    }

    /// Switch a piece to kinematic and make its colliders pass-through,
    /// so an animated piece cannot knock settled ones.
    pub fn set_piece_kinematic(&mut self, id: &str) -> bool {
        let Some(body) = self.body_mut(id) else {
            return false;
        };
        body.set_body_type(rapier::RigidBodyType::KinematicPositionBased, true);
        body.set_linvel(Vector3::zeros(), true);
        body.set_angvel(Vector3::zeros(), true);
        let here = *body.position();
        body.set_next_kinematic_position(here);
        self.set_piece_sensors(id, true);
        if let Some(piece) = self.pieces.get_mut(id) {
            piece.mode = BodyMode::KinematicPositionBased;
        }
        true
    }

    /// Switch a piece back to dynamic with solid colliders and no residual velocity.
    pub fn set_piece_dynamic(&mut self, id: &str) -> bool {
        self.set_piece_sensors(id, false);
        let Some(body) = self.body_mut(id) else {
            return false;
        };
        body.set_body_type(rapier::RigidBodyType::Dynamic, true);
        body.set_linvel(Vector3::zeros(), true);
        body.set_angvel(Vector3::zeros(), true);
        if let Some(piece) = self.pieces.get_mut(id) {
            piece.mode = BodyMode::Dynamic;
        }
        true
    }

    pub fn piece_mode(&self, id: &str) -> Option<BodyMode> {
        let piece = self.pieces.get(id)?;
        let body = self.rigid_body_set.get(piece.body)?;
        Some(if body.is_dynamic() {
            BodyMode::Dynamic
        } else {
            BodyMode::KinematicPositionBased
        })
    }

    pub fn piece_transform(&self, id: &str) -> Option<PieceTransform> {
        self.body(id).map(|body| from_isometry(body.position()))
    }

    pub fn golden_transform(&self, id: &str) -> Option<PieceTransform> {
        self.pieces.get(id).map(|p| p.golden)
    }

    /// Teleport a piece. Kinematic pieces also get it as their next target,
    /// so the following sub-step does not pull them back.
    pub fn set_piece_transform(&mut self, id: &str, transform: PieceTransform) -> bool {
        let iso = to_isometry(&transform);
        let Some(body) = self.body_mut(id) else {
            return false;
        };
        body.set_position(iso, true);
        if body.is_kinematic() {
            body.set_next_kinematic_position(iso);
        }
        true
    }

    /// Linear and angular velocity of a piece.
    pub fn piece_velocity(&self, id: &str) -> Option<(Vec3, Vec3)> {
        self.body(id)
            .map(|body| (from_na(body.linvel()), from_na(body.angvel())))
    }

    pub fn set_piece_velocity(&mut self, id: &str, linear: Vec3, angular: Vec3) -> bool {
        let Some(body) = self.body_mut(id) else {
            return false;
        };
        body.set_linvel(to_na(linear), true);
        body.set_angvel(to_na(angular), true);
        true
    }

    pub fn gravity_scale(&self, id: &str) -> Option<f32> {
        self.body(id).map(|body| body.gravity_scale())
    }

    fn is_body_settled(&self, body: &rapier::RigidBody) -> bool {
        body.linvel().norm() < self.settings.settle_linear_threshold
            && body.angvel().norm() < self.settings.settle_angular_threshold
    }

    /// True iff every dynamic piece is below both speed thresholds.
    ///
    /// Kinematic pieces are ignored. Bodies never sleep, so the velocities are
    /// live every frame and no floor-proximity check is needed.
    pub fn are_all_pieces_settled(&self) -> bool {
        self.pieces
            .iter()
            .filter_map(|p| self.rigid_body_set.get(p.body))
            .filter(|body| body.is_dynamic())
            .all(|body| self.is_body_settled(body))
    }

    /// Number of pieces currently below both speed thresholds.
    pub fn settled_piece_count(&self) -> usize {
        self.pieces
            .iter()
            .filter_map(|p| self.rigid_body_set.get(p.body))
            .filter(|body| self.is_body_settled(body))
            .count()
    }

    /// Put a piece back at its golden transform as a still, solid body.
    pub fn restore_golden(&mut self, id: &str) -> bool {
        let Some(golden) = self.golden_transform(id) else {
            return false;
        };
        self.set_piece_dynamic(id);
        self.set_piece_transform(id, golden)
    }

    /// Drop any partially accumulated time.
    pub fn clear_accumulator(&mut self) {
        self.accumulator = 0.0;
    }
}
