//! Physics → render-group transform sync.
//!
//! Render groups are parented under a puzzle root whose world transform is
//! supplied by the scene. Each tick the piece world transforms are converted
//! into that root's local space and buffered per entity; the plugin copies
//! the buffer into ECS `Transform`s. The core never touches the entities
//! themselves.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::registry::PieceTransform;
use crate::world::RigidBodyWorld;

#[derive(Debug, Clone, Default)]
pub struct FrameSync {
    root: Transform,
    handles: HashMap<String, Entity>,
    written: HashMap<Entity, Transform>,
}

impl FrameSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: Transform) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn root(&self) -> Transform {
        self.root
    }

    pub fn set_root(&mut self, root: Transform) {
        self.root = root;
    }

    pub fn register(&mut self, id: impl Into<String>, entity: Entity) {
        self.handles.insert(id.into(), entity);
    }

    pub fn handle_for(&self, id: &str) -> Option<Entity> {
        self.handles.get(id).copied()
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn clear(&mut self) {
        self.handles.clear();
        self.written.clear();
    }

    /// Express a world-space piece transform in the root's local space.
    pub fn world_to_local(&self, world: PieceTransform) -> Transform {
        let inv_rotation = self.root.rotation.inverse();
        let scale = self.root.scale;
        Transform {
            translation: inv_rotation * (world.translation - self.root.translation) / scale,
            rotation: inv_rotation * world.rotation,
            scale: Vec3::ONE,
        }
    }

    /// Buffer a transform for the render group of piece `id`.
    ///
    /// Pieces without a handle are skipped; they still simulate.
    pub fn write(&mut self, id: &str, transform: PieceTransform) {
        if let Some(entity) = self.handle_for(id) {
            let local = self.world_to_local(transform);
            self.written.insert(entity, local);
        }
    }

    /// Read every piece body and buffer its local transform.
    pub fn sync(&mut self, world: &RigidBodyWorld) {
        for piece in world.pieces().iter() {
            if let Some(transform) = world.piece_transform(&piece.id) {
                self.write(&piece.id, transform);
            }
        }
    }

    /// Last buffered local transform for `entity`.
    pub fn transform_of(&self, entity: Entity) -> Option<Transform> {
        self.written.get(&entity).copied()
    }

    pub fn written(&self) -> impl Iterator<Item = (Entity, Transform)> + '_ {
        self.written.iter().map(|(e, t)| (*e, *t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_identity_root_passes_through() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        let mut sync = FrameSync::new();
        sync.register("A", entity);

        let t = PieceTransform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_x(0.3));
        sync.write("A", t);
        let local = sync.transform_of(entity).unwrap();
        assert_eq!(local.translation, t.translation);
        assert!(local.rotation.angle_between(t.rotation) < 1e-6);
    }

    #[test]
    fn test_rotated_root_converts_to_local() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        let root = Transform::from_xyz(10.0, 0.0, 0.0).with_rotation(Quat::from_rotation_y(FRAC_PI_2));
        let mut sync = FrameSync::with_root(root);
        sync.register("A", entity);

        let world_t = PieceTransform::from_translation(Vec3::new(10.0, 1.0, -1.0));
        sync.write("A", world_t);
        let local = sync.transform_of(entity).unwrap();

        // Back to world space through the root must reproduce the input.
        let round_trip = root.transform_point(local.translation);
        assert!(round_trip.distance(world_t.translation) < 1e-5, "got {:?}", round_trip);
    }

    #[test]
    fn test_unregistered_piece_is_skipped() {
        let mut sync = FrameSync::new();
        sync.write("missing", PieceTransform::IDENTITY);
        assert_eq!(sync.written().count(), 0);
    }
}
