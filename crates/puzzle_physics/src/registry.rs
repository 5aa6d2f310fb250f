//! Per-piece bookkeeping: body handle, sphere offsets and golden transform.

use bevy::math::{Quat, Vec3};
use rapier3d::prelude as rapier;

/// World-space position and orientation of a piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieceTransform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for PieceTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PieceTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    /// True if both parts agree within `tolerance` (rotation compared by angle).
    pub fn approx_eq(&self, other: &PieceTransform, tolerance: f32) -> bool {
        self.translation.distance(other.translation) <= tolerance
            && self.rotation.angle_between(other.rotation) <= tolerance
    }
}

/// How the physics engine drives a piece body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyMode {
    /// Gravity and contacts move the body.
    #[default]
    Dynamic,
    /// Position is commanded each frame; colliders are sensors.
    KinematicPositionBased,
}

/// One puzzle piece: a compound body of fused spheres.
#[derive(Debug, Clone)]
pub struct Piece {
    pub id: String,
    /// Sphere centres relative to the piece centroid. Never mutated.
    pub local_offsets: Vec<Vec3>,
    pub body: rapier::RigidBodyHandle,
    /// Assembled transform, captured at construction.
    pub golden: PieceTransform,
    pub mode: BodyMode,
}

/// Pieces in registration order, addressable by id.
#[derive(Debug, Default)]
pub struct PieceRegistry {
    pieces: Vec<Piece>,
}

impl PieceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, piece: Piece) {
        if let Some(existing) = self.pieces.iter_mut().find(|p| p.id == piece.id) {
            *existing = piece;
        } else {
            self.pieces.push(piece);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.pieces.iter().map(|p| p.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn clear(&mut self) {
        self.pieces.clear();
    }
}

/// Centroid of a non-empty set of points.
pub fn centroid(points: &[Vec3]) -> Option<Vec3> {
    if points.is_empty() {
        return None;
    }
    Some(points.iter().copied().sum::<Vec3>() / points.len() as f32)
}
