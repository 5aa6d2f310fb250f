//! Puzzle definition files.
//!
//! A definition is JSON: the sphere radius, optional mat bounds and floor
//! height, and each piece as a list of world-space sphere centres.
//!
//! ```ignore
//! let puzzle = load_puzzle("puzzles/pyramid.json")?;
//! let bounds = puzzle.mat_bounds();
//! orchestrator.initialize_with_pile(settings, &bounds, puzzle.floor_top_y,
//!     puzzle.sphere_radius, &puzzle.piece_specs(), &handles)?;
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::orchestrator::PieceSpec;
use crate::settings::MatBounds;

/// Errors that can occur while reading or writing puzzle definitions.
#[derive(Debug)]
pub enum PuzzleIoError {
    /// File system error
    Io(std::io::Error),
    /// Malformed JSON
    Json(String),
    /// Well-formed but unusable definition
    Invalid(String),
}

impl std::fmt::Display for PuzzleIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PuzzleIoError::Io(e) => write!(f, "IO error: {}", e),
            PuzzleIoError::Json(e) => write!(f, "JSON error: {}", e),
            PuzzleIoError::Invalid(msg) => write!(f, "Invalid puzzle: {}", msg),
        }
    }
}

impl std::error::Error for PuzzleIoError {}

impl From<std::io::Error> for PuzzleIoError {
    fn from(e: std::io::Error) -> Self {
        PuzzleIoError::Io(e)
    }
}

impl From<serde_json::Error> for PuzzleIoError {
    fn from(e: serde_json::Error) -> Self {
        PuzzleIoError::Json(e.to_string())
    }
}

/// Result type for puzzle I/O operations.
pub type PuzzleIoResult<T> = Result<T, PuzzleIoError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatDefinition {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceDefinition {
    pub id: String,
    pub spheres: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleDefinition {
    pub sphere_radius: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_top_y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mat: Option<MatDefinition>,
    pub pieces: Vec<PieceDefinition>,
}

impl PuzzleDefinition {
    /// Reject definitions that cannot build a world.
    pub fn validate(&self) -> PuzzleIoResult<()> {
        if !self.sphere_radius.is_finite() || self.sphere_radius <= 0.0 {
            return Err(PuzzleIoError::Invalid(format!(
                "sphere_radius must be positive, got {}",
                self.sphere_radius
            )));
        }
        if self.pieces.is_empty() {
            return Err(PuzzleIoError::Invalid("no pieces".to_string()));
        }

        let mut seen = HashSet::new();
        for piece in &self.pieces {
            if piece.spheres.is_empty() {
                return Err(PuzzleIoError::Invalid(format!(
                    "piece '{}' has no spheres",
                    piece.id
                )));
            }
            if !seen.insert(piece.id.as_str()) {
                return Err(PuzzleIoError::Invalid(format!(
                    "duplicate piece id '{}'",
                    piece.id
                )));
            }
            if piece.spheres.iter().flatten().any(|c| !c.is_finite()) {
                return Err(PuzzleIoError::Invalid(format!(
                    "piece '{}' has a non-finite coordinate",
                    piece.id
                )));
            }
        }
        Ok(())
    }

    pub fn sphere_count(&self) -> usize {
        self.pieces.iter().map(|p| p.spheres.len()).sum()
    }

    pub fn piece_specs(&self) -> Vec<PieceSpec> {
        self.pieces
            .iter()
            .map(|p| PieceSpec::new(p.id.clone(), p.spheres.iter().map(|s| Vec3::from_array(*s)).collect()))
            .collect()
    }

    /// Explicit mat bounds, or the sphere extents padded by one radius with
    /// the mat top at the lowest sphere bottom.
    pub fn mat_bounds(&self) -> MatBounds {
        if let Some(mat) = &self.mat {
            return MatBounds::new(Vec3::from_array(mat.min), Vec3::from_array(mat.max));
        }

        let r = self.sphere_radius;
        let mut lo = Vec3::splat(f32::MAX);
        let mut hi = Vec3::splat(f32::MIN);
        for s in self.pieces.iter().flat_map(|p| p.spheres.iter()) {
            let c = Vec3::from_array(*s);
            lo = lo.min(c);
            hi = hi.max(c);
        }
        if lo.x > hi.x {
            return MatBounds::new(Vec3::new(-r, -r, -r), Vec3::new(r, 0.0, r));
        }

        let pad = 2.0 * r;
        let top = lo.y - r;
        MatBounds::new(
            Vec3::new(lo.x - pad, top - r, lo.z - pad),
            Vec3::new(hi.x + pad, top, hi.z + pad),
        )
    }
}

/// Parse and validate a definition from a JSON string.
pub fn parse_puzzle(json: &str) -> PuzzleIoResult<PuzzleDefinition> {
    let puzzle: PuzzleDefinition = serde_json::from_str(json)?;
    puzzle.validate()?;
    Ok(puzzle)
}

/// Load and validate a definition from a JSON file.
pub fn load_puzzle<P: AsRef<Path>>(path: P) -> PuzzleIoResult<PuzzleDefinition> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let puzzle: PuzzleDefinition = serde_json::from_reader(reader)?;
    puzzle.validate()?;
    Ok(puzzle)
}

/// Write a definition as pretty JSON.
pub fn save_puzzle<P: AsRef<Path>>(puzzle: &PuzzleDefinition, path: P) -> PuzzleIoResult<()> {
    puzzle.validate()?;
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, puzzle)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "sphere_radius": 0.5,
        "floor_top_y": 0.0,
        "mat": { "min": [-2, -0.1, -2], "max": [2, 0.0, 2] },
        "pieces": [
            { "id": "A", "spheres": [[0, 0.5, 0], [1, 0.5, 0]] },
            { "id": "B", "spheres": [[0.5, 1.2, 0.5]] }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let puzzle = parse_puzzle(SAMPLE).unwrap();
        assert_eq!(puzzle.pieces.len(), 2);
        assert_eq!(puzzle.sphere_count(), 3);
        assert_eq!(puzzle.floor_top_y, Some(0.0));

        let specs = puzzle.piece_specs();
        assert_eq!(specs[0].id, "A");
        assert_eq!(specs[0].spheres[1], Vec3::new(1.0, 0.5, 0.0));

        let bounds = puzzle.mat_bounds();
        assert_eq!(bounds.min, Vec3::new(-2.0, -0.1, -2.0));
        assert_eq!(bounds.max, Vec3::new(2.0, 0.0, 2.0));
    }

    #[test]
    fn test_derived_mat_bounds() {
        let json = r#"{ "sphere_radius": 0.5,
            "pieces": [ { "id": "A", "spheres": [[0, 0.5, 0], [1, 0.5, 2]] } ] }"#;
        let puzzle = parse_puzzle(json).unwrap();
        assert!(puzzle.mat.is_none());
        let bounds = puzzle.mat_bounds();
        println!("derived bounds: {:?}", bounds);
        assert!((bounds.max.y - 0.0).abs() < 1e-6);
        assert!((bounds.min.x - -1.0).abs() < 1e-6);
        assert!((bounds.max.z - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let empty_piece = r#"{ "sphere_radius": 0.5, "pieces": [ { "id": "A", "spheres": [] } ] }"#;
        assert!(matches!(parse_puzzle(empty_piece), Err(PuzzleIoError::Invalid(_))));

        let duplicate = r#"{ "sphere_radius": 0.5, "pieces": [
            { "id": "A", "spheres": [[0,0,0]] }, { "id": "A", "spheres": [[1,0,0]] } ] }"#;
        assert!(matches!(parse_puzzle(duplicate), Err(PuzzleIoError::Invalid(_))));

        let radius = r#"{ "sphere_radius": 0.0, "pieces": [ { "id": "A", "spheres": [[0,0,0]] } ] }"#;
        assert!(matches!(parse_puzzle(radius), Err(PuzzleIoError::Invalid(_))));

        assert!(matches!(parse_puzzle("{ not json"), Err(PuzzleIoError::Json(_))));
    }

    #[test]
    fn test_save_load_file() {
        let puzzle = parse_puzzle(SAMPLE).unwrap();
        let temp_file = NamedTempFile::with_suffix(".json").unwrap();

        save_puzzle(&puzzle, temp_file.path()).unwrap();
        let loaded = load_puzzle(temp_file.path()).unwrap();
        assert_eq!(loaded, puzzle);
    }

    #[test]
    fn test_load_reports_io_and_json_errors() {
        let missing = load_puzzle("/nonexistent/puzzle.json");
        assert!(matches!(missing, Err(PuzzleIoError::Io(_))));

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        temp_file.write_all(b"[1, 2, 3]").unwrap();
        let result = load_puzzle(temp_file.path());
        assert!(matches!(result, Err(PuzzleIoError::Json(_))));
    }
}
