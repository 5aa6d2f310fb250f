//! Built-in square pyramid used when no puzzle file is given.
//!
//! Fourteen spheres in three layers (3x3, 2x2, 1) split into five pieces.

use puzzle_physics::puzzle_io::{PieceDefinition, PuzzleDefinition};

pub const SAMPLE_RADIUS: f32 = 0.5;

fn base(i: i32, j: i32) -> [f32; 3] {
    [i as f32 - 1.0, SAMPLE_RADIUS, j as f32 - 1.0]
}

fn middle(i: i32, j: i32) -> [f32; 3] {
    let layer = std::f32::consts::FRAC_1_SQRT_2 * 2.0 * SAMPLE_RADIUS;
    [i as f32 - 0.5, SAMPLE_RADIUS + layer, j as f32 - 0.5]
}

fn apex() -> [f32; 3] {
    let layer = std::f32::consts::FRAC_1_SQRT_2 * 2.0 * SAMPLE_RADIUS;
    [0.0, SAMPLE_RADIUS + 2.0 * layer, 0.0]
}

fn piece(id: &str, spheres: Vec<[f32; 3]>) -> PieceDefinition {
    PieceDefinition {
        id: id.to_string(),
        spheres,
    }
}

pub fn sample_puzzle() -> PuzzleDefinition {
    PuzzleDefinition {
        sphere_radius: SAMPLE_RADIUS,
        floor_top_y: Some(0.0),
        mat: None,
        pieces: vec![
            piece("A", vec![base(0, 0), base(1, 0), base(2, 0)]),
            piece("B", vec![base(0, 1), base(0, 2), base(1, 2)]),
            piece("C", vec![base(1, 1), base(2, 1), base(2, 2)]),
            piece("D", vec![middle(0, 0), middle(1, 0)]),
            piece("E", vec![middle(0, 1), middle(1, 1), apex()]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_is_valid() {
        let puzzle = sample_puzzle();
        puzzle.validate().unwrap();
        assert_eq!(puzzle.sphere_count(), 14);
    }

    #[test]
    fn test_sample_spheres_do_not_overlap() {
        let puzzle = sample_puzzle();
        let all: Vec<[f32; 3]> = puzzle.pieces.iter().flat_map(|p| p.spheres.clone()).collect();
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                let d = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt();
                assert!(d >= 2.0 * SAMPLE_RADIUS - 1e-4, "{:?} overlaps {:?}", a, b);
            }
        }
    }
}
