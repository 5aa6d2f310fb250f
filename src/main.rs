use std::collections::HashMap;
use std::path::PathBuf;

use bevy::prelude::*;
use puzzle_controls::ControlsPlugin;
use puzzle_physics::{
    load_puzzle, PhysicsSettings, PuzzleDefinition, PuzzlePiece, PuzzleSimulation,
    PuzzleSimulationPlugin,
};

mod camera;
mod sample;

use camera::{turntable_camera_system, TurntableCamera};

const PIECE_COLORS: [(f32, f32, f32); 8] = [
    (0.90, 0.30, 0.25),
    (0.25, 0.60, 0.90),
    (0.95, 0.75, 0.20),
    (0.35, 0.80, 0.40),
    (0.70, 0.40, 0.85),
    (0.95, 0.55, 0.20),
    (0.30, 0.85, 0.80),
    (0.85, 0.45, 0.65),
];

/// Command line: `sphere_puzzle_studio [puzzle.json] [--settings settings.json] [--duration secs]`
#[derive(Resource, Default, Debug)]
struct LaunchOptions {
    puzzle: Option<PathBuf>,
    settings: Option<PathBuf>,
    duration: Option<f32>,
}

impl LaunchOptions {
    fn from_args(mut args: impl Iterator<Item = String>) -> Self {
        let mut options = LaunchOptions::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => options.settings = args.next().map(PathBuf::from),
                "--duration" => options.duration = args.next().and_then(|s| s.parse().ok()),
                _ => options.puzzle = Some(PathBuf::from(arg)),
            }
        }
        options
    }
}

fn main() {
    let options = LaunchOptions::from_args(std::env::args().skip(1));

    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(PuzzleSimulationPlugin)
        .add_plugins(ControlsPlugin)
        .insert_resource(ClearColor(Color::srgb(0.05, 0.05, 0.08)))
        .insert_resource(options)
        .add_systems(Startup, setup)
        .add_systems(Update, turntable_camera_system)
        .run();
}

fn read_puzzle(options: &LaunchOptions) -> PuzzleDefinition {
    let Some(path) = options.puzzle.as_ref() else {
        return sample::sample_puzzle();
    };
    match load_puzzle(path) {
        Ok(puzzle) => {
            info!("Loaded puzzle {:?}: {} pieces", path, puzzle.pieces.len());
            puzzle
        }
        Err(e) => {
            error!("Failed to load {:?}: {}; using the sample pyramid", path, e);
            sample::sample_puzzle()
        }
    }
}

fn read_settings(options: &LaunchOptions) -> PhysicsSettings {
    let Some(path) = options.settings.as_ref() else {
        return PhysicsSettings::default();
    };
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str::<PhysicsSettings>(&text).map_err(|e| e.to_string()));
    match parsed {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to read settings {:?}: {}; using defaults", path, e);
            PhysicsSettings::default()
        }
    }
}

fn setup(
    mut commands: Commands,
    options: Res<LaunchOptions>,
    mut simulation: ResMut<PuzzleSimulation>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let puzzle = read_puzzle(&options);
    let settings = read_settings(&options);
    let bounds = puzzle.mat_bounds();
    let radius = puzzle.sphere_radius;
    let center = bounds.center();

    // Camera and light
    let extent = bounds.bounding_radius() + radius * 8.0;
    let camera = TurntableCamera::framing(Vec3::new(center.x, bounds.max.y, center.z), extent);
    commands.spawn((Camera3d::default(), camera.transform(), camera));
    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.9, 0.5, 0.0)),
    ));

    // Floor and mat
    let floor_y = puzzle.floor_top_y.unwrap_or(bounds.min.y - settings.ground_offset);
    let floor_size = extent * 4.0;
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(floor_size, 0.02, floor_size))),
        MeshMaterial3d(materials.add(Color::srgb(0.18, 0.2, 0.22))),
        Transform::from_xyz(center.x, floor_y - 0.01, center.z),
    ));
    let half = bounds.half_extents();
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(half.x * 2.0, half.y.max(0.005) * 2.0, half.z * 2.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.55, 0.45, 0.32))),
        Transform::from_translation(center),
    ));

    // One group per piece, spheres as children at their offsets
    let sphere_mesh = meshes.add(Sphere::new(radius).mesh().uv(24, 16));
    let specs = puzzle.piece_specs();
    let mut handles = HashMap::new();
    for (i, spec) in specs.iter().enumerate() {
        let Some(centroid) = puzzle_physics::registry::centroid(&spec.spheres) else {
            continue;
        };
        let (r, g, b) = PIECE_COLORS[i % PIECE_COLORS.len()];
        let material = materials.add(Color::srgb(r, g, b));
        let offsets: Vec<Vec3> = spec.spheres.iter().map(|p| *p - centroid).collect();

        let group = commands
            .spawn((
                PuzzlePiece { id: spec.id.clone() },
                Transform::from_translation(centroid),
                Visibility::default(),
            ))
            .with_children(|parent| {
                for offset in offsets {
                    parent.spawn((
                        Mesh3d(sphere_mesh.clone()),
                        MeshMaterial3d(material.clone()),
                        Transform::from_translation(offset),
                    ));
                }
            })
            .id();
        handles.insert(spec.id.clone(), group);
    }

    simulation.target_duration = options.duration;
    let result = simulation.orchestrator.initialize_with_pile(
        settings,
        &bounds,
        puzzle.floor_top_y,
        radius,
        &specs,
        &handles,
    );
    match result {
        Ok(outcome) => info!("Puzzle ready: {} pieces, pile {:?}", specs.len(), outcome),
        Err(e) => error!("Simulation setup failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options() {
        let args = ["pyramid.json", "--duration", "30", "--settings", "s.json"]
            .into_iter()
            .map(String::from);
        let options = LaunchOptions::from_args(args);
        assert_eq!(options.puzzle, Some(PathBuf::from("pyramid.json")));
        assert_eq!(options.settings, Some(PathBuf::from("s.json")));
        assert_eq!(options.duration, Some(30.0));
    }
}
