//! Rigid-body physics for sphere-packing puzzles: drop a pile, take it apart
//! piece by piece, and fly every piece back to its solved pose.
//!
//! The core is [`SimulationOrchestrator`], a plain struct driven by
//! `tick(dt)`. [`PuzzleSimulationPlugin`] wires it into a bevy app: it ticks
//! once per frame, applies [`SimulationCommand`] messages and copies synced
//! transforms onto the [`PuzzlePiece`] render groups.

use bevy::prelude::*;

pub mod error;
pub mod frame_sync;
pub mod motion;
pub mod orchestrator;
pub mod pile;
pub mod puzzle_io;
pub mod reassembly;
pub mod registry;
pub mod removal;
pub mod rng;
pub mod settings;
pub mod settle;
pub mod world;

pub use error::{SimulationError, SimulationResult};
pub use frame_sync::FrameSync;
pub use orchestrator::{PieceSpec, SimulationCounts, SimulationOrchestrator, SimulationState};
pub use puzzle_io::{load_puzzle, parse_puzzle, save_puzzle, PuzzleDefinition, PuzzleIoError, PuzzleIoResult};
pub use registry::{BodyMode, PieceTransform};
pub use settings::{MatBounds, PhysicsSettings};
pub use settle::SettleOutcome;
pub use world::RigidBodyWorld;

pub struct PuzzleSimulationPlugin;

impl Plugin for PuzzleSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PuzzleSimulation>()
            .add_message::<SimulationCommand>()
            .add_systems(
                Update,
                (handle_simulation_commands, tick_simulation, apply_frame_sync).chain(),
            );
    }
}

/// The orchestrator as an app resource.
#[derive(Resource)]
pub struct PuzzleSimulation {
    pub orchestrator: SimulationOrchestrator,
    /// Duration used by [`SimulationCommand::Play`], in seconds.
    pub target_duration: Option<f32>,
}

impl Default for PuzzleSimulation {
    fn default() -> Self {
        Self {
            orchestrator: SimulationOrchestrator::new(),
            target_duration: None,
        }
    }
}

/// Control requests, usually from the UI panel.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum SimulationCommand {
    /// Elevate, or drop if already elevated.
    Drop,
    Remove,
    Reassemble,
    Play,
    Pause,
    Resume,
    Stop,
    Reset,
    FullReset,
    SetSpeed(f32),
    SetTargetDuration(Option<f32>),
}

/// Render group of one puzzle piece. Child meshes sit at the sphere offsets.
#[derive(Component, Debug, Clone)]
pub struct PuzzlePiece {
    pub id: String,
}

fn handle_simulation_commands(
    mut simulation: ResMut<PuzzleSimulation>,
    mut commands: MessageReader<SimulationCommand>,
) {
    let sim = simulation.as_mut();
    for command in commands.read() {
        debug!("Simulation command: {:?}", command);
        let orch = &mut sim.orchestrator;
        match *command {
            SimulationCommand::Drop => {
                orch.start_drop_experiment();
            }
            SimulationCommand::Remove => {
                orch.start_removal_experiment();
            }
            SimulationCommand::Reassemble => {
                orch.start_reassembly_experiment();
            }
            SimulationCommand::Play => {
                orch.play_full_sequence(sim.target_duration);
            }
            SimulationCommand::Pause => orch.pause_sequence(),
            SimulationCommand::Resume => orch.resume_sequence(),
            SimulationCommand::Stop => orch.stop_sequence(),
            SimulationCommand::Reset => orch.reset(),
            SimulationCommand::FullReset => orch.full_reset(),
            SimulationCommand::SetSpeed(speed) => orch.set_animation_speed(speed),
            SimulationCommand::SetTargetDuration(duration) => sim.target_duration = duration,
        }
    }
}

fn tick_simulation(time: Res<Time>, mut simulation: ResMut<PuzzleSimulation>) {
    simulation.orchestrator.tick(time.delta_secs());
}

fn apply_frame_sync(
    simulation: Res<PuzzleSimulation>,
    mut query: Query<&mut Transform, With<PuzzlePiece>>,
) {
    for (entity, local) in simulation.orchestrator.frame_sync().written() {
        if let Ok(mut transform) = query.get_mut(entity) {
            if *transform != local {
                *transform = local;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::message::Messages;
    use std::collections::HashMap;

    fn app_with_piece() -> (App, Entity) {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(PuzzleSimulationPlugin);

        let entity = app
            .world_mut()
            .spawn((PuzzlePiece { id: "A".into() }, Transform::default()))
            .id();

        let mut handles = HashMap::new();
        handles.insert("A".to_string(), entity);
        let bounds = MatBounds::new(Vec3::new(-1.0, -0.05, -1.0), Vec3::new(1.0, 0.0, 1.0));

        let mut simulation = app.world_mut().resource_mut::<PuzzleSimulation>();
        let orch = &mut simulation.orchestrator;
        orch.initialize(PhysicsSettings::default()).unwrap();
        orch.setup_world(&bounds, None, 0.25);
        orch.add_pieces(&[PieceSpec::new("A", vec![Vec3::new(0.3, 0.25, 0.0)])], 0.25, &handles);
        (app, entity)
    }

    #[test]
    fn test_plugin_applies_synced_transform() {
        let (mut app, entity) = app_with_piece();
        app.update();
        let transform = app.world().get::<Transform>(entity).unwrap();
        assert_eq!(transform.translation, Vec3::new(0.3, 0.25, 0.0));
    }

    #[test]
    fn test_plugin_routes_commands() {
        let (mut app, _) = app_with_piece();
        app.world_mut()
            .resource_mut::<Messages<SimulationCommand>>()
            .write(SimulationCommand::Drop);
        app.update();
        let state = app.world().resource::<PuzzleSimulation>().orchestrator.state();
        assert_eq!(state, SimulationState::Elevated);

        app.world_mut()
            .resource_mut::<Messages<SimulationCommand>>()
            .write(SimulationCommand::SetSpeed(2.5));
        app.update();
        let speed = app.world().resource::<PuzzleSimulation>().orchestrator.animation_speed();
        assert_eq!(speed, 2.5);
    }
}
