use bevy::prelude::*;
use bevy_mod_imgui::prelude::*;
use puzzle_physics::{PuzzleSimulation, SimulationCommand, SimulationState};

pub struct ControlsPlugin;

impl Plugin for ControlsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(bevy_mod_imgui::ImguiPlugin::default())
            .init_resource::<PanelState>()
            .add_systems(Update, imgui_ui);
    }
}

/// Slider values kept between frames.
#[derive(Resource)]
pub struct PanelState {
    pub speed: f32,
    /// Seconds for a full play; zero means "use the speed slider".
    pub duration: f32,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            speed: 1.0,
            duration: 0.0,
        }
    }
}

fn imgui_ui(
    mut context: NonSendMut<ImguiContext>,
    simulation: Res<PuzzleSimulation>,
    mut panel: ResMut<PanelState>,
    mut commands: MessageWriter<SimulationCommand>,
) {
    let ui = context.ui();
    let orch = &simulation.orchestrator;
    let state = orch.state();
    let counts = orch.counts();

    ui.dockspace_over_main_viewport();

    ui.window("Puzzle")
        .size([320.0, 260.0], Condition::FirstUseEver)
        .build(|| {
            ui.text(format!("State: {}", state.label()));
            ui.text(format!(
                "Settled {}  Removed {}  Placed {}  / {}",
                counts.settled, counts.removed, counts.placed, counts.total
            ));
            ui.text_disabled(format!("t = {:.2}s  speed {:.2}x", orch.sim_time(), orch.animation_speed()));
            ui.separator();

            let drop_label = if state == SimulationState::Elevated {
                "Drop"
            } else {
                "Elevate"
            };
            if ui.button(drop_label) {
                commands.write(SimulationCommand::Drop);
            }
            ui.same_line();
            if ui.button("Remove") {
                commands.write(SimulationCommand::Remove);
            }
            ui.same_line();
            if ui.button("Reassemble") {
                commands.write(SimulationCommand::Reassemble);
            }

            ui.separator();

            if ui.slider("Speed", 0.1f32, 8.0f32, &mut panel.speed) {
                commands.write(SimulationCommand::SetSpeed(panel.speed));
            }
            if ui.slider("Duration", 0.0f32, 120.0f32, &mut panel.duration) {
                let duration = (panel.duration > 0.0).then_some(panel.duration);
                commands.write(SimulationCommand::SetTargetDuration(duration));
            }

            if orch.is_playing() && orch.is_paused() {
                if ui.button("Resume") {
                    commands.write(SimulationCommand::Resume);
                }
            } else if orch.is_playing() {
                if ui.button("Pause") {
                    commands.write(SimulationCommand::Pause);
                }
            } else if ui.button("Play") {
                commands.write(SimulationCommand::Play);
            }
            ui.same_line();
            if ui.button("Stop") {
                commands.write(SimulationCommand::Stop);
            }

            ui.separator();

            if ui.button("Reset") {
                commands.write(SimulationCommand::Reset);
            }
            ui.same_line();
            if ui.button("Full Reset") {
                commands.write(SimulationCommand::FullReset);
            }
        });
}
