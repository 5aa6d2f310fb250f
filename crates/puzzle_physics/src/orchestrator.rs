//! Simulation state machine and control surface.
//!
//! ```text
//! idle -> initializing -> ready -> elevated -> dropping -> settled
//! settled -> elevated                      (re-drop)
//! settled -> removing -> completed -> reassembling -> reassembled
//! any -> idle                              (full reset)
//! ```
//!
//! The orchestrator owns the physics world and every animator. Nothing here
//! runs on its own: the caller drives it with [`SimulationOrchestrator::tick`].

use std::collections::HashMap;

use bevy::log::{debug, error, info, warn};
use bevy::math::Vec3;
use bevy::prelude::{Entity, Transform};

use crate::error::{SimulationError, SimulationResult};
use crate::frame_sync::FrameSync;
use crate::pile;
use crate::reassembly::ReassemblyAnimator;
use crate::removal::RemovalAnimator;
use crate::rng::PileRng;
use crate::settings::{MatBounds, PhysicsSettings};
use crate::settle::{SettleDetector, SettleOutcome};
use crate::world::RigidBodyWorld;

/// Seconds per piece a full sequence takes at 1x speed.
pub const SECONDS_PER_PIECE: f32 = 3.75;
/// Simulated seconds to wait after the last removal before declaring
/// completion. Independent of animation speed.
pub const REMOVAL_GRACE_PERIOD: f32 = 0.75;
pub const MIN_ANIMATION_SPEED: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SimulationState {
    #[default]
    Idle,
    Initializing,
    Ready,
    Elevated,
    Dropping,
    Settled,
    Removing,
    Completed,
    Reassembling,
    Reassembled,
}

impl SimulationState {
    pub fn label(self) -> &'static str {
        match self {
            SimulationState::Idle => "idle",
            SimulationState::Initializing => "initializing",
            SimulationState::Ready => "ready",
            SimulationState::Elevated => "elevated",
            SimulationState::Dropping => "dropping",
            SimulationState::Settled => "settled",
            SimulationState::Removing => "removing",
            SimulationState::Completed => "completed",
            SimulationState::Reassembling => "reassembling",
            SimulationState::Reassembled => "reassembled",
        }
    }
}

/// Progress numbers for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationCounts {
    pub settled: usize,
    pub removed: usize,
    pub placed: usize,
    pub total: usize,
}

/// One puzzle piece as world-space sphere centres.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceSpec {
    pub id: String,
    pub spheres: Vec<Vec3>,
}

impl PieceSpec {
    pub fn new(id: impl Into<String>, spheres: Vec<Vec3>) -> Self {
        Self {
            id: id.into(),
            spheres,
        }
    }
}

#[derive(Default)]
pub struct SimulationOrchestrator {
    state: SimulationState,
    history: Vec<SimulationState>,
    world: Option<RigidBodyWorld>,
    frame_sync: FrameSync,
    settle: Option<SettleDetector>,
    removal: Option<RemovalAnimator>,
    reassembly: Option<ReassemblyAnimator>,
    rng: Option<PileRng>,
    sim_time: f32,
    /// Simulated time since the last piece was parked.
    removal_grace: f32,
    animation_speed: f32,
    /// Tick loop active.
    running: bool,
    /// A full sequence is in progress.
    playing: bool,
    paused: bool,
}

impl SimulationOrchestrator {
    pub fn new() -> Self {
        Self {
            animation_speed: 1.0,
            ..Default::default()
        }
    }

    pub fn with_root(root: Transform) -> Self {
        Self {
            frame_sync: FrameSync::with_root(root),
            ..Self::new()
        }
    }

    // --- accessors -------------------------------------------------------

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Every state entered since construction, oldest first.
    pub fn state_history(&self) -> &[SimulationState] {
        &self.history
    }

    pub fn counts(&self) -> SimulationCounts {
        let Some(world) = self.world.as_ref() else {
            return SimulationCounts::default();
        };
        SimulationCounts {
            settled: world.settled_piece_count(),
            removed: self.removal.as_ref().map_or(0, |r| r.removed_count()),
            placed: self.reassembly.as_ref().map_or(0, |r| r.placed_count()),
            total: world.piece_count(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    pub fn animation_speed(&self) -> f32 {
        self.animation_speed
    }

    pub fn world(&self) -> Option<&RigidBodyWorld> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut RigidBodyWorld> {
        self.world.as_mut()
    }

    pub fn frame_sync(&self) -> &FrameSync {
        &self.frame_sync
    }

    pub fn frame_sync_mut(&mut self) -> &mut FrameSync {
        &mut self.frame_sync
    }

    pub fn removal(&self) -> Option<&RemovalAnimator> {
        self.removal.as_ref()
    }

    pub fn reassembly(&self) -> Option<&ReassemblyAnimator> {
        self.reassembly.as_ref()
    }

    fn transition(&mut self, next: SimulationState) {
        if self.state == next {
            return;
        }
        info!("Simulation: {} -> {}", self.state.label(), next.label());
        self.state = next;
        self.history.push(next);
    }

    fn sync_frame(&mut self) {
        if let Some(world) = self.world.as_ref() {
            self.frame_sync.sync(world);
        }
    }

    // --- setup -----------------------------------------------------------

    /// Validate `settings` and build the physics world.
    ///
    /// On failure the state stays `Initializing` and the call can be retried.
    pub fn initialize(&mut self, settings: PhysicsSettings) -> SimulationResult<()> {
        if !matches!(
            self.state,
            SimulationState::Idle | SimulationState::Initializing
        ) {
            return Err(SimulationError::InvalidState {
                expected: SimulationState::Idle,
                actual: self.state,
            });
        }
        self.transition(SimulationState::Initializing);

        let seed = settings.pile_seed;
        match RigidBodyWorld::new(settings) {
            Ok(world) => {
                self.world = Some(world);
                self.rng = Some(PileRng::new(seed));
                self.transition(SimulationState::Ready);
                Ok(())
            }
            Err(e) => {
                error!("Physics initialization failed: {}", e);
                Err(e)
            }
        }
    }

    /// Create the ground and mat slabs.
    pub fn setup_world(&mut self, bounds: &MatBounds, floor_top_y: Option<f32>, sphere_radius: f32) {
        let Some(world) = self.world.as_mut() else {
            warn!("setup_world ignored: physics not initialized");
            return;
        };
        world.create_ground_plane(bounds, floor_top_y, sphere_radius);
        world.create_placemat_collider(bounds, sphere_radius);
    }

    /// Create one body per piece and bind render handles by id.
    ///
    /// Returns the number of bodies created. Empty pieces are skipped.
    pub fn add_pieces(
        &mut self,
        pieces: &[PieceSpec],
        sphere_radius: f32,
        handles: &HashMap<String, Entity>,
    ) -> usize {
        let Some(world) = self.world.as_mut() else {
            warn!("add_pieces ignored: physics not initialized");
            return 0;
        };
        if !(sphere_radius.is_finite() && sphere_radius > 0.0) {
            warn!("add_pieces ignored: invalid sphere radius {}", sphere_radius);
            return 0;
        }

        let mut added = 0;
        for spec in pieces {
            if let Err(e) = world.create_piece_rigid_body(&spec.id, &spec.spheres, sphere_radius) {
                warn!("Skipping piece: {}", e);
                continue;
            }
            added += 1;
            match handles.get(&spec.id) {
                Some(entity) => self.frame_sync.register(spec.id.clone(), *entity),
                None => warn!(
                    "Piece '{}' has no render group; it simulates without visual sync",
                    spec.id
                ),
            }
        }
        info!("Added {}/{} pieces", added, pieces.len());
        self.sync_frame();
        added
    }

    /// Initialize, build the scene and seed a settled pile in one call.
    pub fn initialize_with_pile(
        &mut self,
        settings: PhysicsSettings,
        bounds: &MatBounds,
        floor_top_y: Option<f32>,
        sphere_radius: f32,
        pieces: &[PieceSpec],
        handles: &HashMap<String, Entity>,
    ) -> SimulationResult<SettleOutcome> {
        self.initialize(settings)?;
        self.setup_world(bounds, floor_top_y, sphere_radius);
        self.add_pieces(pieces, sphere_radius, handles);
        self.seed_pile()
    }

    /// Scatter every piece over the mat and settle synchronously.
    ///
    /// Requires `Ready`. Ends frozen in `Settled`.
    pub fn seed_pile(&mut self) -> SimulationResult<SettleOutcome> {
        if self.state != SimulationState::Ready {
            return Err(SimulationError::InvalidState {
                expected: SimulationState::Ready,
                actual: self.state,
            });
        }
        let (Some(world), Some(rng)) = (self.world.as_mut(), self.rng.as_mut()) else {
            return Err(SimulationError::NotInitialized);
        };
        let bounds = world.mat_bounds().ok_or(SimulationError::NotInitialized)?;

        pile::scatter_pieces(world, &bounds, rng);
        self.transition(SimulationState::Elevated);
        self.transition(SimulationState::Dropping);

        let Some(world) = self.world.as_mut() else {
            return Err(SimulationError::NotInitialized);
        };
        let max_iterations = world.settings().max_pile_iterations;
        let outcome = pile::settle_synchronously(world, max_iterations);
        world.freeze_all_pieces();
        world.clear_accumulator();

        self.transition(SimulationState::Settled);
        self.sync_frame();
        Ok(outcome)
    }

    // --- controls --------------------------------------------------------

    /// First press elevates, second press drops.
    pub fn start_drop_experiment(&mut self) -> bool {
        match self.state {
            SimulationState::Ready | SimulationState::Settled => self.elevate(),
            SimulationState::Elevated => self.drop_pieces(),
            other => {
                warn!("Drop ignored in state {}", other.label());
                false
            }
        }
    }

    fn elevate(&mut self) -> bool {
        let (Some(world), Some(rng)) = (self.world.as_mut(), self.rng.as_mut()) else {
            warn!("Elevate ignored: physics not initialized");
            return false;
        };
        pile::elevate_pieces(world, rng);
        world.clear_accumulator();
        self.running = false;
        self.transition(SimulationState::Elevated);
        self.sync_frame();
        true
    }

    fn drop_pieces(&mut self) -> bool {
        let Some(world) = self.world.as_mut() else {
            warn!("Drop ignored: physics not initialized");
            return false;
        };
        world.unfreeze_all_pieces();
        self.settle = Some(SettleDetector::new(world.settings()));
        self.running = true;
        self.paused = false;
        self.transition(SimulationState::Dropping);
        true
    }

    /// Start lifting pieces off the pile, highest first.
    pub fn start_removal_experiment(&mut self) -> bool {
        if self.state != SimulationState::Settled {
            warn!("Removal ignored in state {}", self.state.label());
            return false;
        }
        let Some(world) = self.world.as_mut() else {
            warn!("Removal ignored: physics not initialized");
            return false;
        };
        // Every piece that is not being carried falls freely again.
        world.unfreeze_all_pieces();
        self.removal = Some(RemovalAnimator::new(world));
        self.removal_grace = 0.0;
        self.reassembly = None;
        self.running = true;
        self.transition(SimulationState::Removing);
        true
    }

    /// Start flying pieces back to their golden transforms.
    pub fn start_reassembly_experiment(&mut self) -> bool {
        if self.state != SimulationState::Completed {
            warn!("Reassembly ignored in state {}", self.state.label());
            return false;
        }
        self.begin_reassembly()
    }

    fn begin_reassembly(&mut self) -> bool {
        let Some(world) = self.world.as_ref() else {
            warn!("Reassembly ignored: physics not initialized");
            return false;
        };
        self.reassembly = Some(ReassemblyAnimator::new(world));
        self.running = true;
        self.transition(SimulationState::Reassembling);
        true
    }

    /// Removal then reassembly without further input.
    ///
    /// With a target duration the speed is set so the whole run takes about
    /// that long.
    pub fn play_full_sequence(&mut self, target_duration: Option<f32>) -> bool {
        if self.state != SimulationState::Settled {
            warn!("Play ignored in state {}", self.state.label());
            return false;
        }
        if let Some(duration) = target_duration.filter(|d| d.is_finite() && *d > 0.0) {
            let n = self.world.as_ref().map_or(0, |w| w.piece_count());
            self.set_animation_speed(n as f32 * SECONDS_PER_PIECE / duration);
        }
        self.playing = true;
        self.paused = false;
        if !self.start_removal_experiment() {
            self.playing = false;
            return false;
        }
        info!("Playing full sequence at {:.2}x", self.animation_speed);
        true
    }

    pub fn pause_sequence(&mut self) {
        if self.running && !self.paused {
            debug!("Paused at t={:.3}", self.sim_time);
            self.paused = true;
        }
    }

    pub fn resume_sequence(&mut self) {
        if self.paused {
            debug!("Resumed at t={:.3}", self.sim_time);
            self.paused = false;
        }
    }

    /// Stop ticking. Pieces stay where they are.
    pub fn stop_sequence(&mut self) {
        if self.running || self.playing {
            info!("Sequence stopped in state {}", self.state.label());
        }
        self.running = false;
        self.playing = false;
        self.paused = false;
    }

    /// Put every piece back at its golden transform, frozen, in `Ready`.
    pub fn reset(&mut self) {
        self.stop_sequence();
        self.settle = None;
        self.removal = None;
        self.reassembly = None;

        let Some(world) = self.world.as_mut() else {
            self.transition(SimulationState::Idle);
            return;
        };
        for id in world.pieces().ids() {
            world.restore_golden(&id);
        }
        world.freeze_all_pieces();
        world.clear_accumulator();
        let seed = world.settings().pile_seed;
        self.rng = Some(PileRng::new(seed));

        self.transition(SimulationState::Ready);
        self.sync_frame();
    }

    /// Drop the world and hand golden transforms to every render group.
    pub fn full_reset(&mut self) {
        self.stop_sequence();
        self.settle = None;
        self.removal = None;
        self.reassembly = None;
        self.rng = None;

        if let Some(world) = self.world.take() {
            for piece in world.pieces().iter() {
                self.frame_sync.write(&piece.id, piece.golden);
            }
            info!("Physics world released ({} pieces)", world.piece_count());
        }
        self.transition(SimulationState::Idle);
    }

    pub fn set_animation_speed(&mut self, multiplier: f32) {
        if !multiplier.is_finite() {
            warn!("Ignoring non-finite animation speed");
            return;
        }
        self.animation_speed = multiplier.max(MIN_ANIMATION_SPEED);
    }

    // --- frame driver ----------------------------------------------------

    /// Advance the simulation by `dt` seconds of wall time.
    ///
    /// The clock, the settle detector and the animators all advance by the
    /// simulated time the physics step actually consumed, which is less than
    /// `dt` when the sub-step cap drops part of a long frame.
    pub fn tick(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        if self.paused {
            self.sync_frame();
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let Some(world) = self.world.as_mut() else {
            return;
        };
        let advanced = world.step(dt);
        self.sim_time += advanced;

        match self.state {
            SimulationState::Dropping => self.tick_dropping(advanced),
            SimulationState::Removing => self.tick_removing(advanced),
            SimulationState::Reassembling => self.tick_reassembling(advanced),
            _ => {}
        }
        self.sync_frame();
    }

    fn tick_dropping(&mut self, advanced: f32) {
        let (Some(world), Some(settle)) = (self.world.as_mut(), self.settle.as_mut()) else {
            return;
        };
        let outcome = settle.update(advanced, || world.are_all_pieces_settled());
        match outcome {
            SettleOutcome::Pending => return,
            SettleOutcome::Settled => info!("Pile settled after {:.2}s", settle.elapsed()),
            SettleOutcome::TimedOut => warn!(
                "Pile did not settle within {:.2}s; forcing settle",
                settle.elapsed()
            ),
        }
        world.freeze_all_pieces();
        world.clear_accumulator();
        self.settle = None;
        self.running = false;
        self.transition(SimulationState::Settled);
    }

    fn tick_removing(&mut self, advanced: f32) {
        let (Some(world), Some(removal)) = (self.world.as_mut(), self.removal.as_mut()) else {
            return;
        };
        removal.update(world, advanced, self.animation_speed);
        if !removal.is_finished() {
            return;
        }

        // The last piece may still be landing: wait the grace period, then
        // until everything is still, or give up after the settle timeout.
        self.removal_grace += advanced;
        if self.removal_grace < REMOVAL_GRACE_PERIOD {
            return;
        }
        if !world.are_all_pieces_settled() {
            if self.removal_grace < world.settings().max_sim_time {
                return;
            }
            warn!(
                "Parked pieces still moving after {:.2}s; completing anyway",
                self.removal_grace
            );
        }
        world.freeze_all_pieces();
        world.clear_accumulator();
        self.transition(SimulationState::Completed);

        if self.playing {
            self.begin_reassembly();
        } else {
            self.running = false;
        }
    }

    fn tick_reassembling(&mut self, advanced: f32) {
        let (Some(world), Some(reassembly)) = (self.world.as_mut(), self.reassembly.as_mut())
        else {
            return;
        };
        reassembly.update(world, advanced, self.animation_speed);
        if !reassembly.is_complete() {
            return;
        }
        self.running = false;
        self.playing = false;
        self.transition(SimulationState::Reassembled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn pieces() -> Vec<PieceSpec> {
        vec![
            PieceSpec::new("A", vec![Vec3::new(-0.5, 0.25, 0.0), Vec3::new(0.0, 0.25, 0.0)]),
            PieceSpec::new("B", vec![Vec3::new(0.5, 0.25, 0.0), Vec3::new(0.5, 0.25, 0.5)]),
            PieceSpec::new("C", vec![Vec3::new(0.0, 0.7, 0.25)]),
        ]
    }

    fn bounds() -> MatBounds {
        MatBounds::new(Vec3::new(-1.5, -0.05, -1.5), Vec3::new(1.5, 0.0, 1.5))
    }

    fn ready() -> SimulationOrchestrator {
        let mut orch = SimulationOrchestrator::new();
        orch.initialize(PhysicsSettings::default()).unwrap();
        orch.setup_world(&bounds(), Some(-0.05), 0.25);
        assert_eq!(orch.add_pieces(&pieces(), 0.25, &HashMap::new()), 3);
        orch
    }

    fn run_until(orch: &mut SimulationOrchestrator, state: SimulationState, limit: f32) {
        let mut t = 0.0;
        while orch.state() != state {
            orch.tick(DT);
            t += DT;
            assert!(t < limit, "stuck in {:?}", orch.state());
        }
    }

    #[test]
    fn test_initialize_reaches_ready() {
        let orch = ready();
        assert_eq!(orch.state(), SimulationState::Ready);
        assert_eq!(
            orch.state_history(),
            &[SimulationState::Initializing, SimulationState::Ready]
        );
        assert_eq!(orch.counts().total, 3);
    }

    #[test]
    fn test_invalid_settings_then_retry() {
        let mut orch = SimulationOrchestrator::new();
        let bad = PhysicsSettings {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        let err = orch.initialize(bad).unwrap_err();
        println!("{}", err);
        assert!(matches!(err, SimulationError::InvalidSettings(_)));
        assert_eq!(orch.state(), SimulationState::Initializing);
        assert!(orch.world().is_none());

        orch.initialize(PhysicsSettings::default()).unwrap();
        assert_eq!(orch.state(), SimulationState::Ready);
    }

    #[test]
    fn test_initialize_twice_is_rejected() {
        let mut orch = ready();
        let err = orch.initialize(PhysicsSettings::default()).unwrap_err();
        assert_eq!(
            err,
            SimulationError::InvalidState {
                expected: SimulationState::Idle,
                actual: SimulationState::Ready
            }
        );
    }

    #[test]
    fn test_empty_piece_is_skipped() {
        let mut orch = SimulationOrchestrator::new();
        orch.initialize(PhysicsSettings::default()).unwrap();
        orch.setup_world(&bounds(), None, 0.25);
        let specs = vec![PieceSpec::new("empty", vec![]), PieceSpec::new("ok", vec![Vec3::Y])];
        assert_eq!(orch.add_pieces(&specs, 0.25, &HashMap::new()), 1);
    }

    #[test]
    fn test_add_pieces_before_setup_world_uses_given_radius() {
        let mut orch = SimulationOrchestrator::new();
        orch.initialize(PhysicsSettings::default()).unwrap();
        let specs = [PieceSpec::new("A", vec![Vec3::new(0.0, 2.0, 0.0)])];
        assert_eq!(orch.add_pieces(&specs, 0.0, &HashMap::new()), 0);
        assert_eq!(orch.add_pieces(&specs, 0.25, &HashMap::new()), 1);
        orch.setup_world(&bounds(), Some(-0.05), 0.25);

        let world = orch.world_mut().unwrap();
        world.unfreeze_all_pieces();
        for _ in 0..120 {
            world.step(DT);
        }
        let y = world.piece_transform("A").unwrap().translation.y;
        println!("y after 2s: {:.3}", y);
        assert!(y < 0.5, "piece never fell: y={}", y);
    }

    #[test]
    fn test_long_frames_advance_only_simulated_time() {
        let settings = PhysicsSettings {
            settle_linear_threshold: 0.0,
            settle_angular_threshold: 0.0,
            max_sim_time: 2.0,
            ..Default::default()
        };
        let mut orch = SimulationOrchestrator::new();
        orch.initialize(settings).unwrap();
        orch.setup_world(&bounds(), Some(-0.05), 0.25);
        orch.add_pieces(&pieces(), 0.25, &HashMap::new());
        orch.start_drop_experiment();
        orch.start_drop_experiment();

        let cap = {
            let s = orch.world().unwrap().settings();
            s.max_substeps as f32 * s.fixed_timestep
        };
        let mut ticks = 0;
        while orch.state() == SimulationState::Dropping {
            orch.tick(0.5);
            ticks += 1;
            assert!(ticks < 1000, "drop never ended");
        }
        println!("ticks={} sim_time={:.3}", ticks, orch.sim_time());
        assert!(orch.sim_time() >= 2.0 - 1e-3);
        assert!((orch.sim_time() - ticks as f32 * cap).abs() < 1e-3);
        assert!(ticks as f32 * cap >= 2.0 - 1e-3);
    }

    #[test]
    fn test_drop_is_two_press() {
        let mut orch = ready();
        assert!(orch.start_drop_experiment());
        assert_eq!(orch.state(), SimulationState::Elevated);
        assert!(!orch.is_running());

        assert!(orch.start_drop_experiment());
        assert_eq!(orch.state(), SimulationState::Dropping);
        run_until(&mut orch, SimulationState::Settled, 20.0);
        assert!(!orch.is_running());
    }

    #[test]
    fn test_preconditions_leave_state_untouched() {
        let mut orch = ready();
        assert!(!orch.start_removal_experiment());
        assert!(!orch.start_reassembly_experiment());
        assert!(!orch.play_full_sequence(None));
        assert_eq!(orch.state(), SimulationState::Ready);

        let mut idle = SimulationOrchestrator::new();
        assert!(!idle.start_drop_experiment());
        assert_eq!(idle.state(), SimulationState::Idle);
        assert!(idle.state_history().is_empty());
    }

    #[test]
    fn test_pause_freezes_clock() {
        let mut orch = ready();
        orch.start_drop_experiment();
        orch.start_drop_experiment();
        for _ in 0..10 {
            orch.tick(DT);
        }
        orch.pause_sequence();
        assert!(orch.is_paused());
        let t = orch.sim_time();
        let before = orch.world().unwrap().piece_transform("C").unwrap();
        for _ in 0..30 {
            orch.tick(DT);
        }
        assert_eq!(orch.sim_time(), t);
        assert_eq!(orch.world().unwrap().piece_transform("C").unwrap(), before);

        orch.resume_sequence();
        orch.tick(DT);
        assert!(orch.sim_time() > t);
    }

    #[test]
    fn test_play_sets_speed_from_duration() {
        let mut orch = ready();
        orch.seed_pile().unwrap();
        assert!(orch.play_full_sequence(Some(5.625)));
        // 3 pieces * 3.75s / 5.625s
        assert!((orch.animation_speed() - 2.0).abs() < 1e-5);
        assert!(orch.is_playing());
    }

    #[test]
    fn test_speed_clamped() {
        let mut orch = SimulationOrchestrator::new();
        orch.set_animation_speed(0.0);
        assert_eq!(orch.animation_speed(), MIN_ANIMATION_SPEED);
        orch.set_animation_speed(f32::NAN);
        assert_eq!(orch.animation_speed(), MIN_ANIMATION_SPEED);
    }

    #[test]
    fn test_reset_restores_golden_frozen() {
        let mut orch = ready();
        orch.seed_pile().unwrap();
        orch.reset();
        assert_eq!(orch.state(), SimulationState::Ready);

        let world = orch.world().unwrap();
        for piece in world.pieces().iter() {
            let t = world.piece_transform(&piece.id).unwrap();
            assert!(t.approx_eq(&piece.golden, 1e-5), "'{}' at {:?}", piece.id, t);
            assert_eq!(world.gravity_scale(&piece.id), Some(0.0));
        }
    }

    #[test]
    fn test_reset_without_world_goes_idle() {
        let mut orch = SimulationOrchestrator::new();
        orch.reset();
        assert_eq!(orch.state(), SimulationState::Idle);
        orch.full_reset();
        orch.full_reset();
        assert_eq!(orch.state(), SimulationState::Idle);
    }
}
