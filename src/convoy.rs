//! The convoy: a grid-snapped head dragged by the pointer, trailed by body
//! segments replaying its path.
//!
//! Each frame the head may step one cell (see [`GridMotionPlanner`]), the
//! step is pushed onto the [`PathHistory`], and body segment `i` glides to
//! history slot `i + 1`. Turns are recorded in the [`CornerLedger`] for tilt,
//! and each segment's [`Deformation`] picks straight or corner meshes.
//! Dwelling in a sink zone hands the convoy to the [`SinkSequencer`].

mod corners;
mod entities;
mod follower;
mod grid_planner;
mod history;
mod safety;
mod sink;
mod startup_systems;
mod state;
mod systems;

pub use corners::{CornerInfo, CornerLedger};
pub use entities::{
    AttachSegment, Convoy, ConvoyAssets, ConvoyError, ConvoyParts, ConvoySunk, Inert,
    PointerGround, Segment, StartExitLine,
};
pub use follower::{CornerKind, Deformation, SegmentPlacement, follow_targets};
pub use grid_planner::{GridMotionPlanner, MoveDirection, PlannedMove};
pub use history::PathHistory;
pub use safety::{BlockerSnapshot, Overlap, SafetyChecker, SpatialQuery};
pub use sink::{SinkEvent, SinkPhase, SinkSequencer};
pub use startup_systems::{ConvoySpawn, spawn_convoy};
pub use state::{ConvoyState, DwellTimer, ExitLine};

use bevy::prelude::*;

use crate::GameState;
use crate::config::ConvoyConfig;
use crate::tween;

/// Ordering of the per-frame convoy work.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvoySet {
    /// Chain resolution of freshly spawned convoys.
    Init,
    /// Pointer, grab/release, and external commands.
    Input,
    /// Zone contacts and subscriptions.
    Zones,
    /// Dwell timer, head stepping, following, tweens.
    Motion,
    /// Sink sequences.
    Sink,
    /// Mesh selection and corner bookkeeping.
    Visuals,
}

/// Convoy movement, following, sinking, and their debug view.
pub struct ConvoyPlugin(pub ConvoyConfig);

impl Plugin for ConvoyPlugin {
    fn build(&self, app: &mut App) {
        let prune_every = self.0.movement.corner_prune_interval;
        app.register_type::<ConvoyConfig>()
            .register_type::<Convoy>()
            .register_type::<Segment>()
            .register_type::<ConvoyParts>()
            .register_type::<ConvoyState>()
            .register_type::<PathHistory>()
            .register_type::<CornerLedger>()
            .register_type::<GridMotionPlanner>()
            .register_type::<DwellTimer>()
            .register_type::<Deformation>()
            .register_type::<ExitLine>()
            .register_type::<PointerGround>()
            .insert_resource(self.0.clone())
            .init_resource::<PointerGround>()
            .insert_resource(entities::CornerPruneTimer(Timer::from_seconds(
                prune_every,
                TimerMode::Repeating,
            )))
            .add_message::<ConvoySunk>()
            .add_message::<AttachSegment>()
            .add_message::<StartExitLine>()
            .configure_sets(
                Update,
                (
                    ConvoySet::Init,
                    ConvoySet::Input,
                    ConvoySet::Zones,
                    ConvoySet::Motion,
                    ConvoySet::Sink,
                    ConvoySet::Visuals,
                )
                    .chain(),
            )
            .add_systems(
                Startup,
                (startup_systems::log_config, startup_systems::setup_convoy_assets),
            )
            .add_systems(Update, systems::init_convoys.in_set(ConvoySet::Init))
            .add_systems(
                Update,
                (
                    systems::update_pointer,
                    systems::grab_heads,
                    systems::attach_segments,
                    systems::start_exit_lines,
                )
                    .chain()
                    .in_set(ConvoySet::Input)
                    .run_if(in_state(GameState::Running)),
            )
            .add_systems(
                Update,
                (
                    systems::tick_dwell,
                    systems::drive_heads,
                    systems::follow_segments,
                    systems::steer_exit_lines,
                    tween::advance_tweens,
                )
                    .chain()
                    .in_set(ConvoySet::Motion)
                    .run_if(in_state(GameState::Running)),
            )
            .add_systems(
                Update,
                systems::run_sinks
                    .in_set(ConvoySet::Sink)
                    .run_if(in_state(GameState::Running)),
            )
            .add_systems(
                Update,
                (
                    systems::update_deformation,
                    systems::apply_corner_visuals,
                    systems::prune_corners,
                )
                    .chain()
                    .in_set(ConvoySet::Visuals)
                    .run_if(in_state(GameState::Running)),
            )
            .add_systems(
                Update,
                (systems::update_pointer, systems::draw_debug)
                    .chain()
                    .run_if(in_state(GameState::Debugging)),
            );
    }
}
