#![warn(missing_docs)]
//! Grid-snapped convoys on a ground plane.
//!
//! A convoy's head is dragged cell by cell with the pointer while its body
//! segments replay the head's path, bending at corners. Dwelling in a sink
//! zone sinks the whole convoy segment by segment; waiting occupants of the
//! matching colour board it by being pulled into its seats.

pub mod category;
pub mod config;
pub mod convoy;
pub mod level;
pub mod math;
pub mod occupant;
pub mod tween;
pub mod zone;

use bevy::prelude::*;

/// Application-wide game state, used for system scheduling.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum GameState {
    /// Normal play: dragging, following, sinking.
    #[default]
    Running,
    /// Simulation paused with the inspector and gizmos shown (Tab to toggle).
    Debugging,
}
