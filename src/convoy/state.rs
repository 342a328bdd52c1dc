use bevy::prelude::*;

use super::grid_planner::{GridMotionPlanner, PlannedMove};
use crate::config::MovementSettings;
use crate::math;

/// Top-level mode of one convoy. Convoy-local, never shared.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum ConvoyState {
    /// Parked; segments settle onto their slots.
    #[default]
    Idle,
    /// The pointer holds the head; the planner runs every frame.
    Dragging,
    /// The dwell timer fired; the sink sequence starts this frame.
    ReadyToSink,
    /// The sink sequence owns every segment until the convoy is destroyed.
    Sinking,
    /// Easing below the board after an external exit command.
    ExitingLine,
}

impl ConvoyState {
    /// Pointer-down on the head. Only an idle convoy can be picked up.
    pub fn press_on_head(&mut self) -> bool {
        if *self != ConvoyState::Idle {
            return false;
        }
        *self = ConvoyState::Dragging;
        true
    }

    /// Pointer-up. A dragged convoy drops back to idle; nothing else changes.
    pub fn release(&mut self) -> bool {
        if *self != ConvoyState::Dragging {
            return false;
        }
        *self = ConvoyState::Idle;
        true
    }

    /// `true` while the sink sequence is pending or running.
    pub fn is_sinking(self) -> bool {
        matches!(self, ConvoyState::ReadyToSink | ConvoyState::Sinking)
    }

    /// `true` while per-frame path following should run.
    pub fn follows_path(self) -> bool {
        matches!(self, ConvoyState::Idle | ConvoyState::Dragging)
    }

    /// Dwell threshold reached. Refused once sinking has begun, which makes a
    /// second sink sequence for the same convoy impossible.
    pub fn trigger_sink(&mut self) -> bool {
        if self.is_sinking() {
            return false;
        }
        *self = ConvoyState::ReadyToSink;
        true
    }

    /// Hands the convoy to the sink sequencer.
    pub fn begin_sinking(&mut self) -> bool {
        if *self != ConvoyState::ReadyToSink {
            return false;
        }
        *self = ConvoyState::Sinking;
        true
    }

    /// External exit command. Ignored while sinking or already exiting.
    pub fn start_exit_line(&mut self) -> bool {
        if self.is_sinking() || *self == ConvoyState::ExitingLine {
            return false;
        }
        *self = ConvoyState::ExitingLine;
        true
    }
}

/// Accumulates continuous overlap with one sink zone.
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
pub struct DwellTimer {
    zone: Option<Entity>,
    elapsed: f32,
}

impl DwellTimer {
    /// Seconds of uninterrupted overlap so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Zone the time is being accumulated for.
    pub fn zone(&self) -> Option<Entity> {
        self.zone
    }

    /// Advances the timer for the zone currently overlapped. Losing overlap or
    /// crossing into a different zone resets it to zero; returns `true` on the
    /// frame the accumulated time reaches `threshold`.
    pub fn tick(&mut self, zone: Option<Entity>, dt: f32, threshold: f32) -> bool {
        if zone != self.zone {
            self.zone = zone;
            self.elapsed = 0.0;
        }
        if zone.is_none() {
            return false;
        }
        let before = self.elapsed;
        self.elapsed += dt;
        before < threshold && self.elapsed >= threshold
    }
}

/// Plans the head's next step, but only while the convoy is being dragged.
pub fn drive_head(
    state: ConvoyState,
    planner: &mut GridMotionPlanner,
    now: f32,
    head_pos: Vec3,
    pointer: Option<Vec3>,
    cfg: &MovementSettings,
    is_safe: impl FnOnce(Vec3) -> bool,
) -> Option<PlannedMove> {
    if state != ConvoyState::Dragging {
        return None;
    }
    planner.plan(now, head_pos, pointer?, cfg, is_safe)
}

/// Per-segment targets of the exit-line glide, head first.
#[derive(Component, Clone, Debug, Default, Reflect)]
pub struct ExitLine {
    /// Where each segment settles: straight below where it stood.
    pub targets: Vec<Vec3>,
}

impl ExitLine {
    /// Exit line `depth` units under the given positions.
    pub fn below(positions: impl IntoIterator<Item = Vec3>, depth: f32) -> Self {
        Self {
            targets: positions.into_iter().map(|p| p + Vec3::NEG_Y * depth).collect(),
        }
    }
}

/// Exponential approach of `current` toward `target` at `rate` per second.
pub fn approach(current: Vec3, target: Vec3, rate: f32, dt: f32) -> Vec3 {
    current.lerp(target, math::approach_factor(rate, dt))
}
