use bevy::prelude::*;
use serde::Deserialize;

use super::corners::CornerInfo;
use crate::config::MovementSettings;
use crate::math;

/// One of the four axis-aligned unit steps on the ground plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect, Deserialize)]
pub enum MoveDirection {
    /// +X ("right").
    PosX,
    /// -X ("left").
    NegX,
    /// +Z ("forward").
    PosZ,
    /// -Z ("back").
    NegZ,
}

impl MoveDirection {
    /// Unit vector of this direction.
    pub fn to_vec3(self) -> Vec3 {
        match self {
            MoveDirection::PosX => Vec3::X,
            MoveDirection::NegX => Vec3::NEG_X,
            MoveDirection::PosZ => Vec3::Z,
            MoveDirection::NegZ => Vec3::NEG_Z,
        }
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        match self {
            MoveDirection::PosX => MoveDirection::NegX,
            MoveDirection::NegX => MoveDirection::PosX,
            MoveDirection::PosZ => MoveDirection::NegZ,
            MoveDirection::NegZ => MoveDirection::PosZ,
        }
    }

    /// Dominant planar axis of `delta`, ties going to X. `None` for a zero
    /// planar vector.
    pub fn dominant(delta: Vec3) -> Option<Self> {
        if delta.x == 0.0 && delta.z == 0.0 {
            return None;
        }
        Some(if delta.x.abs() >= delta.z.abs() {
            if delta.x >= 0.0 {
                MoveDirection::PosX
            } else {
                MoveDirection::NegX
            }
        } else if delta.z >= 0.0 {
            MoveDirection::PosZ
        } else {
            MoveDirection::NegZ
        })
    }

    /// Rounds a (roughly unit) vector onto a grid axis.
    ///
    /// Each planar component is rounded to the nearest integer; the result is
    /// a direction only when exactly one axis survives.
    pub fn from_rounded(v: Vec3) -> Option<Self> {
        let n = v.normalize_or_zero();
        match (n.x.round() as i32, n.z.round() as i32) {
            (1, 0) => Some(MoveDirection::PosX),
            (-1, 0) => Some(MoveDirection::NegX),
            (0, 1) => Some(MoveDirection::PosZ),
            (0, -1) => Some(MoveDirection::NegZ),
            _ => None,
        }
    }
}

/// A head step the planner accepted this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannedMove {
    /// Cell the head should glide into.
    pub target: Vec3,
    /// Direction of the step.
    pub direction: MoveDirection,
    /// Heading change recorded at the cell the head is leaving.
    pub corner: Option<CornerInfo>,
}

/// Turns a continuous pointer target into the head's next grid cell.
///
/// Owns the committed heading and the move-rate limiter.
#[derive(Component, Clone, Debug, Reflect)]
pub struct GridMotionPlanner {
    committed: MoveDirection,
    next_move_at: f32,
    target: Vec3,
}

impl GridMotionPlanner {
    /// Starts with `committed` as the current heading and the head parked on `cell`.
    pub fn new(committed: MoveDirection, cell: Vec3) -> Self {
        Self {
            committed,
            next_move_at: 0.0,
            target: cell,
        }
    }

    /// Heading of the last accepted step.
    pub fn committed(&self) -> MoveDirection {
        self.committed
    }

    /// Cell of the last accepted step.
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Plans at most one single-cell step toward `pointer`.
    ///
    /// `is_safe` is asked about the candidate cell only after the dead-zone,
    /// rate limit, and minimum-step checks pass; it is the only veto, so a
    /// step back into the body is refused there. On acceptance the heading and
    /// rate limiter advance and the returned move carries a corner record when
    /// the heading turned by a quarter.
    pub fn plan(
        &mut self,
        now: f32,
        head_pos: Vec3,
        pointer: Vec3,
        cfg: &MovementSettings,
        is_safe: impl FnOnce(Vec3) -> bool,
    ) -> Option<PlannedMove> {
        if now < self.next_move_at {
            return None;
        }

        let pitch = cfg.grid_pitch;
        let cell = math::snap_to_grid(head_pos, pitch);
        if math::planar_distance(cell, pointer) <= cfg.follow_threshold {
            return None;
        }

        let direction = MoveDirection::dominant(pointer - cell)?;
        let next = cell + direction.to_vec3() * pitch;
        if math::planar_distance(cell, next) < pitch * cfg.min_step_fraction || !is_safe(next) {
            return None;
        }

        // A reversal is only reachable without a body and has no corner shape.
        let turned = direction != self.committed && direction != self.committed.opposite();
        let corner = turned.then(|| CornerInfo {
            position: cell,
            incoming: self.committed,
            outgoing: direction,
        });
        self.committed = direction;
        self.target = next;
        self.next_move_at = now + cfg.move_interval;

        Some(PlannedMove {
            target: next,
            direction,
            corner,
        })
    }
}
