//! Body segment placement and corner deformation, derived from the path
//! history and the neighbouring segments.

use bevy::prelude::*;

use super::corners::CornerLedger;
use super::grid_planner::MoveDirection;
use super::history::PathHistory;
use crate::config::{CornerYaws, MovementSettings};
use crate::math;

/// Where a body segment belongs this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentPlacement {
    /// Cell the segment should occupy.
    pub position: Vec3,
    /// Direction of travel through that cell (zero when unknown).
    pub forward: Vec3,
}

/// Computes placements for `body_count` segments.
///
/// Segment `i` sits on history slot `i + 1`; its forward direction runs from
/// the slot behind it toward its own slot, or from its own slot toward the
/// one ahead when nothing is behind. Missing slots are extrapolated so a
/// freshly attached segment lines up behind the tail.
pub fn follow_targets(
    history: &PathHistory,
    body_count: usize,
    heading: MoveDirection,
    pitch: f32,
) -> Vec<SegmentPlacement> {
    let heading = heading.to_vec3();
    let slot = |i: usize| history.slot(i, heading, pitch);
    (0..body_count)
        .filter_map(|i| {
            let here = slot(i + 1)?;
            let forward = match (slot(i + 2), slot(i)) {
                (Some(behind), _) if i + 2 < history.len() => (here - behind).normalize_or_zero(),
                (_, Some(ahead)) => (ahead - here).normalize_or_zero(),
                _ => Vec3::ZERO,
            };
            Some(SegmentPlacement {
                position: here,
                forward,
            })
        })
        .collect()
}

/// Orientation a segment eases toward.
///
/// On a recorded corner (within half a pitch) the segment takes the corner's
/// tilted pose; elsewhere it faces `forward` rounded to a quarter turn. With
/// no usable forward the current yaw is rounded instead.
pub fn target_rotation(
    pos: Vec3,
    forward: Vec3,
    current: Quat,
    ledger: &CornerLedger,
    cfg: &MovementSettings,
) -> Quat {
    if let Some(corner) = ledger.near(pos, cfg.grid_pitch * 0.5) {
        return corner.tilt_rotation(cfg.corner_tilt_degrees);
    }
    let yaw = if forward == Vec3::ZERO {
        math::yaw_of_rotation(current)
    } else {
        math::yaw_of(forward)
    };
    Quat::from_rotation_y(math::round_yaw_to_quarter(yaw))
}

/// Slerps `current` toward `target` at `rate` per second.
pub fn smooth_rotation(current: Quat, target: Quat, rate: f32, dt: f32) -> Quat {
    current.slerp(target, math::approach_factor(rate, dt))
}

/// Which corner mesh variant a turn uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum CornerKind {
    /// The "90°" variant.
    Quarter,
    /// The "180°" opposite-corner variant.
    Opposite,
}

impl CornerKind {
    /// Classifies a `(from, to)` pair by handedness. `None` for straight or
    /// U-turn pairs, which have no corner mesh.
    pub fn classify(from: MoveDirection, to: MoveDirection) -> Option<Self> {
        let turn = from.to_vec3().cross(to.to_vec3()).y;
        if turn > 0.0 {
            Some(CornerKind::Quarter)
        } else if turn < 0.0 {
            Some(CornerKind::Opposite)
        } else {
            None
        }
    }
}

impl CornerYaws {
    /// Configured yaw (degrees) for a `(from, to)` pair; zero for pairs
    /// without a corner mesh.
    pub fn lookup(&self, from: MoveDirection, to: MoveDirection) -> f32 {
        use MoveDirection::*;
        match (from, to) {
            (PosX, NegZ) => self.right_to_back,
            (NegZ, NegX) => self.back_to_left,
            (NegX, PosZ) => self.left_to_forward,
            (PosZ, PosX) => self.forward_to_right,
            (NegZ, PosX) => self.back_to_right,
            (NegX, NegZ) => self.left_to_back,
            (PosZ, NegX) => self.forward_to_left,
            (PosX, PosZ) => self.right_to_forward,
            _ => 0.0,
        }
    }
}

/// Straight or corner mesh selection for one body segment.
///
/// Recomputed every frame from neighbour positions; never carried over.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub struct Deformation {
    /// Show the pivoted corner mesh instead of the straight one.
    pub is_corner: bool,
    /// Variant of the corner mesh when `is_corner`.
    pub kind: Option<CornerKind>,
    /// Local yaw (degrees) of the corner mesh.
    pub yaw_degrees: f32,
}

impl Deformation {
    /// Derives the mesh state of the segment at `this`.
    ///
    /// `prev` is the segment ahead (toward the head), `next` the one behind;
    /// the tail passes `None` and is never a corner.
    pub fn derive(prev: Vec3, this: Vec3, next: Option<Vec3>, yaws: &CornerYaws) -> Self {
        let from = MoveDirection::from_rounded(this - prev);
        let to = next.and_then(|n| MoveDirection::from_rounded(n - this));
        match (from, to) {
            (Some(from), Some(to)) if from != to => Self {
                is_corner: true,
                kind: CornerKind::classify(from, to),
                yaw_degrees: yaws.lookup(from, to),
            },
            _ => Self::default(),
        }
    }

    /// Mesh state for a whole chain (head first); one entry per body segment.
    pub fn derive_chain(positions: &[Vec3], yaws: &CornerYaws) -> Vec<Self> {
        (1..positions.len())
            .map(|i| Self::derive(positions[i - 1], positions[i], positions.get(i + 1).copied(), yaws))
            .collect()
    }
}
