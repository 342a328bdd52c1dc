use bevy::prelude::*;

use super::grid_planner::MoveDirection;
use crate::math;

/// A heading change of the head, recorded at the cell where it turned.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct CornerInfo {
    /// Cell the head was on when it turned.
    pub position: Vec3,
    /// Heading before the turn.
    pub incoming: MoveDirection,
    /// Heading after the turn.
    pub outgoing: MoveDirection,
}

impl CornerInfo {
    /// Sign of the turn: the y component of `incoming × outgoing`.
    ///
    /// Negative for a turn from +X to +Z, positive for the mirror turn, zero
    /// when the two directions are parallel.
    pub fn handedness(&self) -> f32 {
        self.incoming.to_vec3().cross(self.outgoing.to_vec3()).y
    }

    /// Orientation a segment sitting on this corner eases toward: facing the
    /// outgoing direction and rolled by `tilt_degrees` toward the inside of the turn.
    pub fn tilt_rotation(&self, tilt_degrees: f32) -> Quat {
        let yaw = math::yaw_of(self.outgoing.to_vec3());
        let roll = if self.handedness() < 0.0 {
            -tilt_degrees
        } else {
            tilt_degrees
        };
        Quat::from_euler(EulerRot::YXZ, yaw, 0.0, roll.to_radians())
    }
}

/// Corners the convoy has not fully passed yet.
///
/// Append-on-turn, prune-on-distance: an entry lives while any segment is
/// within the prune radius of it, regardless of how many newer entries exist.
#[derive(Component, Clone, Debug, Default, Reflect)]
pub struct CornerLedger {
    entries: Vec<CornerInfo>,
}

impl CornerLedger {
    /// Recorded corners, oldest first.
    pub fn entries(&self) -> &[CornerInfo] {
        &self.entries
    }

    /// Number of recorded corners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no corner is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a turn. Straight-through and U-turn entries are ignored.
    pub fn record(&mut self, corner: CornerInfo) -> bool {
        if corner.incoming == corner.outgoing || corner.incoming == corner.outgoing.opposite() {
            return false;
        }
        self.entries.push(corner);
        true
    }

    /// Drops every corner farther than `radius` from all `segments`.
    /// Returns how many were removed.
    pub fn prune(&mut self, segments: &[Vec3], radius: f32) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|c| segments.iter().any(|p| p.distance(c.position) < radius));
        before - self.entries.len()
    }

    /// Most recent corner within `radius` of `pos`.
    pub fn near(&self, pos: Vec3, radius: f32) -> Option<&CornerInfo> {
        self.entries
            .iter()
            .rev()
            .find(|c| pos.distance(c.position) < radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner(at: Vec3, incoming: MoveDirection, outgoing: MoveDirection) -> CornerInfo {
        CornerInfo {
            position: at,
            incoming,
            outgoing,
        }
    }

    #[test]
    fn straight_entry_is_never_recorded() {
        let mut ledger = CornerLedger::default();
        assert!(!ledger.record(corner(Vec3::ZERO, MoveDirection::PosX, MoveDirection::PosX)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn u_turn_is_never_recorded() {
        let mut ledger = CornerLedger::default();
        assert!(!ledger.record(corner(Vec3::ZERO, MoveDirection::PosZ, MoveDirection::NegZ)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn turn_out_and_back_records_two_corners() {
        let mut ledger = CornerLedger::default();
        ledger.record(corner(
            Vec3::new(3.0, 0.0, 0.0),
            MoveDirection::PosX,
            MoveDirection::PosZ,
        ));
        ledger.record(corner(
            Vec3::new(3.0, 0.0, 2.0),
            MoveDirection::PosZ,
            MoveDirection::PosX,
        ));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[0].outgoing, MoveDirection::PosZ);
        assert_eq!(ledger.entries()[1].incoming, MoveDirection::PosZ);
        assert_eq!(ledger.entries()[1].outgoing, MoveDirection::PosX);

        // Convoy still straddling the corners keeps them.
        let near = [Vec3::new(4.0, 0.0, 2.0), Vec3::new(3.0, 0.0, 2.0)];
        assert_eq!(ledger.prune(&near, 3.0), 0);

        // Every segment more than three pitches away prunes both.
        let far = [Vec3::new(10.0, 0.0, 2.0), Vec3::new(9.0, 0.0, 2.0)];
        assert_eq!(ledger.prune(&far, 3.0), 2);
        assert!(ledger.is_empty());
    }

    #[test]
    fn pruning_is_by_distance_not_age() {
        let mut ledger = CornerLedger::default();
        ledger.record(corner(Vec3::ZERO, MoveDirection::PosX, MoveDirection::PosZ));
        ledger.record(corner(
            Vec3::new(0.0, 0.0, 10.0),
            MoveDirection::PosZ,
            MoveDirection::NegX,
        ));
        // Only the older corner is still near a segment.
        ledger.prune(&[Vec3::new(0.0, 0.0, 1.0)], 3.0);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries()[0].position, Vec3::ZERO);
    }

    #[test]
    fn near_returns_newest_match() {
        let mut ledger = CornerLedger::default();
        ledger.record(corner(Vec3::ZERO, MoveDirection::PosX, MoveDirection::PosZ));
        ledger.record(corner(Vec3::ZERO, MoveDirection::PosZ, MoveDirection::NegX));
        let c = ledger.near(Vec3::new(0.1, 0.0, 0.0), 0.5).unwrap();
        assert_eq!(c.outgoing, MoveDirection::NegX);
        assert!(ledger.near(Vec3::new(1.0, 0.0, 0.0), 0.5).is_none());
    }

    #[test]
    fn mirror_turns_tilt_opposite_ways() {
        let left = corner(Vec3::ZERO, MoveDirection::PosX, MoveDirection::PosZ);
        let right = corner(Vec3::ZERO, MoveDirection::PosX, MoveDirection::NegZ);
        assert!(left.handedness() < 0.0);
        assert!(right.handedness() > 0.0);

        let (_, _, roll_l) = left.tilt_rotation(30.0).to_euler(EulerRot::YXZ);
        let (_, _, roll_r) = right.tilt_rotation(30.0).to_euler(EulerRot::YXZ);
        assert!((roll_l + 30f32.to_radians()).abs() < 1e-4);
        assert!((roll_r - 30f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn tilt_faces_outgoing_direction() {
        let c = corner(Vec3::ZERO, MoveDirection::PosZ, MoveDirection::PosX);
        let (yaw, _, _) = c.tilt_rotation(30.0).to_euler(EulerRot::YXZ);
        assert!((yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }
}
