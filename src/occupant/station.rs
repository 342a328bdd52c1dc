use std::collections::VecDeque;

use bevy::prelude::*;

use super::entities::{BoardingRefused, Seats};
use crate::category::Category;
use crate::config::StationSettings;
use crate::convoy::MoveDirection;
use crate::tween::{Ease, Group, Motion, Sequence, Track, Tween};

/// A platform where occupants queue up and board convoys that pull up in
/// front of it.
///
/// Slot `0` is the boarding spot; the queue extends behind it. The front
/// occupant boards when a segment of a matching, seated convoy sits in the
/// cell the station faces.
#[derive(Component, Clone, Debug, Reflect)]
pub struct PassengerStation {
    queue: VecDeque<Entity>,
    slots: Vec<Vec3>,
    /// Direction the station faces the track in.
    pub facing: MoveDirection,
    /// Distance to the boarding cell, in pitches.
    pub reach_cells: f32,
    /// Seconds between two checks.
    pub check_interval: f32,
    /// Seconds after a boarding before probing resumes.
    pub cooldown: f32,
    next_check_at: f32,
    cooldown_until: f32,
}

impl PassengerStation {
    /// A station at `origin` with `queue` lined up behind it, one pitch apart.
    pub fn new(
        origin: Vec3,
        facing: MoveDirection,
        queue: impl IntoIterator<Item = Entity>,
        pitch: f32,
        s: &StationSettings,
    ) -> Self {
        let queue: VecDeque<Entity> = queue.into_iter().collect();
        let slots = (0..queue.len())
            .map(|k| Self::slot(origin, facing, k, pitch))
            .collect();
        Self {
            queue,
            slots,
            facing,
            reach_cells: s.reach_cells,
            check_interval: s.check_interval,
            cooldown: s.cooldown,
            next_check_at: 0.0,
            cooldown_until: 0.0,
        }
    }

    /// Where the `k`-th waiting occupant stands.
    pub fn slot(origin: Vec3, facing: MoveDirection, k: usize, pitch: f32) -> Vec3 {
        origin - facing.to_vec3() * pitch * k as f32
    }

    /// Occupant at the boarding spot.
    pub fn front(&self) -> Option<Entity> {
        self.queue.front().copied()
    }

    /// Waiting occupants, front first.
    pub fn queue(&self) -> impl Iterator<Item = Entity> + '_ {
        self.queue.iter().copied()
    }

    /// Cell checked for a convoy segment.
    pub fn boarding_point(&self, origin: Vec3, pitch: f32) -> Vec3 {
        origin + self.facing.to_vec3() * self.reach_cells * pitch
    }

    /// `true` when a check is due at `now`; schedules the next one.
    pub fn check_due(&mut self, now: f32) -> bool {
        if now < self.cooldown_until || now < self.next_check_at {
            return false;
        }
        self.next_check_at = now + self.check_interval;
        true
    }

    /// Sends the front occupant off and starts the cooldown.
    pub fn board_front(&mut self, now: f32) -> Option<Entity> {
        let boarded = self.queue.pop_front()?;
        self.cooldown_until = now + self.cooldown;
        Some(boarded)
    }

    /// Moves the remaining occupants up one place, one after another.
    ///
    /// Step `k` moves the occupant now `k`-th in line to slot `k`; targets
    /// are indexed like [`Self::queue`].
    pub fn shift_sequence(&self, s: &StationSettings) -> Sequence<usize> {
        self.slots
            .iter()
            .take(self.queue.len())
            .enumerate()
            .fold(Sequence::new(), |seq, (k, slot)| {
                seq.then(
                    k,
                    Group::new().with(
                        k,
                        Track::single(Tween::new(
                            Motion::MoveTo(*slot),
                            s.shift_duration,
                            Ease::OutCubic,
                        )),
                    ),
                )
            })
    }
}

/// Convoy found in front of a station.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arrival {
    /// Convoy root owning the segment that was hit.
    pub convoy: Entity,
    /// Its category.
    pub category: Category,
    /// Seats it has left, less any already claimed this frame.
    pub seats: u32,
    /// `false` once the convoy is sinking or leaving.
    pub boarding: bool,
}

impl Arrival {
    /// Whether an occupant of `occupant` category may board.
    pub fn admit(&self, occupant: Category) -> Result<(), BoardingRefused> {
        if !self.boarding {
            return Err(BoardingRefused::Departed);
        }
        Seats {
            remaining: self.seats,
        }
        .accept(self.category, occupant)
    }
}

/// Queue shift in progress on a station. No probing until it finishes.
#[derive(Component, Debug)]
pub struct QueueShift {
    pub(super) sequence: Sequence<usize>,
    pub(super) occupants: Vec<Entity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::StepEvent;

    fn ids(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    fn station(queue: &[Entity]) -> PassengerStation {
        PassengerStation::new(
            Vec3::ZERO,
            MoveDirection::PosZ,
            queue.iter().copied(),
            1.0,
            &StationSettings::default(),
        )
    }

    fn hit(category: Category, seats: u32) -> Arrival {
        Arrival {
            convoy: ids(1)[0],
            category,
            seats,
            boarding: true,
        }
    }

    // ── admission ───────────────────────────────────────────────────

    #[test]
    fn matching_seated_convoy_is_admitted() {
        assert_eq!(hit(Category::Red, 1).admit(Category::Red), Ok(()));
    }

    #[test]
    fn wrong_colour_is_refused() {
        assert!(matches!(
            hit(Category::Blue, 2).admit(Category::Red),
            Err(BoardingRefused::WrongCategory { .. })
        ));
    }

    #[test]
    fn full_convoy_is_refused() {
        assert_eq!(
            hit(Category::Red, 0).admit(Category::Red),
            Err(BoardingRefused::Full)
        );
    }

    #[test]
    fn departing_convoy_is_refused() {
        let mut h = hit(Category::Red, 3);
        h.boarding = false;
        assert_eq!(h.admit(Category::Red), Err(BoardingRefused::Departed));
    }

    // ── queue ───────────────────────────────────────────────────────

    #[test]
    fn queue_lines_up_behind_the_facing() {
        let e = ids(3);
        let s = station(&e);
        assert_eq!(s.boarding_point(Vec3::ZERO, 1.0), Vec3::Z);
        assert_eq!(
            PassengerStation::slot(Vec3::ZERO, MoveDirection::PosZ, 2, 1.0),
            Vec3::new(0.0, 0.0, -2.0)
        );
        assert_eq!(s.queue().collect::<Vec<_>>(), e);
    }

    #[test]
    fn boarding_pops_the_front() {
        let e = ids(3);
        let mut s = station(&e);
        assert_eq!(s.board_front(0.0), Some(e[0]));
        assert_eq!(s.front(), Some(e[1]));
        s.board_front(1.0);
        s.board_front(2.0);
        assert_eq!(s.board_front(3.0), None);
    }

    #[test]
    fn cooldown_holds_checks_back() {
        let e = ids(2);
        let settings = StationSettings {
            cooldown: 0.5,
            ..default()
        };
        let mut s = PassengerStation::new(Vec3::ZERO, MoveDirection::PosZ, e, 1.0, &settings);
        assert!(s.check_due(1.0));
        assert!(!s.check_due(1.05));
        s.board_front(1.0);
        assert!(!s.check_due(1.2));
        assert!(!s.check_due(1.45));
        assert!(s.check_due(1.55));
    }

    #[test]
    fn queue_shifts_one_occupant_at_a_time() {
        let e = ids(3);
        let mut s = station(&e);
        s.board_front(0.0);
        let mut seq = s.shift_sequence(&StationSettings::default());
        // The two left behind still stand on slots 1 and 2.
        let mut waiting = vec![
            Transform::from_xyz(0.0, 0.0, -1.0),
            Transform::from_xyz(0.0, 0.0, -2.0),
        ];

        let mut order = Vec::new();
        for _ in 0..100 {
            if seq.current() == Some(0) {
                assert_eq!(waiting[1].translation, Vec3::new(0.0, 0.0, -2.0));
            }
            for event in seq.tick(0.01, &mut waiting) {
                if let StepEvent::Started { step, .. } = event {
                    order.push(step);
                }
            }
        }
        assert_eq!(order, vec![0, 1]);
        assert!(seq.is_finished());
        assert_eq!(waiting[0].translation, Vec3::ZERO);
        assert_eq!(waiting[1].translation, Vec3::new(0.0, 0.0, -1.0));
    }
}
