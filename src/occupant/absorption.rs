use bevy::prelude::*;

use super::entities::OccupantPart;
use crate::config::AbsorptionSettings;
use crate::tween::{Ease, Group, Motion, Sequence, StepEvent, Track, Tween, Tweening};

/// Progress notification of an [`AbsorptionSequencer`].
pub type AbsorptionEvent = StepEvent<OccupantPart>;

/// Pulls an occupant's head, body, and legs into their seat anchors, one
/// sub-part at a time.
///
/// Targets are indexed in [`OccupantPart::ALL`] order.
#[derive(Clone, Debug)]
pub struct AbsorptionSequencer {
    sequence: Sequence<OccupantPart>,
}

impl AbsorptionSequencer {
    /// Plans the absorption. `pieces` holds each sub-part's current
    /// transform, `anchors` where it should end up (same space).
    ///
    /// Returns `None` when any sub-part is missing; the caller removes the
    /// occupant immediately instead.
    pub fn plan(
        pieces: &[Option<Transform>; 3],
        anchors: &[Vec3; 3],
        s: &AbsorptionSettings,
    ) -> Option<Self> {
        let mut sequence = Sequence::new();
        for part in OccupantPart::ALL {
            let i = part.index();
            let piece = pieces[i]?;
            sequence = sequence.then(
                part,
                Group::new()
                    .with(
                        i,
                        Track::single(Tween::new(
                            Motion::ScaleTo(piece.scale * s.part_scale),
                            s.scale_duration,
                            Ease::InQuad,
                        )),
                    )
                    .with(
                        i,
                        Track::single(Tween::new(
                            Motion::MoveTo(anchors[i]),
                            s.sink_duration,
                            Ease::InQuad,
                        )),
                    ),
            );
        }
        Some(Self { sequence })
    }

    /// Sub-part currently being absorbed.
    pub fn current(&self) -> Option<OccupantPart> {
        self.sequence.current()
    }

    /// `true` once every sub-part has reached its anchor.
    pub fn is_done(&self) -> bool {
        self.sequence.is_finished()
    }

    /// Advances the current sub-part by `dt`.
    pub fn tick(&mut self, dt: f32, pieces: &mut [Transform]) -> Vec<AbsorptionEvent> {
        self.sequence.tick(dt, pieces)
    }
}

/// Pop of a freshly taken seat marker.
pub fn seat_reveal(s: &AbsorptionSettings) -> Tweening {
    Tweening::join([Tween::new(
        Motion::ScaleTo(Vec3::splat(s.seat_reveal_scale)),
        s.seat_reveal_duration,
        Ease::OutBack,
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors() -> [Vec3; 3] {
        [
            Vec3::new(0.0, 1.0, 5.0),
            Vec3::new(0.0, 0.5, 5.0),
            Vec3::new(0.0, 0.0, 5.0),
        ]
    }

    fn pieces() -> [Transform; 3] {
        [
            Transform::from_xyz(0.0, 1.6, 0.0),
            Transform::from_xyz(0.0, 1.0, 0.0),
            Transform::from_xyz(0.0, 0.4, 0.0),
        ]
    }

    #[test]
    fn missing_legs_skips_the_animation() {
        let [head, body, _] = pieces();
        let plan = AbsorptionSequencer::plan(
            &[Some(head), Some(body), None],
            &anchors(),
            &AbsorptionSettings::default(),
        );
        assert!(plan.is_none());
    }

    #[test]
    fn parts_are_absorbed_one_after_another() {
        let mut targets = pieces();
        let mut seq = AbsorptionSequencer::plan(
            &targets.map(Some),
            &anchors(),
            &AbsorptionSettings::default(),
        )
        .unwrap();

        let mut order = Vec::new();
        let mut completed = 0;
        for _ in 0..200 {
            // Later parts stay put until their turn comes.
            if seq.current() == Some(OccupantPart::Head) {
                assert_eq!(targets[2].translation, pieces()[2].translation);
            }
            for e in seq.tick(0.05, &mut targets) {
                match e {
                    StepEvent::Started { step, .. } => order.push(step),
                    StepEvent::Completed => completed += 1,
                    StepEvent::Finished { .. } => {}
                }
            }
        }
        assert_eq!(order, OccupantPart::ALL.to_vec());
        assert_eq!(completed, 1);
        assert!(seq.is_done());
        for (t, a) in targets.iter().zip(anchors()) {
            assert_eq!(t.translation, a);
            assert_eq!(t.scale, Vec3::splat(0.5));
        }
    }

    #[test]
    fn seat_pops_past_its_size_then_settles() {
        let s = AbsorptionSettings::default();
        let mut seat = Transform::from_scale(Vec3::splat(s.seat_hidden_scale));
        let mut pop = seat_reveal(&s);
        assert!(!pop.advance(s.seat_reveal_duration * 0.7, &mut seat));
        assert!(seat.scale.x > s.seat_reveal_scale);
        assert!(pop.advance(s.seat_reveal_duration, &mut seat));
        assert!((seat.scale - Vec3::splat(s.seat_reveal_scale)).length() < 1e-5);
    }
}
