//! Scripted retirement of a convoy.
//!
//! Every phase is a [`Group`] of tracks inside a [`Sequence`]; the next phase
//! only starts once the current group reports completion.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::config::SinkSettings;
use crate::tween::{Ease, Group, Motion, Sequence, StepEvent, Track, Tween};

/// Step of the sink sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum SinkPhase {
    /// Head shrinks, descends, and spins half a turn.
    HeadSink,
    /// Head scales to nothing while still descending.
    HeadVanish,
    /// Body segment `k` (1-based, nearest the head first) slides into the
    /// cell vacated by the segment ahead of it.
    BodyAdvance(usize),
    /// Short hold before the body goes under.
    Pause,
    /// Every body segment descends and disappears at once.
    BodyVanish,
}

/// Progress notification of a [`SinkSequencer`].
pub type SinkEvent = StepEvent<SinkPhase>;

/// Ordered phases retiring one convoy.
///
/// Targets are addressed by chain index: `0` is the head, `1..=n` the body
/// in order from the head outward.
#[derive(Clone, Debug)]
pub struct SinkSequencer {
    sequence: Sequence<SinkPhase>,
}

impl SinkSequencer {
    /// Lays out the full sequence for the chain as it stands now.
    pub fn new(chain: &[Transform], s: &SinkSettings) -> Self {
        let head_scale = chain.first().map_or(Vec3::ONE, |t| t.scale);
        let mut sequence = Sequence::new()
            .then(
                SinkPhase::HeadSink,
                Group::new()
                    .with(
                        0,
                        Track::single(Tween::new(
                            Motion::MoveBy(Vec3::NEG_Y * s.sink_distance),
                            s.head_sink_duration,
                            Ease::InQuad,
                        )),
                    )
                    .with(
                        0,
                        Track::single(Tween::new(
                            Motion::ScaleTo(head_scale * s.scale_down_amount),
                            s.head_sink_duration,
                            Ease::OutQuad,
                        )),
                    )
                    .with(
                        0,
                        Track::single(Tween::new(
                            Motion::SpinBy(PI),
                            s.head_sink_duration,
                            Ease::InOutSine,
                        )),
                    ),
            )
            .then(
                SinkPhase::HeadVanish,
                Group::new()
                    .with(
                        0,
                        Track::single(Tween::new(
                            Motion::MoveBy(Vec3::NEG_Y * s.disappear_distance),
                            s.head_disappear_duration,
                            Ease::InQuad,
                        )),
                    )
                    .with(
                        0,
                        Track::single(Tween::new(
                            Motion::ScaleTo(Vec3::ZERO),
                            s.head_disappear_duration,
                            Ease::InQuad,
                        )),
                    ),
            );

        let body_count = chain.len().saturating_sub(1);
        if body_count == 0 {
            return Self { sequence };
        }

        for (k, pair) in chain.windows(2).enumerate() {
            let (ahead, this) = (&pair[0], &pair[1]);
            sequence = sequence.then(
                SinkPhase::BodyAdvance(k + 1),
                Group::new()
                    .with(
                        k + 1,
                        Track::single(Tween::new(
                            Motion::MoveTo(ahead.translation),
                            s.body_move_duration,
                            Ease::OutQuad,
                        )),
                    )
                    .with(
                        k + 1,
                        Track::single(Tween::new(
                            Motion::ScaleTo(this.scale * s.scale_up_amount),
                            s.body_scale_duration,
                            Ease::OutQuad,
                        ))
                        .then(Tween::new(
                            Motion::ScaleTo(this.scale),
                            s.body_scale_duration,
                            Ease::InQuad,
                        )),
                    ),
            );
        }

        let mut vanish = Group::new();
        for k in 1..=body_count {
            vanish.push(
                k,
                Track::single(Tween::new(
                    Motion::MoveBy(Vec3::NEG_Y * s.sink_distance),
                    s.body_sink_duration,
                    Ease::InQuad,
                ))
                .then(Tween::new(
                    Motion::MoveBy(Vec3::NEG_Y * s.disappear_distance),
                    s.body_disappear_duration,
                    Ease::InQuad,
                )),
            );
            vanish.push(
                k,
                Track::single(Tween::wait(s.body_sink_duration)).then(Tween::new(
                    Motion::ScaleTo(Vec3::ZERO),
                    s.body_disappear_duration,
                    Ease::InQuad,
                )),
            );
        }

        Self {
            sequence: sequence
                .then(
                    SinkPhase::Pause,
                    Group::new().with(0, Track::single(Tween::wait(s.body_wait_duration))),
                )
                .then(SinkPhase::BodyVanish, vanish),
        }
    }

    /// The phase being played; `None` once done.
    pub fn phase(&self) -> Option<SinkPhase> {
        self.sequence.current()
    }

    /// `true` once [`StepEvent::Completed`] has been emitted.
    pub fn is_done(&self) -> bool {
        self.sequence.is_finished()
    }

    /// Advances the current phase by `dt`.
    pub fn tick(&mut self, dt: f32, chain: &mut [Transform]) -> Vec<SinkEvent> {
        self.sequence.tick(dt, chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> Vec<Transform> {
        (0..=n)
            .map(|i| Transform::from_xyz(-(i as f32), 0.0, 0.0))
            .collect()
    }

    fn run(chain: &mut [Transform], seq: &mut SinkSequencer) -> Vec<SinkEvent> {
        let mut all = Vec::new();
        for _ in 0..1000 {
            all.extend(seq.tick(0.05, chain));
            if seq.is_done() {
                break;
            }
        }
        all
    }

    fn started(events: &[SinkEvent]) -> Vec<(SinkPhase, f32)> {
        events
            .iter()
            .filter_map(|e| match e {
                StepEvent::Started { step, at } => Some((*step, *at)),
                _ => None,
            })
            .collect()
    }

    fn finished_at(events: &[SinkEvent], which: SinkPhase) -> f32 {
        events
            .iter()
            .find_map(|e| match e {
                StepEvent::Finished { step, at } if *step == which => Some(*at),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn phases_play_in_chain_order() {
        let mut c = chain(3);
        let mut seq = SinkSequencer::new(&c, &SinkSettings::default());
        let events = run(&mut c, &mut seq);
        let order: Vec<SinkPhase> = started(&events).into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            order,
            vec![
                SinkPhase::HeadSink,
                SinkPhase::HeadVanish,
                SinkPhase::BodyAdvance(1),
                SinkPhase::BodyAdvance(2),
                SinkPhase::BodyAdvance(3),
                SinkPhase::Pause,
                SinkPhase::BodyVanish,
            ]
        );
        assert_eq!(
            events.iter().filter(|e| **e == StepEvent::Completed).count(),
            1
        );
        assert_eq!(events.last(), Some(&StepEvent::Completed));
    }

    #[test]
    fn second_segment_waits_for_first() {
        let mut c = chain(3);
        let mut seq = SinkSequencer::new(&c, &SinkSettings::default());
        let events = run(&mut c, &mut seq);
        let starts = started(&events);
        let start_of = |p| starts.iter().find(|(q, _)| *q == p).unwrap().1;

        assert!(start_of(SinkPhase::BodyAdvance(1)) >= finished_at(&events, SinkPhase::HeadVanish));
        assert!(start_of(SinkPhase::BodyAdvance(2)) >= finished_at(&events, SinkPhase::BodyAdvance(1)));
        assert!(start_of(SinkPhase::BodyAdvance(3)) >= finished_at(&events, SinkPhase::BodyAdvance(2)));
        assert!(start_of(SinkPhase::BodyVanish) >= finished_at(&events, SinkPhase::Pause));
    }

    #[test]
    fn body_does_not_move_while_head_sinks() {
        let mut c = chain(2);
        let before: Vec<Vec3> = c.iter().map(|t| t.translation).collect();
        let mut seq = SinkSequencer::new(&c, &SinkSettings::default());
        while matches!(seq.phase(), Some(SinkPhase::HeadSink | SinkPhase::HeadVanish)) {
            seq.tick(0.05, &mut c);
        }
        assert_eq!(c[1].translation, before[1]);
        assert_eq!(c[2].translation, before[2]);
        assert!(c[0].translation.y < 0.0);
        assert_eq!(c[0].scale, Vec3::ZERO);
    }

    #[test]
    fn each_segment_takes_the_vacated_cell() {
        let mut c = chain(2);
        let start: Vec<Vec3> = c.iter().map(|t| t.translation).collect();
        let mut seq = SinkSequencer::new(&c, &SinkSettings::default());
        while seq.phase() != Some(SinkPhase::Pause) {
            seq.tick(0.05, &mut c);
        }
        assert_eq!(c[1].translation, start[0]);
        assert_eq!(c[2].translation, start[1]);
        assert!((c[1].scale - Vec3::ONE).length() < 1e-5);
    }

    #[test]
    fn everything_ends_below_and_invisible() {
        let mut c = chain(3);
        let mut seq = SinkSequencer::new(&c, &SinkSettings::default());
        run(&mut c, &mut seq);
        for t in &c {
            assert!(t.translation.y < 0.0);
            assert_eq!(t.scale, Vec3::ZERO);
        }
    }

    #[test]
    fn bodiless_convoy_finishes_after_the_head() {
        let mut c = chain(0);
        let mut seq = SinkSequencer::new(&c, &SinkSettings::default());
        let events = run(&mut c, &mut seq);
        let order: Vec<SinkPhase> = started(&events).into_iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec![SinkPhase::HeadSink, SinkPhase::HeadVanish]);
        assert!(seq.is_done());
    }

    #[test]
    fn ticking_after_done_is_silent() {
        let mut c = chain(1);
        let mut seq = SinkSequencer::new(&c, &SinkSettings::default());
        run(&mut c, &mut seq);
        assert!(seq.tick(0.05, &mut c).is_empty());
    }
}
