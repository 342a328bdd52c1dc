//! Minimal tween engine: timed position/rotation/scale interpolation.
//!
//! A [`Tween`] animates one channel of a [`Transform`]. Its start value is
//! captured on the first advance, so a tween queued behind another starts from
//! wherever the previous one left off. [`Track`] chains tweens, [`Group`] joins
//! tracks bound to different targets and completes when the longest finishes.
//! [`Sequence`] plays labelled groups strictly in order.
//!
//! Everything here is frame-granular: a tween that finishes mid-frame does not
//! hand the leftover time to its successor, which begins on the next advance.

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::math;

/// Easing curve applied to normalized time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub enum Ease {
    /// Constant speed.
    #[default]
    Linear,
    /// Accelerating quadratic.
    InQuad,
    /// Decelerating quadratic.
    OutQuad,
    /// Decelerating cubic.
    OutCubic,
    /// Sine ease-in-out.
    InOutSine,
    /// Overshoots slightly, then settles.
    OutBack,
}

impl Ease {
    /// Maps `t` in `[0, 1]` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::InQuad => t * t,
            Ease::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::OutCubic => math::ease_out_cubic(t),
            Ease::InOutSine => -((std::f32::consts::PI * t).cos() - 1.0) / 2.0,
            Ease::OutBack => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
        }
    }
}

/// What a tween animates, expressed relative to the value at its start.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub enum Motion {
    /// Translate to an absolute position.
    MoveTo(Vec3),
    /// Translate by an offset from the start position.
    MoveBy(Vec3),
    /// Scale to an absolute scale.
    ScaleTo(Vec3),
    /// Rotate to an absolute orientation.
    RotateTo(Quat),
    /// Rotate about +Y by an angle (radians) from the start orientation.
    SpinBy(f32),
    /// Touch nothing; only consume time.
    Wait,
}

#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
enum Resolved {
    Translation(Vec3, Vec3),
    Scale(Vec3, Vec3),
    Rotation(Quat, Quat),
    Idle,
}

/// One timed interpolation of a single transform channel.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct Tween {
    motion: Motion,
    duration: f32,
    ease: Ease,
    elapsed: f32,
    resolved: Option<Resolved>,
}

impl Tween {
    /// Creates a tween that has not started yet.
    pub fn new(motion: Motion, duration: f32, ease: Ease) -> Self {
        Self {
            motion,
            duration: duration.max(0.0),
            ease,
            elapsed: 0.0,
            resolved: None,
        }
    }

    /// Shorthand for [`Motion::Wait`].
    pub fn wait(duration: f32) -> Self {
        Self::new(Motion::Wait, duration, Ease::Linear)
    }

    /// The motion this tween performs.
    pub fn motion(&self) -> Motion {
        self.motion
    }

    /// Configured duration in seconds.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// `true` once the full duration has elapsed.
    pub fn is_finished(&self) -> bool {
        self.resolved.is_some() && self.elapsed >= self.duration
    }

    /// Advances by `dt` and writes the eased value into `target`.
    ///
    /// The first call captures the start value from `target`. Returns `true`
    /// once the tween has reached its end value.
    pub fn advance(&mut self, dt: f32, target: &mut Transform) -> bool {
        let resolved = *self
            .resolved
            .get_or_insert_with(|| resolve(self.motion, target));
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);

        let t = if self.duration <= 0.0 {
            1.0
        } else {
            self.elapsed / self.duration
        };
        let k = self.ease.apply(t);

        match resolved {
            Resolved::Translation(from, to) => target.translation = from.lerp(to, k),
            Resolved::Scale(from, to) => target.scale = from.lerp(to, k),
            Resolved::Rotation(from, to) => target.rotation = from.slerp(to, k),
            Resolved::Idle => {}
        }
        self.elapsed >= self.duration
    }
}

fn resolve(motion: Motion, start: &Transform) -> Resolved {
    match motion {
        Motion::MoveTo(to) => Resolved::Translation(start.translation, to),
        Motion::MoveBy(offset) => {
            Resolved::Translation(start.translation, start.translation + offset)
        }
        Motion::ScaleTo(to) => Resolved::Scale(start.scale, to),
        Motion::RotateTo(to) => Resolved::Rotation(start.rotation, to),
        Motion::SpinBy(angle) => {
            Resolved::Rotation(start.rotation, Quat::from_rotation_y(angle) * start.rotation)
        }
        Motion::Wait => Resolved::Idle,
    }
}

/// Tweens played one after another on the same target.
#[derive(Clone, Debug, Default, PartialEq, Reflect)]
pub struct Track {
    queue: VecDeque<Tween>,
}

impl Track {
    /// A track holding a single tween.
    pub fn single(tween: Tween) -> Self {
        Self {
            queue: VecDeque::from([tween]),
        }
    }

    /// Appends a tween that starts after everything already queued.
    pub fn then(mut self, tween: Tween) -> Self {
        self.queue.push_back(tween);
        self
    }

    /// `true` when nothing is left to play.
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Advances the current tween; pops it when done. Returns `true` when the
    /// whole track has finished.
    pub fn advance(&mut self, dt: f32, target: &mut Transform) -> bool {
        if let Some(current) = self.queue.front_mut()
            && current.advance(dt, target)
        {
            self.queue.pop_front();
        }
        self.queue.is_empty()
    }
}

/// Tracks bound to target indices, all running at once.
#[derive(Clone, Debug, Default, PartialEq, Reflect)]
pub struct Group {
    tracks: Vec<(usize, Track)>,
}

impl Group {
    /// An empty group (already finished).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a track animating `targets[index]`.
    pub fn with(mut self, index: usize, track: Track) -> Self {
        self.tracks.push((index, track));
        self
    }

    /// Adds a track in place.
    pub fn push(&mut self, index: usize, track: Track) {
        self.tracks.push((index, track));
    }

    /// `true` once every track has finished.
    pub fn is_finished(&self) -> bool {
        self.tracks.iter().all(|(_, t)| t.is_finished())
    }

    /// Advances every unfinished track. Tracks whose index is out of range are
    /// dropped. Returns `true` once all tracks have finished.
    pub fn advance(&mut self, dt: f32, targets: &mut [Transform]) -> bool {
        self.tracks.retain_mut(|(index, track)| match targets.get_mut(*index) {
            Some(target) => !track.advance(dt, target),
            None => false,
        });
        self.tracks.is_empty()
    }
}

/// Joined tweens animating the entity they sit on.
///
/// Inserting a new `Tweening` replaces (kills) the one in flight.
#[derive(Component, Clone, Debug, Reflect)]
pub struct Tweening {
    tweens: Vec<Tween>,
}

impl Tweening {
    /// Runs all `tweens` simultaneously.
    pub fn join(tweens: impl IntoIterator<Item = Tween>) -> Self {
        Self {
            tweens: tweens.into_iter().collect(),
        }
    }

    /// Destination of the first translation tween, if any.
    pub fn destination(&self) -> Option<Vec3> {
        self.tweens.iter().find_map(|t| match t.motion() {
            Motion::MoveTo(to) => Some(to),
            _ => None,
        })
    }

    /// Advances every tween. Returns `true` once all have finished.
    pub fn advance(&mut self, dt: f32, target: &mut Transform) -> bool {
        self.tweens.retain_mut(|t| !t.advance(dt, target));
        self.tweens.is_empty()
    }
}

/// Progress of a [`Sequence`], stamped with the sequence's own clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepEvent<P> {
    /// A step began.
    Started {
        /// The step.
        step: P,
        /// Seconds since the sequence started.
        at: f32,
    },
    /// Every track of a step reported completion.
    Finished {
        /// The step.
        step: P,
        /// Seconds since the sequence started.
        at: f32,
    },
    /// The last step finished. Emitted exactly once.
    Completed,
}

/// Labelled groups played strictly one after another.
///
/// Step `n + 1` is announced on the tick step `n` finishes and first advanced
/// on the following tick, so its start never precedes its predecessor's end.
#[derive(Clone, Debug)]
pub struct Sequence<P> {
    steps: VecDeque<(P, Group)>,
    clock: f32,
    announced: bool,
}

impl<P> Default for Sequence<P> {
    fn default() -> Self {
        Self {
            steps: VecDeque::new(),
            clock: 0.0,
            announced: false,
        }
    }
}

impl<P: Copy> Sequence<P> {
    /// An empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn then(mut self, step: P, group: Group) -> Self {
        self.steps.push_back((step, group));
        self
    }

    /// Label of the step being played.
    pub fn current(&self) -> Option<P> {
        self.steps.front().map(|(step, _)| *step)
    }

    /// `true` once every step has played (or none was queued).
    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    /// Advances the current step and moves on once its group completes.
    pub fn tick(&mut self, dt: f32, targets: &mut [Transform]) -> Vec<StepEvent<P>> {
        let mut events = Vec::new();
        let Some((step, group)) = self.steps.front_mut() else {
            return events;
        };
        let step = *step;
        if !self.announced {
            self.announced = true;
            events.push(StepEvent::Started {
                step,
                at: self.clock,
            });
        }

        self.clock += dt;
        if !group.advance(dt, targets) {
            return events;
        }

        events.push(StepEvent::Finished {
            step,
            at: self.clock,
        });
        self.steps.pop_front();
        match self.current() {
            Some(next) => events.push(StepEvent::Started {
                step: next,
                at: self.clock,
            }),
            None => events.push(StepEvent::Completed),
        }
        events
    }
}

/// Advances every [`Tweening`] and removes it once finished.
pub fn advance_tweens(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut Tweening, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (entity, mut tweening, mut transform) in &mut query {
        if tweening.advance(dt, &mut transform) {
            commands.entity(entity).remove::<Tweening>();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    // ── Ease ────────────────────────────────────────────────────────

    #[test]
    fn every_ease_hits_endpoints() {
        for ease in [
            Ease::Linear,
            Ease::InQuad,
            Ease::OutQuad,
            Ease::OutCubic,
            Ease::InOutSine,
            Ease::OutBack,
        ] {
            assert!(ease.apply(0.0).abs() < 1e-5, "{ease:?} at 0");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-5, "{ease:?} at 1");
        }
    }

    #[test]
    fn out_quad_leads_linear() {
        assert!(Ease::OutQuad.apply(0.5) > 0.5);
        assert!(Ease::InQuad.apply(0.5) < 0.5);
    }

    // ── Tween ───────────────────────────────────────────────────────

    #[test]
    fn move_to_reaches_target_exactly() {
        let mut tf = Transform::from_xyz(0.0, 0.0, 0.0);
        let mut tw = Tween::new(Motion::MoveTo(Vec3::new(1.0, 0.0, 0.0)), 0.5, Ease::OutQuad);
        assert!(!tw.advance(0.25, &mut tf));
        assert!(tf.translation.x > 0.5 && tf.translation.x < 1.0);
        assert!(tw.advance(0.25, &mut tf));
        assert_eq!(tf.translation, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn move_by_captures_start_on_first_advance() {
        let mut tf = Transform::from_xyz(2.0, 1.0, 0.0);
        let mut tw = Tween::new(Motion::MoveBy(Vec3::NEG_Y), 0.2, Ease::Linear);
        tf.translation.x = 5.0;
        tw.advance(0.2, &mut tf);
        assert!(approx(tf.translation, Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn zero_duration_snaps() {
        let mut tf = Transform::default();
        let mut tw = Tween::new(Motion::ScaleTo(Vec3::ZERO), 0.0, Ease::Linear);
        assert!(tw.advance(0.0, &mut tf));
        assert_eq!(tf.scale, Vec3::ZERO);
    }

    #[test]
    fn spin_by_half_turn() {
        let mut tf = Transform::default();
        let mut tw = Tween::new(Motion::SpinBy(PI), 1.0, Ease::Linear);
        tw.advance(1.0, &mut tf);
        let forward = tf.rotation * Vec3::Z;
        assert!(approx(forward, Vec3::NEG_Z));
    }

    #[test]
    fn wait_leaves_transform_alone() {
        let mut tf = Transform::from_xyz(1.0, 2.0, 3.0);
        let mut tw = Tween::wait(0.5);
        assert!(!tw.advance(0.25, &mut tf));
        assert!(tw.advance(0.25, &mut tf));
        assert_eq!(tf.translation, Vec3::new(1.0, 2.0, 3.0));
    }

    // ── Track / Group ───────────────────────────────────────────────

    #[test]
    fn track_chains_in_order() {
        let mut tf = Transform::default();
        let mut track = Track::single(Tween::new(
            Motion::ScaleTo(Vec3::splat(2.0)),
            0.1,
            Ease::Linear,
        ))
        .then(Tween::new(Motion::ScaleTo(Vec3::ONE), 0.1, Ease::Linear));

        assert!(!track.advance(0.1, &mut tf));
        assert_eq!(tf.scale, Vec3::splat(2.0));
        // The second tween starts from the first one's end value.
        assert!(track.advance(0.1, &mut tf));
        assert_eq!(tf.scale, Vec3::ONE);
    }

    #[test]
    fn group_waits_for_longest_track() {
        let mut targets = [Transform::default(), Transform::default()];
        let mut group = Group::new()
            .with(0, Track::single(Tween::wait(0.25)))
            .with(1, Track::single(Tween::wait(0.75)));

        assert!(!group.advance(0.25, &mut targets));
        assert!(!group.advance(0.25, &mut targets));
        assert!(group.advance(0.25, &mut targets));
        assert!(group.is_finished());
    }

    #[test]
    fn group_drops_out_of_range_targets() {
        let mut targets = [Transform::default()];
        let mut group = Group::new().with(4, Track::single(Tween::wait(1.0)));
        assert!(group.advance(0.0, &mut targets));
    }

    #[test]
    fn tweening_reports_destination() {
        let tw = Tweening::join([
            Tween::new(Motion::RotateTo(Quat::IDENTITY), 0.0, Ease::Linear),
            Tween::new(Motion::MoveTo(Vec3::X), 0.1, Ease::OutQuad),
        ]);
        assert_eq!(tw.destination(), Some(Vec3::X));
    }

    // ── Sequence ────────────────────────────────────────────────────

    #[test]
    fn sequence_announces_each_step_after_the_previous_ends() {
        let mut targets = [Transform::default()];
        let mut seq = Sequence::new()
            .then('a', Group::new().with(0, Track::single(Tween::wait(0.5))))
            .then('b', Group::new().with(0, Track::single(Tween::wait(0.25))));

        let first = seq.tick(0.25, &mut targets);
        assert_eq!(first, vec![StepEvent::Started { step: 'a', at: 0.0 }]);
        let second = seq.tick(0.25, &mut targets);
        assert_eq!(
            second,
            vec![
                StepEvent::Finished { step: 'a', at: 0.5 },
                StepEvent::Started { step: 'b', at: 0.5 },
            ]
        );
        assert_eq!(seq.current(), Some('b'));
        let third = seq.tick(0.25, &mut targets);
        assert_eq!(
            third,
            vec![
                StepEvent::Finished { step: 'b', at: 0.75 },
                StepEvent::Completed,
            ]
        );
        assert!(seq.is_finished());
        assert!(seq.tick(0.25, &mut targets).is_empty());
    }

    #[test]
    fn later_step_starts_from_earlier_result() {
        let mut targets = [Transform::default()];
        let mut seq = Sequence::new()
            .then(
                0,
                Group::new().with(0, Track::single(Tween::new(Motion::MoveBy(Vec3::X), 0.25, Ease::Linear))),
            )
            .then(
                1,
                Group::new().with(0, Track::single(Tween::new(Motion::MoveBy(Vec3::X), 0.25, Ease::Linear))),
            );
        for _ in 0..4 {
            seq.tick(0.25, &mut targets);
        }
        assert!(approx(targets[0].translation, Vec3::new(2.0, 0.0, 0.0)));
    }
}
