use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use super::corners::CornerLedger;
use super::entities::{
    AttachSegment, Convoy, ConvoyAssets, ConvoyError, ConvoyParts, ConvoySunk, CornerMesh,
    CornerPruneTimer, Inert, PointerGround, Segment, SinkRun, StartExitLine, StraightMesh,
    resolve_anchors,
};
use super::follower::{self, Deformation};
use super::grid_planner::{GridMotionPlanner, MoveDirection};
use super::history::PathHistory;
use super::safety::{BlockerSnapshot, SafetyChecker};
use super::sink::SinkSequencer;
use super::startup_systems::spawn_body_segment;
use super::state::{self, ConvoyState, DwellTimer, ExitLine};
use crate::category::Blocker;
use crate::config::ConvoyConfig;
use crate::math;
use crate::occupant::{SeatAnchor, SeatAnchors, Seats};
use crate::tween::{Ease, Motion, StepEvent, Tween, Tweening};
use crate::zone::ZoneContact;

// ── Initialization ──────────────────────────────────────────────────

/// Resolves the chain of every freshly spawned convoy and attaches its
/// per-convoy state. A convoy that fails is marked [`Inert`] and reported once.
#[allow(clippy::type_complexity)]
pub fn init_convoys(
    mut commands: Commands,
    cfg: Res<ConvoyConfig>,
    convoys: Query<(Entity, &Children, &Seats), (With<Convoy>, Without<ConvoyParts>, Without<Inert>)>,
    mut segments: Query<(&Segment, &mut Transform)>,
    segment_children: Query<&Children, With<Segment>>,
    anchors: Query<&SeatAnchor>,
) {
    let pitch = cfg.movement.grid_pitch;
    for (convoy, kids, seats) in &convoys {
        let found: Vec<(Entity, usize)> = kids
            .iter()
            .filter_map(|e| segments.get(e).ok().map(|(s, _)| (e, s.index)))
            .collect();

        let resolved = ConvoyParts::assemble(&found).and_then(|parts| {
            if seats.remaining == 0 {
                return Ok((parts, None));
            }
            let found_anchors: Vec<(Entity, SeatAnchor)> = segment_children
                .get(parts.head)
                .map(|c| {
                    c.iter()
                        .filter_map(|e| anchors.get(e).ok().map(|a| (e, *a)))
                        .collect()
                })
                .unwrap_or_default();
            resolve_anchors(&found_anchors).map(|a| (parts, Some(a)))
        });
        let (parts, seat_anchors) = match resolved {
            Ok(ok) => ok,
            Err(err) => {
                report_inert(&mut commands, convoy, err);
                continue;
            }
        };

        let mut positions = Vec::with_capacity(parts.len());
        for entity in parts.chain() {
            if let Ok((_, mut tf)) = segments.get_mut(entity) {
                tf.translation = math::snap_to_grid(tf.translation, pitch);
                positions.push(tf.translation);
            }
        }
        let Some((&head, body)) = positions.split_first() else {
            report_inert(&mut commands, convoy, ConvoyError::MissingHead);
            continue;
        };
        let heading = body
            .first()
            .and_then(|b| MoveDirection::from_rounded(head - *b))
            .unwrap_or(MoveDirection::PosX);

        // Initial yaws: the head faces the heading, each body segment the
        // segment ahead of it.
        for (i, entity) in parts.chain().enumerate() {
            let Ok((_, mut tf)) = segments.get_mut(entity) else {
                continue;
            };
            let facing = match i {
                0 => heading.to_vec3(),
                _ => positions
                    .get(i - 1)
                    .map_or(Vec3::ZERO, |ahead| *ahead - tf.translation),
            };
            let yaw = if facing.length_squared() > 0.0 {
                math::yaw_of(facing)
            } else {
                math::yaw_of_rotation(tf.rotation)
            };
            tf.rotation = Quat::from_rotation_y(math::round_yaw_to_quarter(yaw));
        }

        info!(
            "convoy {convoy:?} ready: {} body segments, heading {heading:?}",
            parts.body.len()
        );
        let mut entity = commands.entity(convoy);
        entity.insert((
            PathHistory::seeded(head, body.iter().copied(), pitch),
            CornerLedger::default(),
            GridMotionPlanner::new(heading, head),
            DwellTimer::default(),
            ConvoyState::Idle,
            ZoneContact::default(),
            parts,
        ));
        if let Some(a) = seat_anchors {
            entity.insert(SeatAnchors(a));
        }
    }
}

fn report_inert(commands: &mut Commands, convoy: Entity, err: ConvoyError) {
    error!("convoy {convoy:?} left inert: {err}");
    commands.entity(convoy).insert(Inert);
}

// ── Input ───────────────────────────────────────────────────────────

/// Projects the cursor onto the ground plane.
pub fn update_pointer(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    mut pointer: ResMut<PointerGround>,
) {
    pointer.0 = windows
        .single()
        .ok()
        .and_then(Window::cursor_position)
        .and_then(|cursor| {
            let (camera, cam_tf) = cameras.single().ok()?;
            let ray = camera.viewport_to_world(cam_tf, cursor).ok()?;
            let t = ray.intersect_plane(Vec3::ZERO, InfinitePlane3d::new(Vec3::Y))?;
            Some(ray.get_point(t))
        });
}

/// Pointer-down on a head starts dragging that convoy; pointer-up releases.
pub fn grab_heads(
    mouse: Res<ButtonInput<MouseButton>>,
    pointer: Res<PointerGround>,
    cfg: Res<ConvoyConfig>,
    mut convoys: Query<(Entity, &ConvoyParts, &mut ConvoyState), Without<Inert>>,
    segments: Query<&Transform, With<Segment>>,
) {
    if mouse.just_released(MouseButton::Left) {
        for (convoy, _, mut state) in &mut convoys {
            if state.release() {
                info!("convoy {convoy:?} released");
            }
        }
    }
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    let Some(point) = pointer.0 else {
        return;
    };

    // Only the head is grabbable, within half a cell.
    let reach = cfg.movement.grid_pitch * 0.5;
    let hit = convoys
        .iter()
        .filter_map(|(convoy, parts, _)| {
            let head = segments.get(parts.head).ok()?;
            let d = math::planar_distance(head.translation, point);
            (d < reach).then_some((convoy, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1));

    if let Some((convoy, _)) = hit
        && let Ok((_, _, mut state)) = convoys.get_mut(convoy)
        && state.press_on_head()
    {
        info!("convoy {convoy:?} dragging");
    }
}

// ── Movement ────────────────────────────────────────────────────────

/// Steps each dragged head one cell toward the pointer.
#[allow(clippy::type_complexity)]
pub fn drive_heads(
    mut commands: Commands,
    time: Res<Time>,
    pointer: Res<PointerGround>,
    cfg: Res<ConvoyConfig>,
    mut convoys: Query<
        (
            Entity,
            &ConvoyState,
            &ConvoyParts,
            &mut GridMotionPlanner,
            &mut PathHistory,
            &mut CornerLedger,
        ),
        Without<Inert>,
    >,
    segments: Query<&Transform, With<Segment>>,
    blockers: Query<(Entity, &Transform, &Blocker)>,
) {
    let snapshot: Vec<(Entity, Vec3, Blocker)> = blockers
        .iter()
        .map(|(e, tf, b)| (e, tf.translation, *b))
        .collect();
    let scene = BlockerSnapshot {
        blockers: &snapshot,
    };
    let m = &cfg.movement;
    let now = time.elapsed_secs();

    for (convoy, state, parts, mut planner, mut history, mut ledger) in &mut convoys {
        let Ok(head) = segments.get(parts.head) else {
            continue;
        };
        let own_parts: Vec<Entity> = parts.chain().collect();
        let own_body: Vec<Vec3> = parts
            .body
            .iter()
            .filter_map(|e| segments.get(*e).ok())
            .map(|tf| tf.translation)
            .collect();
        let checker = SafetyChecker {
            scene: &scene,
            own_parts: &own_parts,
            own_body: &own_body,
            blocking: &cfg.blocking,
            cfg: m,
        };

        let Some(step) = state::drive_head(
            *state,
            &mut planner,
            now,
            head.translation,
            pointer.0,
            m,
            |cell| checker.is_safe(cell),
        ) else {
            continue;
        };

        if let Some(corner) = step.corner
            && ledger.record(corner)
        {
            debug!(
                "convoy {convoy:?} corner at {} ({:?} -> {:?})",
                corner.position, corner.incoming, corner.outgoing
            );
        }
        history.record(step.target, parts.body.len(), m.grid_pitch);
        debug!("convoy {convoy:?} head -> {}", step.target);

        let facing = Quat::from_rotation_y(math::yaw_of(step.direction.to_vec3()));
        commands.entity(parts.head).insert(Tweening::join([
            Tween::new(Motion::MoveTo(step.target), m.move_duration, Ease::OutQuad),
            Tween::new(Motion::RotateTo(facing), 0.0, Ease::Linear),
        ]));
    }
}

/// Glides each body segment to its history slot and eases its orientation.
#[allow(clippy::type_complexity)]
pub fn follow_segments(
    mut commands: Commands,
    time: Res<Time>,
    cfg: Res<ConvoyConfig>,
    convoys: Query<
        (
            &ConvoyState,
            &ConvoyParts,
            &PathHistory,
            &CornerLedger,
            &GridMotionPlanner,
        ),
        Without<Inert>,
    >,
    mut segments: Query<(&mut Transform, Option<&Tweening>), With<Segment>>,
) {
    let m = &cfg.movement;
    let dt = time.delta_secs();
    for (state, parts, history, ledger, planner) in &convoys {
        if !state.follows_path() {
            continue;
        }
        let placements =
            follower::follow_targets(history, parts.body.len(), planner.committed(), m.grid_pitch);
        for (entity, place) in parts.body.iter().zip(&placements) {
            let Ok((mut tf, tweening)) = segments.get_mut(*entity) else {
                continue;
            };
            let bound_for = tweening
                .and_then(Tweening::destination)
                .unwrap_or(tf.translation);
            if bound_for.distance(place.position) > 1e-4 {
                commands.entity(*entity).insert(Tweening::join([Tween::new(
                    Motion::MoveTo(place.position),
                    m.move_duration,
                    Ease::OutQuad,
                )]));
            }

            let target =
                follower::target_rotation(tf.translation, place.forward, tf.rotation, ledger, m);
            tf.rotation = follower::smooth_rotation(tf.rotation, target, m.rotation_smoothing, dt);
        }
    }
}

/// Eases exiting convoys toward their exit line.
pub fn steer_exit_lines(
    time: Res<Time>,
    cfg: Res<ConvoyConfig>,
    convoys: Query<(&ConvoyState, &ConvoyParts, &ExitLine)>,
    mut segments: Query<&mut Transform, With<Segment>>,
) {
    let dt = time.delta_secs();
    for (state, parts, line) in &convoys {
        if *state != ConvoyState::ExitingLine {
            continue;
        }
        for (i, (entity, target)) in parts.chain().zip(&line.targets).enumerate() {
            let rate = if i == 0 {
                cfg.exit.head_rate
            } else {
                cfg.exit.body_rate
            };
            if let Ok(mut tf) = segments.get_mut(entity) {
                tf.translation = state::approach(tf.translation, *target, rate, dt);
            }
        }
    }
}

// ── Commands ────────────────────────────────────────────────────────

/// Adds a body segment behind the tail of each requested convoy.
#[allow(clippy::type_complexity)]
pub fn attach_segments(
    mut commands: Commands,
    cfg: Res<ConvoyConfig>,
    assets: Res<ConvoyAssets>,
    mut requests: MessageReader<AttachSegment>,
    mut convoys: Query<
        (
            &Convoy,
            &ConvoyState,
            &mut ConvoyParts,
            &PathHistory,
            &GridMotionPlanner,
        ),
        Without<Inert>,
    >,
) {
    for req in requests.read() {
        let Ok((convoy, state, mut parts, history, planner)) = convoys.get_mut(req.convoy) else {
            continue;
        };
        if !state.follows_path() {
            warn!("convoy {:?} cannot take a segment while {state:?}", req.convoy);
            continue;
        }
        let index = parts.body.len() + 1;
        let Some(pos) = history.slot(index, planner.committed().to_vec3(), cfg.movement.grid_pitch)
        else {
            continue;
        };
        let segment = spawn_body_segment(&mut commands, &assets, &cfg, convoy.category, index, pos);
        commands.entity(req.convoy).add_child(segment);
        parts.body.push(segment);
        info!("convoy {:?} gained segment {index} at {pos}", req.convoy);
    }
}

/// Switches requested convoys to the exit line.
pub fn start_exit_lines(
    mut commands: Commands,
    cfg: Res<ConvoyConfig>,
    mut requests: MessageReader<StartExitLine>,
    mut convoys: Query<(&mut ConvoyState, &ConvoyParts), Without<Inert>>,
    segments: Query<&Transform, With<Segment>>,
) {
    for req in requests.read() {
        let Ok((mut state, parts)) = convoys.get_mut(req.convoy) else {
            continue;
        };
        if !state.start_exit_line() {
            debug!("convoy {:?} ignored exit command while {:?}", req.convoy, *state);
            continue;
        }
        let positions: Vec<Vec3> = parts
            .chain()
            .map(|e| segments.get(e).map_or(Vec3::ZERO, |tf| tf.translation))
            .collect();
        commands
            .entity(req.convoy)
            .insert(ExitLine::below(positions, cfg.exit.depth));
        for e in parts.chain() {
            commands.entity(e).remove::<Tweening>();
        }
        info!("convoy {:?} heading for the exit line", req.convoy);
    }
}

// ── Sinking ─────────────────────────────────────────────────────────

/// Accumulates zone dwell time and starts the sink sequence once it fires.
#[allow(clippy::type_complexity)]
pub fn tick_dwell(
    mut commands: Commands,
    time: Res<Time>,
    cfg: Res<ConvoyConfig>,
    mut convoys: Query<
        (
            Entity,
            &mut ConvoyState,
            &mut DwellTimer,
            &ZoneContact,
            &ConvoyParts,
        ),
        Without<Inert>,
    >,
    segments: Query<&Transform, With<Segment>>,
) {
    let dt = time.delta_secs();
    for (convoy, mut state, mut dwell, contact, parts) in &mut convoys {
        if *state == ConvoyState::Sinking {
            continue;
        }
        if dwell.tick(contact.0, dt, cfg.sink.trigger_delay) && state.trigger_sink() {
            info!("convoy {convoy:?} ready to sink");
        }
        if *state != ConvoyState::ReadyToSink {
            continue;
        }

        let chain: Vec<Entity> = parts.chain().collect();
        let transforms: Vec<Transform> = chain
            .iter()
            .map(|e| segments.get(*e).copied().unwrap_or_default())
            .collect();
        state.begin_sinking();
        for e in &chain {
            commands.entity(*e).remove::<Tweening>();
        }
        commands.entity(convoy).insert(SinkRun {
            sequencer: SinkSequencer::new(&transforms, &cfg.sink),
            chain,
        });
        info!("convoy {convoy:?} sinking");
    }
}

/// Advances sink sequences; raises [`ConvoySunk`] and despawns on completion.
pub fn run_sinks(
    mut commands: Commands,
    time: Res<Time>,
    mut runs: Query<(Entity, &mut SinkRun)>,
    mut segments: Query<&mut Transform, With<Segment>>,
    mut sunk: MessageWriter<ConvoySunk>,
) {
    let dt = time.delta_secs();
    for (convoy, mut run) in &mut runs {
        let mut chain: Vec<Transform> = run
            .chain
            .iter()
            .map(|e| segments.get(*e).map_or(Transform::default(), |tf| *tf))
            .collect();
        let events = run.sequencer.tick(dt, &mut chain);
        for (entity, animated) in run.chain.iter().zip(&chain) {
            if let Ok(mut tf) = segments.get_mut(*entity) {
                tf.set_if_neq(*animated);
            }
        }

        for event in events {
            match event {
                StepEvent::Started { step, at } => {
                    debug!("convoy {convoy:?} sink phase {step:?} at {at:.2}s");
                }
                StepEvent::Finished { .. } => {}
                StepEvent::Completed => {
                    info!("convoy {convoy:?} sunk");
                    sunk.write(ConvoySunk { convoy });
                    commands.entity(convoy).despawn();
                }
            }
        }
    }
}

// ── Visuals ─────────────────────────────────────────────────────────

/// Re-derives every body segment's mesh state from its neighbours.
pub fn update_deformation(
    cfg: Res<ConvoyConfig>,
    convoys: Query<&ConvoyParts, Without<Inert>>,
    segments: Query<&Transform, With<Segment>>,
    mut deformations: Query<&mut Deformation>,
) {
    for parts in &convoys {
        let positions: Vec<Vec3> = parts
            .chain()
            .filter_map(|e| segments.get(e).ok())
            .map(|tf| tf.translation)
            .collect();
        if positions.len() != parts.len() {
            continue;
        }
        let derived = Deformation::derive_chain(&positions, &cfg.corner_yaws);
        for (entity, d) in parts.body.iter().zip(derived) {
            if let Ok(mut current) = deformations.get_mut(*entity) {
                current.set_if_neq(d);
            }
        }
    }
}

/// Swaps straight and corner meshes when a segment's deformation changes.
pub fn apply_corner_visuals(
    segments: Query<(&Deformation, &Children), Changed<Deformation>>,
    mut straight: Query<&mut Visibility, (With<StraightMesh>, Without<CornerMesh>)>,
    mut corners: Query<(&CornerMesh, &mut Visibility, &mut Transform), Without<StraightMesh>>,
) {
    for (deformation, children) in &segments {
        let shown_kind = deformation.kind.filter(|_| deformation.is_corner);
        for child in children.iter() {
            if let Ok(mut vis) = straight.get_mut(child) {
                vis.set_if_neq(if shown_kind.is_none() {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                });
            }
            if let Ok((corner, mut vis, mut tf)) = corners.get_mut(child) {
                if shown_kind == Some(corner.0) {
                    vis.set_if_neq(Visibility::Inherited);
                    tf.rotation = Quat::from_rotation_y(deformation.yaw_degrees.to_radians());
                } else {
                    vis.set_if_neq(Visibility::Hidden);
                }
            }
        }
    }
}

/// Periodically drops corners no segment is near any more.
pub fn prune_corners(
    time: Res<Time>,
    cfg: Res<ConvoyConfig>,
    mut timer: ResMut<CornerPruneTimer>,
    mut convoys: Query<(Entity, &ConvoyParts, &mut CornerLedger)>,
    segments: Query<&Transform, With<Segment>>,
) {
    if !timer.0.tick(time.delta()).just_finished() {
        return;
    }
    let radius = cfg.movement.grid_pitch * cfg.movement.corner_prune_cells;
    for (convoy, parts, mut ledger) in &mut convoys {
        if ledger.is_empty() {
            continue;
        }
        let positions: Vec<Vec3> = parts
            .chain()
            .filter_map(|e| segments.get(e).ok())
            .map(|tf| tf.translation)
            .collect();
        let removed = ledger.prune(&positions, radius);
        if removed > 0 {
            debug!("convoy {convoy:?} pruned {removed} corners");
        }
    }
}

// ── Debug ───────────────────────────────────────────────────────────

/// Path history, planner target, and corner markers.
pub fn draw_debug(
    mut gizmos: Gizmos,
    cfg: Res<ConvoyConfig>,
    pointer: Res<PointerGround>,
    convoys: Query<(&PathHistory, &CornerLedger, &GridMotionPlanner, &ConvoyParts)>,
    segments: Query<&Transform, With<Segment>>,
) {
    let pitch = cfg.movement.grid_pitch;
    let lift = Vec3::Y * 0.6 * pitch;
    for (history, ledger, planner, parts) in &convoys {
        gizmos.linestrip(history.iter().map(|c| c + lift), Color::srgb(1.0, 1.0, 0.2));
        if let Ok(head) = segments.get(parts.head) {
            gizmos.line(
                head.translation + lift,
                planner.target() + lift,
                Color::srgb(0.2, 1.0, 1.0),
            );
        }
        for corner in ledger.entries() {
            let p = corner.position + lift;
            gizmos.sphere(Isometry3d::from_translation(p), 0.15 * pitch, Color::srgb(1.0, 0.3, 0.1));
            gizmos.arrow(
                p - corner.incoming.to_vec3() * 0.4 * pitch,
                p,
                Color::srgb(1.0, 0.5, 0.0),
            );
            gizmos.arrow(
                p,
                p + corner.outgoing.to_vec3() * 0.4 * pitch,
                Color::srgb(0.2, 1.0, 0.2),
            );
        }
    }
    if let Some(p) = pointer.0 {
        gizmos.circle(
            Isometry3d::new(p, Quat::from_rotation_x(FRAC_PI_2)),
            0.2 * pitch,
            Color::WHITE,
        );
    }
}
