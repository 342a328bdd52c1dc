use bevy::prelude::*;

use super::absorption::{self, AbsorptionSequencer};
use super::entities::{
    Absorbing, BoardOccupant, BoardingRefused, Occupant, OccupantPart, OccupantPiece,
    SeatAnchors, SeatMarker, Seats,
};
use super::station::{Arrival, PassengerStation, QueueShift};
use crate::category::Blocker;
use crate::config::ConvoyConfig;
use crate::convoy::{Convoy, ConvoyAssets, ConvoyState, Inert, Segment};
use crate::math;
use crate::tween::StepEvent;

// ── Stations ────────────────────────────────────────────────────────

/// Checks the cell in front of every idle station and sends its front
/// occupant to a matching convoy parked there.
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn serve_stations(
    mut commands: Commands,
    time: Res<Time>,
    cfg: Res<ConvoyConfig>,
    assets: Res<ConvoyAssets>,
    mut stations: Query<
        (
            Entity,
            &mut PassengerStation,
            &Transform,
            &mut MeshMaterial3d<StandardMaterial>,
        ),
        Without<QueueShift>,
    >,
    occupants: Query<&Occupant, Without<Absorbing>>,
    segments: Query<(&Transform, &ChildOf), With<Segment>>,
    convoys: Query<(&Convoy, &ConvoyState, &Seats), (With<SeatAnchors>, Without<Inert>)>,
    mut board: MessageWriter<BoardOccupant>,
) {
    let now = time.elapsed_secs();
    let pitch = cfg.movement.grid_pitch;
    // Seats promised this frame, not yet consumed by `board_occupants`.
    let mut claimed: Vec<Entity> = Vec::new();

    for (station_entity, mut station, tf, mut material) in &mut stations {
        let Some(front) = station.front() else {
            continue;
        };
        if !station.check_due(now) {
            continue;
        }
        let Ok(occupant) = occupants.get(front) else {
            continue;
        };

        let target = station.boarding_point(tf.translation, pitch);
        let Some(hit) = segments
            .iter()
            .filter(|(seg, _)| math::planar_distance(seg.translation, target) < pitch * 0.5)
            .find_map(|(_, child_of)| {
                let convoy = child_of.parent();
                let (c, state, seats) = convoys.get(convoy).ok()?;
                let taken = claimed.iter().filter(|e| **e == convoy).count() as u32;
                Some(Arrival {
                    convoy,
                    category: c.category,
                    seats: seats.remaining.saturating_sub(taken),
                    boarding: state.follows_path(),
                })
            })
        else {
            continue;
        };
        if let Err(reason) = hit.admit(occupant.category) {
            debug!("station {station_entity:?} holds {front:?}: {reason}");
            continue;
        }

        station.board_front(now);
        claimed.push(hit.convoy);
        board.write(BoardOccupant {
            convoy: hit.convoy,
            occupant: front,
        });
        info!("station {station_entity:?} sends {front:?} to convoy {:?}", hit.convoy);

        if let Some(next) = station.front().and_then(|e| occupants.get(e).ok()) {
            material.set_if_neq(MeshMaterial3d(assets.material(next.category)));
        }
        commands.entity(station_entity).insert(QueueShift {
            sequence: station.shift_sequence(&cfg.station),
            occupants: station.queue().collect(),
        });
    }
}

/// Steps waiting occupants up one place after a boarding, then frees the
/// station for its next check.
pub fn shift_queues(
    mut commands: Commands,
    time: Res<Time>,
    mut stations: Query<(Entity, &mut QueueShift)>,
    mut occupants: Query<&mut Transform, With<Occupant>>,
) {
    let dt = time.delta_secs();
    for (station, mut shift) in &mut stations {
        let mut current: Vec<Transform> = shift
            .occupants
            .iter()
            .map(|e| occupants.get(*e).map_or(Transform::default(), |tf| *tf))
            .collect();
        for event in shift.sequence.tick(dt, &mut current) {
            if let StepEvent::Started { step, .. } = event {
                debug!("station {station:?} moves occupant {step} up");
            }
        }
        for (entity, animated) in shift.occupants.iter().zip(&current) {
            if let Ok(mut tf) = occupants.get_mut(*entity) {
                tf.set_if_neq(*animated);
            }
        }
        if shift.sequence.is_finished() {
            commands.entity(station).remove::<QueueShift>();
        }
    }
}

// ── Boarding ────────────────────────────────────────────────────────

/// Accepts or refuses boarding requests, pops the seat taken, and starts
/// absorptions.
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn board_occupants(
    mut commands: Commands,
    cfg: Res<ConvoyConfig>,
    mut requests: MessageReader<BoardOccupant>,
    mut convoys: Query<(&Convoy, &ConvoyState, &mut Seats, &SeatAnchors), Without<Inert>>,
    occupants: Query<(&Occupant, &GlobalTransform, &Children), Without<Absorbing>>,
    pieces: Query<(&OccupantPiece, &Transform)>,
    anchors: Query<&GlobalTransform, Without<Occupant>>,
    mut seat_markers: Query<(Entity, &SeatMarker, &mut Visibility)>,
) {
    for req in requests.read() {
        let Ok((convoy, state, mut seats, seat_anchors)) = convoys.get_mut(req.convoy) else {
            warn!("boarding refused: {:?} is not a seated convoy", req.convoy);
            continue;
        };
        let Ok((occupant, occupant_tf, children)) = occupants.get(req.occupant) else {
            continue;
        };
        let accepted = if state.follows_path() {
            seats.accept(convoy.category, occupant.category)
        } else {
            Err(BoardingRefused::Departed)
        };
        if let Err(reason) = accepted {
            warn!("boarding of {:?} into {:?} refused: {reason}", req.occupant, req.convoy);
            continue;
        }

        let seat = seat_markers
            .iter()
            .filter(|(_, m, vis)| m.convoy == req.convoy && **vis == Visibility::Hidden)
            .min_by_key(|(_, m, _)| m.order)
            .map(|(e, ..)| e);
        if let Some(seat) = seat
            && let Ok((_, _, mut vis)) = seat_markers.get_mut(seat)
        {
            *vis = Visibility::Inherited;
            commands
                .entity(seat)
                .insert(absorption::seat_reveal(&cfg.absorption));
        }

        let mut found: [Option<(Entity, Transform)>; 3] = [None; 3];
        for child in children.iter() {
            if let Ok((piece, tf)) = pieces.get(child) {
                let slot = &mut found[piece.0.index()];
                if slot.is_none() {
                    *slot = Some((child, *tf));
                }
            }
        }

        // Anchor targets are expressed in the occupant's local space, the
        // same space its pieces move in.
        let to_local = occupant_tf.affine().inverse();
        let mut targets = [Vec3::ZERO; 3];
        for part in OccupantPart::ALL {
            if let Ok(anchor) = anchors.get(seat_anchors.0[part.index()]) {
                targets[part.index()] = to_local.transform_point3(anchor.translation());
            }
        }

        let plan = AbsorptionSequencer::plan(
            &found.map(|f| f.map(|(_, tf)| tf)),
            &targets,
            &cfg.absorption,
        );
        match (plan, found) {
            (Some(sequencer), [Some((head, _)), Some((body, _)), Some((legs, _))]) => {
                info!(
                    "{:?} boarding {:?}, {} seats left",
                    req.occupant, req.convoy, seats.remaining
                );
                commands
                    .entity(req.occupant)
                    .insert(Absorbing {
                        sequencer,
                        pieces: [head, body, legs],
                    })
                    .remove::<Blocker>();
            }
            _ => {
                warn!(
                    "{:?} is missing a sub-part; removing it without absorption",
                    req.occupant
                );
                commands.entity(req.occupant).despawn();
            }
        }
    }
}

/// Advances absorptions and removes occupants whose sequence completed.
pub fn run_absorptions(
    mut commands: Commands,
    time: Res<Time>,
    mut occupants: Query<(Entity, &mut Absorbing)>,
    mut pieces: Query<&mut Transform, With<OccupantPiece>>,
) {
    let dt = time.delta_secs();
    for (occupant, mut absorbing) in &mut occupants {
        let mut current: Vec<Transform> = absorbing
            .pieces
            .iter()
            .map(|e| pieces.get(*e).map_or(Transform::default(), |tf| *tf))
            .collect();
        let events = absorbing.sequencer.tick(dt, &mut current);
        for (entity, animated) in absorbing.pieces.iter().zip(&current) {
            if let Ok(mut tf) = pieces.get_mut(*entity) {
                tf.set_if_neq(*animated);
            }
        }
        for event in events {
            match event {
                StepEvent::Started { step, .. } => debug!("{occupant:?} absorbing {step}"),
                StepEvent::Finished { .. } => {}
                StepEvent::Completed => {
                    info!("{occupant:?} seated");
                    commands.entity(occupant).despawn();
                }
            }
        }
    }
}
