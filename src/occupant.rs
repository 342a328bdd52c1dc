//! Occupants: passengers that board a convoy of their category.
//!
//! Occupants wait in line at a [`PassengerStation`]. When a convoy of the
//! front occupant's colour with a free seat pulls up in front of it, the
//! occupant boards: a seat pops up on the convoy, and the occupant's head,
//! body, and legs are pulled into the seat anchors one after another before
//! it is removed. The rest of the line then steps up one by one.

mod absorption;
mod entities;
mod station;
mod systems;

pub use absorption::{AbsorptionEvent, AbsorptionSequencer, seat_reveal};
pub use entities::{
    Absorbing, BoardOccupant, BoardingRefused, Occupant, OccupantPart, OccupantPiece, SeatAnchor,
    SeatAnchors, SeatMarker, Seats,
};
pub use station::{Arrival, PassengerStation, QueueShift};

use bevy::prelude::*;

use crate::GameState;
use crate::convoy::ConvoySet;

/// Boarding requests and absorption sequences.
pub struct OccupantPlugin;

impl Plugin for OccupantPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Occupant>()
            .register_type::<OccupantPiece>()
            .register_type::<SeatAnchor>()
            .register_type::<SeatAnchors>()
            .register_type::<Seats>()
            .register_type::<SeatMarker>()
            .register_type::<PassengerStation>()
            .add_message::<BoardOccupant>()
            .add_systems(
                Update,
                (
                    systems::serve_stations,
                    systems::board_occupants,
                    systems::run_absorptions,
                    systems::shift_queues,
                )
                    .chain()
                    .in_set(ConvoySet::Sink)
                    .run_if(in_state(GameState::Running)),
            );
    }
}
