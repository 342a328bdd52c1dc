use bevy::prelude::*;
use serde::Deserialize;

use super::absorption::AbsorptionSequencer;
use crate::category::Category;

/// Named sub-part of an occupant; each has a matching seat anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect, Deserialize)]
pub enum OccupantPart {
    /// Absorbed first.
    Head,
    /// Absorbed second.
    Body,
    /// Absorbed last.
    Legs,
}

impl OccupantPart {
    /// Absorption order.
    pub const ALL: [OccupantPart; 3] = [OccupantPart::Head, OccupantPart::Body, OccupantPart::Legs];

    /// Position in [`Self::ALL`].
    pub fn index(self) -> usize {
        match self {
            OccupantPart::Head => 0,
            OccupantPart::Body => 1,
            OccupantPart::Legs => 2,
        }
    }
}

impl std::fmt::Display for OccupantPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OccupantPart::Head => "head",
            OccupantPart::Body => "body",
            OccupantPart::Legs => "legs",
        };
        f.write_str(name)
    }
}

/// A passenger waiting to board a convoy of its category.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct Occupant {
    /// Which convoys may take this occupant.
    pub category: Category,
}

/// Marks one sub-part child of an [`Occupant`].
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct OccupantPiece(pub OccupantPart);

/// Marks the point on a convoy's head where a sub-part of a boarding
/// occupant ends up.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct SeatAnchor(pub OccupantPart);

/// Asks a convoy to take an occupant on board.
#[derive(Message, Clone, Copy, Debug)]
pub struct BoardOccupant {
    /// Convoy root.
    pub convoy: Entity,
    /// Occupant root.
    pub occupant: Entity,
}

/// Absorption in progress; the occupant is despawned once it completes.
#[derive(Component, Debug)]
pub struct Absorbing {
    pub(super) sequencer: AbsorptionSequencer,
    /// Piece entities in [`OccupantPart::ALL`] order.
    pub(super) pieces: [Entity; 3],
}

/// Why a boarding request was turned down.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardingRefused {
    /// The occupant's category differs from the convoy's.
    #[error("occupant is {occupant:?} but convoy carries {convoy:?}")]
    WrongCategory {
        /// The convoy's category.
        convoy: Category,
        /// The occupant's category.
        occupant: Category,
    },
    /// No seat left.
    #[error("no free seat")]
    Full,
    /// The convoy is sinking or leaving.
    #[error("convoy is no longer boarding")]
    Departed,
}

/// Free seats of a convoy.
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
pub struct Seats {
    /// Seats still free.
    pub remaining: u32,
}

impl Seats {
    /// Takes a seat for an occupant of `occupant` category.
    pub fn accept(&mut self, convoy: Category, occupant: Category) -> Result<(), BoardingRefused> {
        if convoy != occupant {
            return Err(BoardingRefused::WrongCategory { convoy, occupant });
        }
        if self.remaining == 0 {
            return Err(BoardingRefused::Full);
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// One seat of a convoy, shown shrunk and hidden until an occupant takes it.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct SeatMarker {
    /// Convoy root the seat belongs to.
    pub convoy: Entity,
    /// Seats are taken in ascending order.
    pub order: u32,
}

/// Resolved seat anchors of an initialized convoy, in [`OccupantPart::ALL`] order.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct SeatAnchors(pub [Entity; 3]);
