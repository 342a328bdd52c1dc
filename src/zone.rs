//! Sink zones: trigger volumes that convoys dwell in before sinking.
//!
//! Contact is derived from the head's position each frame and delivered as
//! [`ZoneEntered`] / [`ZoneExited`] messages. Zones track subscriptions and
//! mark themselves filled when a subscribed convoy completes its sink.

mod entities;
mod systems;

pub use entities::{SinkZone, ZoneContact, ZoneEntered, ZoneExited, ZoneWatch};

use bevy::prelude::*;

use crate::GameState;

/// Registers zone contact detection and subscriptions.
pub struct ZonePlugin;

impl Plugin for ZonePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SinkZone>()
            .register_type::<ZoneWatch>()
            .register_type::<ZoneContact>()
            .add_message::<ZoneEntered>()
            .add_message::<ZoneExited>()
            .add_systems(
                Update,
                (systems::detect_zone_contacts, systems::update_subscriptions)
                    .chain()
                    .in_set(crate::convoy::ConvoySet::Zones)
                    .run_if(in_state(GameState::Running)),
            );
    }
}
