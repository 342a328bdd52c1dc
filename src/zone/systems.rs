use bevy::prelude::*;

use super::entities::{SinkZone, ZoneContact, ZoneEntered, ZoneExited, ZoneWatch, contact_change};
use crate::convoy::{ConvoyParts, ConvoySunk, Inert, Segment};

/// Derives enter/exit messages from the head's overlap with every zone.
pub fn detect_zone_contacts(
    zones: Query<(Entity, &SinkZone, &Transform)>,
    mut convoys: Query<(Entity, &ConvoyParts, &mut ZoneContact), Without<Inert>>,
    segments: Query<&Transform, With<Segment>>,
    mut entered: MessageWriter<ZoneEntered>,
    mut exited: MessageWriter<ZoneExited>,
) {
    for (convoy, parts, mut contact) in &mut convoys {
        let Ok(head) = segments.get(parts.head) else {
            continue;
        };
        let now = zones
            .iter()
            .find(|(_, zone, tf)| zone.contains(tf.translation, head.translation))
            .map(|(e, _, _)| e);

        let (left, arrived) = contact_change(contact.0, now);
        if let Some(zone) = left {
            exited.write(ZoneExited { zone, convoy });
        }
        if let Some(zone) = arrived {
            entered.write(ZoneEntered { zone, convoy });
        }
        contact.0 = now;
    }
}

/// Keeps zone subscriptions in step with contacts and completion signals.
pub fn update_subscriptions(
    mut entered: MessageReader<ZoneEntered>,
    mut exited: MessageReader<ZoneExited>,
    mut sunk: MessageReader<ConvoySunk>,
    mut zones: Query<(Entity, &mut ZoneWatch, Option<&Name>)>,
) {
    for ev in exited.read() {
        if let Ok((_, mut watch, _)) = zones.get_mut(ev.zone) {
            watch.unsubscribe(ev.convoy);
        }
    }
    for ev in entered.read() {
        if let Ok((_, mut watch, _)) = zones.get_mut(ev.zone)
            && watch.subscribe(ev.convoy)
        {
            debug!("zone {:?} subscribed to convoy {:?}", ev.zone, ev.convoy);
        }
    }
    for ev in sunk.read() {
        for (zone, mut watch, name) in &mut zones {
            if watch.on_sunk(ev.convoy) {
                let label = name.map_or_else(|| format!("{zone:?}"), |n| n.to_string());
                info!("zone {label} filled by convoy {:?}", ev.convoy);
            }
        }
    }
}
