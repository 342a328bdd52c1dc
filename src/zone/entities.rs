use bevy::prelude::*;

/// Trigger volume that sinks a convoy whose head dwells in it long enough.
///
/// An axis-aligned box footprint on the ground, centred on the entity.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct SinkZone {
    /// Half size along x and z.
    pub half_extents: Vec2,
}

impl SinkZone {
    /// `true` when `point` lies inside the footprint centred at `center`.
    pub fn contains(&self, center: Vec3, point: Vec3) -> bool {
        (point.x - center.x).abs() <= self.half_extents.x
            && (point.z - center.z).abs() <= self.half_extents.y
    }
}

/// Which convoys a zone is listening to, and whether one has sunk in it.
///
/// A convoy is subscribed on first contact and unsubscribed when contact
/// ends or when its completion signal arrives.
#[derive(Component, Clone, Debug, Default, Reflect)]
pub struct ZoneWatch {
    subscribed: Vec<Entity>,
    filled: bool,
}

impl ZoneWatch {
    /// Starts listening to `convoy`. Returns `false` if already subscribed.
    pub fn subscribe(&mut self, convoy: Entity) -> bool {
        if self.subscribed.contains(&convoy) {
            return false;
        }
        self.subscribed.push(convoy);
        true
    }

    /// Stops listening to `convoy`. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, convoy: Entity) -> bool {
        let before = self.subscribed.len();
        self.subscribed.retain(|c| *c != convoy);
        before != self.subscribed.len()
    }

    /// Handles a convoy's completion signal: only a subscribed convoy fills
    /// the zone, and the subscription is released either way.
    pub fn on_sunk(&mut self, convoy: Entity) -> bool {
        if !self.unsubscribe(convoy) {
            return false;
        }
        self.filled = true;
        true
    }

    /// `true` once a subscribed convoy has completed its sink sequence here.
    pub fn filled(&self) -> bool {
        self.filled
    }

    /// Convoys currently listened to.
    pub fn subscriptions(&self) -> &[Entity] {
        &self.subscribed
    }
}

/// Zone the convoy's head is currently inside, if any.
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
pub struct ZoneContact(pub Option<Entity>);

/// A convoy's head entered a zone.
#[derive(Message, Clone, Copy, Debug)]
pub struct ZoneEntered {
    /// Zone entity.
    pub zone: Entity,
    /// Convoy root.
    pub convoy: Entity,
}

/// A convoy's head left a zone.
#[derive(Message, Clone, Copy, Debug)]
pub struct ZoneExited {
    /// Zone entity.
    pub zone: Entity,
    /// Convoy root.
    pub convoy: Entity,
}

/// Contact changes between two frames: `(exited, entered)`.
pub fn contact_change(
    before: Option<Entity>,
    now: Option<Entity>,
) -> (Option<Entity>, Option<Entity>) {
    if before == now {
        return (None, None);
    }
    (before, now)
}
