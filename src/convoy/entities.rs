use bevy::prelude::*;

use super::sink::SinkSequencer;
use crate::category::Category;
use crate::occupant::{OccupantPart, SeatAnchor};

/// Root of one convoy. Stays at the origin; its [`Segment`] children carry
/// world positions directly.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct Convoy {
    /// Colour of the convoy and of the occupants it accepts.
    pub category: Category,
}

/// Chain position of a segment: `0` is the head, `1..` the body.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub struct Segment {
    /// Index in the chain.
    pub index: usize,
}

/// Straight body mesh, shown when the segment is not on a corner.
#[derive(Component, Reflect)]
pub struct StraightMesh;

/// Pivoted corner mesh of one variant, shown when the segment sits on a
/// corner of that variant.
#[derive(Component, Reflect)]
pub struct CornerMesh(pub super::CornerKind);

/// Resolved chain of an initialized convoy.
#[derive(Component, Clone, Debug, Reflect)]
pub struct ConvoyParts {
    /// Head segment.
    pub head: Entity,
    /// Body segments, nearest the head first.
    pub body: Vec<Entity>,
}

impl ConvoyParts {
    /// Builds the chain from `(entity, index)` pairs in any order.
    pub fn assemble(segments: &[(Entity, usize)]) -> Result<Self, ConvoyError> {
        let mut sorted = segments.to_vec();
        sorted.sort_by_key(|(_, index)| *index);
        match sorted.split_first() {
            Some(((head, 0), body)) => Ok(Self {
                head: *head,
                body: body.iter().map(|(e, _)| *e).collect(),
            }),
            _ => Err(ConvoyError::MissingHead),
        }
    }

    /// Head followed by the body.
    pub fn chain(&self) -> impl Iterator<Item = Entity> + '_ {
        std::iter::once(self.head).chain(self.body.iter().copied())
    }

    /// Number of segments including the head.
    pub fn len(&self) -> usize {
        self.body.len() + 1
    }

    /// Always `false`: a convoy has at least its head.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Resolves the three seat anchors among `(entity, anchor)` pairs.
pub fn resolve_anchors(found: &[(Entity, SeatAnchor)]) -> Result<[Entity; 3], ConvoyError> {
    let mut out = [None; 3];
    for (entity, anchor) in found {
        let slot = &mut out[anchor.0.index()];
        if slot.is_none() {
            *slot = Some(*entity);
        }
    }
    let mut resolved = [Entity::PLACEHOLDER; 3];
    for part in OccupantPart::ALL {
        resolved[part.index()] = out[part.index()].ok_or(ConvoyError::MissingAnchor(part))?;
    }
    Ok(resolved)
}

/// Fatal problems found while initializing a convoy.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvoyError {
    /// No segment with index 0.
    #[error("convoy has no head segment")]
    MissingHead,
    /// Seats are configured but an anchor for this sub-part is missing.
    #[error("convoy has seats but no {0} seat anchor")]
    MissingAnchor(OccupantPart),
}

/// A convoy whose initialization failed. Never processed again.
#[derive(Component, Reflect)]
pub struct Inert;

/// Sink sequence in progress, with the chain it animates.
#[derive(Component, Debug)]
pub struct SinkRun {
    pub(super) sequencer: SinkSequencer,
    pub(super) chain: Vec<Entity>,
}

/// Ground point under the cursor this frame, if any.
#[derive(Resource, Default, Debug, Reflect)]
pub struct PointerGround(pub Option<Vec3>);

/// Repeating timer for corner pruning.
#[derive(Resource)]
pub struct CornerPruneTimer(pub Timer);

/// Raised exactly once per convoy when its sink sequence finishes.
#[derive(Message, Clone, Copy, Debug)]
pub struct ConvoySunk {
    /// Convoy root (already scheduled for despawn).
    pub convoy: Entity,
}

/// Adds one body segment behind the tail.
#[derive(Message, Clone, Copy, Debug)]
pub struct AttachSegment {
    /// Convoy root.
    pub convoy: Entity,
}

/// Sends a convoy to the exit line without the dwell timer.
#[derive(Message, Clone, Copy, Debug)]
pub struct StartExitLine {
    /// Convoy root.
    pub convoy: Entity,
}

/// Meshes and per-category materials shared by every convoy.
#[derive(Resource)]
pub struct ConvoyAssets {
    /// Head block.
    pub head: Handle<Mesh>,
    /// Straight body block.
    pub straight: Handle<Mesh>,
    /// Corner block, pivoted about the cell centre.
    pub corner: Handle<Mesh>,
    /// Small marker for seat anchors.
    pub anchor: Handle<Mesh>,
    /// Seat shown once an occupant takes it.
    pub seat: Handle<Mesh>,
    /// One material per category, in [`Category::ALL`] order.
    pub materials: Vec<Handle<StandardMaterial>>,
    /// Slightly darker tint for corner pieces of the opposite variant.
    pub opposite_materials: Vec<Handle<StandardMaterial>>,
}

impl ConvoyAssets {
    /// Material for `category`.
    pub fn material(&self, category: Category) -> Handle<StandardMaterial> {
        let i = Category::ALL.iter().position(|c| *c == category).unwrap_or(0);
        self.materials[i].clone()
    }

    /// Material for the opposite corner variant of `category`.
    pub fn opposite_material(&self, category: Category) -> Handle<StandardMaterial> {
        let i = Category::ALL.iter().position(|c| *c == category).unwrap_or(0);
        self.opposite_materials[i].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn assemble_orders_by_index() {
        let e = ids(3);
        let parts = ConvoyParts::assemble(&[(e[2], 2), (e[0], 0), (e[1], 1)]).unwrap();
        assert_eq!(parts.head, e[0]);
        assert_eq!(parts.body, vec![e[1], e[2]]);
        assert_eq!(parts.chain().collect::<Vec<_>>(), e);
    }

    #[test]
    fn assemble_without_head_fails() {
        let e = ids(2);
        assert_eq!(
            ConvoyParts::assemble(&[(e[0], 1), (e[1], 2)]).unwrap_err(),
            ConvoyError::MissingHead
        );
        assert_eq!(ConvoyParts::assemble(&[]).unwrap_err(), ConvoyError::MissingHead);
    }

    #[test]
    fn missing_anchor_names_the_part() {
        let e = ids(2);
        let err = resolve_anchors(&[
            (e[0], SeatAnchor(OccupantPart::Head)),
            (e[1], SeatAnchor(OccupantPart::Body)),
        ])
        .unwrap_err();
        assert_eq!(err, ConvoyError::MissingAnchor(OccupantPart::Legs));
        assert_eq!(err.to_string(), "convoy has seats but no legs seat anchor");
    }

    #[test]
    fn anchors_resolve_in_part_order() {
        let e = ids(3);
        let got = resolve_anchors(&[
            (e[2], SeatAnchor(OccupantPart::Legs)),
            (e[0], SeatAnchor(OccupantPart::Head)),
            (e[1], SeatAnchor(OccupantPart::Body)),
        ])
        .unwrap();
        assert_eq!(got, [e[0], e[1], e[2]]);
    }
}
