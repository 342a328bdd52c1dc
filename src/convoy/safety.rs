use bevy::prelude::*;

use crate::category::{Blocker, BlockerTag, Category};
use crate::config::MovementSettings;

/// Something a sphere-overlap query reported near a candidate cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Overlap {
    /// Entity that was hit.
    pub entity: Entity,
    /// Its blocker tag.
    pub tag: BlockerTag,
}

/// Sphere-overlap service the safety check reads the scene through.
pub trait SpatialQuery {
    /// Everything whose footprint intersects the sphere, filtered by `layers`.
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: u32) -> Vec<Overlap>;
}

/// Overlap query over plain `(entity, position, blocker)` triples.
pub struct BlockerSnapshot<'a> {
    /// Every blocker in the scene.
    pub blockers: &'a [(Entity, Vec3, Blocker)],
}

impl SpatialQuery for BlockerSnapshot<'_> {
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: u32) -> Vec<Overlap> {
        self.blockers
            .iter()
            .filter(|(_, pos, b)| b.layers & layers != 0 && pos.distance(center) < radius + b.radius)
            .map(|(entity, _, b)| Overlap {
                entity: *entity,
                tag: b.tag,
            })
            .collect()
    }
}

/// Side-effect-free veto for a candidate head cell.
pub struct SafetyChecker<'a, Q: SpatialQuery> {
    /// Scene access.
    pub scene: &'a Q,
    /// Entities of the convoy being moved (head and body); never block themselves.
    pub own_parts: &'a [Entity],
    /// Current positions of that convoy's body segments.
    pub own_body: &'a [Vec3],
    /// Colour categories that veto a move.
    pub blocking: &'a [Category],
    /// Pitch, overlap radius and layer mask.
    pub cfg: &'a MovementSettings,
}

impl<Q: SpatialQuery> SafetyChecker<'_, Q> {
    /// `true` when the head may step into `candidate`.
    pub fn is_safe(&self, candidate: Vec3) -> bool {
        let pitch = self.cfg.grid_pitch;
        if self
            .own_body
            .iter()
            .any(|p| p.distance(candidate) < pitch * 0.5)
        {
            return false;
        }

        self.scene
            .overlap_sphere(
                candidate,
                pitch * self.cfg.overlap_radius_cells,
                self.cfg.query_layers,
            )
            .iter()
            .filter(|o| !self.own_parts.contains(&o.entity))
            .all(|o| match o.tag {
                BlockerTag::Obstacle => false,
                BlockerTag::Colored(c) => !self.blocking.contains(&c),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocker(tag: BlockerTag) -> Blocker {
        Blocker {
            tag,
            radius: 0.45,
            layers: Blocker::DEFAULT_LAYER,
        }
    }

    fn entities(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    struct Fixture {
        blockers: Vec<(Entity, Vec3, Blocker)>,
        own: Vec<Entity>,
        other: Entity,
        body: Vec<Vec3>,
        cfg: MovementSettings,
    }

    impl Fixture {
        fn new() -> Self {
            let ids = entities(3);
            Self {
                blockers: Vec::new(),
                own: ids[..2].to_vec(),
                other: ids[2],
                body: vec![Vec3::NEG_X],
                cfg: MovementSettings::default(),
            }
        }

        fn safe(&self, candidate: Vec3) -> bool {
            let snapshot = BlockerSnapshot {
                blockers: &self.blockers,
            };
            SafetyChecker {
                scene: &snapshot,
                own_parts: &self.own,
                own_body: &self.body,
                blocking: &Category::ALL,
                cfg: &self.cfg,
            }
            .is_safe(candidate)
        }
    }

    #[test]
    fn empty_cell_is_safe() {
        assert!(Fixture::new().safe(Vec3::X));
    }

    #[test]
    fn own_body_cell_is_always_rejected() {
        let f = Fixture::new();
        assert!(!f.safe(Vec3::NEG_X));
        assert!(!f.safe(Vec3::new(-1.2, 0.0, 0.3)));
    }

    #[test]
    fn obstacle_vetoes() {
        let mut f = Fixture::new();
        f.blockers.push((
            f.other,
            Vec3::X,
            blocker(BlockerTag::Obstacle),
        ));
        assert!(!f.safe(Vec3::X));
        assert!(f.safe(Vec3::Z));
    }

    #[test]
    fn other_convoy_segment_vetoes() {
        let mut f = Fixture::new();
        f.blockers.push((
            f.other,
            Vec3::Z,
            blocker(BlockerTag::Colored(Category::Red)),
        ));
        assert!(!f.safe(Vec3::Z));
    }

    #[test]
    fn own_segments_are_ignored_by_overlap() {
        let mut f = Fixture::new();
        f.body.clear();
        f.blockers.push((f.own[1], Vec3::X, blocker(BlockerTag::Colored(Category::Blue))));
        assert!(f.safe(Vec3::X));
    }

    #[test]
    fn non_blocking_category_passes() {
        let mut f = Fixture::new();
        f.blockers.push((
            f.other,
            Vec3::X,
            blocker(BlockerTag::Colored(Category::Green)),
        ));
        let snapshot = BlockerSnapshot {
            blockers: &f.blockers,
        };
        let checker = SafetyChecker {
            scene: &snapshot,
            own_parts: &f.own,
            own_body: &f.body,
            blocking: &[Category::Red],
            cfg: &f.cfg,
        };
        assert!(checker.is_safe(Vec3::X));
    }

    #[test]
    fn layer_mask_filters_blockers() {
        let mut f = Fixture::new();
        let mut b = blocker(BlockerTag::Obstacle);
        b.layers = 0b10;
        f.blockers.push((f.other, Vec3::X, b));
        assert!(f.safe(Vec3::X));
    }

    #[test]
    fn adjacent_cell_blocker_does_not_reach() {
        let mut f = Fixture::new();
        f.blockers.push((
            f.other,
            Vec3::new(2.0, 0.0, 0.0),
            blocker(BlockerTag::Obstacle),
        ));
        assert!(f.safe(Vec3::X));
    }
}
