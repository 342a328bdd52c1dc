//! Level layout: camera, ground, obstacles, sink zones, passenger stations
//! and convoys, spawned from a [`LevelBlueprint`] at startup.
//!
//! Also wires two demo keys that stand in for the game's outer surfaces:
//! `N` attaches a segment, `X` sends every live convoy down its exit line.

mod systems;

use bevy::prelude::*;
use serde::Deserialize;

use crate::GameState;
use crate::category::Category;
use crate::convoy::{ConvoySet, MoveDirection};
use crate::occupant::OccupantPart;

/// Grid cell `(x, z)` in pitches.
pub type Cell = (i32, i32);

/// World position of `cell` on the ground plane.
pub fn cell_to_world(cell: Cell, pitch: f32) -> Vec3 {
    Vec3::new(cell.0 as f32 * pitch, 0.0, cell.1 as f32 * pitch)
}

/// Everything spawned at startup.
#[derive(Clone, Debug, Reflect, Deserialize)]
#[serde(default)]
pub struct LevelBlueprint {
    /// Convoys, each with its head and body cells.
    pub convoys: Vec<ConvoyBlueprint>,
    /// Cells holding a static obstacle.
    pub obstacles: Vec<Cell>,
    /// Sink zones.
    pub zones: Vec<ZoneBlueprint>,
    /// Stations with their waiting occupants.
    pub stations: Vec<StationBlueprint>,
    /// Height of the overhead camera.
    pub camera_height: f32,
}

/// One convoy of a [`LevelBlueprint`].
#[derive(Clone, Debug, Reflect, Deserialize)]
#[serde(default)]
pub struct ConvoyBlueprint {
    /// Colour.
    pub category: Category,
    /// Head cell; a convoy without one is kept inert.
    pub head: Option<Cell>,
    /// Body cells, nearest the head first.
    pub body: Vec<Cell>,
    /// Free seats.
    pub seats: u32,
    /// Whether the head carries seat anchors.
    pub anchors: bool,
}

impl ConvoyBlueprint {
    /// `true` when head and body form a chain of edge-adjacent cells.
    pub fn is_contiguous(&self) -> bool {
        let Some(head) = self.head else {
            return true;
        };
        std::iter::once(head)
            .chain(self.body.iter().copied())
            .collect::<Vec<_>>()
            .windows(2)
            .all(|w| (w[0].0 - w[1].0).abs() + (w[0].1 - w[1].1).abs() == 1)
    }
}

/// One sink zone of a [`LevelBlueprint`].
#[derive(Clone, Debug, Reflect, Deserialize)]
pub struct ZoneBlueprint {
    /// Centre cell.
    pub center: Cell,
    /// Half size along x and z, in pitches.
    pub half_extents: (f32, f32),
}

/// One passenger station of a [`LevelBlueprint`].
#[derive(Clone, Debug, Reflect, Deserialize)]
pub struct StationBlueprint {
    /// Cell of the boarding spot.
    pub cell: Cell,
    /// Side the convoy pulls up on.
    pub facing: MoveDirection,
    /// Waiting occupants, front first.
    pub queue: Vec<OccupantBlueprint>,
}

/// One waiting occupant of a [`StationBlueprint`].
#[derive(Clone, Debug, Reflect, Deserialize)]
pub struct OccupantBlueprint {
    /// Colour.
    pub category: Category,
    /// Sub-parts it is built from.
    #[serde(default = "all_parts")]
    pub parts: Vec<OccupantPart>,
}

fn all_parts() -> Vec<OccupantPart> {
    OccupantPart::ALL.to_vec()
}

impl Default for LevelBlueprint {
    fn default() -> Self {
        let occupant = |category| OccupantBlueprint {
            category,
            parts: all_parts(),
        };
        Self {
            convoys: vec![
                ConvoyBlueprint {
                    category: Category::Red,
                    head: Some((0, 0)),
                    body: vec![(-1, 0), (-2, 0), (-3, 0)],
                    seats: 2,
                    anchors: true,
                },
                ConvoyBlueprint {
                    category: Category::Blue,
                    head: Some((0, 3)),
                    body: vec![(-1, 3), (-2, 3)],
                    seats: 1,
                    anchors: true,
                },
            ],
            obstacles: vec![(3, 1), (3, 2), (-2, -3), (-1, -3)],
            zones: vec![ZoneBlueprint {
                center: (6, 0),
                half_extents: (0.6, 1.6),
            }],
            stations: vec![
                StationBlueprint {
                    cell: (-3, -2),
                    facing: MoveDirection::PosZ,
                    queue: vec![
                        occupant(Category::Red),
                        OccupantBlueprint {
                            category: Category::Red,
                            parts: vec![OccupantPart::Head, OccupantPart::Body],
                        },
                        occupant(Category::Blue),
                    ],
                },
                StationBlueprint {
                    cell: (-4, 5),
                    facing: MoveDirection::NegZ,
                    queue: vec![occupant(Category::Blue), occupant(Category::Blue)],
                },
            ],
            camera_height: 14.0,
        }
    }
}

impl Default for ConvoyBlueprint {
    fn default() -> Self {
        Self {
            category: Category::Purple,
            head: Some((0, 0)),
            body: Vec::new(),
            seats: 0,
            anchors: true,
        }
    }
}

/// Spawns the level and handles the demo keys.
pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, systems::spawn_scene)
            .add_systems(PostStartup, systems::spawn_level)
            .add_systems(
                Update,
                systems::demo_keys
                    .before(ConvoySet::Input)
                    .run_if(in_state(GameState::Running)),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_contiguous() {
        for convoy in &LevelBlueprint::default().convoys {
            assert!(convoy.is_contiguous(), "{convoy:?}");
        }
    }

    #[test]
    fn gap_in_body_is_detected() {
        let convoy = ConvoyBlueprint {
            head: Some((0, 0)),
            body: vec![(-1, 0), (-3, 0)],
            ..default()
        };
        assert!(!convoy.is_contiguous());
        let diagonal = ConvoyBlueprint {
            head: Some((0, 0)),
            body: vec![(-1, -1)],
            ..default()
        };
        assert!(!diagonal.is_contiguous());
    }

    #[test]
    fn occupant_parts_default_to_all() {
        let occupant: OccupantBlueprint = ron::de::from_str("(category: Green)").unwrap();
        assert_eq!(occupant.parts, OccupantPart::ALL.to_vec());
    }

    #[test]
    fn station_reads_from_ron() {
        let station: StationBlueprint = ron::de::from_str(
            "(cell: (1, 2), facing: NegX, queue: [(category: Red), (category: Red, parts: [Head])])",
        )
        .unwrap();
        assert_eq!(station.facing, MoveDirection::NegX);
        assert_eq!(station.queue.len(), 2);
        assert_eq!(station.queue[1].parts, vec![OccupantPart::Head]);
    }

    #[test]
    fn default_stations_face_open_cells() {
        let level = LevelBlueprint::default();
        for station in &level.stations {
            let (dx, dz) = match station.facing {
                MoveDirection::PosX => (1, 0),
                MoveDirection::NegX => (-1, 0),
                MoveDirection::PosZ => (0, 1),
                MoveDirection::NegZ => (0, -1),
            };
            let front = (station.cell.0 + dx, station.cell.1 + dz);
            assert!(!level.obstacles.contains(&front), "{station:?}");
        }
    }

    #[test]
    fn cells_scale_by_pitch() {
        assert_eq!(cell_to_world((2, -1), 1.5), Vec3::new(3.0, 0.0, -1.5));
    }
}
