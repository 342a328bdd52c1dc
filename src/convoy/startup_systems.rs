use bevy::prelude::*;

use super::entities::{Convoy, ConvoyAssets, CornerMesh, Segment, StraightMesh};
use super::follower::{CornerKind, Deformation};
use crate::category::{Blocker, BlockerTag, Category};
use crate::config::ConvoyConfig;
use crate::math;
use crate::occupant::{OccupantPart, SeatAnchor, SeatMarker, Seats};

// ── Startup ─────────────────────────────────────────────────────────

/// Reports the active tunables once logging is up.
pub fn log_config(cfg: Res<ConvoyConfig>) {
    info!(
        "convoy config: pitch {}, move interval {}s, dwell {}s, blocking {:?}",
        cfg.movement.grid_pitch, cfg.movement.move_interval, cfg.sink.trigger_delay, cfg.blocking
    );
}

/// Creates the shared convoy meshes and one material per category.
pub fn setup_convoy_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<ConvoyConfig>,
) {
    let g = cfg.movement.grid_pitch;
    let mut tinted = |category: Category, dim: f32| {
        let c = category.color().to_linear();
        let base = LinearRgba::rgb(c.red * dim, c.green * dim, c.blue * dim);
        materials.add(StandardMaterial {
            base_color: base.into(),
            emissive: LinearRgba::rgb(base.red * 0.2, base.green * 0.2, base.blue * 0.2),
            perceptual_roughness: 0.6,
            ..default()
        })
    };
    let materials_by_cat: Vec<_> = Category::ALL.iter().map(|c| tinted(*c, 1.0)).collect();
    let opposite: Vec<_> = Category::ALL.iter().map(|c| tinted(*c, 0.7)).collect();

    commands.insert_resource(ConvoyAssets {
        head: meshes.add(Cuboid::new(0.9 * g, 0.7 * g, 0.9 * g)),
        straight: meshes.add(Cuboid::new(0.8 * g, 0.5 * g, 0.9 * g)),
        corner: meshes.add(Cuboid::new(0.8 * g, 0.5 * g, 0.8 * g)),
        anchor: meshes.add(Sphere::new(0.06 * g)),
        seat: meshes.add(Cuboid::new(0.18 * g, 0.12 * g, 0.18 * g)),
        materials: materials_by_cat,
        opposite_materials: opposite,
    });
}

// ── Spawn helpers ───────────────────────────────────────────────────

/// What to build for one convoy.
pub struct ConvoySpawn<'a> {
    /// Convoy colour.
    pub category: Category,
    /// Head cell; `None` spawns a headless (and therefore inert) convoy.
    pub head: Option<Vec3>,
    /// Body cells, nearest the head first.
    pub body: &'a [Vec3],
    /// Free seats.
    pub seats: u32,
    /// Whether to give the head its three seat anchors.
    pub anchors: bool,
}

/// Spawns a convoy root with its segments as children. Returns the root.
pub fn spawn_convoy(
    commands: &mut Commands,
    assets: &ConvoyAssets,
    cfg: &ConvoyConfig,
    layout: &ConvoySpawn,
) -> Entity {
    let root = commands
        .spawn((
            Name::new(format!("Convoy({:?})", layout.category)),
            Convoy {
                category: layout.category,
            },
            Seats {
                remaining: layout.seats,
            },
            Transform::default(),
            Visibility::default(),
        ))
        .id();

    if let Some(head) = layout.head {
        let head_entity = spawn_head(commands, assets, cfg, layout.category, head);
        if layout.anchors {
            spawn_seat_anchors(commands, assets, cfg, head_entity);
        }
        spawn_seat_markers(commands, assets, cfg, layout, root, head_entity);
        commands.entity(root).add_child(head_entity);
    }
    for (i, pos) in layout.body.iter().enumerate() {
        let seg = spawn_body_segment(commands, assets, cfg, layout.category, i + 1, *pos);
        commands.entity(root).add_child(seg);
    }
    root
}

fn segment_blocker(category: Category, cfg: &ConvoyConfig) -> Blocker {
    Blocker {
        tag: BlockerTag::Colored(category),
        radius: cfg.movement.grid_pitch * 0.45,
        layers: Blocker::DEFAULT_LAYER,
    }
}

fn spawn_head(
    commands: &mut Commands,
    assets: &ConvoyAssets,
    cfg: &ConvoyConfig,
    category: Category,
    pos: Vec3,
) -> Entity {
    let pitch = cfg.movement.grid_pitch;
    commands
        .spawn((
            Name::new("Head"),
            Segment { index: 0 },
            Mesh3d(assets.head.clone()),
            MeshMaterial3d(assets.material(category)),
            Transform::from_translation(math::snap_to_grid(pos, pitch)),
            segment_blocker(category, cfg),
        ))
        .id()
}

fn spawn_seat_anchors(
    commands: &mut Commands,
    assets: &ConvoyAssets,
    cfg: &ConvoyConfig,
    head: Entity,
) {
    let pitch = cfg.movement.grid_pitch;
    for part in OccupantPart::ALL {
        let height = 0.2 + 0.15 * (2 - part.index()) as f32;
        let anchor = commands
            .spawn((
                Name::new(format!("SeatAnchor({part})")),
                SeatAnchor(part),
                Mesh3d(assets.anchor.clone()),
                MeshMaterial3d(assets.material(Category::Orange)),
                Transform::from_xyz(0.0, height * pitch, 0.0),
            ))
            .id();
        commands.entity(head).add_child(anchor);
    }
}

/// Seats sit in a row on top of the head, hidden and shrunk until taken.
fn spawn_seat_markers(
    commands: &mut Commands,
    assets: &ConvoyAssets,
    cfg: &ConvoyConfig,
    layout: &ConvoySpawn,
    convoy: Entity,
    head: Entity,
) {
    let pitch = cfg.movement.grid_pitch;
    let centre = layout.seats.saturating_sub(1) as f32 * 0.5;
    for order in 0..layout.seats {
        let x = (order as f32 - centre) * 0.25 * pitch;
        let seat = commands
            .spawn((
                Name::new(format!("Seat({order})")),
                SeatMarker { convoy, order },
                Mesh3d(assets.seat.clone()),
                MeshMaterial3d(assets.material(layout.category)),
                Transform::from_xyz(x, 0.42 * pitch, 0.0)
                    .with_scale(Vec3::splat(cfg.absorption.seat_hidden_scale)),
                Visibility::Hidden,
            ))
            .id();
        commands.entity(head).add_child(seat);
    }
}

/// Spawns one body segment with its straight and corner meshes.
pub fn spawn_body_segment(
    commands: &mut Commands,
    assets: &ConvoyAssets,
    cfg: &ConvoyConfig,
    category: Category,
    index: usize,
    pos: Vec3,
) -> Entity {
    let pitch = cfg.movement.grid_pitch;
    let segment = commands
        .spawn((
            Name::new(format!("Segment({index})")),
            Segment { index },
            Deformation::default(),
            Transform::from_translation(math::snap_to_grid(pos, pitch)),
            Visibility::default(),
            segment_blocker(category, cfg),
        ))
        .id();

    let straight = commands
        .spawn((
            StraightMesh,
            Mesh3d(assets.straight.clone()),
            MeshMaterial3d(assets.material(category)),
            Transform::default(),
        ))
        .id();
    let quarter = commands
        .spawn((
            CornerMesh(CornerKind::Quarter),
            Mesh3d(assets.corner.clone()),
            MeshMaterial3d(assets.material(category)),
            Transform::default(),
            Visibility::Hidden,
        ))
        .id();
    let opposite = commands
        .spawn((
            CornerMesh(CornerKind::Opposite),
            Mesh3d(assets.corner.clone()),
            MeshMaterial3d(assets.opposite_material(category)),
            Transform::default(),
            Visibility::Hidden,
        ))
        .id();
    commands
        .entity(segment)
        .add_children(&[straight, quarter, opposite]);
    segment
}
