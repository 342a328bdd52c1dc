use bevy::prelude::*;

use super::{OccupantBlueprint, StationBlueprint, cell_to_world};
use crate::category::{Blocker, BlockerTag, Category};
use crate::config::ConvoyConfig;
use crate::convoy::{
    AttachSegment, ConvoyAssets, ConvoyParts, ConvoySpawn, ConvoyState, Inert, StartExitLine,
    spawn_convoy,
};
use crate::occupant::{Occupant, OccupantPart, OccupantPiece, PassengerStation};
use crate::zone::{SinkZone, ZoneWatch};

// ── Startup ─────────────────────────────────────────────────────────

/// Spawns the overhead camera, a light, and the ground plane.
pub fn spawn_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<ConvoyConfig>,
) {
    let height = cfg.level.camera_height;
    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        Transform::from_xyz(0.0, height, height * 0.6).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let pitch = cfg.movement.grid_pitch;
    commands.spawn((
        Name::new("Ground"),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(40.0 * pitch, 40.0 * pitch))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.12, 0.13, 0.15),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::from_xyz(0.0, -0.3 * pitch, 0.0),
    ));
}

/// Spawns obstacles, sink zones, stations and convoys.
///
/// Runs after startup so the shared [`ConvoyAssets`] exist.
pub fn spawn_level(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    assets: Res<ConvoyAssets>,
    cfg: Res<ConvoyConfig>,
) {
    let pitch = cfg.movement.grid_pitch;
    let level = &cfg.level;

    let obstacle_mesh = meshes.add(Cuboid::new(0.9 * pitch, 0.8 * pitch, 0.9 * pitch));
    let obstacle_mat = materials.add(StandardMaterial {
        base_color: Color::srgb(0.35, 0.35, 0.38),
        perceptual_roughness: 0.8,
        ..default()
    });
    for cell in &level.obstacles {
        commands.spawn((
            Name::new(format!("Obstacle({},{})", cell.0, cell.1)),
            Mesh3d(obstacle_mesh.clone()),
            MeshMaterial3d(obstacle_mat.clone()),
            Transform::from_translation(cell_to_world(*cell, pitch)),
            Blocker {
                tag: BlockerTag::Obstacle,
                radius: 0.45 * pitch,
                layers: Blocker::DEFAULT_LAYER,
            },
        ));
    }

    let zone_mat = materials.add(StandardMaterial {
        base_color: Color::srgba(0.1, 0.9, 0.8, 0.35),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });
    for (i, zone) in level.zones.iter().enumerate() {
        let half = Vec2::new(zone.half_extents.0, zone.half_extents.1) * pitch;
        commands.spawn((
            Name::new(format!("SinkZone({i})")),
            SinkZone { half_extents: half },
            ZoneWatch::default(),
            Mesh3d(meshes.add(Plane3d::default().mesh().size(half.x * 2.0, half.y * 2.0))),
            MeshMaterial3d(zone_mat.clone()),
            Transform::from_translation(cell_to_world(zone.center, pitch) - Vec3::Y * 0.28 * pitch),
        ));
    }

    let piece_meshes = [
        meshes.add(Sphere::new(0.18 * pitch)),
        meshes.add(Cuboid::new(0.3 * pitch, 0.3 * pitch, 0.2 * pitch)),
        meshes.add(Cuboid::new(0.25 * pitch, 0.3 * pitch, 0.15 * pitch)),
    ];
    let slab_mesh = meshes.add(Cuboid::new(0.9 * pitch, 0.1 * pitch, 0.9 * pitch));
    for station in &level.stations {
        spawn_station(
            &mut commands,
            &assets,
            &cfg,
            &slab_mesh,
            &piece_meshes,
            station,
        );
    }

    for convoy in &level.convoys {
        if !convoy.is_contiguous() {
            warn!("{:?} convoy cells are not edge-adjacent", convoy.category);
        }
        let body: Vec<Vec3> = convoy.body.iter().map(|c| cell_to_world(*c, pitch)).collect();
        spawn_convoy(
            &mut commands,
            &assets,
            &cfg,
            &ConvoySpawn {
                category: convoy.category,
                head: convoy.head.map(|c| cell_to_world(c, pitch)),
                body: &body,
                seats: convoy.seats,
                anchors: convoy.anchors,
            },
        );
    }
    info!(
        "level spawned: {} convoys, {} stations, {} zones",
        level.convoys.len(),
        level.stations.len(),
        level.zones.len()
    );
}

/// Spawns a station slab at the boarding spot with its queue lined up
/// behind it.
fn spawn_station(
    commands: &mut Commands,
    assets: &ConvoyAssets,
    cfg: &ConvoyConfig,
    slab_mesh: &Handle<Mesh>,
    piece_meshes: &[Handle<Mesh>; 3],
    blueprint: &StationBlueprint,
) {
    let pitch = cfg.movement.grid_pitch;
    let origin = cell_to_world(blueprint.cell, pitch);
    let queue: Vec<Entity> = blueprint
        .queue
        .iter()
        .enumerate()
        .map(|(k, occupant)| {
            let at = PassengerStation::slot(origin, blueprint.facing, k, pitch);
            spawn_occupant(commands, assets, piece_meshes, pitch, at, occupant)
        })
        .collect();
    let front = blueprint
        .queue
        .first()
        .map_or(Category::Purple, |o| o.category);

    commands.spawn((
        Name::new(format!("Station({},{})", blueprint.cell.0, blueprint.cell.1)),
        PassengerStation::new(origin, blueprint.facing, queue, pitch, &cfg.station),
        Mesh3d(slab_mesh.clone()),
        MeshMaterial3d(assets.material(front)),
        Transform::from_translation(origin - Vec3::Y * 0.22 * pitch),
        Blocker {
            tag: BlockerTag::Obstacle,
            radius: 0.45 * pitch,
            layers: Blocker::DEFAULT_LAYER,
        },
    ));
}

fn spawn_occupant(
    commands: &mut Commands,
    assets: &ConvoyAssets,
    piece_meshes: &[Handle<Mesh>; 3],
    pitch: f32,
    at: Vec3,
    blueprint: &OccupantBlueprint,
) -> Entity {
    let root = commands
        .spawn((
            Name::new(format!("Occupant({:?})", blueprint.category)),
            Occupant {
                category: blueprint.category,
            },
            Transform::from_translation(at),
            Visibility::default(),
            Blocker {
                tag: BlockerTag::Colored(blueprint.category),
                radius: 0.35 * pitch,
                layers: Blocker::DEFAULT_LAYER,
            },
        ))
        .id();
    for part in OccupantPart::ALL {
        if !blueprint.parts.contains(&part) {
            continue;
        }
        let height = match part {
            OccupantPart::Head => 0.75,
            OccupantPart::Body => 0.4,
            OccupantPart::Legs => 0.05,
        };
        let piece = commands
            .spawn((
                Name::new(format!("{part}")),
                OccupantPiece(part),
                Mesh3d(piece_meshes[part.index()].clone()),
                MeshMaterial3d(assets.material(blueprint.category)),
                Transform::from_xyz(0.0, height * pitch, 0.0),
            ))
            .id();
        commands.entity(root).add_child(piece);
    }
    root
}

// ── Update ──────────────────────────────────────────────────────────

/// `N` attaches a segment to every live convoy, `X` starts their exit lines.
#[allow(clippy::type_complexity)]
pub fn demo_keys(
    keys: Res<ButtonInput<KeyCode>>,
    convoys: Query<(Entity, &ConvoyState), (With<ConvoyParts>, Without<Inert>)>,
    mut attach: MessageWriter<AttachSegment>,
    mut exit: MessageWriter<StartExitLine>,
) {
    let live = || convoys.iter().filter(|(_, state)| state.follows_path());

    if keys.just_pressed(KeyCode::KeyN) {
        for (convoy, ..) in live() {
            attach.write(AttachSegment { convoy });
        }
    }
    if keys.just_pressed(KeyCode::KeyX) {
        for (convoy, ..) in live() {
            exit.write(StartExitLine { convoy });
        }
    }
}
