use bevy::app::AppExit;
use bevy::prelude::*;
#[cfg(feature = "native")]
use bevy::remote::{RemotePlugin, http::RemoteHttpPlugin};
use bevy_inspector_egui::quick::WorldInspectorPlugin;

use convoy_grid::GameState;
use convoy_grid::config::ConvoyConfig;
use convoy_grid::convoy::ConvoyPlugin;
use convoy_grid::level::LevelPlugin;
use convoy_grid::occupant::OccupantPlugin;
use convoy_grid::zone::ZonePlugin;

#[cfg(feature = "native")]
#[derive(clap::Parser, Debug)]
#[command(version, about = "Drag grid-snapped convoys into sink zones")]
struct Cli {
    /// RON file overriding the default tunables and level.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

/// Loads the config named on the command line, if any.
///
/// Logging is not up yet, so problems go to stderr and the defaults are used.
fn load_config() -> ConvoyConfig {
    #[cfg(feature = "native")]
    {
        use clap::Parser;
        if let Some(path) = Cli::parse().config {
            match ConvoyConfig::load(&path) {
                Ok(cfg) => return cfg,
                Err(e) => eprintln!("{}: {e}; using defaults", path.display()),
            }
        }
    }
    ConvoyConfig::default()
}

fn main() {
    let cfg = load_config();
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Convoy Grid".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<GameState>()
    .init_state::<GameState>();

    #[cfg(feature = "native")]
    app.add_plugins(RemotePlugin::default())
        .add_plugins(RemoteHttpPlugin::default());

    app.add_plugins(bevy_egui::EguiPlugin::default())
        .add_plugins(ConvoyPlugin(cfg))
        .add_plugins(ZonePlugin)
        .add_plugins(OccupantPlugin)
        .add_plugins(LevelPlugin)
        .add_systems(Update, exit_on_esc)
        .add_systems(Update, toggle_inspector)
        .add_plugins(WorldInspectorPlugin::new().run_if(in_state(GameState::Debugging)));

    app.run();
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next: ResMut<NextState<GameState>>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        next.set(match state.get() {
            GameState::Running => GameState::Debugging,
            GameState::Debugging => GameState::Running,
        });
    }
}

fn exit_on_esc(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}
