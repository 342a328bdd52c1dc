//! Tunables for convoy movement, sinking, absorption, and the level layout.
//!
//! Loaded from a RON file (see [`ConvoyConfig::load`]); every field has a
//! default so a file only needs to name what it overrides.

use std::path::Path;

use bevy::prelude::*;
use serde::Deserialize;

use crate::category::Category;
use crate::level::LevelBlueprint;

/// Top-level configuration resource.
#[derive(Resource, Clone, Debug, Reflect, Deserialize)]
#[serde(default)]
pub struct ConvoyConfig {
    /// Grid stepping, following and safety checks.
    pub movement: MovementSettings,
    /// Dwell trigger and the sink sequence.
    pub sink: SinkSettings,
    /// Occupant absorption into a seat.
    pub absorption: AbsorptionSettings,
    /// Passenger station timing and queue steps.
    pub station: StationSettings,
    /// Yaw of the pivoted corner mesh for each turn.
    pub corner_yaws: CornerYaws,
    /// Exit-line steering.
    pub exit: ExitSettings,
    /// Categories whose blockers veto a head move.
    pub blocking: Vec<Category>,
    /// What to spawn at startup.
    pub level: LevelBlueprint,
}

/// Grid stepping, following and safety checks.
#[derive(Clone, Debug, Reflect, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Spacing between adjacent admissible positions.
    pub grid_pitch: f32,
    /// Minimum seconds between two accepted head steps.
    pub move_interval: f32,
    /// Seconds a segment takes to glide into its new cell.
    pub move_duration: f32,
    /// Pointer dead-zone radius around the head's cell.
    pub follow_threshold: f32,
    /// A step shorter than this fraction of a pitch is rejected.
    pub min_step_fraction: f32,
    /// Roll applied to a segment sitting on a recorded corner (degrees).
    pub corner_tilt_degrees: f32,
    /// Slerp rate (per second) toward a segment's target orientation.
    pub rotation_smoothing: f32,
    /// Seconds between corner ledger prunes.
    pub corner_prune_interval: f32,
    /// A corner survives while any segment is within this many pitches.
    pub corner_prune_cells: f32,
    /// Radius of the obstacle overlap test, in pitches.
    pub overlap_radius_cells: f32,
    /// Layer mask used by the obstacle overlap test.
    pub query_layers: u32,
}

/// Dwell trigger and the sink sequence.
#[derive(Clone, Debug, Reflect, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    /// Seconds the sink zone must stay occupied before sinking starts.
    pub trigger_delay: f32,
    /// Head shrink + descend + half turn.
    pub head_sink_duration: f32,
    /// Head vanish (scale to zero while descending further).
    pub head_disappear_duration: f32,
    /// Each body segment's move into the vacated slot.
    pub body_move_duration: f32,
    /// Each half of the body scale flourish.
    pub body_scale_duration: f32,
    /// Pause between the last advance and the collective vanish.
    pub body_wait_duration: f32,
    /// Body shrink + descend.
    pub body_sink_duration: f32,
    /// Body vanish.
    pub body_disappear_duration: f32,
    /// Depth of the first descend.
    pub sink_distance: f32,
    /// Extra depth while vanishing.
    pub disappear_distance: f32,
    /// Peak scale of the flourish.
    pub scale_up_amount: f32,
    /// Scale reached by the shrink phases.
    pub scale_down_amount: f32,
}

/// Occupant absorption into a seat.
#[derive(Clone, Debug, Reflect, Deserialize)]
#[serde(default)]
pub struct AbsorptionSettings {
    /// Seconds for a sub-part to shrink.
    pub scale_duration: f32,
    /// Seconds for a sub-part to reach its anchor.
    pub sink_duration: f32,
    /// Uniform scale each sub-part shrinks to.
    pub part_scale: f32,
    /// Scale of a seat marker before it is taken.
    pub seat_hidden_scale: f32,
    /// Scale a seat marker pops to once taken.
    pub seat_reveal_scale: f32,
    /// Seconds of the seat pop.
    pub seat_reveal_duration: f32,
}

/// Passenger station timing and queue steps.
#[derive(Clone, Debug, Reflect, Deserialize)]
#[serde(default)]
pub struct StationSettings {
    /// Seconds between two checks for a convoy in front of a station.
    pub check_interval: f32,
    /// Seconds after a boarding before the station checks again.
    pub cooldown: f32,
    /// Distance of the boarding cell in front of the station, in pitches.
    pub reach_cells: f32,
    /// Seconds each waiting occupant takes to step up one place.
    pub shift_duration: f32,
}

/// Corner mesh yaw (degrees) per `(from, to)` direction pair.
///
/// `from` runs from the previous segment to this one, `to` from this one to
/// the next. Directions: right = +X, left = -X, forward = +Z, back = -Z.
#[derive(Clone, Debug, Reflect, Deserialize)]
#[serde(default)]
pub struct CornerYaws {
    /// Right, then back.
    pub right_to_back: f32,
    /// Back, then left.
    pub back_to_left: f32,
    /// Left, then forward.
    pub left_to_forward: f32,
    /// Forward, then right.
    pub forward_to_right: f32,
    /// Back, then right.
    pub back_to_right: f32,
    /// Left, then back.
    pub left_to_back: f32,
    /// Forward, then left.
    pub forward_to_left: f32,
    /// Right, then forward.
    pub right_to_forward: f32,
}

/// Exit-line steering.
#[derive(Clone, Debug, Reflect, Deserialize)]
#[serde(default)]
pub struct ExitSettings {
    /// How far below its current position the head is steered.
    pub depth: f32,
    /// Approach rate of the head (per second).
    pub head_rate: f32,
    /// Approach rate of each body segment toward the one ahead (per second).
    pub body_rate: f32,
}

impl Default for ConvoyConfig {
    fn default() -> Self {
        Self {
            movement: MovementSettings::default(),
            sink: SinkSettings::default(),
            absorption: AbsorptionSettings::default(),
            station: StationSettings::default(),
            corner_yaws: CornerYaws::default(),
            exit: ExitSettings::default(),
            blocking: Category::ALL.to_vec(),
            level: LevelBlueprint::default(),
        }
    }
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            grid_pitch: 1.0,
            move_interval: 0.08,
            move_duration: 0.1,
            follow_threshold: 0.1,
            min_step_fraction: 0.9,
            corner_tilt_degrees: 30.0,
            rotation_smoothing: 10.0,
            corner_prune_interval: 1.0,
            corner_prune_cells: 3.0,
            overlap_radius_cells: 0.4,
            query_layers: crate::category::Blocker::DEFAULT_LAYER,
        }
    }
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            trigger_delay: 0.4,
            head_sink_duration: 0.3,
            head_disappear_duration: 0.2,
            body_move_duration: 0.4,
            body_scale_duration: 0.2,
            body_wait_duration: 0.1,
            body_sink_duration: 0.3,
            body_disappear_duration: 0.2,
            sink_distance: 0.5,
            disappear_distance: 2.0,
            scale_up_amount: 1.1,
            scale_down_amount: 0.8,
        }
    }
}

impl Default for AbsorptionSettings {
    fn default() -> Self {
        Self {
            scale_duration: 0.3,
            sink_duration: 0.5,
            part_scale: 0.5,
            seat_hidden_scale: 0.3,
            seat_reveal_scale: 1.2,
            seat_reveal_duration: 0.5,
        }
    }
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            check_interval: 0.1,
            cooldown: 0.1,
            reach_cells: 1.0,
            shift_duration: 0.05,
        }
    }
}

impl Default for CornerYaws {
    fn default() -> Self {
        Self {
            right_to_back: 90.0,
            back_to_left: 90.0,
            left_to_forward: 90.0,
            forward_to_right: 90.0,
            back_to_right: 180.0,
            left_to_back: 180.0,
            forward_to_left: 180.0,
            right_to_forward: 180.0,
        }
    }
}

impl Default for ExitSettings {
    fn default() -> Self {
        Self {
            depth: 2.0,
            head_rate: 2.0,
            body_rate: 8.0,
        }
    }
}

/// Errors raised while loading or validating a [`ConvoyConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O while reading config: {0}")]
    Io(#[from] std::io::Error),
    /// The text is not valid RON for this schema.
    #[error("RON parse error: {0}")]
    Ron(String),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConvoyConfig {
    /// Reads and validates a RON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Parses and validates RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: ConvoyConfig =
            ron::de::from_str(text).map_err(|e| ConfigError::Ron(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects values the core logic cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.movement;
        if m.grid_pitch <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "grid_pitch must be positive, got {}",
                m.grid_pitch
            )));
        }
        // A shorter interval plans from a head that has not yet left its previous cell.
        if m.move_interval < m.move_duration * 0.3 {
            return Err(ConfigError::Invalid(format!(
                "movement.move_interval ({}) must be at least 0.3 x move_duration ({})",
                m.move_interval, m.move_duration
            )));
        }
        if self.sink.trigger_delay <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "sink.trigger_delay must be positive, got {}",
                self.sink.trigger_delay
            )));
        }

        let s = &self.sink;
        let a = &self.absorption;
        let durations = [
            ("movement.move_interval", m.move_interval),
            ("movement.move_duration", m.move_duration),
            ("sink.head_sink_duration", s.head_sink_duration),
            ("sink.head_disappear_duration", s.head_disappear_duration),
            ("sink.body_move_duration", s.body_move_duration),
            ("sink.body_scale_duration", s.body_scale_duration),
            ("sink.body_wait_duration", s.body_wait_duration),
            ("sink.body_sink_duration", s.body_sink_duration),
            ("sink.body_disappear_duration", s.body_disappear_duration),
            ("absorption.scale_duration", a.scale_duration),
            ("absorption.sink_duration", a.sink_duration),
            ("absorption.seat_reveal_duration", a.seat_reveal_duration),
            ("station.check_interval", self.station.check_interval),
            ("station.cooldown", self.station.cooldown),
            ("station.shift_duration", self.station.shift_duration),
        ];
        if let Some((name, value)) = durations.iter().find(|(_, v)| *v < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{name} must not be negative, got {value}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ConvoyConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = ConvoyConfig::from_ron_str("()").unwrap();
        assert_eq!(cfg.movement.grid_pitch, 1.0);
        assert_eq!(cfg.sink.trigger_delay, 0.4);
        assert_eq!(cfg.blocking.len(), Category::ALL.len());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = ConvoyConfig::from_ron_str(
            "(movement: (grid_pitch: 2.0), blocking: [Red, Green])",
        )
        .unwrap();
        assert_eq!(cfg.movement.grid_pitch, 2.0);
        assert_eq!(cfg.movement.move_interval, 0.08);
        assert_eq!(cfg.blocking, vec![Category::Red, Category::Green]);
    }

    #[test]
    fn zero_pitch_is_rejected() {
        let err = ConvoyConfig::from_ron_str("(movement: (grid_pitch: 0.0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let err = ConvoyConfig::from_ron_str("(sink: (body_move_duration: -1.0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("body_move_duration")));
    }

    #[test]
    fn step_interval_shorter_than_the_glide_is_rejected() {
        let err = ConvoyConfig::from_ron_str("(movement: (move_interval: 0.02, move_duration: 0.1))")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("move_interval")));
        assert!(
            ConvoyConfig::from_ron_str("(movement: (move_interval: 0.04, move_duration: 0.1))")
                .is_ok()
        );
    }

    #[test]
    fn malformed_ron_reports_parse_error() {
        let err = ConvoyConfig::from_ron_str("(movement: ").unwrap_err();
        assert!(matches!(err, ConfigError::Ron(_)));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = ConvoyConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
