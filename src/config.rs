//! Game tuning loaded from `config.json`.
//!
//! Every section falls back to its defaults, so a partial file only overrides
//! the keys it names.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::game::card::DEFAULT_FLIP_DURATION;
use crate::game::layout::FALLBACK_CARD_SPACING;
use crate::game::state::GridSize;

pub const APP_DIR_NAME: &str = "concentration";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Seconds the flipped pair stays visible before it is compared.
    pub match_check_delay: f32,
    pub flip_duration: f32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            match_check_delay: 1.0,
            flip_duration: DEFAULT_FLIP_DURATION,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_match_score: u32,
    pub combo_bonus_per_level: u32,
    pub combo_window: f64,
    pub speed_bonus_rate: f64,
    pub speed_window: f64,
    pub hot_streak_threshold: u32,
    pub hot_streak_bonus: u32,
    pub perfect_game_bonus: u32,
    pub efficiency_threshold: f64,
    pub efficiency_multiplier: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            base_match_score: 100,
            combo_bonus_per_level: 50,
            combo_window: 3.0,
            speed_bonus_rate: 10.0,
            speed_window: 2.0,
            hot_streak_threshold: 3,
            hot_streak_bonus: 50,
            perfect_game_bonus: 500,
            efficiency_threshold: 50.0,
            efficiency_multiplier: 10.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub use_responsive_layout: bool,
    pub auto_scale_cards: bool,
    pub card_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            use_responsive_layout: true,
            auto_scale_cards: false,
            card_spacing: FALLBACK_CARD_SPACING,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rules: RulesConfig,
    pub scoring: ScoringConfig,
    pub layout: LayoutConfig,
    pub default_grid: GridSize,
}

impl GameConfig {
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Reads the config at `path`. A missing file yields defaults; an
    /// unreadable or malformed one is logged and also yields defaults.
    pub fn load_or_default(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file, using defaults");
                return GameConfig::default();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config unreadable, using defaults");
                return GameConfig::default();
            }
        };
        match serde_json::from_str::<GameConfig>(&raw) {
            Ok(config) => {
                info!(path = %path.display(), "loaded config");
                config.sanitized()
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config malformed, using defaults");
                GameConfig::default()
            }
        }
    }

    fn sanitized(mut self) -> Self {
        if !(self.rules.match_check_delay >= 0.0) {
            warn!(value = self.rules.match_check_delay, "negative match_check_delay clamped");
            self.rules.match_check_delay = 0.0;
        }
        if !(self.rules.flip_duration >= 0.0) {
            warn!(value = self.rules.flip_duration, "negative flip_duration clamped");
            self.rules.flip_duration = 0.0;
        }
        self
    }
}
