use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ScoringConfig;

#[derive(Clone, Debug, PartialEq)]
pub struct GameStats {
    pub final_score: u32,
    pub total_moves: u32,
    pub total_time: f64,
    pub max_combo: u32,
    pub perfect_game: bool,
    /// Score per move at completion, before the efficiency bonus.
    pub efficiency: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScoreEvent {
    ScoreChanged(u32),
    ComboChanged(u32),
    MovesChanged(u32),
    ComboBonus(u32),
    GameCompleted(GameStats),
}

/// Score fields carried inside a save.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSnapshot {
    pub current_score: u32,
    pub total_moves: u32,
    pub current_combo: u32,
    pub is_perfect_game: bool,
    pub game_time_seconds: f64,
    #[serde(default)]
    pub consecutive_matches: u32,
    #[serde(default)]
    pub max_combo: u32,
    #[serde(default)]
    pub total_matches: u32,
    #[serde(default)]
    pub last_match_seconds: Option<f64>,
}

#[derive(Debug)]
pub struct ScoreManager {
    config: ScoringConfig,
    score: u32,
    combo: u32,
    max_combo: u32,
    consecutive_matches: u32,
    total_matches: u32,
    total_moves: u32,
    perfect_game: bool,
    elapsed: f64,
    last_match_at: Option<f64>,
    events: Vec<ScoreEvent>,
}

impl Default for ScoreManager {
    fn default() -> Self {
        ScoreManager::new(ScoringConfig::default())
    }
}

impl ScoreManager {
    pub fn new(config: ScoringConfig) -> Self {
        ScoreManager {
            config,
            score: 0,
            combo: 0,
            max_combo: 0,
            consecutive_matches: 0,
            total_matches: 0,
            total_moves: 0,
            perfect_game: true,
            elapsed: 0.0,
            last_match_at: None,
            events: Vec::new(),
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn consecutive_matches(&self) -> u32 {
        self.consecutive_matches
    }

    pub fn total_moves(&self) -> u32 {
        self.total_moves
    }

    pub fn total_matches(&self) -> u32 {
        self.total_matches
    }

    pub fn is_perfect_game(&self) -> bool {
        self.perfect_game
    }

    /// Logical seconds since the game started; frozen while paused.
    pub fn game_time(&self) -> f64 {
        self.elapsed
    }

    pub fn advance(&mut self, dt: f64) {
        self.elapsed += dt.max(0.0);
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, ScoreEvent> {
        self.events.drain(..)
    }

    pub fn start_new_game(&mut self) {
        self.score = 0;
        self.combo = 0;
        self.max_combo = 0;
        self.consecutive_matches = 0;
        self.total_matches = 0;
        self.total_moves = 0;
        self.perfect_game = true;
        self.elapsed = 0.0;
        self.last_match_at = None;

        self.events.push(ScoreEvent::ScoreChanged(self.score));
        self.events.push(ScoreEvent::ComboChanged(self.combo));
        self.events.push(ScoreEvent::MovesChanged(self.total_moves));
        info!("new game started, score tracking reset");
    }

    pub fn record_move(&mut self) {
        self.total_moves += 1;
        self.events.push(ScoreEvent::MovesChanged(self.total_moves));
    }

    /// Scores one resolved pair and returns the points it earned (completion
    /// bonuses excluded).
    pub fn record_match(&mut self, matched_pairs: usize, total_pairs: usize) -> u32 {
        self.total_matches += 1;
        let now = self.elapsed;
        let since_last = now - self.last_match_at.unwrap_or(0.0);

        let mut points = self.config.base_match_score;

        match self.last_match_at {
            Some(last) if now - last <= self.config.combo_window => {
                self.combo += 1;
                let bonus = self.combo.saturating_mul(self.config.combo_bonus_per_level);
                points = points.saturating_add(bonus);
                info!(combo = self.combo, bonus, "combo");
            }
            _ => self.combo = 1,
        }

        if since_last < self.config.speed_window {
            let bonus = round_points(self.config.speed_bonus_rate * (self.config.speed_window - since_last));
            points = points.saturating_add(bonus);
            debug!(bonus, since_last, "speed bonus");
        }

        self.consecutive_matches += 1;
        if self.consecutive_matches >= self.config.hot_streak_threshold {
            points = points.saturating_add(self.config.hot_streak_bonus);
            debug!(streak = self.consecutive_matches, bonus = self.config.hot_streak_bonus, "hot streak bonus");
        }

        self.score = self.score.saturating_add(points);
        self.last_match_at = Some(now);
        self.max_combo = self.max_combo.max(self.combo);

        if matched_pairs >= total_pairs {
            self.complete_game();
        }

        self.events.push(ScoreEvent::ScoreChanged(self.score));
        self.events.push(ScoreEvent::ComboChanged(self.combo));
        if self.combo >= 3 {
            self.events.push(ScoreEvent::ComboBonus(self.combo));
        }

        info!(points, total = self.score, matched_pairs, total_pairs, "match scored");
        points
    }

    pub fn record_mismatch(&mut self) {
        self.perfect_game = false;
        self.consecutive_matches = 0;
        if self.combo > 0 {
            info!(was = self.combo, "combo broken");
            self.combo = 0;
            self.events.push(ScoreEvent::ComboChanged(self.combo));
        }
    }

    fn complete_game(&mut self) {
        if self.perfect_game {
            self.score = self.score.saturating_add(self.config.perfect_game_bonus);
            info!(bonus = self.config.perfect_game_bonus, "perfect game");
        }

        let efficiency = if self.total_moves == 0 {
            0.0
        } else {
            self.score as f64 / self.total_moves as f64
        };
        if efficiency > self.config.efficiency_threshold {
            let bonus = round_points(efficiency * self.config.efficiency_multiplier);
            self.score = self.score.saturating_add(bonus);
            info!(bonus, efficiency, "efficiency bonus");
        }

        let stats = GameStats {
            final_score: self.score,
            total_moves: self.total_moves,
            total_time: self.elapsed,
            max_combo: self.max_combo,
            perfect_game: self.perfect_game,
            efficiency,
        };
        info!(
            score = stats.final_score,
            moves = stats.total_moves,
            time = stats.total_time,
            perfect = stats.perfect_game,
            "game complete"
        );
        self.events.push(ScoreEvent::GameCompleted(stats));
    }

    /// Points the next match would earn, for UI previews.
    pub fn potential_score(&self, would_be_combo: bool, since_last_match: f64) -> u32 {
        let mut points = self.config.base_match_score;
        if would_be_combo {
            points = points.saturating_add((self.combo + 1).saturating_mul(self.config.combo_bonus_per_level));
        }
        if since_last_match < self.config.speed_window {
            points = points.saturating_add(round_points(
                self.config.speed_bonus_rate * (self.config.speed_window - since_last_match),
            ));
        }
        points
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            current_score: self.score,
            total_moves: self.total_moves,
            current_combo: self.combo,
            is_perfect_game: self.perfect_game,
            game_time_seconds: self.elapsed,
            consecutive_matches: self.consecutive_matches,
            max_combo: self.max_combo,
            total_matches: self.total_matches,
            last_match_seconds: self.last_match_at,
        }
    }

    pub fn restore(&mut self, saved: &ScoreSnapshot) {
        self.score = saved.current_score;
        self.combo = saved.current_combo;
        self.max_combo = saved.max_combo.max(saved.current_combo);
        self.consecutive_matches = saved.consecutive_matches;
        self.total_matches = saved.total_matches;
        self.total_moves = saved.total_moves;
        self.perfect_game = saved.is_perfect_game;
        self.elapsed = saved.game_time_seconds.max(0.0);
        self.last_match_at = saved
            .last_match_seconds
            .filter(|at| at.is_finite() && *at <= self.elapsed);

        self.events.push(ScoreEvent::ScoreChanged(self.score));
        self.events.push(ScoreEvent::ComboChanged(self.combo));
        self.events.push(ScoreEvent::MovesChanged(self.total_moves));
        info!(score = self.score, moves = self.total_moves, "score restored");
    }
}

/// Nearest integer, ties away from zero; negatives clamp to 0.
fn round_points(value: f64) -> u32 {
    value.round().max(0.0) as u32
}
