use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::error::{GridError, PersistenceError};

use super::audio::{AudioSink, SoundCue};
use super::board::{ClickOutcome, GridEngine, IgnoreReason, ResizeOutcome, Resolution};
use super::layout::{FixedSpacingLayout, LayoutCalculator};
use super::score::{ScoreEvent, ScoreManager};
use super::session_save::{LoadReport, PersistenceController, SaveOutcome, SaveSettings, SaveStore};
use super::state::{GridPos, GridSize, SessionContext};

/// Wires the grid, the score and the save slot together and applies the
/// session policies around them (autosave, sound cues, pause).
pub struct Game {
    config: GameConfig,
    engine: GridEngine,
    score: ScoreManager,
    persistence: PersistenceController,
    audio: Box<dyn AudioSink>,
    ctx: SessionContext,
    events: Vec<ScoreEvent>,
}

impl Game {
    pub fn new(config: GameConfig, store: Box<dyn SaveStore>, audio: Box<dyn AudioSink>) -> Self {
        let layout = Box::new(FixedSpacingLayout::new(config.layout.card_spacing));
        Game::with_layout(config, store, audio, layout)
    }

    pub fn with_layout(
        config: GameConfig,
        store: Box<dyn SaveStore>,
        audio: Box<dyn AudioSink>,
        layout: Box<dyn LayoutCalculator>,
    ) -> Self {
        let engine = GridEngine::with_layout(config.rules.clone(), config.default_grid, layout);
        let score = ScoreManager::new(config.scoring.clone());
        Game {
            config,
            engine,
            score,
            persistence: PersistenceController::new(store),
            audio,
            ctx: SessionContext::running(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn engine(&self) -> &GridEngine {
        &self.engine
    }

    pub fn score(&self) -> &ScoreManager {
        &self.score
    }

    pub fn is_paused(&self) -> bool {
        self.ctx.paused
    }

    pub fn new_game(&mut self) -> Result<GridSize, GridError> {
        self.new_game_with_rng(&mut rand::rng())
    }

    /// Deals a fresh grid at the requested size and drops any saved game.
    /// A size that cannot be dealt leaves both the board and the save alone.
    pub fn new_game_with_rng<R: Rng>(&mut self, rng: &mut R) -> Result<GridSize, GridError> {
        self.audio.play(SoundCue::Button);

        let size = self.engine.next_size();
        let palette = self.engine.palette().clone();
        let built = self.engine.build_grid_with_rng(size, palette, rng)?;
        self.remove_save_quietly();
        self.score.start_new_game();
        self.ctx.paused = false;
        self.collect_score_events();
        info!(size = %built, game_id = self.engine.game_id(), "new game started");
        Ok(built)
    }

    pub fn restart(&mut self) -> Result<GridSize, GridError> {
        debug!("restarting current game");
        self.new_game()
    }

    pub fn resize(&mut self, size: GridSize) -> Result<ResizeOutcome, GridError> {
        let outcome = self.engine.resize(size, &mut self.score)?;
        if outcome == ResizeOutcome::Rebuilt {
            self.remove_save_quietly();
        }
        self.collect_score_events();
        Ok(outcome)
    }

    pub fn click(&mut self, index: usize) -> ClickOutcome {
        let outcome = self.engine.on_card_clicked(&self.ctx, index, &mut self.score);
        if let ClickOutcome::Accepted { .. } = outcome {
            self.audio.play(SoundCue::Flip);
        }
        self.collect_score_events();
        outcome
    }

    pub fn click_at(&mut self, pos: GridPos) -> ClickOutcome {
        match self.engine.size().index_of(pos) {
            Some(index) if self.engine.has_grid() => self.click(index),
            _ => {
                debug!(x = pos.x, y = pos.y, "click outside the grid");
                ClickOutcome::Ignored(IgnoreReason::OutOfRange)
            }
        }
    }

    /// Advances the logical clock by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> Option<Resolution> {
        let resolution = self.engine.tick(&self.ctx, dt, &mut self.score);
        match &resolution {
            Some(Resolution::Match { completed, .. }) => {
                self.audio.play(SoundCue::Match);
                if *completed {
                    self.audio.play(SoundCue::Win);
                    self.remove_save_quietly();
                }
            }
            Some(Resolution::Mismatch { .. }) => self.audio.play(SoundCue::Mismatch),
            None => {}
        }
        self.collect_score_events();
        resolution
    }

    pub fn pause(&mut self) {
        if self.ctx.paused {
            return;
        }
        self.audio.play(SoundCue::Button);
        self.ctx.paused = true;
        info!("game paused");
        self.autosave("pause");
    }

    pub fn resume(&mut self) {
        if !self.ctx.paused {
            return;
        }
        self.audio.play(SoundCue::Button);
        self.ctx.paused = false;
        info!("game resumed");
    }

    pub fn save(&mut self) -> Result<SaveOutcome, PersistenceError> {
        let settings = SaveSettings::from(&self.config.layout);
        self.persistence.save(&self.engine, &self.score, settings)
    }

    /// Loads the saved game over the current one. On error nothing changes.
    pub fn continue_saved(&mut self) -> Result<LoadReport, PersistenceError> {
        let report = self.persistence.load(&mut self.engine, &mut self.score)?;
        self.config.layout.use_responsive_layout = report.settings.use_responsive_layout;
        self.config.layout.auto_scale_cards = report.settings.auto_scale_cards;
        self.ctx.paused = false;
        self.collect_score_events();
        Ok(report)
    }

    pub fn delete_save(&mut self) -> Result<(), PersistenceError> {
        self.persistence.delete()
    }

    pub fn has_save(&self) -> bool {
        self.persistence.has_save()
    }

    pub fn return_to_menu(&mut self) {
        self.audio.play(SoundCue::Button);
        self.autosave("menu");
        self.engine.clear_grid();
        self.ctx.paused = false;
    }

    pub fn shutdown(&mut self) {
        self.autosave("shutdown");
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, ScoreEvent> {
        self.events.drain(..)
    }

    fn collect_score_events(&mut self) {
        for event in self.score.drain_events() {
            if let ScoreEvent::ComboBonus(_) = event {
                self.audio.play(SoundCue::ComboBonus);
            }
            self.events.push(event);
        }
    }

    fn autosave(&mut self, reason: &'static str) {
        match self.save() {
            Ok(SaveOutcome::Written) => debug!(reason, "autosaved"),
            Ok(SaveOutcome::Skipped) => {}
            Err(err) => warn!(reason, error = %err, "autosave failed"),
        }
    }

    fn remove_save_quietly(&mut self) {
        if let Err(err) = self.persistence.delete() {
            warn!(error = %err, "could not remove save");
        }
    }
}
