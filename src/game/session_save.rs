use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{APP_DIR_NAME, LayoutConfig};
use crate::error::PersistenceError;

use super::board::{GridEngine, RestoredCard};
use super::score::{ScoreManager, ScoreSnapshot};
use super::state::{GridPos, GridSize, Position};

const SAVE_FILE_NAME: &str = "cardgame_save.json";
pub const SAVE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub value: u32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    pub is_flipped: bool,
    pub is_matched: bool,
    pub grid_x: u32,
    pub grid_y: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSettings {
    pub use_responsive_layout: bool,
    pub auto_scale_cards: bool,
}

impl From<&LayoutConfig> for SaveSettings {
    fn from(layout: &LayoutConfig) -> Self {
        SaveSettings {
            use_responsive_layout: layout.use_responsive_layout,
            auto_scale_cards: layout.auto_scale_cards,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMeta {
    pub saved_at: String,
    pub version: u32,
}

/// Everything needed to resume a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub grid_width: u32,
    pub grid_height: u32,
    pub matched_pairs: usize,
    pub total_pairs: usize,
    pub game_in_progress: bool,
    pub cards: Vec<CardRecord>,
    pub score: ScoreSnapshot,
    pub settings: SaveSettings,
    pub meta: SaveMeta,
}

impl GameSnapshot {
    pub fn capture(engine: &GridEngine, score: &ScoreManager, settings: SaveSettings) -> Self {
        let size = engine.size();
        let cards = engine
            .cards()
            .iter()
            .enumerate()
            .map(|(index, card)| {
                let grid = size.pos_of(index);
                let position = card.position();
                CardRecord {
                    value: card.value(),
                    pos_x: position.x,
                    pos_y: position.y,
                    pos_z: position.z,
                    is_flipped: card.is_flipped(),
                    is_matched: card.is_matched(),
                    grid_x: grid.x,
                    grid_y: grid.y,
                }
            })
            .collect();

        GameSnapshot {
            grid_width: size.width,
            grid_height: size.height,
            matched_pairs: engine.matched_pairs(),
            total_pairs: engine.total_pairs(),
            game_in_progress: engine.is_game_in_progress(),
            cards,
            score: score.snapshot(),
            settings,
            meta: SaveMeta {
                saved_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                version: SAVE_VERSION,
            },
        }
    }

    pub fn grid_size(&self) -> GridSize {
        GridSize::new(self.grid_width, self.grid_height)
    }

    /// Checks the snapshot describes a playable grid and returns the cards
    /// in the form the engine restores from.
    pub fn validate(&self) -> Result<Vec<RestoredCard>, PersistenceError> {
        let size = self.grid_size();
        if size.width == 0 || size.height == 0 {
            return Err(PersistenceError::corrupt(format!("grid {size} has an empty dimension")));
        }
        let count = size.card_count();
        if self.cards.len() != count {
            return Err(PersistenceError::corrupt(format!(
                "grid {size} expects {count} cards, found {}",
                self.cards.len()
            )));
        }
        if count % 2 != 0 || self.total_pairs != count / 2 {
            return Err(PersistenceError::corrupt(format!(
                "{count} cards cannot hold {} pairs",
                self.total_pairs
            )));
        }
        if self.matched_pairs > self.total_pairs {
            return Err(PersistenceError::corrupt(format!(
                "{} matched pairs exceeds {} total",
                self.matched_pairs, self.total_pairs
            )));
        }
        if !self.score.game_time_seconds.is_finite() {
            return Err(PersistenceError::corrupt("game time is not a number"));
        }

        let mut seen = HashSet::with_capacity(count);
        let mut by_value: HashMap<u32, (usize, usize)> = HashMap::new();
        let mut restored = Vec::with_capacity(count);
        for record in &self.cards {
            let grid = GridPos::new(record.grid_x, record.grid_y);
            if size.index_of(grid).is_none() || !seen.insert(grid) {
                return Err(PersistenceError::corrupt(format!(
                    "card at ({}, {}) is outside the grid or duplicated",
                    grid.x, grid.y
                )));
            }
            let entry = by_value.entry(record.value).or_insert((0, 0));
            entry.0 += 1;
            if record.is_matched {
                entry.1 += 1;
            }
            restored.push(RestoredCard {
                value: record.value,
                is_flipped: record.is_flipped,
                is_matched: record.is_matched,
                grid,
                position: Position::new(record.pos_x, record.pos_y, record.pos_z),
            });
        }

        if by_value.len() != self.total_pairs {
            return Err(PersistenceError::corrupt(format!(
                "{} distinct values for {} pairs",
                by_value.len(),
                self.total_pairs
            )));
        }
        let mut matched_cards = 0;
        for (value, (cards, matched)) in &by_value {
            if *cards != 2 {
                return Err(PersistenceError::corrupt(format!("value {value} appears {cards} times")));
            }
            if *matched == 1 {
                return Err(PersistenceError::corrupt(format!("value {value} is only half matched")));
            }
            matched_cards += matched;
        }
        if matched_cards != self.matched_pairs * 2 {
            return Err(PersistenceError::corrupt(format!(
                "{matched_cards} matched cards disagree with {} matched pairs",
                self.matched_pairs
            )));
        }

        Ok(restored)
    }
}

/// Byte store behind the save artifact.
pub trait SaveStore {
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&mut self, data: &str) -> io::Result<()>;
    fn remove(&mut self) -> io::Result<()>;
    fn exists(&self) -> bool;
}

#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(APP_DIR_NAME).join(SAVE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveStore for FileStore {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Writes next to the target and renames over it, so a crash mid-write
    /// never leaves a truncated save behind.
    fn write(&mut self, data: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &self.path)
    }

    fn remove(&mut self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// In-memory store; clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.borrow().clone()
    }

    pub fn set_contents(&self, data: Option<String>) {
        *self.slot.borrow_mut() = data;
    }
}

impl SaveStore for MemoryStore {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.slot.borrow().clone())
    }

    fn write(&mut self, data: &str) -> io::Result<()> {
        *self.slot.borrow_mut() = Some(data.to_string());
        Ok(())
    }

    fn remove(&mut self) -> io::Result<()> {
        *self.slot.borrow_mut() = None;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// Nothing to resume: no grid, or the game is already won.
    Skipped,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadReport {
    pub size: GridSize,
    pub matched_pairs: usize,
    pub total_pairs: usize,
    /// Cards saved face-up without a match that came back face down.
    pub normalized_cards: usize,
    pub settings: SaveSettings,
    pub saved_at: String,
}

pub struct PersistenceController {
    store: Box<dyn SaveStore>,
}

impl PersistenceController {
    pub fn new(store: Box<dyn SaveStore>) -> Self {
        PersistenceController { store }
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        PersistenceController::new(Box::new(FileStore::new(path)))
    }

    pub fn has_save(&self) -> bool {
        self.store.exists()
    }

    pub fn save(
        &mut self,
        engine: &GridEngine,
        score: &ScoreManager,
        settings: SaveSettings,
    ) -> Result<SaveOutcome, PersistenceError> {
        if !engine.is_game_in_progress() {
            debug!("no game in progress, save skipped");
            return Ok(SaveOutcome::Skipped);
        }
        let snapshot = GameSnapshot::capture(engine, score, settings);
        let json = serde_json::to_string_pretty(&snapshot)?;
        self.store.write(&json)?;
        info!(
            cards = snapshot.cards.len(),
            score = snapshot.score.current_score,
            "game saved"
        );
        Ok(SaveOutcome::Written)
    }

    /// Reads and validates the stored snapshot without touching any game
    /// state.
    pub fn read_snapshot(&self) -> Result<GameSnapshot, PersistenceError> {
        self.read_validated().map(|(snapshot, _)| snapshot)
    }

    fn read_validated(&self) -> Result<(GameSnapshot, Vec<RestoredCard>), PersistenceError> {
        let raw = self.store.read()?.ok_or(PersistenceError::NoData)?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|err| PersistenceError::corrupt(err.to_string()))?;

        let version = value
            .get("meta")
            .and_then(|meta| meta.get("version"))
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| PersistenceError::corrupt("missing meta.version"))?;
        if version != SAVE_VERSION as u64 {
            return Err(PersistenceError::UnsupportedVersion(
                u32::try_from(version).unwrap_or(u32::MAX),
            ));
        }

        let snapshot: GameSnapshot =
            serde_json::from_value(value).map_err(|err| PersistenceError::corrupt(err.to_string()))?;
        let restored = snapshot.validate()?;
        Ok((snapshot, restored))
    }

    /// Replaces the running game with the stored one. On any error the
    /// engine and score are left exactly as they were.
    pub fn load(&self, engine: &mut GridEngine, score: &mut ScoreManager) -> Result<LoadReport, PersistenceError> {
        let (snapshot, restored) = match self.read_validated() {
            Ok(read) => read,
            Err(PersistenceError::NoData) => {
                debug!("no save file found");
                return Err(PersistenceError::NoData);
            }
            Err(err) => {
                warn!(error = %err, "load failed");
                return Err(err);
            }
        };
        let size = snapshot.grid_size();
        let normalized_cards = engine.restore(size, snapshot.matched_pairs, snapshot.total_pairs, &restored);
        score.restore(&snapshot.score);

        info!(
            cards = snapshot.cards.len(),
            score = snapshot.score.current_score,
            saved_at = %snapshot.meta.saved_at,
            "game loaded"
        );
        Ok(LoadReport {
            size,
            matched_pairs: snapshot.matched_pairs,
            total_pairs: snapshot.total_pairs,
            normalized_cards,
            settings: snapshot.settings,
            saved_at: snapshot.meta.saved_at,
        })
    }

    pub fn delete(&mut self) -> Result<(), PersistenceError> {
        self.store.remove()?;
        info!("save file deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::RulesConfig;
    use crate::game::card::CardPhase;
    use crate::game::state::{Palette, SessionContext};

    struct Fixture {
        engine: GridEngine,
        score: ScoreManager,
    }

    fn fixture(size: GridSize) -> Fixture {
        let mut engine = GridEngine::new(RulesConfig::default(), size);
        engine
            .build_grid_with_rng(size, Palette::default(), &mut StdRng::seed_from_u64(99))
            .unwrap();
        let mut score = ScoreManager::default();
        score.start_new_game();
        Fixture { engine, score }
    }

    fn partner_of(engine: &GridEngine, index: usize) -> usize {
        let value = engine.cards()[index].value();
        (0..engine.cards().len())
            .find(|&i| i != index && engine.cards()[i].value() == value)
            .unwrap()
    }

    /// Matches the pair holding card 0, then leaves one more card face up.
    fn play_into_mid_game(fx: &mut Fixture) -> usize {
        let ctx = SessionContext::running();
        let partner = partner_of(&fx.engine, 0);
        fx.engine.on_card_clicked(&ctx, 0, &mut fx.score);
        fx.engine.on_card_clicked(&ctx, partner, &mut fx.score);
        fx.engine.tick(&ctx, 1.0, &mut fx.score);

        let loose = (0..fx.engine.cards().len())
            .find(|&i| !fx.engine.cards()[i].is_matched())
            .unwrap();
        fx.engine.on_card_clicked(&ctx, loose, &mut fx.score);
        fx.engine.tick(&ctx, 0.5, &mut fx.score);
        assert!(fx.engine.cards()[loose].is_flipped());
        loose
    }

    #[test]
    fn test_round_trip_restores_state_and_normalizes_flips() {
        let dir = tempfile::tempdir().unwrap();
        let mut persistence = PersistenceController::with_file(dir.path().join("save.json"));
        let mut fx = fixture(GridSize::new(4, 4));
        let loose = play_into_mid_game(&mut fx);

        assert_eq!(
            persistence.save(&fx.engine, &fx.score, SaveSettings::default()).unwrap(),
            SaveOutcome::Written
        );
        assert!(persistence.has_save());

        let mut engine = GridEngine::new(RulesConfig::default(), GridSize::new(2, 2));
        let mut score = ScoreManager::default();
        let report = persistence.load(&mut engine, &mut score).unwrap();

        assert_eq!(report.normalized_cards, 1);
        assert_eq!(engine.size(), GridSize::new(4, 4));
        assert_eq!(engine.matched_pairs(), 1);
        assert_eq!(engine.total_pairs(), 8);
        assert_eq!(score.score(), fx.score.score());
        assert_eq!(score.total_moves(), 3);
        for (restored, original) in engine.cards().iter().zip(fx.engine.cards()) {
            assert_eq!(restored.value(), original.value());
            assert_eq!(restored.is_matched(), original.is_matched());
            assert_eq!(restored.position(), original.position());
        }
        assert_eq!(engine.cards()[loose].phase(), CardPhase::FaceDown);
        assert!(engine.flipped().is_empty());
        assert!(!engine.is_resolving());
    }

    #[test]
    fn test_snapshot_uses_camel_case_schema() {
        let fx = fixture(GridSize::new(2, 2));
        let snapshot = GameSnapshot::capture(&fx.engine, &fx.score, SaveSettings::default());
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["gridWidth"], 2);
        assert_eq!(value["totalPairs"], 2);
        assert_eq!(value["gameInProgress"], true);
        assert_eq!(value["meta"]["version"], SAVE_VERSION);
        assert!(value["cards"][0].get("isFlipped").is_some());
        assert!(value["cards"][0].get("gridX").is_some());
        assert!(value["score"].get("currentScore").is_some());
        assert!(value["settings"].get("useResponsiveLayout").is_some());
    }

    #[test]
    fn test_missing_save_reports_no_data() {
        let persistence = PersistenceController::new(Box::new(MemoryStore::new()));
        let mut fx = fixture(GridSize::new(2, 2));
        assert!(!persistence.has_save());
        assert!(matches!(
            persistence.load(&mut fx.engine, &mut fx.score),
            Err(PersistenceError::NoData)
        ));
    }

    #[test]
    fn test_corrupt_save_leaves_game_untouched() {
        let store = MemoryStore::new();
        let persistence = PersistenceController::new(Box::new(store.clone()));
        let mut fx = fixture(GridSize::new(2, 2));
        let before: Vec<u32> = fx.engine.cards().iter().map(|c| c.value()).collect();
        let game_id = fx.engine.game_id();

        store.set_contents(Some("{ \"gridWidth\": ".to_string()));
        assert!(matches!(
            persistence.load(&mut fx.engine, &mut fx.score),
            Err(PersistenceError::Corrupt(_))
        ));
        assert_eq!(fx.engine.game_id(), game_id);
        let after: Vec<u32> = fx.engine.cards().iter().map(|c| c.value()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_inconsistent_snapshots_are_rejected() {
        let fx = fixture(GridSize::new(2, 2));
        let good = GameSnapshot::capture(&fx.engine, &fx.score, SaveSettings::default());
        assert!(good.validate().is_ok());

        let mut missing_card = good.clone();
        missing_card.cards.pop();
        assert!(missing_card.validate().is_err());

        let mut triple = good.clone();
        let value = triple.cards[0].value;
        for card in &mut triple.cards {
            card.value = value;
        }
        assert!(triple.validate().is_err());

        let mut half_matched = good.clone();
        half_matched.cards[0].is_matched = true;
        assert!(half_matched.validate().is_err());

        let mut duplicate_slot = good.clone();
        duplicate_slot.cards[1].grid_x = duplicate_slot.cards[0].grid_x;
        duplicate_slot.cards[1].grid_y = duplicate_slot.cards[0].grid_y;
        assert!(duplicate_slot.validate().is_err());

        let mut overcounted = good.clone();
        overcounted.matched_pairs = 3;
        assert!(overcounted.validate().is_err());
    }

    #[test]
    fn test_other_version_is_refused() {
        let store = MemoryStore::new();
        let persistence = PersistenceController::new(Box::new(store.clone()));
        let fx = fixture(GridSize::new(2, 2));
        let mut snapshot = GameSnapshot::capture(&fx.engine, &fx.score, SaveSettings::default());
        snapshot.meta.version = 7;
        store.set_contents(Some(serde_json::to_string(&snapshot).unwrap()));

        assert!(matches!(
            persistence.read_snapshot(),
            Err(PersistenceError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_finished_game_is_not_saved() {
        let ctx = SessionContext::running();
        let mut persistence = PersistenceController::new(Box::new(MemoryStore::new()));
        let mut fx = fixture(GridSize::new(2, 2));
        while !fx.engine.is_complete() {
            let first = (0..4).find(|&i| !fx.engine.cards()[i].is_matched()).unwrap();
            let partner = partner_of(&fx.engine, first);
            fx.engine.on_card_clicked(&ctx, first, &mut fx.score);
            fx.engine.on_card_clicked(&ctx, partner, &mut fx.score);
            fx.engine.tick(&ctx, 1.0, &mut fx.score);
        }
        assert_eq!(
            persistence.save(&fx.engine, &fx.score, SaveSettings::default()).unwrap(),
            SaveOutcome::Skipped
        );
        assert!(!persistence.has_save());
    }

    #[test]
    fn test_delete_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("save.json");
        let mut persistence = PersistenceController::with_file(&path);
        let fx = fixture(GridSize::new(2, 2));

        persistence.save(&fx.engine, &fx.score, SaveSettings::default()).unwrap();
        assert!(path.is_file());
        assert!(!path.with_extension("tmp").exists());

        persistence.delete().unwrap();
        assert!(!persistence.has_save());
        persistence.delete().unwrap();
    }
}
