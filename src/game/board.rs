use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::RulesConfig;
use crate::error::GridError;

use super::card::{Card, FlipProgress, FlipRequest};
use super::layout::{FixedSpacingLayout, LayoutCalculator};
use super::score::ScoreManager;
use super::state::{GridPos, GridSize, MAX_FLIPPED_CARDS, Palette, Position, SessionContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    Paused,
    Resolving,
    Matched,
    SelectionFull,
    AlreadySelected,
    StillFlipping,
    OutOfRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    Accepted { resolving: bool },
    Ignored(IgnoreReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Match {
        value: u32,
        indices: Vec<usize>,
        completed: bool,
    },
    Mismatch {
        indices: Vec<usize>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
    Rebuilt,
    Deferred,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingResolution {
    remaining: f32,
}

/// One card as read back from a save, already validated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestoredCard {
    pub value: u32,
    pub is_flipped: bool,
    pub is_matched: bool,
    pub grid: GridPos,
    pub position: Position,
}

/// Owns the cards and the pair-resolution protocol.
pub struct GridEngine {
    rules: RulesConfig,
    layout: Box<dyn LayoutCalculator>,
    palette: Palette,
    size: GridSize,
    pending_size: Option<GridSize>,
    cards: Vec<Card>,
    flipped: Vec<usize>,
    matched_pairs: usize,
    total_pairs: usize,
    resolution: Option<PendingResolution>,
    game_id: u64,
}

impl GridEngine {
    pub fn new(rules: RulesConfig, size: GridSize) -> Self {
        GridEngine::with_layout(rules, size, Box::new(FixedSpacingLayout::default()))
    }

    pub fn with_layout(rules: RulesConfig, size: GridSize, layout: Box<dyn LayoutCalculator>) -> Self {
        GridEngine {
            rules,
            layout,
            palette: Palette::default(),
            size,
            pending_size: None,
            cards: Vec::new(),
            flipped: Vec::new(),
            matched_pairs: 0,
            total_pairs: 0,
            resolution: None,
            game_id: 0,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn card_at(&self, pos: GridPos) -> Option<&Card> {
        self.size.index_of(pos).and_then(|index| self.cards.get(index))
    }

    pub fn face_of(&self, index: usize) -> Option<&str> {
        self.cards.get(index).map(|card| self.palette.face_of(card.value()))
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn pending_size(&self) -> Option<GridSize> {
        self.pending_size
    }

    /// Size the next build will use.
    pub fn next_size(&self) -> GridSize {
        self.pending_size.unwrap_or(self.size)
    }

    pub fn flipped(&self) -> &[usize] {
        &self.flipped
    }

    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    pub fn total_pairs(&self) -> usize {
        self.total_pairs
    }

    pub fn is_resolving(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn has_grid(&self) -> bool {
        !self.cards.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.has_grid() && self.matched_pairs >= self.total_pairs
    }

    pub fn is_game_in_progress(&self) -> bool {
        self.has_grid() && self.matched_pairs < self.total_pairs
    }

    /// Bumped whenever the grid is replaced or cleared.
    pub fn game_id(&self) -> u64 {
        self.game_id
    }

    pub fn build_grid(&mut self, size: GridSize, palette: Palette) -> Result<GridSize, GridError> {
        self.build_grid_with_rng(size, palette, &mut rand::rng())
    }

    /// Builds a fresh shuffled grid, replacing the current one. Returns the
    /// size actually used after odd counts are evened out.
    pub fn build_grid_with_rng<R: Rng>(
        &mut self,
        size: GridSize,
        palette: Palette,
        rng: &mut R,
    ) -> Result<GridSize, GridError> {
        if size.width == 0 || size.height == 0 {
            return Err(GridError::EmptyDimension(size));
        }
        let evened = size.evened();
        if evened != size {
            warn!(requested = %size, adjusted = %evened, "odd card count, shrinking grid");
        }
        let total_pairs = evened.pair_count();
        if total_pairs == 0 {
            return Err(GridError::NoPairs(evened));
        }

        let mut values: Vec<u32> = (0..total_pairs as u32).flat_map(|v| [v, v]).collect();
        shuffle(&mut values, rng);

        self.clear_grid();
        self.size = evened;
        self.pending_size = None;
        self.palette = palette;
        self.total_pairs = total_pairs;
        self.cards = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let grid = evened.pos_of(index);
                let position = self.layout.card_position(grid, evened);
                Card::new(value, grid, position, self.rules.flip_duration)
            })
            .collect();

        info!(size = %evened, pairs = total_pairs, "grid created");
        Ok(evened)
    }

    pub fn clear_grid(&mut self) {
        self.cards.clear();
        self.flipped.clear();
        self.matched_pairs = 0;
        self.total_pairs = 0;
        self.resolution = None;
        self.game_id = self.game_id.wrapping_add(1);
        debug!("grid cleared");
    }

    pub fn on_card_clicked(
        &mut self,
        ctx: &SessionContext,
        index: usize,
        score: &mut ScoreManager,
    ) -> ClickOutcome {
        let outcome = self.try_select(ctx, index, score);
        if let ClickOutcome::Ignored(reason) = outcome {
            debug!(index, ?reason, "click ignored");
        }
        outcome
    }

    fn try_select(&mut self, ctx: &SessionContext, index: usize, score: &mut ScoreManager) -> ClickOutcome {
        if ctx.paused {
            return ClickOutcome::Ignored(IgnoreReason::Paused);
        }
        if self.resolution.is_some() {
            return ClickOutcome::Ignored(IgnoreReason::Resolving);
        }
        let Some(card) = self.cards.get(index) else {
            return ClickOutcome::Ignored(IgnoreReason::OutOfRange);
        };
        if card.is_matched() {
            return ClickOutcome::Ignored(IgnoreReason::Matched);
        }
        if self.flipped.len() >= MAX_FLIPPED_CARDS {
            return ClickOutcome::Ignored(IgnoreReason::SelectionFull);
        }
        if self.flipped.contains(&index) {
            return ClickOutcome::Ignored(IgnoreReason::AlreadySelected);
        }
        if card.is_flipping() {
            return ClickOutcome::Ignored(IgnoreReason::StillFlipping);
        }

        let request = self.cards[index].request_flip(ctx);
        debug_assert_eq!(request, FlipRequest::Started);
        score.record_move();
        self.flipped.push(index);

        let resolving = self.flipped.len() == MAX_FLIPPED_CARDS;
        if resolving {
            self.resolution = Some(PendingResolution {
                remaining: self.rules.match_check_delay,
            });
        }
        ClickOutcome::Accepted { resolving }
    }

    /// Advances animations, the score clock and any pending resolution.
    /// Nothing moves while the session is paused.
    pub fn tick(&mut self, ctx: &SessionContext, dt: f32, score: &mut ScoreManager) -> Option<Resolution> {
        if ctx.paused || !(dt > 0.0) {
            return None;
        }
        score.advance(dt as f64);
        for card in &mut self.cards {
            if let Some(FlipProgress::FaceChanged | FlipProgress::FaceChangedAndFinished) = card.advance(dt) {
                debug!(value = card.value(), face_up = card.is_flipped(), "card face changed");
            }
        }

        let pending = self.resolution.as_mut()?;
        pending.remaining -= dt;
        if pending.remaining > 0.0 {
            return None;
        }
        Some(self.resolve(score))
    }

    fn resolve(&mut self, score: &mut ScoreManager) -> Resolution {
        debug_assert_eq!(self.flipped.len(), MAX_FLIPPED_CARDS);
        let indices = std::mem::take(&mut self.flipped);
        self.resolution = None;

        let first_value = self.cards[indices[0]].value();
        let is_match = indices.iter().all(|&i| self.cards[i].value() == first_value);

        if is_match {
            for &i in &indices {
                self.cards[i].mark_matched();
            }
            self.matched_pairs += 1;
            debug_assert!(self.matched_pairs <= self.total_pairs);
            score.record_match(self.matched_pairs, self.total_pairs);
            let completed = self.matched_pairs >= self.total_pairs;
            info!(
                value = first_value,
                matched = self.matched_pairs,
                total = self.total_pairs,
                "match"
            );
            if completed {
                info!("all pairs matched");
            }
            Resolution::Match {
                value: first_value,
                indices,
                completed,
            }
        } else {
            info!(?indices, "mismatch, flipping back");
            score.record_mismatch();
            for &i in &indices {
                self.cards[i].force_to_face_down();
            }
            Resolution::Mismatch { indices }
        }
    }

    /// Rebuilds right away when a grid is on the table, otherwise remembers
    /// the size for the next build.
    pub fn resize(&mut self, size: GridSize, score: &mut ScoreManager) -> Result<ResizeOutcome, GridError> {
        if !self.has_grid() {
            info!(size = %size, "grid size stored for next game");
            self.pending_size = Some(size);
            return Ok(ResizeOutcome::Deferred);
        }
        let palette = self.palette.clone();
        self.build_grid(size, palette)?;
        score.start_new_game();
        info!(size = %self.size, "grid recreated for active game");
        Ok(ResizeOutcome::Rebuilt)
    }

    /// Replaces the grid with cards read back from a save. Callers validate
    /// the records first; flipped cards that are not matched come back face
    /// down. A size picked for the next game survives. Returns how many cards
    /// were turned back over.
    pub fn restore(
        &mut self,
        size: GridSize,
        matched_pairs: usize,
        total_pairs: usize,
        restored: &[RestoredCard],
    ) -> usize {
        debug_assert_eq!(restored.len(), size.card_count());
        debug_assert!(matched_pairs <= total_pairs);

        self.clear_grid();
        self.size = size;
        self.matched_pairs = matched_pairs;
        self.total_pairs = total_pairs;

        let mut slots: Vec<Option<Card>> = vec![None; size.card_count()];
        for record in restored {
            let Some(index) = size.index_of(record.grid) else {
                continue;
            };
            let mut card = Card::new(record.value, record.grid, record.position, self.rules.flip_duration);
            card.restore_state(record.value, record.is_flipped, record.is_matched);
            slots[index] = Some(card);
        }
        self.cards = slots.into_iter().flatten().collect();

        let mut normalized = 0;
        for card in &mut self.cards {
            if card.is_flipped() && !card.is_matched() {
                card.force_to_face_down();
                normalized += 1;
            }
        }

        info!(
            cards = self.cards.len(),
            matched = matched_pairs,
            total = total_pairs,
            normalized,
            "grid restored"
        );
        normalized
    }
}

/// Fisher-Yates: position `i` swaps with a uniform pick from `i..n`.
fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    let n = items.len();
    for i in 0..n {
        let j = rng.random_range(i..n);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::game::card::CardPhase;

    const RULES: RulesConfig = RulesConfig {
        match_check_delay: 1.0,
        flip_duration: 0.3,
    };

    fn engine_with(size: GridSize, seed: u64) -> GridEngine {
        let mut engine = GridEngine::new(RULES, size);
        engine
            .build_grid_with_rng(size, Palette::default(), &mut StdRng::seed_from_u64(seed))
            .unwrap();
        engine
    }

    fn value_counts(engine: &GridEngine) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for card in engine.cards() {
            *counts.entry(card.value()).or_insert(0) += 1;
        }
        counts
    }

    /// Index of the other card holding `index`'s value.
    fn partner_of(engine: &GridEngine, index: usize) -> usize {
        let value = engine.cards()[index].value();
        (0..engine.cards().len())
            .find(|&i| i != index && engine.cards()[i].value() == value)
            .unwrap()
    }

    fn non_partner_of(engine: &GridEngine, index: usize) -> usize {
        let value = engine.cards()[index].value();
        (0..engine.cards().len())
            .find(|&i| engine.cards()[i].value() != value)
            .unwrap()
    }

    fn fresh_score() -> ScoreManager {
        let mut score = ScoreManager::default();
        score.start_new_game();
        score
    }

    #[test]
    fn test_build_places_every_value_twice() {
        let engine = engine_with(GridSize::new(4, 4), 1);
        assert_eq!(engine.cards().len(), 16);
        assert_eq!(engine.total_pairs(), 8);
        let counts = value_counts(&engine);
        assert_eq!(counts.len(), 8);
        assert!(counts.values().all(|&c| c == 2));
        assert_eq!(engine.cards()[5].grid(), GridPos::new(1, 1));
    }

    #[test]
    fn test_build_evens_odd_grid() {
        let mut engine = GridEngine::new(RULES, GridSize::new(3, 3));
        let used = engine.build_grid(GridSize::new(3, 3), Palette::default()).unwrap();
        assert_eq!(used, GridSize::new(2, 3));
        assert_eq!(engine.cards().len(), 6);
    }

    #[test]
    fn test_build_rejects_grids_without_pairs() {
        let mut engine = GridEngine::new(RULES, GridSize::new(1, 1));
        assert!(matches!(
            engine.build_grid(GridSize::new(1, 1), Palette::default()),
            Err(GridError::NoPairs(_))
        ));
        assert!(matches!(
            engine.build_grid(GridSize::new(0, 4), Palette::default()),
            Err(GridError::EmptyDimension(_))
        ));
        assert!(!engine.has_grid());
    }

    #[test]
    fn test_repeated_builds_shuffle_differently() {
        let mut engine = GridEngine::new(RULES, GridSize::new(5, 6));
        let mut orders = Vec::new();
        for _ in 0..4 {
            engine.build_grid(GridSize::new(5, 6), Palette::default()).unwrap();
            orders.push(engine.cards().iter().map(Card::value).collect::<Vec<_>>());
        }
        assert!(orders.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_matching_pair_resolves_after_delay() {
        let ctx = SessionContext::running();
        let mut engine = engine_with(GridSize::new(4, 4), 7);
        let mut score = fresh_score();
        let partner = partner_of(&engine, 0);

        assert_eq!(
            engine.on_card_clicked(&ctx, 0, &mut score),
            ClickOutcome::Accepted { resolving: false }
        );
        assert_eq!(
            engine.on_card_clicked(&ctx, partner, &mut score),
            ClickOutcome::Accepted { resolving: true }
        );
        assert!(engine.is_resolving());
        assert_eq!(score.total_moves(), 2);

        assert_eq!(engine.tick(&ctx, 0.5, &mut score), None);
        let resolution = engine.tick(&ctx, 0.5, &mut score).unwrap();
        assert!(matches!(resolution, Resolution::Match { completed: false, .. }));

        assert_eq!(engine.cards()[0].phase(), CardPhase::Matched);
        assert_eq!(engine.cards()[partner].phase(), CardPhase::Matched);
        assert_eq!(engine.matched_pairs(), 1);
        assert!(score.score() >= 100);
        assert!(!engine.is_resolving());
        assert!(engine.flipped().is_empty());
    }

    #[test]
    fn test_mismatch_snaps_both_cards_down() {
        let ctx = SessionContext::running();
        let mut engine = engine_with(GridSize::new(4, 4), 3);
        let mut score = fresh_score();
        let other = non_partner_of(&engine, 0);

        engine.on_card_clicked(&ctx, 0, &mut score);
        engine.on_card_clicked(&ctx, other, &mut score);
        let resolution = engine.tick(&ctx, 1.0, &mut score).unwrap();
        assert_eq!(resolution, Resolution::Mismatch { indices: vec![0, other] });

        assert_eq!(engine.cards()[0].phase(), CardPhase::FaceDown);
        assert_eq!(engine.cards()[other].phase(), CardPhase::FaceDown);
        assert!(!score.is_perfect_game());
        assert_eq!(score.combo(), 0);
        assert_eq!(engine.matched_pairs(), 0);
    }

    #[test]
    fn test_clicks_ignored_while_resolving_or_paused() {
        let ctx = SessionContext::running();
        let mut engine = engine_with(GridSize::new(4, 4), 11);
        let mut score = fresh_score();

        assert_eq!(
            engine.on_card_clicked(&SessionContext::paused(), 0, &mut score),
            ClickOutcome::Ignored(IgnoreReason::Paused)
        );
        engine.on_card_clicked(&ctx, 0, &mut score);
        assert_eq!(
            engine.on_card_clicked(&ctx, 0, &mut score),
            ClickOutcome::Ignored(IgnoreReason::AlreadySelected)
        );
        engine.on_card_clicked(&ctx, 1, &mut score);
        assert_eq!(
            engine.on_card_clicked(&ctx, 2, &mut score),
            ClickOutcome::Ignored(IgnoreReason::Resolving)
        );
        assert_eq!(
            engine.on_card_clicked(&ctx, 99, &mut ScoreManager::default()),
            ClickOutcome::Ignored(IgnoreReason::Resolving)
        );
        assert_eq!(score.total_moves(), 2);
    }

    #[test]
    fn test_pause_freezes_resolution_timer() {
        let ctx = SessionContext::running();
        let paused = SessionContext::paused();
        let mut engine = engine_with(GridSize::new(2, 2), 5);
        let mut score = fresh_score();
        let partner = partner_of(&engine, 0);

        engine.on_card_clicked(&ctx, 0, &mut score);
        engine.on_card_clicked(&ctx, partner, &mut score);
        assert_eq!(engine.tick(&paused, 10.0, &mut score), None);
        assert!(engine.is_resolving());
        assert!(engine.cards()[0].is_flipping());
        assert_eq!(score.game_time(), 0.0);

        assert!(engine.tick(&ctx, 1.0, &mut score).is_some());
    }

    #[test]
    fn test_non_finite_step_does_not_skip_delay() {
        let ctx = SessionContext::running();
        let mut engine = engine_with(GridSize::new(4, 4), 17);
        let mut score = fresh_score();
        let partner = partner_of(&engine, 0);

        engine.on_card_clicked(&ctx, 0, &mut score);
        engine.on_card_clicked(&ctx, partner, &mut score);
        assert_eq!(engine.tick(&ctx, f32::NAN, &mut score), None);
        assert_eq!(engine.tick(&ctx, -1.0, &mut score), None);
        assert!(engine.is_resolving());
        assert_eq!(score.game_time(), 0.0);

        assert_eq!(engine.tick(&ctx, 0.5, &mut score), None);
        assert!(engine.tick(&ctx, 0.5, &mut score).is_some());
    }

    #[test]
    fn test_snap_back_cancels_flip_and_card_can_be_reselected() {
        let ctx = SessionContext::running();
        let mut engine = engine_with(GridSize::new(4, 4), 13);
        let mut score = fresh_score();

        // Resolve instantly so the flip-up animation is still running when
        // the mismatch lands; the snap-back cancels it.
        engine.rules.match_check_delay = 0.0;
        let other = non_partner_of(&engine, 0);
        engine.on_card_clicked(&ctx, 0, &mut score);
        engine.on_card_clicked(&ctx, other, &mut score);
        engine.tick(&ctx, 0.01, &mut score);
        assert!(!engine.cards()[0].is_flipping());

        engine.on_card_clicked(&ctx, 0, &mut score);
        assert!(engine.cards()[0].is_flipping());
        assert_eq!(
            engine.on_card_clicked(&ctx, 0, &mut score),
            ClickOutcome::Ignored(IgnoreReason::AlreadySelected)
        );
    }

    #[test]
    fn test_completing_last_pair_reports_completion() {
        let ctx = SessionContext::running();
        let mut engine = engine_with(GridSize::new(2, 2), 21);
        let mut score = fresh_score();

        let mut completed = false;
        while !engine.is_complete() {
            let first = (0..4).find(|&i| !engine.cards()[i].is_matched()).unwrap();
            let partner = partner_of(&engine, first);
            engine.on_card_clicked(&ctx, first, &mut score);
            engine.on_card_clicked(&ctx, partner, &mut score);
            if let Some(Resolution::Match { completed: done, .. }) = engine.tick(&ctx, 1.0, &mut score) {
                completed = done;
            }
        }
        assert!(completed);
        assert_eq!(engine.matched_pairs(), engine.total_pairs());
        assert!(engine.cards().iter().all(Card::is_matched));
        assert_eq!(
            engine.on_card_clicked(&ctx, 0, &mut score),
            ClickOutcome::Ignored(IgnoreReason::Matched)
        );
    }

    #[test]
    fn test_resize_defers_without_grid_and_rebuilds_with_one() {
        let mut engine = GridEngine::new(RULES, GridSize::new(4, 4));
        let mut score = fresh_score();
        assert_eq!(
            engine.resize(GridSize::new(3, 4), &mut score).unwrap(),
            ResizeOutcome::Deferred
        );
        assert_eq!(engine.next_size(), GridSize::new(3, 4));

        engine.build_grid(engine.next_size(), Palette::default()).unwrap();
        score.record_move();
        let before = engine.game_id();
        assert_eq!(
            engine.resize(GridSize::new(5, 6), &mut score).unwrap(),
            ResizeOutcome::Rebuilt
        );
        assert_eq!(engine.cards().len(), 30);
        assert_eq!(score.total_moves(), 0);
        assert!(engine.game_id() > before);
    }

    #[test]
    fn test_restore_turns_dangling_flips_face_down() {
        let size = GridSize::new(2, 2);
        let layout = FixedSpacingLayout::default();
        let records: Vec<RestoredCard> = [(0, true, true), (1, true, false), (0, true, true), (1, false, false)]
            .into_iter()
            .enumerate()
            .map(|(i, (value, is_flipped, is_matched))| RestoredCard {
                value,
                is_flipped,
                is_matched,
                grid: size.pos_of(i),
                position: layout.card_position(size.pos_of(i), size),
            })
            .collect();

        let mut engine = GridEngine::new(RULES, GridSize::new(4, 4));
        let normalized = engine.restore(size, 1, 2, &records);
        assert_eq!(normalized, 1);
        assert_eq!(engine.cards()[0].phase(), CardPhase::Matched);
        assert_eq!(engine.cards()[1].phase(), CardPhase::FaceDown);
        assert_eq!(engine.cards()[3].phase(), CardPhase::FaceDown);
        assert_eq!(engine.size(), size);
        assert!(engine.is_game_in_progress());
    }

    #[test]
    fn test_restore_keeps_size_picked_for_next_game() {
        let size = GridSize::new(2, 2);
        let records: Vec<RestoredCard> = [0, 1, 0, 1]
            .into_iter()
            .enumerate()
            .map(|(i, value)| RestoredCard {
                value,
                is_flipped: false,
                is_matched: false,
                grid: size.pos_of(i),
                position: Position::default(),
            })
            .collect();

        let mut engine = GridEngine::new(RULES, GridSize::new(4, 4));
        let mut score = fresh_score();
        engine.resize(GridSize::new(5, 6), &mut score).unwrap();
        engine.restore(size, 0, 2, &records);

        assert_eq!(engine.size(), size);
        assert_eq!(engine.pending_size(), Some(GridSize::new(5, 6)));
        assert_eq!(engine.next_size(), GridSize::new(5, 6));
    }

    proptest! {
        #[test]
        fn prop_grid_values_are_pairs(width in 1u32..9, height in 1u32..9, seed in any::<u64>()) {
            prop_assume!(width * height >= 4 && (width * height) % 2 == 0);
            let engine = engine_with(GridSize::new(width, height), seed);
            let counts = value_counts(&engine);
            prop_assert_eq!(counts.len(), (width * height / 2) as usize);
            prop_assert!(counts.values().all(|&c| c == 2));
        }

        #[test]
        fn prop_shuffle_is_permutation(len in 0usize..64, seed in any::<u64>()) {
            let original: Vec<usize> = (0..len).collect();
            let mut shuffled = original.clone();
            shuffle(&mut shuffled, &mut StdRng::seed_from_u64(seed));
            shuffled.sort_unstable();
            prop_assert_eq!(shuffled, original);
        }

        #[test]
        fn prop_selection_never_exceeds_limit(
            clicks in proptest::collection::vec((0usize..16, 0u8..4), 1..80),
            seed in any::<u64>(),
        ) {
            let ctx = SessionContext::running();
            let mut engine = engine_with(GridSize::new(4, 4), seed);
            let mut score = fresh_score();
            for (index, ticks) in clicks {
                let was_resolving = engine.is_resolving();
                let outcome = engine.on_card_clicked(&ctx, index, &mut score);
                if was_resolving {
                    prop_assert_eq!(outcome, ClickOutcome::Ignored(IgnoreReason::Resolving));
                }
                prop_assert!(engine.flipped().len() <= MAX_FLIPPED_CARDS);
                for _ in 0..ticks {
                    engine.tick(&ctx, 0.4, &mut score);
                    prop_assert!(engine.flipped().len() <= MAX_FLIPPED_CARDS);
                }
                prop_assert!(engine.matched_pairs() <= engine.total_pairs());
            }
        }
    }
}
