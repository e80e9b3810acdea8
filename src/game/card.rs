use tracing::debug;

use super::state::{GridPos, Position, SessionContext};

pub const DEFAULT_FLIP_DURATION: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardPhase {
    FaceDown,
    Flipping,
    FaceUp,
    Matched,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipRequest {
    Started,
    Blocked,
}

/// What a tick did to a running flip, for the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipProgress {
    FaceChanged,
    Finished,
    FaceChangedAndFinished,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FlipAnimation {
    elapsed: f32,
    duration: f32,
    face_applied: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    value: u32,
    flipped: bool,
    matched: bool,
    flip: Option<FlipAnimation>,
    flip_duration: f32,
    generation: u64,
    grid: GridPos,
    position: Position,
}

impl Card {
    pub fn new(value: u32, grid: GridPos, position: Position, flip_duration: f32) -> Self {
        Card {
            value,
            flipped: false,
            matched: false,
            flip: None,
            flip_duration: flip_duration.max(0.0),
            generation: 0,
            grid,
            position,
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub fn is_flipping(&self) -> bool {
        self.flip.is_some()
    }

    pub fn grid(&self) -> GridPos {
        self.grid
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Bumped whenever an animation is cancelled or state is restored, so a
    /// renderer can drop anything tied to the previous state.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> CardPhase {
        if self.matched {
            CardPhase::Matched
        } else if self.flip.is_some() {
            CardPhase::Flipping
        } else if self.flipped {
            CardPhase::FaceUp
        } else {
            CardPhase::FaceDown
        }
    }

    /// Fraction of the running flip, `None` when idle.
    pub fn flip_progress(&self) -> Option<f32> {
        self.flip.map(|anim| {
            if anim.duration <= 0.0 {
                1.0
            } else {
                (anim.elapsed / anim.duration).clamp(0.0, 1.0)
            }
        })
    }

    pub fn request_flip(&mut self, ctx: &SessionContext) -> FlipRequest {
        if ctx.paused || self.flip.is_some() || self.matched {
            debug!(
                value = self.value,
                paused = ctx.paused,
                flipping = self.flip.is_some(),
                matched = self.matched,
                "flip blocked"
            );
            return FlipRequest::Blocked;
        }
        self.flip = Some(FlipAnimation {
            elapsed: 0.0,
            duration: self.flip_duration,
            face_applied: false,
        });
        FlipRequest::Started
    }

    pub fn advance(&mut self, dt: f32) -> Option<FlipProgress> {
        let anim = self.flip.as_mut()?;
        anim.elapsed += dt.max(0.0);

        let mut face_changed = false;
        if !anim.face_applied && anim.elapsed >= anim.duration / 2.0 {
            anim.face_applied = true;
            self.flipped = !self.flipped;
            face_changed = true;
        }

        let finished = anim.elapsed >= anim.duration;
        if finished {
            self.flip = None;
            debug!(
                value = self.value,
                face_up = self.flipped,
                "flip complete"
            );
        }

        match (face_changed, finished) {
            (true, true) => Some(FlipProgress::FaceChangedAndFinished),
            (true, false) => Some(FlipProgress::FaceChanged),
            (false, true) => Some(FlipProgress::Finished),
            (false, false) => None,
        }
    }

    fn cancel_flip(&mut self) {
        if self.flip.take().is_some() {
            self.generation = self.generation.wrapping_add(1);
        }
    }

    pub fn force_to_face_down(&mut self) {
        if self.matched {
            return;
        }
        self.cancel_flip();
        self.flipped = false;
    }

    pub fn mark_matched(&mut self) {
        self.cancel_flip();
        self.flipped = true;
        self.matched = true;
    }

    pub fn restore_state(&mut self, value: u32, is_flipped: bool, is_matched: bool) {
        self.flip = None;
        self.generation = self.generation.wrapping_add(1);
        self.value = value;
        self.matched = is_matched;
        self.flipped = is_flipped || is_matched;
    }
}
