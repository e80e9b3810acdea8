use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Flip,
    Match,
    Mismatch,
    Win,
    Button,
    ComboBonus,
}

impl SoundCue {
    pub fn name(self) -> &'static str {
        match self {
            SoundCue::Flip => "card_flip",
            SoundCue::Match => "card_match",
            SoundCue::Mismatch => "card_mismatch",
            SoundCue::Win => "game_win",
            SoundCue::Button => "button_click",
            SoundCue::ComboBonus => "combo_bonus",
        }
    }
}

/// Fire-and-forget sound trigger. Implementations must not fail the caller.
pub trait AudioSink {
    fn play(&mut self, cue: SoundCue);
}

#[derive(Debug, Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&mut self, cue: SoundCue) {
        trace!(cue = cue.name(), "sound suppressed");
    }
}

/// Keeps every cue it was asked to play. Clones share one log.
#[derive(Clone, Debug, Default)]
pub struct RecordingAudio {
    played: Rc<RefCell<Vec<SoundCue>>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        RecordingAudio::default()
    }

    pub fn played(&self) -> Vec<SoundCue> {
        self.played.borrow().clone()
    }

    pub fn count(&self, cue: SoundCue) -> usize {
        self.played.borrow().iter().filter(|played| **played == cue).count()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, cue: SoundCue) {
        trace!(cue = cue.name(), "sound");
        self.played.borrow_mut().push(cue);
    }
}
