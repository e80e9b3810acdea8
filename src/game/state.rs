use std::fmt;

use serde::{Deserialize, Serialize};

/// Cards that may be face-up and awaiting resolution at once.
pub const MAX_FLIPPED_CARDS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub const fn new(width: u32, height: u32) -> Self {
        GridSize { width, height }
    }

    pub fn card_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn pair_count(self) -> usize {
        self.card_count() / 2
    }

    /// Drops one column or row so the card count becomes even. The larger
    /// dimension shrinks; on a tie the width does.
    pub fn evened(self) -> Self {
        if self.card_count() % 2 == 0 {
            return self;
        }
        if self.width >= self.height && self.width > 1 {
            GridSize::new(self.width - 1, self.height)
        } else if self.height > 1 {
            GridSize::new(self.width, self.height - 1)
        } else {
            self
        }
    }

    pub fn pos_of(self, index: usize) -> GridPos {
        let width = self.width.max(1) as usize;
        GridPos::new((index % width) as u32, (index / width) as u32)
    }

    pub fn index_of(self, pos: GridPos) -> Option<usize> {
        if pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        Some(pos.y as usize * self.width as usize + pos.x as usize)
    }
}

impl Default for GridSize {
    fn default() -> Self {
        GridSize::new(4, 4)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub const fn new(x: u32, y: u32) -> Self {
        GridPos { x, y }
    }
}

/// World-space position handed out by the layout calculator.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Position { x, y, z }
    }
}

/// Grid choices offered by the settings menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GridPreset {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
}

impl GridPreset {
    pub const ALL: [GridPreset; 4] = [
        GridPreset::Tiny,
        GridPreset::Small,
        GridPreset::Medium,
        GridPreset::Large,
    ];

    pub fn size(self) -> GridSize {
        match self {
            GridPreset::Tiny => GridSize::new(2, 2),
            GridPreset::Small => GridSize::new(3, 4),
            GridPreset::Medium => GridSize::new(4, 4),
            GridPreset::Large => GridSize::new(5, 6),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GridPreset::Tiny => "2x2",
            GridPreset::Small => "3x4",
            GridPreset::Medium => "4x4",
            GridPreset::Large => "5x6",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        let value = value.trim();
        GridPreset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(value))
    }
}

/// Per-session flags every input path consults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub paused: bool,
}

impl SessionContext {
    pub fn running() -> Self {
        SessionContext { paused: false }
    }

    pub fn paused() -> Self {
        SessionContext { paused: true }
    }
}

/// Face labels indexed by card value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    faces: Vec<String>,
}

impl Palette {
    pub fn new<I, S>(faces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Palette {
            faces: faces.into_iter().map(Into::into).collect(),
        }
    }

    /// Label for `value`; wraps when the palette is shorter than the pair count.
    pub fn face_of(&self, value: u32) -> &str {
        if self.faces.is_empty() {
            return "?";
        }
        &self.faces[value as usize % self.faces.len()]
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::new([
            // Animals
            "🐶", "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼", "🐨", "🐯", "🦁", "🐮", "🐷", "🐸", "🐵",
            // Fruits
            "🍏", "🍎", "🍐", "🍊", "🍋", "🍌", "🍉", "🍇", "🍓", "🍒",
            // Sports
            "⚽", "🏀", "🏈", "⚾", "🎾", "🏐",
        ])
    }
}
