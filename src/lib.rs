//! Core of a pair-matching card game: a grid of face-down cards, a two-card
//! selection protocol, combo scoring and a resumable save slot.

pub mod config;
pub mod error;
pub mod game;

pub use config::GameConfig;
pub use error::{GridError, PersistenceError};
pub use game::app::Game;
pub use game::state::{GridPos, GridPreset, GridSize, SessionContext};
