pub mod app;
pub mod audio;
pub mod board;
pub mod card;
pub mod layout;
pub mod score;
pub mod session_save;
pub mod state;
