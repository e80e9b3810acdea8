use super::state::{GridPos, GridSize, Position};

pub const FALLBACK_CARD_SPACING: f32 = 1.2;

/// Places cards in world space. Screen-aware layouts live with the renderer;
/// the core only needs a position per card to persist.
pub trait LayoutCalculator {
    fn card_position(&self, pos: GridPos, size: GridSize) -> Position;
}

/// Centers the grid on the origin with a fixed pitch between card centers.
/// Row 0 is the top row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedSpacingLayout {
    pub spacing: f32,
}

impl FixedSpacingLayout {
    pub fn new(spacing: f32) -> Self {
        FixedSpacingLayout { spacing }
    }
}

impl Default for FixedSpacingLayout {
    fn default() -> Self {
        FixedSpacingLayout::new(FALLBACK_CARD_SPACING)
    }
}

impl LayoutCalculator for FixedSpacingLayout {
    fn card_position(&self, pos: GridPos, size: GridSize) -> Position {
        let half_w = (size.width.saturating_sub(1)) as f32 * self.spacing / 2.0;
        let half_h = (size.height.saturating_sub(1)) as f32 * self.spacing / 2.0;
        Position::new(
            pos.x as f32 * self.spacing - half_w,
            half_h - pos.y as f32 * self.spacing,
            0.0,
        )
    }
}
