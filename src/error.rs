use thiserror::Error;

use crate::board::{PieceKind, Position};

/// Rejections raised by the rules engine and the session controller.
///
/// Every variant is recoverable: the state the call was made against is left
/// untouched and the caller decides whether to re-prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("illegal move")]
    IllegalMove,
    #[error("position ({}, {}) is outside the board", .0.row, .0.col)]
    OutOfBounds(Position),
    #[error("cannot promote to {0:?}")]
    InvalidPromotion(PieceKind),
    #[error("the engine is still thinking")]
    Busy,
    #[error("the game is over")]
    GameOver,
}
