use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::board::{Position, Side};
use crate::error::EngineError;
use crate::search::{AdversarialGame, Evaluate};

/// Classification of a game state as reported to the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ongoing,
    /// The side to move is in check but has a reply.
    Check,
    /// Carries the winning side.
    Checkmate(Side),
    Stalemate,
    Win(Side),
    Draw,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Ongoing | Outcome::Check)
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            Outcome::Checkmate(side) | Outcome::Win(side) => Some(*side),
            _ => None,
        }
    }
}

/// The call contract between a game and its callers.
///
/// States are values: `apply_human_move` returns a new state and leaves
/// `self` untouched, so a rejected move never disturbs what the caller holds.
pub trait GameRules: Clone + Send + Sized + 'static {
    type Move: Copy + PartialEq + Debug + Send + 'static;
    /// The board the search engine works on.
    type Snapshot: AdversarialGame<Move = Self::Move> + Clone + Send + 'static;
    type Evaluator: Evaluate<Self::Snapshot> + Default + Send + 'static;

    /// Name used in log lines.
    const NAME: &'static str;
    /// Search depth for easy, medium and hard play.
    const DEPTHS: [u32; 3];

    fn new_game() -> Self;

    fn side_to_move(&self) -> Side;

    /// Legal moves of the token at `position`; empty when there is no token
    /// there or it does not belong to the side to move.
    fn legal_moves_for(&self, position: Position) -> Result<Vec<Self::Move>, EngineError>;

    fn all_legal_moves(&self) -> Vec<Self::Move>;

    fn apply_human_move(&self, mv: Self::Move) -> Result<Self, EngineError>;

    fn snapshot(&self) -> Self::Snapshot;

    /// Pure function of `self` and `depth`: same inputs, same move.
    fn request_engine_move(&self, depth: u32) -> Option<Self::Move>;

    fn classify(&self) -> Outcome;
}
