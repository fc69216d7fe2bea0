//! Rules for chess and connect-four, an alpha-beta opponent for both, and
//! a session layer that runs the opponent on a worker thread.

pub mod board;
pub mod chess;
pub mod config;
pub mod connect_four;
pub mod console;
pub mod error;
pub mod evaluation;
pub mod movegen;
pub mod rng;
pub mod rules;
pub mod search;
pub mod session;

pub use board::{Board, Piece, PieceKind, Position, Side};
pub use chess::ChessState;
pub use config::{Difficulty, SessionConfig};
pub use connect_four::{Column, ConnectFour, ConnectFourState};
pub use console::Console;
pub use error::EngineError;
pub use movegen::{Move, MoveGenerator};
pub use rules::{GameRules, Outcome};
pub use search::{AdversarialGame, Evaluate, Search};
pub use session::{Phase, Session};
