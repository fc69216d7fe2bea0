//! Connect-four: a 6x7 grid filled from the bottom, four in a line wins.

use std::fmt;

use log::info;

use crate::board::{Position, Side};
use crate::error::EngineError;
use crate::evaluation::Neutral;
use crate::rules::{GameRules, Outcome};
use crate::search::{AdversarialGame, Search, Terminal};

pub const ROWS: u8 = 6;
pub const COLS: u8 = 7;
const CONNECT: usize = 4;

/// Columns are offered center-first so the search meets strong moves early.
const COLUMN_ORDER: [u8; COLS as usize] = [3, 2, 4, 1, 5, 0, 6];

const LINES: [(i8, i8); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// A column to drop into; the landing row follows from the column.
pub type Column = u8;

/// Record of one drop, enough to lift the token back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub position: Position,
    winner_before: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectFour {
    cells: [[Option<Side>; COLS as usize]; ROWS as usize],
    heights: [u8; COLS as usize],
    pub side_to_move: Side,
    winner: Option<Side>,
}

impl ConnectFour {
    pub fn new() -> Self {
        Self {
            cells: [[None; COLS as usize]; ROWS as usize],
            heights: [0; COLS as usize],
            side_to_move: Side::First,
            winner: None,
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row < ROWS && pos.col < COLS
    }

    pub fn owner_at(&self, pos: Position) -> Option<Side> {
        self.cells
            .get(pos.row as usize)
            .and_then(|row| row.get(pos.col as usize))
            .copied()
            .flatten()
    }

    /// Lowest empty row of `column`, if the column has room.
    pub fn landing_row(&self, column: Column) -> Option<u8> {
        self.heights
            .get(column as usize)
            .copied()
            .filter(|&height| height < ROWS)
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn is_full(&self) -> bool {
        self.heights.iter().all(|&height| height == ROWS)
    }

    pub fn is_draw(&self) -> bool {
        self.winner.is_none() && self.is_full()
    }

    /// Open columns in center-first order; none once somebody has won.
    pub fn legal_columns(&self) -> Vec<Column> {
        if self.winner.is_some() {
            return Vec::new();
        }
        COLUMN_ORDER
            .iter()
            .copied()
            .filter(|&column| self.landing_row(column).is_some())
            .collect()
    }

    /// Drops a token for the side to move and passes the turn.
    pub fn drop_token(&mut self, column: Column) -> Result<Placement, EngineError> {
        if column >= COLS {
            return Err(EngineError::OutOfBounds(Position::new(ROWS - 1, column)));
        }
        if self.winner.is_some() {
            return Err(EngineError::GameOver);
        }
        let row = self.landing_row(column).ok_or(EngineError::IllegalMove)?;
        let side = self.side_to_move;
        let position = Position::new(row, column);

        let placement = Placement {
            position,
            winner_before: self.winner,
        };
        self.cells[row as usize][column as usize] = Some(side);
        self.heights[column as usize] += 1;
        if self.completes_line(position, side) {
            self.winner = Some(side);
        }
        self.side_to_move = side.opposite();
        Ok(placement)
    }

    pub fn lift_token(&mut self, placement: Placement) {
        let Position { row, col } = placement.position;
        self.cells[row as usize][col as usize] = None;
        self.heights[col as usize] = row;
        self.winner = placement.winner_before;
        self.side_to_move = self.side_to_move.opposite();
    }

    /// Counts runs through `pos` only, in each of the four line directions.
    fn completes_line(&self, pos: Position, side: Side) -> bool {
        LINES.iter().any(|&(dr, dc)| {
            1 + self.run_length(pos, dr, dc, side) + self.run_length(pos, -dr, -dc, side) >= CONNECT
        })
    }

    fn run_length(&self, from: Position, dr: i8, dc: i8, side: Side) -> usize {
        let mut count = 0;
        let mut cursor = from;
        while let Some(next) = cursor.offset(dr, dc, ROWS, COLS) {
            if self.owner_at(next) != Some(side) {
                break;
            }
            count += 1;
            cursor = next;
        }
        count
    }
}

impl Default for ConnectFour {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectFour {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in (0..ROWS).rev() {
            let line: Vec<String> = (0..COLS)
                .map(|col| match self.owner_at(Position::new(row, col)) {
                    Some(Side::First) => "X".to_string(),
                    Some(Side::Second) => "O".to_string(),
                    None => ".".to_string(),
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        let footer: Vec<String> = (0..COLS).map(|col| col.to_string()).collect();
        write!(f, "{}", footer.join(" "))
    }
}

impl AdversarialGame for ConnectFour {
    type Move = Column;
    type Undo = Option<Placement>;

    fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    fn legal_moves(&mut self) -> Vec<Column> {
        self.legal_columns()
    }

    fn terminal(&mut self, _legal: &[Column]) -> Option<Terminal> {
        match self.winner {
            Some(side) => Some(Terminal::Win(side)),
            None if self.is_full() => Some(Terminal::Draw),
            None => None,
        }
    }

    fn play(&mut self, column: Column) -> Option<Placement> {
        self.drop_token(column).ok()
    }

    fn undo(&mut self, undo: Option<Placement>) {
        if let Some(placement) = undo {
            self.lift_token(placement);
        }
    }
}

/// Connect-four game state handed to the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectFourState {
    pub board: ConnectFour,
    /// Every token in the order it was dropped.
    pub placed: Vec<Position>,
}

impl ConnectFourState {
    pub fn new() -> Self {
        Self {
            board: ConnectFour::new(),
            placed: Vec::new(),
        }
    }

    pub fn winner(&self) -> Option<Side> {
        self.board.winner()
    }

    pub fn is_draw(&self) -> bool {
        self.board.is_draw()
    }

    pub fn last_placed(&self) -> Option<Position> {
        self.placed.last().copied()
    }
}

impl Default for ConnectFourState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRules for ConnectFourState {
    type Move = Column;
    type Snapshot = ConnectFour;
    type Evaluator = Neutral;

    const NAME: &'static str = "connect-four";
    const DEPTHS: [u32; 3] = [4, 5, 6];

    fn new_game() -> Self {
        Self::new()
    }

    fn side_to_move(&self) -> Side {
        self.board.side_to_move
    }

    fn legal_moves_for(&self, position: Position) -> Result<Vec<Column>, EngineError> {
        if !self.board.in_bounds(position) {
            return Err(EngineError::OutOfBounds(position));
        }
        Ok(self
            .board
            .legal_columns()
            .into_iter()
            .filter(|&column| column == position.col)
            .collect())
    }

    fn all_legal_moves(&self) -> Vec<Column> {
        self.board.legal_columns()
    }

    fn apply_human_move(&self, column: Column) -> Result<Self, EngineError> {
        let mut next = self.clone();
        let placement = next.board.drop_token(column)?;
        next.placed.push(placement.position);
        if let Some(winner) = next.board.winner() {
            info!("{} won connect-four after {} tokens", winner, next.placed.len());
        } else if next.board.is_draw() {
            info!("connect-four board filled without a winner");
        }
        Ok(next)
    }

    fn snapshot(&self) -> ConnectFour {
        self.board.clone()
    }

    fn request_engine_move(&self, depth: u32) -> Option<Column> {
        Search::new(Neutral).choose_move(&mut self.snapshot(), depth)
    }

    fn classify(&self) -> Outcome {
        match self.board.winner() {
            Some(side) => Outcome::Win(side),
            None if self.board.is_full() => Outcome::Draw,
            None => Outcome::Ongoing,
        }
    }
}
