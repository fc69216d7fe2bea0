use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::movegen::Move;

pub const BOARD_SIZE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Kinds a pawn may turn into on the last rank, in generation order.
    pub const PROMOTIONS: [PieceKind; 4] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
    ];

    pub fn is_promotion_target(self) -> bool {
        !matches!(self, PieceKind::Pawn | PieceKind::King)
    }

    pub fn symbol(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }
}

/// One of the two players. In chess `First` is white and advances toward
/// higher rows; in connect-four `First` drops the opening token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::First => write!(f, "first"),
            Side::Second => write!(f, "second"),
        }
    }
}

/// Zero-based grid coordinate. Row 0 is white's back rank for chess and the
/// bottom row for connect-four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Steps by `(dr, dc)`, returning `None` once the result leaves a
    /// `rows` x `cols` grid.
    pub fn offset(self, dr: i8, dc: i8, rows: u8, cols: u8) -> Option<Position> {
        let row = self.row as i16 + dr as i16;
        let col = self.col as i16 + dc as i16;
        if row < 0 || col < 0 || row >= rows as i16 || col >= cols as i16 {
            return None;
        }
        Some(Position::new(row as u8, col as u8))
    }

    /// Parses algebraic notation such as `e2`.
    pub fn parse(text: &str) -> Option<Position> {
        let mut chars = text.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() || !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return None;
        }
        Some(Position::new(rank as u8 - b'1', file as u8 - b'a'))
    }

    pub fn is_light_square(&self) -> bool {
        (self.row + self.col) % 2 == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col) as char, (b'1' + self.row) as char)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub side: Side,
    pub has_moved: bool,
}

impl Piece {
    pub fn new(kind: PieceKind, side: Side) -> Self {
        Self {
            kind,
            side,
            has_moved: false,
        }
    }

    pub fn symbol(&self) -> char {
        match self.side {
            Side::First => self.kind.symbol().to_ascii_uppercase(),
            Side::Second => self.kind.symbol(),
        }
    }
}

/// Everything `make_move` changed, so `unmake_move` can put it back.
#[derive(Debug, Clone)]
pub struct Undo {
    mv: Move,
    moved: Option<Piece>,
    captured: Option<(Position, Piece)>,
    rook: Option<(Position, Position, Piece)>,
    en_passant: Option<Position>,
    halfmove_clock: u16,
}

impl Undo {
    pub fn captured(&self) -> Option<Piece> {
        self.captured.map(|(_, piece)| piece)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Piece>; BOARD_SIZE as usize]; BOARD_SIZE as usize],
    pub side_to_move: Side,
    pub en_passant: Option<Position>,
    pub halfmove_clock: u16,
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

impl Board {
    pub fn new() -> Self {
        let mut board = Self::empty(Side::First);
        for (col, &kind) in BACK_RANK.iter().enumerate() {
            let col = col as u8;
            board.put(Position::new(0, col), Piece::new(kind, Side::First));
            board.put(Position::new(1, col), Piece::new(PieceKind::Pawn, Side::First));
            board.put(Position::new(6, col), Piece::new(PieceKind::Pawn, Side::Second));
            board.put(Position::new(7, col), Piece::new(kind, Side::Second));
        }
        board
    }

    /// A board with no pieces, for building fixtures.
    pub fn empty(side_to_move: Side) -> Self {
        Self {
            cells: [[None; BOARD_SIZE as usize]; BOARD_SIZE as usize],
            side_to_move,
            en_passant: None,
            halfmove_clock: 0,
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row < BOARD_SIZE && pos.col < BOARD_SIZE
    }

    pub fn checked(&self, pos: Position) -> Result<Position, EngineError> {
        if self.in_bounds(pos) {
            Ok(pos)
        } else {
            Err(EngineError::OutOfBounds(pos))
        }
    }

    pub fn piece_at(&self, pos: Position) -> Option<Piece> {
        self.cells
            .get(pos.row as usize)
            .and_then(|row| row.get(pos.col as usize))
            .copied()
            .flatten()
    }

    pub fn put(&mut self, pos: Position, piece: Piece) {
        self.set(pos, Some(piece));
    }

    pub fn take(&mut self, pos: Position) -> Option<Piece> {
        let piece = self.piece_at(pos);
        self.set(pos, None);
        piece
    }

    fn set(&mut self, pos: Position, cell: Option<Piece>) {
        if let Some(slot) = self
            .cells
            .get_mut(pos.row as usize)
            .and_then(|row| row.get_mut(pos.col as usize))
        {
            *slot = cell;
        }
    }

    /// Occupied squares of `side`, scanned row-major.
    pub fn pieces(&self, side: Side) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.occupied().filter(move |(_, piece)| piece.side == side)
    }

    pub fn occupied(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, cell)| {
                cell.map(|piece| (Position::new(row as u8, col as u8), piece))
            })
        })
    }

    pub fn king_square(&self, side: Side) -> Option<Position> {
        self.pieces(side)
            .find(|(_, piece)| piece.kind == PieceKind::King)
            .map(|(pos, _)| pos)
    }

    pub fn home_row(side: Side) -> u8 {
        match side {
            Side::First => 0,
            Side::Second => BOARD_SIZE - 1,
        }
    }

    pub fn pawn_direction(side: Side) -> i8 {
        match side {
            Side::First => 1,
            Side::Second => -1,
        }
    }

    pub fn promotion_row(side: Side) -> u8 {
        Board::home_row(side.opposite())
    }

    /// Plays `mv` in place. The move is trusted to be at least pseudo-legal.
    /// The mover is whoever stands on `mv.from`; the side to move flips.
    pub fn make_move(&mut self, mv: &Move) -> Undo {
        let mut undo = Undo {
            mv: *mv,
            moved: self.take(mv.from),
            captured: None,
            rook: None,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
        };

        let Some(piece) = undo.moved else {
            self.side_to_move = self.side_to_move.opposite();
            return undo;
        };
        let side = piece.side;

        // En passant removes a pawn beside the origin, not on the target.
        let captured_at = if mv.is_en_passant {
            Position::new(mv.from.row, mv.to.col)
        } else {
            mv.to
        };
        undo.captured = self.take(captured_at).map(|captured| (captured_at, captured));

        let kind = match mv.promotion {
            Some(kind) => kind,
            None if piece.kind == PieceKind::Pawn && mv.to.row == Board::promotion_row(side) => {
                PieceKind::Queen
            }
            None => piece.kind,
        };
        self.put(
            mv.to,
            Piece {
                kind,
                side,
                has_moved: true,
            },
        );

        if mv.is_castling {
            let (rook_from, rook_to) = mv.castling_rook();
            if let Some(rook) = self.take(rook_from) {
                self.put(
                    rook_to,
                    Piece {
                        has_moved: true,
                        ..rook
                    },
                );
                undo.rook = Some((rook_from, rook_to, rook));
            }
        }

        self.en_passant = if piece.kind == PieceKind::Pawn && mv.from.row.abs_diff(mv.to.row) == 2 {
            Some(Position::new((mv.from.row + mv.to.row) / 2, mv.from.col))
        } else {
            None
        };

        if piece.kind == PieceKind::Pawn || undo.captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }

        self.side_to_move = self.side_to_move.opposite();
        undo
    }

    pub fn unmake_move(&mut self, undo: Undo) {
        self.side_to_move = self.side_to_move.opposite();
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;

        let Some(piece) = undo.moved else {
            return;
        };
        if let Some((rook_from, rook_to, rook)) = undo.rook {
            self.set(rook_to, None);
            self.put(rook_from, rook);
        }
        self.set(undo.mv.to, None);
        if let Some((pos, captured)) = undo.captured {
            self.put(pos, captured);
        }
        self.put(undo.mv.from, piece);
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in (0..BOARD_SIZE).rev() {
            write!(f, "{} ", row + 1)?;
            for col in 0..BOARD_SIZE {
                let symbol = self
                    .piece_at(Position::new(row, col))
                    .map(|piece| piece.symbol())
                    .unwrap_or('.');
                write!(f, "{}", symbol)?;
                if col < BOARD_SIZE - 1 {
                    write!(f, " ")?;
                }
            }
            writeln!(f)?;
        }
        write!(f, "  a b c d e f g h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_algebraic_squares() {
        assert_eq!(Position::parse("a1"), Some(Position::new(0, 0)));
        assert_eq!(Position::parse("e2"), Some(Position::new(1, 4)));
        assert_eq!(Position::parse("h8"), Some(Position::new(7, 7)));
        assert_eq!(Position::parse("i1"), None);
        assert_eq!(Position::parse("a9"), None);
        assert_eq!(Position::parse("a10"), None);
        assert_eq!(Position::new(3, 4).to_string(), "e4");
    }

    #[test]
    fn offsets_stop_at_edges() {
        let corner = Position::new(0, 0);
        assert_eq!(corner.offset(-1, 0, 8, 8), None);
        assert_eq!(corner.offset(0, -1, 8, 8), None);
        assert_eq!(corner.offset(1, 1, 8, 8), Some(Position::new(1, 1)));
        assert_eq!(Position::new(5, 6).offset(1, 0, 6, 7), None);
    }

    #[test]
    fn bounds_are_checked() {
        let board = Board::new();
        assert!(board.checked(Position::new(7, 7)).is_ok());
        assert_eq!(
            board.checked(Position::new(8, 0)),
            Err(EngineError::OutOfBounds(Position::new(8, 0)))
        );
        assert_eq!(board.piece_at(Position::new(9, 9)), None);
    }

    #[test]
    fn initial_setup_has_one_king_each() {
        let board = Board::new();
        assert_eq!(board.occupied().count(), 32);
        assert_eq!(board.king_square(Side::First), Some(Position::new(0, 4)));
        assert_eq!(board.king_square(Side::Second), Some(Position::new(7, 4)));
        assert_eq!(board.piece_at(Position::new(7, 3)).map(|p| p.kind), Some(PieceKind::Queen));
    }

    #[test]
    fn display_shows_ranks_top_down() {
        let text = Board::new().to_string();
        let first = text.lines().next().unwrap_or_default();
        assert_eq!(first, "8 r n b q k b n r");
        assert!(text.ends_with("  a b c d e f g h"));
    }

    #[test]
    fn unmake_restores_double_step() {
        let mut board = Board::new();
        let before = board.clone();
        let mv = Move::new(Position::new(1, 4), Position::new(3, 4), PieceKind::Pawn);
        let undo = board.make_move(&mv);
        assert_eq!(board.en_passant, Some(Position::new(2, 4)));
        assert_eq!(board.side_to_move, Side::Second);
        assert!(board.piece_at(Position::new(3, 4)).is_some_and(|p| p.has_moved));
        board.unmake_move(undo);
        assert_eq!(board, before);
    }
}
