use crate::board::{Board, PieceKind, Position, Side, BOARD_SIZE};
use crate::search::Evaluate;

type Table = [[i32; 8]; 8];

// Tables read from the owner's point of view: row 0 is the far (promotion)
// rank, row 7 the owner's back rank.
const PAWN_TABLE: Table = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [50, 50, 50, 50, 50, 50, 50, 50],
    [10, 10, 20, 30, 30, 20, 10, 10],
    [5, 5, 10, 25, 25, 10, 5, 5],
    [0, 0, 0, 20, 20, 0, 0, 0],
    [5, -5, -10, 0, 0, -10, -5, 5],
    [5, 10, 10, -20, -20, 10, 10, 5],
    [0, 0, 0, 0, 0, 0, 0, 0],
];

const KNIGHT_TABLE: Table = [
    [-50, -40, -30, -30, -30, -30, -40, -50],
    [-40, -20, 0, 0, 0, 0, -20, -40],
    [-30, 0, 10, 15, 15, 10, 0, -30],
    [-30, 5, 15, 20, 20, 15, 5, -30],
    [-30, 0, 15, 20, 20, 15, 0, -30],
    [-30, 5, 10, 15, 15, 10, 5, -30],
    [-40, -20, 0, 5, 5, 0, -20, -40],
    [-50, -40, -30, -30, -30, -30, -40, -50],
];

const BISHOP_TABLE: Table = [
    [-20, -10, -10, -10, -10, -10, -10, -20],
    [-10, 0, 0, 0, 0, 0, 0, -10],
    [-10, 0, 5, 10, 10, 5, 0, -10],
    [-10, 5, 5, 10, 10, 5, 5, -10],
    [-10, 0, 10, 10, 10, 10, 0, -10],
    [-10, 10, 10, 10, 10, 10, 10, -10],
    [-10, 5, 0, 0, 0, 0, 5, -10],
    [-20, -10, -10, -10, -10, -10, -10, -20],
];

const ROOK_TABLE: Table = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [5, 10, 10, 10, 10, 10, 10, 5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [0, 0, 0, 5, 5, 0, 0, 0],
];

const QUEEN_TABLE: Table = [
    [-20, -10, -10, -5, -5, -10, -10, -20],
    [-10, 0, 0, 0, 0, 0, 0, -10],
    [-10, 0, 5, 5, 5, 5, 0, -10],
    [-5, 0, 5, 5, 5, 5, 0, -5],
    [0, 0, 5, 5, 5, 5, 0, -5],
    [-10, 5, 5, 5, 5, 5, 0, -10],
    [-10, 0, 5, 0, 0, 0, 0, -10],
    [-20, -10, -10, -5, -5, -10, -10, -20],
];

const KING_TABLE: Table = [
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-20, -30, -30, -40, -40, -30, -30, -20],
    [-10, -20, -20, -20, -20, -20, -20, -10],
    [20, 20, 0, 0, 0, 0, 20, 20],
    [20, 30, 10, 0, 0, 10, 30, 20],
];

const KING_ENDGAME_TABLE: Table = [
    [-50, -40, -30, -20, -20, -30, -40, -50],
    [-30, -20, -10, 0, 0, -10, -20, -30],
    [-30, -10, 20, 30, 30, 20, -10, -30],
    [-30, -10, 30, 40, 40, 30, -10, -30],
    [-30, -10, 30, 40, 40, 30, -10, -30],
    [-30, -10, 20, 30, 30, 20, -10, -30],
    [-30, -30, 0, 0, 0, 0, -30, -30],
    [-50, -30, -30, -30, -30, -30, -30, -50],
];

/// Static chess evaluation in centipawns, positive when `Side::First` is
/// better: material, piece-square tables, pawn structure and king shelter.
#[derive(Debug, Clone)]
pub struct Evaluator {
    pub pawn_value: i32,
    pub knight_value: i32,
    pub bishop_value: i32,
    pub rook_value: i32,
    pub queen_value: i32,
    pub king_value: i32,

    pub doubled_pawn_penalty: i32,
    pub isolated_pawn_penalty: i32,
    pub passed_pawn_bonus: i32,
    pub pawn_shield_bonus: i32,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            pawn_value: 100,
            knight_value: 320,
            bishop_value: 330,
            rook_value: 500,
            queen_value: 900,
            king_value: 20000,

            doubled_pawn_penalty: -10,
            isolated_pawn_penalty: -20,
            passed_pawn_bonus: 20,
            pawn_shield_bonus: 5,
        }
    }

    pub fn evaluate(&self, board: &Board) -> i32 {
        let endgame = self.is_endgame(board);
        let mut score = 0;

        for (pos, piece) in board.occupied() {
            let value = self.piece_value(piece.kind) + self.position_bonus(piece.kind, piece.side, pos, endgame);
            score += signed(piece.side, value);
        }

        score += self.pawn_structure(board, Side::First) - self.pawn_structure(board, Side::Second);
        score += self.king_shelter(board, Side::First) - self.king_shelter(board, Side::Second);
        score
    }

    pub fn piece_value(&self, kind: PieceKind) -> i32 {
        match kind {
            PieceKind::Pawn => self.pawn_value,
            PieceKind::Knight => self.knight_value,
            PieceKind::Bishop => self.bishop_value,
            PieceKind::Rook => self.rook_value,
            PieceKind::Queen => self.queen_value,
            PieceKind::King => self.king_value,
        }
    }

    fn position_bonus(&self, kind: PieceKind, side: Side, pos: Position, endgame: bool) -> i32 {
        let table = match kind {
            PieceKind::Pawn => &PAWN_TABLE,
            PieceKind::Knight => &KNIGHT_TABLE,
            PieceKind::Bishop => &BISHOP_TABLE,
            PieceKind::Rook => &ROOK_TABLE,
            PieceKind::Queen => &QUEEN_TABLE,
            PieceKind::King if endgame => &KING_ENDGAME_TABLE,
            PieceKind::King => &KING_TABLE,
        };
        let row = match side {
            Side::First => BOARD_SIZE - 1 - pos.row,
            Side::Second => pos.row,
        };
        table[row as usize][pos.col as usize]
    }

    /// Few heavy pieces left.
    fn is_endgame(&self, board: &Board) -> bool {
        let heavy = board
            .occupied()
            .filter(|(_, piece)| matches!(piece.kind, PieceKind::Queen | PieceKind::Rook))
            .count();
        heavy <= 2
    }

    fn pawn_structure(&self, board: &Board, side: Side) -> i32 {
        let mut files = [0i32; BOARD_SIZE as usize];
        let mut pawns = Vec::new();
        for (pos, piece) in board.occupied() {
            if piece.kind == PieceKind::Pawn && piece.side == side {
                files[pos.col as usize] += 1;
                pawns.push(pos);
            }
        }

        let mut score = 0;
        for (file, &count) in files.iter().enumerate() {
            if count > 1 {
                score += self.doubled_pawn_penalty * (count - 1);
            }
            let left = file > 0 && files[file - 1] > 0;
            let right = file + 1 < files.len() && files[file + 1] > 0;
            if count > 0 && !left && !right {
                score += self.isolated_pawn_penalty * count;
            }
        }

        for pawn in pawns {
            if self.is_passed(board, pawn, side) {
                score += self.passed_pawn_bonus;
            }
        }
        score
    }

    /// No enemy pawn ahead on the same or an adjacent file.
    fn is_passed(&self, board: &Board, pawn: Position, side: Side) -> bool {
        let dir = Board::pawn_direction(side);
        !board.pieces(side.opposite()).any(|(pos, piece)| {
            piece.kind == PieceKind::Pawn
                && pos.col.abs_diff(pawn.col) <= 1
                && (pos.row as i8 - pawn.row as i8) * dir > 0
        })
    }

    fn king_shelter(&self, board: &Board, side: Side) -> i32 {
        let Some(king) = board.king_square(side) else {
            return 0;
        };
        let dir = Board::pawn_direction(side);
        (-1..=1)
            .filter_map(|dc| king.offset(dir, dc, BOARD_SIZE, BOARD_SIZE))
            .filter(|&pos| {
                matches!(board.piece_at(pos), Some(p) if p.kind == PieceKind::Pawn && p.side == side)
            })
            .count() as i32
            * self.pawn_shield_bonus
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn signed(side: Side, value: i32) -> i32 {
    match side {
        Side::First => value,
        Side::Second => -value,
    }
}

impl Evaluate<Board> for Evaluator {
    fn score(&self, board: &Board, maximizing: Side) -> i32 {
        signed(maximizing, self.evaluate(board))
    }
}

/// Scores every unfinished leaf as even. Connect-four relies on terminal
/// detection alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neutral;

impl<G> Evaluate<G> for Neutral {
    fn score(&self, _game: &G, _maximizing: Side) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Piece;

    fn sq(text: &str) -> Position {
        Position::parse(text).unwrap()
    }

    #[test]
    fn start_position_is_balanced() {
        let evaluator = Evaluator::new();
        assert_eq!(evaluator.evaluate(&Board::new()), 0);
    }

    #[test]
    fn extra_material_shows_in_both_perspectives() {
        let mut board = Board::new();
        board.take(sq("d8"));
        let evaluator = Evaluator::new();
        assert!(evaluator.score(&board, Side::First) > 800);
        assert_eq!(evaluator.score(&board, Side::Second), -evaluator.score(&board, Side::First));
    }

    #[test]
    fn tables_are_mirrored_between_sides() {
        let evaluator = Evaluator::new();
        let mut white = Board::empty(Side::First);
        white.put(sq("e1"), Piece::new(PieceKind::King, Side::First));
        white.put(sq("e8"), Piece::new(PieceKind::King, Side::Second));
        white.put(sq("c3"), Piece::new(PieceKind::Knight, Side::First));
        let mut black = Board::empty(Side::First);
        black.put(sq("e1"), Piece::new(PieceKind::King, Side::First));
        black.put(sq("e8"), Piece::new(PieceKind::King, Side::Second));
        black.put(sq("c6"), Piece::new(PieceKind::Knight, Side::Second));
        assert_eq!(evaluator.evaluate(&white), -evaluator.evaluate(&black));
    }

    #[test]
    fn passed_pawn_is_rewarded() {
        let evaluator = Evaluator::new();
        let mut board = Board::empty(Side::First);
        board.put(sq("a5"), Piece::new(PieceKind::Pawn, Side::First));
        assert!(evaluator.is_passed(&board, sq("a5"), Side::First));
        board.put(sq("b7"), Piece::new(PieceKind::Pawn, Side::Second));
        assert!(!evaluator.is_passed(&board, sq("a5"), Side::First));
        assert!(!evaluator.is_passed(&board, sq("b7"), Side::Second));
    }

    #[test]
    fn neutral_scores_zero() {
        assert_eq!(Neutral.score(&Board::new(), Side::First), 0);
    }
}
