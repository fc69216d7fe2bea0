use std::fmt;

use crate::board::{Board, Piece, PieceKind, Position, Side, Undo, BOARD_SIZE};
use crate::rules::Outcome;
use crate::search::{AdversarialGame, Terminal};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1), (0, 1),
    (1, -1), (1, 0), (1, 1),
];

const DIAGONALS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ORTHOGONALS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Draw after this many plies without a pawn move or capture.
pub const FIFTY_MOVE_PLIES: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    pub piece: PieceKind,
    pub captured: Option<Piece>,
    pub promotion: Option<PieceKind>,
    pub is_en_passant: bool,
    pub is_castling: bool,
}

impl Move {
    pub fn new(from: Position, to: Position, piece: PieceKind) -> Self {
        Self {
            from,
            to,
            piece,
            captured: None,
            promotion: None,
            is_en_passant: false,
            is_castling: false,
        }
    }

    pub fn new_capture(from: Position, to: Position, piece: PieceKind, captured: Piece) -> Self {
        Self {
            captured: Some(captured),
            ..Self::new(from, to, piece)
        }
    }

    pub fn new_en_passant(from: Position, to: Position, captured: Piece) -> Self {
        Self {
            captured: Some(captured),
            is_en_passant: true,
            ..Self::new(from, to, PieceKind::Pawn)
        }
    }

    pub fn new_castling(from: Position, to: Position) -> Self {
        Self {
            is_castling: true,
            ..Self::new(from, to, PieceKind::King)
        }
    }

    pub fn new_promotion(
        from: Position,
        to: Position,
        captured: Option<Piece>,
        promotion: PieceKind,
    ) -> Self {
        Self {
            captured,
            promotion: Some(promotion),
            ..Self::new(from, to, PieceKind::Pawn)
        }
    }

    /// Rook origin and destination for a castling move.
    pub fn castling_rook(&self) -> (Position, Position) {
        let row = self.from.row;
        if self.to.col > self.from.col {
            (Position::new(row, BOARD_SIZE - 1), Position::new(row, self.to.col - 1))
        } else {
            (Position::new(row, 0), Position::new(row, self.to.col + 1))
        }
    }

    /// Coordinate notation such as `e2e4` or `e7e8q`. Returns the squares
    /// and the optional promotion kind; the caller matches it against the
    /// legal moves.
    pub fn parse(text: &str) -> Option<(Position, Position, Option<PieceKind>)> {
        if !text.is_ascii() || (text.len() != 4 && text.len() != 5) {
            return None;
        }
        let from = Position::parse(&text[0..2])?;
        let to = Position::parse(&text[2..4])?;
        let promotion = match text[4..].chars().next() {
            Some(symbol) => Some(PieceKind::from_symbol(symbol)?),
            None => None,
        };
        Some((from, to, promotion))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.symbol())?;
        }
        Ok(())
    }
}

/// Move generation, attack detection and terminal classification for chess.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Geometrically possible moves of the token on `pos`, ignoring whether
    /// they expose the mover's king.
    pub fn pseudo_legal_moves(&self, board: &Board, pos: Position) -> Vec<Move> {
        let mut moves = Vec::new();
        let Some(piece) = board.piece_at(pos) else {
            return moves;
        };
        match piece.kind {
            PieceKind::Pawn => self.pawn_moves(board, pos, piece, &mut moves),
            PieceKind::Knight => self.step_moves(board, pos, piece, &KNIGHT_OFFSETS, &mut moves),
            PieceKind::Bishop => self.slide_moves(board, pos, piece, &DIAGONALS, &mut moves),
            PieceKind::Rook => self.slide_moves(board, pos, piece, &ORTHOGONALS, &mut moves),
            PieceKind::Queen => {
                self.slide_moves(board, pos, piece, &ORTHOGONALS, &mut moves);
                self.slide_moves(board, pos, piece, &DIAGONALS, &mut moves);
            }
            PieceKind::King => {
                self.step_moves(board, pos, piece, &KING_OFFSETS, &mut moves);
                self.castling_moves(board, pos, piece, &mut moves);
            }
        }
        moves
    }

    fn pawn_moves(&self, board: &Board, from: Position, pawn: Piece, moves: &mut Vec<Move>) {
        let side = pawn.side;
        let dir = Board::pawn_direction(side);
        let start_row = (Board::home_row(side) as i8 + dir) as u8;

        if let Some(one) = from.offset(dir, 0, BOARD_SIZE, BOARD_SIZE) {
            if board.piece_at(one).is_none() {
                self.push_pawn_move(from, one, None, side, moves);
                if from.row == start_row {
                    if let Some(two) = one.offset(dir, 0, BOARD_SIZE, BOARD_SIZE) {
                        if board.piece_at(two).is_none() {
                            moves.push(Move::new(from, two, PieceKind::Pawn));
                        }
                    }
                }
            }
        }

        for dc in [-1, 1] {
            let Some(target) = from.offset(dir, dc, BOARD_SIZE, BOARD_SIZE) else {
                continue;
            };
            match board.piece_at(target) {
                Some(victim) if victim.side != side => {
                    self.push_pawn_move(from, target, Some(victim), side, moves);
                }
                None if board.en_passant == Some(target) && side == board.side_to_move => {
                    let beside = Position::new(from.row, target.col);
                    if let Some(victim) = board.piece_at(beside) {
                        if victim.kind == PieceKind::Pawn && victim.side != side {
                            moves.push(Move::new_en_passant(from, target, victim));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn push_pawn_move(
        &self,
        from: Position,
        to: Position,
        captured: Option<Piece>,
        side: Side,
        moves: &mut Vec<Move>,
    ) {
        if to.row == Board::promotion_row(side) {
            for kind in PieceKind::PROMOTIONS {
                moves.push(Move::new_promotion(from, to, captured, kind));
            }
        } else {
            moves.push(Move {
                captured,
                ..Move::new(from, to, PieceKind::Pawn)
            });
        }
    }

    fn step_moves(
        &self,
        board: &Board,
        from: Position,
        piece: Piece,
        offsets: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        for &(dr, dc) in offsets {
            let Some(to) = from.offset(dr, dc, BOARD_SIZE, BOARD_SIZE) else {
                continue;
            };
            match board.piece_at(to) {
                None => moves.push(Move::new(from, to, piece.kind)),
                Some(other) if other.side != piece.side => {
                    moves.push(Move::new_capture(from, to, piece.kind, other));
                }
                Some(_) => {}
            }
        }
    }

    fn slide_moves(
        &self,
        board: &Board,
        from: Position,
        piece: Piece,
        directions: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        for &(dr, dc) in directions {
            let mut cursor = from;
            while let Some(to) = cursor.offset(dr, dc, BOARD_SIZE, BOARD_SIZE) {
                match board.piece_at(to) {
                    None => moves.push(Move::new(from, to, piece.kind)),
                    Some(other) => {
                        if other.side != piece.side {
                            moves.push(Move::new_capture(from, to, piece.kind, other));
                        }
                        break;
                    }
                }
                cursor = to;
            }
        }
    }

    /// King and rook unmoved, squares between them empty. Attacked squares
    /// are left to `is_legal`.
    fn castling_moves(&self, board: &Board, from: Position, king: Piece, moves: &mut Vec<Move>) {
        let row = Board::home_row(king.side);
        if king.has_moved || from != Position::new(row, 4) {
            return;
        }
        for (rook_col, king_col) in [(BOARD_SIZE - 1, 6), (0, 2)] {
            let rook_ready = matches!(
                board.piece_at(Position::new(row, rook_col)),
                Some(rook) if rook.kind == PieceKind::Rook && rook.side == king.side && !rook.has_moved
            );
            if !rook_ready {
                continue;
            }
            let (lo, hi) = (from.col.min(rook_col) + 1, from.col.max(rook_col));
            if (lo..hi).all(|col| board.piece_at(Position::new(row, col)).is_none()) {
                moves.push(Move::new_castling(from, Position::new(row, king_col)));
            }
        }
    }

    /// Whether any token of `by` attacks `square`. Pawns attack their forward
    /// diagonals whether or not anything stands there.
    pub fn is_square_attacked(&self, board: &Board, square: Position, by: Side) -> bool {
        let attacker = |pos: Position, kinds: &[PieceKind]| {
            matches!(board.piece_at(pos), Some(p) if p.side == by && kinds.contains(&p.kind))
        };

        // A pawn of `by` attacks from one row behind, relative to its own direction.
        let back = -Board::pawn_direction(by);
        for dc in [-1, 1] {
            if let Some(pos) = square.offset(back, dc, BOARD_SIZE, BOARD_SIZE) {
                if attacker(pos, &[PieceKind::Pawn]) {
                    return true;
                }
            }
        }

        for (offsets, kind) in [(&KNIGHT_OFFSETS, PieceKind::Knight), (&KING_OFFSETS, PieceKind::King)] {
            for &(dr, dc) in offsets {
                if let Some(pos) = square.offset(dr, dc, BOARD_SIZE, BOARD_SIZE) {
                    if attacker(pos, &[kind]) {
                        return true;
                    }
                }
            }
        }

        for (directions, kinds) in [
            (&DIAGONALS, [PieceKind::Bishop, PieceKind::Queen]),
            (&ORTHOGONALS, [PieceKind::Rook, PieceKind::Queen]),
        ] {
            for &(dr, dc) in directions {
                let mut cursor = square;
                while let Some(pos) = cursor.offset(dr, dc, BOARD_SIZE, BOARD_SIZE) {
                    if board.piece_at(pos).is_some() {
                        if attacker(pos, &kinds) {
                            return true;
                        }
                        break;
                    }
                    cursor = pos;
                }
            }
        }

        false
    }

    pub fn is_in_check(&self, board: &Board, side: Side) -> bool {
        match board.king_square(side) {
            Some(king) => self.is_square_attacked(board, king, side.opposite()),
            None => false,
        }
    }

    /// Plays `mv` on `board`, checks the mover's king, and takes it back.
    /// Castling also needs the king out of check and a safe square to pass.
    pub fn is_legal(&self, board: &mut Board, mv: &Move) -> bool {
        let Some(piece) = board.piece_at(mv.from) else {
            return false;
        };
        if mv.is_castling {
            let enemy = piece.side.opposite();
            let step: i8 = if mv.to.col > mv.from.col { 1 } else { -1 };
            let passed = mv.from.offset(0, step, BOARD_SIZE, BOARD_SIZE);
            if self.is_square_attacked(board, mv.from, enemy)
                || passed.is_some_and(|pos| self.is_square_attacked(board, pos, enemy))
            {
                return false;
            }
        }
        let undo = board.make_move(mv);
        let safe = !self.is_in_check(board, piece.side);
        board.unmake_move(undo);
        safe
    }

    pub fn legal_moves(&self, board: &Board, pos: Position) -> Vec<Move> {
        let mut scratch = board.clone();
        self.legal_moves_in(&mut scratch, pos)
    }

    fn legal_moves_in(&self, board: &mut Board, pos: Position) -> Vec<Move> {
        self.pseudo_legal_moves(board, pos)
            .into_iter()
            .filter(|mv| self.is_legal(board, mv))
            .collect()
    }

    pub fn all_legal_moves(&self, board: &Board, side: Side) -> Vec<Move> {
        let mut scratch = board.clone();
        self.all_legal_moves_in(&mut scratch, side)
    }

    fn all_legal_moves_in(&self, board: &mut Board, side: Side) -> Vec<Move> {
        let origins: Vec<Position> = board.pieces(side).map(|(pos, _)| pos).collect();
        origins
            .into_iter()
            .flat_map(|pos| self.legal_moves_in(board, pos))
            .collect()
    }

    /// Legal moves for the side to move.
    pub fn generate_moves(&self, board: &Board) -> Vec<Move> {
        self.all_legal_moves(board, board.side_to_move)
    }

    pub fn classify(&self, board: &Board) -> Outcome {
        let side = board.side_to_move;
        let moves = self.generate_moves(board);
        let in_check = self.is_in_check(board, side);
        if moves.is_empty() {
            return if in_check {
                Outcome::Checkmate(side.opposite())
            } else {
                Outcome::Stalemate
            };
        }
        if self.is_insufficient_material(board) || board.halfmove_clock >= FIFTY_MOVE_PLIES {
            return Outcome::Draw;
        }
        if in_check {
            Outcome::Check
        } else {
            Outcome::Ongoing
        }
    }

    /// Neither side can possibly mate: bare kings, a lone minor piece, or
    /// one bishop each on the same square colour.
    pub fn is_insufficient_material(&self, board: &Board) -> bool {
        let mut extras: [Vec<(Position, PieceKind)>; 2] = [Vec::new(), Vec::new()];
        for (pos, piece) in board.occupied() {
            if piece.kind != PieceKind::King {
                extras[piece.side.index()].push((pos, piece.kind));
            }
        }
        let minor = |kind: PieceKind| matches!(kind, PieceKind::Knight | PieceKind::Bishop);
        match (extras[0].as_slice(), extras[1].as_slice()) {
            ([], []) => true,
            ([(_, kind)], []) | ([], [(_, kind)]) => minor(*kind),
            ([(a, PieceKind::Bishop)], [(b, PieceKind::Bishop)]) => {
                a.is_light_square() == b.is_light_square()
            }
            _ => false,
        }
    }
}

impl AdversarialGame for Board {
    type Move = Move;
    type Undo = Undo;

    fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    fn legal_moves(&mut self) -> Vec<Move> {
        let side = self.side_to_move;
        MoveGenerator.all_legal_moves_in(self, side)
    }

    fn terminal(&mut self, legal: &[Move]) -> Option<Terminal> {
        let generator = MoveGenerator;
        if legal.is_empty() {
            return Some(if generator.is_in_check(self, self.side_to_move) {
                Terminal::Win(self.side_to_move.opposite())
            } else {
                Terminal::Draw
            });
        }
        if self.halfmove_clock >= FIFTY_MOVE_PLIES || generator.is_insufficient_material(self) {
            return Some(Terminal::Draw);
        }
        None
    }

    fn play(&mut self, mv: Move) -> Undo {
        self.make_move(&mv)
    }

    fn undo(&mut self, undo: Undo) {
        self.unmake_move(undo)
    }
}
