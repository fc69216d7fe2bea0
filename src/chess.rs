use log::{info, trace};

use crate::board::{Board, Piece, PieceKind, Position, Side};
use crate::error::EngineError;
use crate::evaluation::Evaluator;
use crate::movegen::{Move, MoveGenerator};
use crate::rules::{GameRules, Outcome};
use crate::search::Search;

/// What makes two chess positions "the same" for repetition: placement,
/// castling rights (unmoved kings and rooks), side to move and en passant.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RepetitionKey {
    placement: Vec<(Position, PieceKind, Side, bool)>,
    side_to_move: Side,
    en_passant: Option<Position>,
}

impl RepetitionKey {
    fn of(board: &Board) -> Self {
        let placement = board
            .occupied()
            .map(|(pos, piece)| {
                let castling = matches!(piece.kind, PieceKind::King | PieceKind::Rook) && !piece.has_moved;
                (pos, piece.kind, piece.side, castling)
            })
            .collect();
        Self {
            placement,
            side_to_move: board.side_to_move,
            en_passant: board.en_passant,
        }
    }
}

/// Chess game state. Every accepted move produces a fresh value; nothing
/// here is mutated behind a caller's back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChessState {
    pub board: Board,
    pub selection: Option<Position>,
    /// Legal moves of the selected token.
    pub legal_moves: Vec<Move>,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    /// Insufficient material, fifty-move rule or threefold repetition.
    pub is_draw: bool,
    /// `captured[side.index()]` lists the enemy pieces `side` has taken.
    pub captured: [Vec<Piece>; 2],
    pub last_move: Option<Move>,
    pub history: Vec<Move>,
    repetitions: Vec<RepetitionKey>,
}

impl ChessState {
    pub fn new() -> Self {
        Self::from_board(Board::new())
    }

    /// Starts a game from an arbitrary position.
    pub fn from_board(board: Board) -> Self {
        let mut state = Self {
            repetitions: vec![RepetitionKey::of(&board)],
            board,
            selection: None,
            legal_moves: Vec::new(),
            is_check: false,
            is_checkmate: false,
            is_stalemate: false,
            is_draw: false,
            captured: [Vec::new(), Vec::new()],
            last_move: None,
            history: Vec::new(),
        };
        state.refresh_flags();
        state
    }

    pub fn is_terminal(&self) -> bool {
        self.is_checkmate || self.is_stalemate || self.is_draw
    }

    /// Selects a token of the side to move that has somewhere to go.
    pub fn select_token(&self, position: Position) -> Result<ChessState, EngineError> {
        let position = self.board.checked(position)?;
        if self.is_terminal() {
            return Err(EngineError::GameOver);
        }
        let moves = self.legal_moves_for(position)?;
        if moves.is_empty() {
            trace!("nothing selectable on {}", position);
            return Err(EngineError::IllegalMove);
        }
        Ok(ChessState {
            selection: Some(position),
            legal_moves: moves,
            ..self.clone()
        })
    }

    /// Moves the selected token to `position` if that is one of its legal
    /// moves; anything else just drops the selection. Pawns reaching the last
    /// rank become queens.
    pub fn attempt_move(&self, position: Position) -> Result<ChessState, EngineError> {
        let position = self.board.checked(position)?;
        if self.is_terminal() {
            return Err(EngineError::GameOver);
        }
        let chosen = self.selection.and_then(|_| {
            self.legal_moves
                .iter()
                .find(|mv| mv.to == position && mv.promotion.map_or(true, |kind| kind == PieceKind::Queen))
                .copied()
        });
        match chosen {
            Some(mv) => Ok(self.play(mv)),
            None => {
                trace!("deselecting, {} is not a target", position);
                Ok(self.deselected())
            }
        }
    }

    pub fn deselected(&self) -> ChessState {
        ChessState {
            selection: None,
            legal_moves: Vec::new(),
            ..self.clone()
        }
    }

    fn play(&self, mv: Move) -> ChessState {
        let mover = self.board.side_to_move;
        let mut next = self.deselected();
        let undo = next.board.make_move(&mv);
        if let Some(piece) = undo.captured() {
            next.captured[mover.index()].push(piece);
        }
        next.last_move = Some(mv);
        next.history.push(mv);
        next.repetitions.push(RepetitionKey::of(&next.board));
        next.refresh_flags();

        if next.is_terminal() {
            info!("chess game over after {}: {:?}", mv, next.classify());
        }
        next
    }

    fn refresh_flags(&mut self) {
        let generator = MoveGenerator::new();
        let outcome = generator.classify(&self.board);
        self.is_check = generator.is_in_check(&self.board, self.board.side_to_move);
        self.is_checkmate = matches!(outcome, Outcome::Checkmate(_));
        self.is_stalemate = outcome == Outcome::Stalemate;
        self.is_draw = outcome == Outcome::Draw || self.is_threefold_repetition();
    }

    fn is_threefold_repetition(&self) -> bool {
        match self.repetitions.last() {
            Some(current) => self.repetitions.iter().filter(|key| *key == current).count() >= 3,
            None => false,
        }
    }
}

impl Default for ChessState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRules for ChessState {
    type Move = Move;
    type Snapshot = Board;
    type Evaluator = Evaluator;

    const NAME: &'static str = "chess";
    const DEPTHS: [u32; 3] = [1, 2, 3];

    fn new_game() -> Self {
        Self::new()
    }

    fn side_to_move(&self) -> Side {
        self.board.side_to_move
    }

    fn legal_moves_for(&self, position: Position) -> Result<Vec<Move>, EngineError> {
        let position = self.board.checked(position)?;
        match self.board.piece_at(position) {
            Some(piece) if piece.side == self.board.side_to_move && !self.is_terminal() => {
                Ok(MoveGenerator::new().legal_moves(&self.board, position))
            }
            _ => Ok(Vec::new()),
        }
    }

    fn all_legal_moves(&self) -> Vec<Move> {
        if self.is_terminal() {
            return Vec::new();
        }
        MoveGenerator::new().generate_moves(&self.board)
    }

    /// Accepts `mv` when its squares (and promotion, defaulting to a queen)
    /// match a legal move; capture and special-move flags are filled in from
    /// the legal move.
    fn apply_human_move(&self, mv: Move) -> Result<Self, EngineError> {
        self.board.checked(mv.from)?;
        self.board.checked(mv.to)?;
        if let Some(kind) = mv.promotion {
            if !kind.is_promotion_target() {
                return Err(EngineError::InvalidPromotion(kind));
            }
        }
        if self.is_terminal() {
            return Err(EngineError::GameOver);
        }
        let wanted = mv.promotion.unwrap_or(PieceKind::Queen);
        let legal = self
            .all_legal_moves()
            .into_iter()
            .find(|candidate| {
                candidate.from == mv.from
                    && candidate.to == mv.to
                    && candidate.promotion.map_or(mv.promotion.is_none(), |kind| kind == wanted)
            })
            .ok_or(EngineError::IllegalMove)?;
        Ok(self.play(legal))
    }

    fn snapshot(&self) -> Board {
        self.board.clone()
    }

    fn request_engine_move(&self, depth: u32) -> Option<Move> {
        Search::new(Evaluator::new()).choose_move(&mut self.snapshot(), depth)
    }

    fn classify(&self) -> Outcome {
        let side = self.board.side_to_move;
        if self.is_checkmate {
            Outcome::Checkmate(side.opposite())
        } else if self.is_stalemate {
            Outcome::Stalemate
        } else if self.is_draw {
            Outcome::Draw
        } else if self.is_check {
            Outcome::Check
        } else {
            Outcome::Ongoing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(text: &str) -> Position {
        Position::parse(text).unwrap()
    }

    fn mv(text: &str) -> Move {
        let (from, to, promotion) = Move::parse(text).unwrap();
        Move {
            promotion,
            ..Move::new(from, to, PieceKind::Pawn)
        }
    }

    fn play(moves: &[&str]) -> ChessState {
        moves.iter().fold(ChessState::new(), |state, text| {
            state
                .apply_human_move(mv(text))
                .unwrap_or_else(|err| panic!("{}: {}", text, err))
        })
    }

    #[test]
    fn fools_mate() {
        let state = play(&["f2f4", "e7e5", "g2g4", "d8h4"]);
        assert!(state.is_checkmate);
        assert!(!state.is_stalemate);
        assert_eq!(state.board.side_to_move, Side::First);
        assert_eq!(state.classify(), Outcome::Checkmate(Side::Second));
        assert!(state.all_legal_moves().is_empty());
        assert!(MoveGenerator::new().generate_moves(&state.board).is_empty());
        assert_eq!(state.apply_human_move(mv("a2a3")), Err(EngineError::GameOver));
    }

    #[test]
    fn stalemate_fixture() {
        let mut board = Board::empty(Side::First);
        board.put(sq("a1"), Piece::new(PieceKind::King, Side::First));
        board.put(sq("c2"), Piece::new(PieceKind::King, Side::Second));
        board.put(sq("b3"), Piece::new(PieceKind::Queen, Side::Second));
        let state = ChessState::from_board(board);
        assert!(state.is_stalemate);
        assert!(!state.is_checkmate);
        assert!(!state.is_check);
        assert_eq!(state.classify(), Outcome::Stalemate);
    }

    #[test]
    fn selection_then_move() {
        let state = ChessState::new();
        let selected = state.select_token(sq("g1")).unwrap();
        assert_eq!(selected.selection, Some(sq("g1")));
        assert_eq!(selected.legal_moves.len(), 2);

        let moved = selected.attempt_move(sq("f3")).unwrap();
        assert_eq!(moved.selection, None);
        assert!(moved.legal_moves.is_empty());
        assert_eq!(moved.board.piece_at(sq("f3")).map(|p| p.kind), Some(PieceKind::Knight));
        assert_eq!(moved.board.side_to_move, Side::Second);
        assert_eq!(moved.history.len(), 1);
        // The original value is untouched.
        assert_eq!(state, ChessState::new());
    }

    #[test]
    fn bad_target_only_deselects() {
        let selected = ChessState::new().select_token(sq("e2")).unwrap();
        let after = selected.attempt_move(sq("e5")).unwrap();
        assert_eq!(after.selection, None);
        assert_eq!(after.board, Board::new());
        assert!(after.history.is_empty());

        let nothing_selected = ChessState::new().attempt_move(sq("e4")).unwrap();
        assert_eq!(nothing_selected.board, Board::new());
    }

    #[test]
    fn cannot_select_stuck_or_enemy_tokens() {
        let state = ChessState::new();
        assert_eq!(state.select_token(sq("a1")), Err(EngineError::IllegalMove));
        assert_eq!(state.select_token(sq("e7")), Err(EngineError::IllegalMove));
        assert_eq!(state.select_token(sq("e4")), Err(EngineError::IllegalMove));
        assert_eq!(
            state.select_token(Position::new(8, 1)),
            Err(EngineError::OutOfBounds(Position::new(8, 1)))
        );
        assert_eq!(state.legal_moves_for(sq("e7")), Ok(Vec::new()));
    }

    #[test]
    fn rejected_moves_leave_state_alone() {
        let state = play(&["e2e4"]);
        let before = state.clone();
        assert_eq!(state.apply_human_move(mv("e4e5")), Err(EngineError::IllegalMove));
        assert_eq!(state.apply_human_move(mv("e7e4")), Err(EngineError::IllegalMove));
        assert_eq!(state, before);
    }

    #[test]
    fn self_check_is_illegal() {
        let state = play(&["e2e4", "e7e5", "d1h5", "f7f6"]);
        let state = state.apply_human_move(mv("h5e5")).unwrap();
        assert!(state.is_check);
        // Every reply on offer has to answer the check on the e-file.
        for reply in state.all_legal_moves() {
            let mut board = state.board.clone();
            board.make_move(&reply);
            assert!(!MoveGenerator::new().is_in_check(&board, Side::Second));
        }
        assert_eq!(state.apply_human_move(mv("a7a6")), Err(EngineError::IllegalMove));
    }

    #[test]
    fn captures_are_tracked_per_side() {
        let state = play(&["e2e4", "d7d5", "e4d5", "d8d5"]);
        assert_eq!(state.captured[Side::First.index()].len(), 1);
        assert_eq!(state.captured[Side::First.index()][0].side, Side::Second);
        assert_eq!(state.captured[Side::Second.index()].len(), 1);
        assert_eq!(state.captured[Side::Second.index()][0].kind, PieceKind::Pawn);
        assert_eq!(state.last_move.map(|m| m.piece), Some(PieceKind::Queen));
    }

    fn promotion_state() -> ChessState {
        let mut board = Board::empty(Side::First);
        board.put(sq("a7"), Piece::new(PieceKind::Pawn, Side::First));
        board.put(sq("e1"), Piece::new(PieceKind::King, Side::First));
        board.put(sq("h7"), Piece::new(PieceKind::King, Side::Second));
        board.put(sq("h6"), Piece::new(PieceKind::Pawn, Side::Second));
        ChessState::from_board(board)
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let state = promotion_state().apply_human_move(mv("a7a8")).unwrap();
        assert_eq!(state.board.piece_at(sq("a8")).map(|p| p.kind), Some(PieceKind::Queen));

        let selected = promotion_state().select_token(sq("a7")).unwrap();
        assert_eq!(selected.legal_moves.len(), 4);
        let state = selected.attempt_move(sq("a8")).unwrap();
        assert_eq!(state.board.piece_at(sq("a8")).map(|p| p.kind), Some(PieceKind::Queen));
    }

    #[test]
    fn explicit_underpromotion() {
        let state = promotion_state().apply_human_move(mv("a7a8n")).unwrap();
        assert_eq!(state.board.piece_at(sq("a8")).map(|p| p.kind), Some(PieceKind::Knight));
    }

    #[test]
    fn invalid_promotion_targets() {
        let state = promotion_state();
        assert_eq!(
            state.apply_human_move(mv("a7a8k")),
            Err(EngineError::InvalidPromotion(PieceKind::King))
        );
        assert_eq!(
            state.apply_human_move(mv("a7a8p")),
            Err(EngineError::InvalidPromotion(PieceKind::Pawn))
        );
        assert_eq!(state.apply_human_move(mv("e1e2q")), Err(EngineError::IllegalMove));
    }

    #[test]
    fn knight_shuffle_repeats_three_times() {
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        let once = play(&shuffle);
        assert!(!once.is_draw);
        let twice = play(&[&shuffle[..], &shuffle[..]].concat());
        assert!(twice.is_draw);
        assert_eq!(twice.classify(), Outcome::Draw);
    }

    #[test]
    fn engine_finds_mate_in_one() {
        // Back-rank mate: Ra1-a8.
        let mut board = Board::empty(Side::First);
        board.put(sq("a1"), Piece::new(PieceKind::Rook, Side::First));
        board.put(sq("g1"), Piece::new(PieceKind::King, Side::First));
        board.put(sq("g8"), Piece::new(PieceKind::King, Side::Second));
        board.put(sq("f7"), Piece::new(PieceKind::Pawn, Side::Second));
        board.put(sq("g7"), Piece::new(PieceKind::Pawn, Side::Second));
        board.put(sq("h7"), Piece::new(PieceKind::Pawn, Side::Second));
        let state = ChessState::from_board(board);
        for depth in 1..=3 {
            let reply = state.request_engine_move(depth).unwrap();
            assert_eq!(reply.to_string(), "a1a8", "depth {}", depth);
        }
        let mated = state.apply_human_move(mv("a1a8")).unwrap();
        assert_eq!(mated.classify(), Outcome::Checkmate(Side::First));
    }

    #[test]
    fn engine_grabs_a_hanging_queen() {
        let state = play(&["e2e4", "d7d5", "d1g4", "c8g4"]);
        let state = state.apply_human_move(mv("a2a3")).unwrap();
        let state = state.apply_human_move(mv("g4d1")).unwrap();
        // White king can take the bishop on d1.
        let reply = state.request_engine_move(2).unwrap();
        assert_eq!(reply.to, sq("d1"));
        assert_eq!(reply.captured.map(|p| p.kind), Some(PieceKind::Bishop));
    }
}
