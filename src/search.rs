use std::fmt::Debug;

use log::debug;

use crate::board::Side;
use crate::rng::GameRng;

/// Base magnitude of a decided game. Remaining depth is added on top so that
/// quicker wins and slower losses score better.
pub const WIN_SCORE: i32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Win(Side),
    Draw,
}

/// A two-player position the search can walk. Moves are played in place and
/// taken back through the returned undo record.
pub trait AdversarialGame {
    type Move: Copy + PartialEq + Debug;
    type Undo;

    fn side_to_move(&self) -> Side;

    /// Legal moves for the side to move in a stable order. Takes `&mut self`
    /// so implementations may try moves and take them back.
    fn legal_moves(&mut self) -> Vec<Self::Move>;

    /// `legal` is the result of `legal_moves` for this same position.
    fn terminal(&mut self, legal: &[Self::Move]) -> Option<Terminal>;

    fn play(&mut self, mv: Self::Move) -> Self::Undo;

    fn undo(&mut self, undo: Self::Undo);
}

/// Static score of a non-terminal leaf, from `maximizing`'s point of view.
pub trait Evaluate<G> {
    fn score(&self, game: &G, maximizing: Side) -> i32;
}

pub struct Search<E> {
    evaluator: E,
    pruning: bool,
    nodes_searched: u64,
}

impl<E> Search<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            pruning: true,
            nodes_searched: 0,
        }
    }

    /// Plain minimax, visiting every node. Used to check that pruning never
    /// changes the chosen move.
    pub fn unpruned(evaluator: E) -> Self {
        Self {
            evaluator,
            pruning: false,
            nodes_searched: 0,
        }
    }

    pub fn nodes_searched(&self) -> u64 {
        self.nodes_searched
    }

    /// Minimax with alpha-beta pruning. Scores are from `side`'s point of
    /// view; `maximizing` says whether the side to move at this ply is `side`.
    pub fn search<G>(
        &mut self,
        game: &mut G,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
        side: Side,
    ) -> i32
    where
        G: AdversarialGame,
        E: Evaluate<G>,
    {
        self.nodes_searched += 1;

        let moves = game.legal_moves();
        if let Some(terminal) = game.terminal(&moves) {
            let margin = WIN_SCORE + depth as i32;
            return match terminal {
                Terminal::Win(winner) if winner == side => margin,
                Terminal::Win(_) => -margin,
                Terminal::Draw => 0,
            };
        }
        if depth == 0 {
            return self.evaluator.score(game, side);
        }

        if maximizing {
            let mut best = i32::MIN;
            for mv in moves {
                let undo = game.play(mv);
                let score = self.search(game, depth - 1, alpha, beta, false, side);
                game.undo(undo);

                best = best.max(score);
                alpha = alpha.max(best);
                if self.pruning && beta <= alpha {
                    break;
                }
            }
            best
        } else {
            let mut best = i32::MAX;
            for mv in moves {
                let undo = game.play(mv);
                let score = self.search(game, depth - 1, alpha, beta, true, side);
                game.undo(undo);

                best = best.min(score);
                beta = beta.min(best);
                if self.pruning && beta <= alpha {
                    break;
                }
            }
            best
        }
    }

    /// Best move for the side to move, looking `depth` plies ahead (at least
    /// one). Ties go to the move generated first.
    pub fn choose_move<G>(&mut self, game: &mut G, depth: u32) -> Option<G::Move>
    where
        G: AdversarialGame,
        E: Evaluate<G>,
    {
        self.nodes_searched = 0;
        let side = game.side_to_move();
        let depth = depth.max(1);

        let mut best_move = None;
        let mut best_score = i32::MIN;
        let mut alpha = i32::MIN;
        let beta = i32::MAX;

        for mv in game.legal_moves() {
            let undo = game.play(mv);
            let score = self.search(game, depth - 1, alpha, beta, false, side);
            game.undo(undo);

            if best_move.is_none() || score > best_score {
                best_score = score;
                best_move = Some(mv);
            }
            if self.pruning {
                alpha = alpha.max(score);
            }
        }

        debug!(
            "depth {} search for {} visited {} nodes, best {:?} scoring {}",
            depth, side, self.nodes_searched, best_move, best_score
        );
        best_move
    }

    /// Difficulty policy: with probability `skill` play the searched move,
    /// otherwise any legal move uniformly at random.
    pub fn pick_move<G>(
        &mut self,
        game: &mut G,
        depth: u32,
        skill: f64,
        rng: &mut GameRng,
    ) -> Option<G::Move>
    where
        G: AdversarialGame,
        E: Evaluate<G>,
    {
        let moves = game.legal_moves();
        if moves.is_empty() {
            return None;
        }
        if rng.unit() < skill {
            self.choose_move(game, depth)
        } else {
            let mv = rng.choose(&moves).copied();
            debug!("skill roll missed, playing random {:?}", mv);
            mv
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Take one to three stones; whoever takes the last stone wins.
    #[derive(Debug, Clone)]
    struct Nim {
        stones: u32,
        to_move: Side,
    }

    impl AdversarialGame for Nim {
        type Move = u32;
        type Undo = u32;

        fn side_to_move(&self) -> Side {
            self.to_move
        }

        fn legal_moves(&mut self) -> Vec<u32> {
            (1..=3).filter(|&take| take <= self.stones).collect()
        }

        fn terminal(&mut self, _legal: &[u32]) -> Option<Terminal> {
            // The player who just moved took the last stone.
            (self.stones == 0).then(|| Terminal::Win(self.to_move.opposite()))
        }

        fn play(&mut self, take: u32) -> u32 {
            self.stones -= take;
            self.to_move = self.to_move.opposite();
            take
        }

        fn undo(&mut self, take: u32) {
            self.stones += take;
            self.to_move = self.to_move.opposite();
        }
    }

    struct Zero;

    impl Evaluate<Nim> for Zero {
        fn score(&self, _game: &Nim, _maximizing: Side) -> i32 {
            0
        }
    }

    fn nim(stones: u32) -> Nim {
        Nim {
            stones,
            to_move: Side::First,
        }
    }

    #[test]
    fn finds_winning_nim_move() {
        // Leaving a multiple of four wins.
        for (stones, expected) in [(5, 1), (6, 2), (7, 3), (9, 1)] {
            let mut game = nim(stones);
            let mut search = Search::new(Zero);
            assert_eq!(search.choose_move(&mut game, 12), Some(expected));
        }
    }

    #[test]
    fn search_leaves_game_untouched() {
        let mut game = nim(11);
        let mut search = Search::new(Zero);
        search.choose_move(&mut game, 8);
        assert_eq!(game.stones, 11);
        assert_eq!(game.to_move, Side::First);
    }

    #[test]
    fn pruning_agrees_with_minimax_and_visits_fewer_nodes() {
        for stones in 4..14 {
            let mut pruned = Search::new(Zero);
            let mut plain = Search::unpruned(Zero);
            let a = pruned.choose_move(&mut nim(stones), 9);
            let b = plain.choose_move(&mut nim(stones), 9);
            assert_eq!(a, b, "stones = {}", stones);
            assert!(pruned.nodes_searched() <= plain.nodes_searched());
        }
        let mut pruned = Search::new(Zero);
        let mut plain = Search::unpruned(Zero);
        pruned.choose_move(&mut nim(13), 9);
        plain.choose_move(&mut nim(13), 9);
        assert!(pruned.nodes_searched() < plain.nodes_searched());
    }

    #[test]
    fn lost_positions_still_return_a_move() {
        // Every move from a multiple of four loses; the first one is kept.
        let mut search = Search::new(Zero);
        assert_eq!(search.choose_move(&mut nim(8), 10), Some(1));
    }

    #[test]
    fn terminal_scores_prefer_quick_wins() {
        let mut search = Search::new(Zero);
        let mut won = nim(0);
        won.to_move = Side::Second;
        assert_eq!(search.search(&mut won, 3, i32::MIN, i32::MAX, false, Side::First), WIN_SCORE + 3);
        assert_eq!(search.search(&mut won, 1, i32::MIN, i32::MAX, false, Side::First), WIN_SCORE + 1);
        assert_eq!(search.search(&mut won, 3, i32::MIN, i32::MAX, true, Side::Second), -(WIN_SCORE + 3));
    }

    #[test]
    fn full_skill_always_searches() {
        let mut rng = GameRng::new(11);
        let mut search = Search::new(Zero);
        for _ in 0..200 {
            assert_eq!(search.pick_move(&mut nim(6), 8, 1.0, &mut rng), Some(2));
        }
    }

    #[test]
    fn zero_skill_is_uniform() {
        let mut rng = GameRng::new(99);
        let mut search = Search::new(Zero);
        let mut counts = [0u32; 3];
        let samples = 3000;
        for _ in 0..samples {
            let take = search.pick_move(&mut nim(6), 8, 0.0, &mut rng);
            counts[take.map(|t| t as usize - 1).unwrap_or(0)] += 1;
        }
        for count in counts {
            assert!((850..=1150).contains(&count), "counts = {:?}", counts);
        }
    }

    #[test]
    fn no_moves_no_pick() {
        let mut rng = GameRng::new(1);
        let mut search = Search::new(Zero);
        assert_eq!(search.pick_move(&mut nim(0), 3, 1.0, &mut rng), None);
    }
}
