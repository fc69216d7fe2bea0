//! Turn-taking between a human and the engine.
//!
//! Engine replies are computed on a worker thread against a private copy of
//! the board and come back over a channel tagged with the session epoch.
//! Every reset bumps the epoch, so a reply for an abandoned game is dropped
//! on arrival instead of being played.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use log::{debug, info, trace, warn};

use crate::board::{Position, Side};
use crate::chess::ChessState;
use crate::config::SessionConfig;
use crate::connect_four::{Column, ConnectFourState};
use crate::error::EngineError;
use crate::rng::GameRng;
use crate::rules::{GameRules, Outcome};
use crate::search::Search;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingHuman,
    /// A search is in flight; human input is refused.
    Evaluating,
    Terminal(Outcome),
}

#[derive(Debug)]
struct EngineReply<M> {
    epoch: u64,
    mv: Option<M>,
}

pub struct Session<G: GameRules> {
    state: G,
    config: SessionConfig,
    phase: Phase,
    epoch: u64,
    rng: GameRng,
    sender: Sender<EngineReply<G::Move>>,
    replies: Receiver<EngineReply<G::Move>>,
}

impl<G: GameRules> Session<G> {
    pub fn new(config: SessionConfig) -> Self {
        Self::from_state(config, G::new_game())
    }

    /// Resumes from an existing state. If it is the engine's turn the search
    /// starts right away.
    pub fn from_state(config: SessionConfig, state: G) -> Self {
        let (sender, replies) = mpsc::channel();
        let mut session = Self {
            state,
            rng: GameRng::new(config.seed),
            config,
            phase: Phase::AwaitingHuman,
            epoch: 0,
            sender,
            replies,
        };
        info!(
            "new {} session, human plays {}, depth {}, skill {}",
            G::NAME,
            session.config.human_side,
            session.config.search_depth::<G>(),
            session.config.search_skill()
        );
        session.begin_turn();
        session
    }

    pub fn state(&self) -> &G {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn outcome(&self) -> Outcome {
        self.state.classify()
    }

    pub fn engine_side(&self) -> Side {
        self.config.human_side.opposite()
    }

    /// Throws the current game away, including any search still running for
    /// it, and sets up a fresh one.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.state = G::new_game();
        self.phase = Phase::AwaitingHuman;
        info!("{} session reset, epoch {}", G::NAME, self.epoch);
        self.begin_turn();
    }

    /// Plays a complete human move.
    pub fn submit(&mut self, mv: G::Move) -> Result<&G, EngineError> {
        self.ensure_human_turn()?;
        let next = self.state.apply_human_move(mv).map_err(|err| {
            trace!("rejected {:?}: {}", mv, err);
            err
        })?;
        self.accept(next);
        Ok(&self.state)
    }

    /// Applies the engine's reply if it has arrived. Replies from an earlier
    /// epoch are discarded.
    pub fn poll_engine(&mut self) -> Option<G::Move> {
        loop {
            match self.replies.try_recv() {
                Ok(reply) => {
                    if let Some(mv) = self.deliver(reply) {
                        return Some(mv);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Blocks until the search for the current epoch answers. Returns `None`
    /// straight away when no search is running.
    pub fn wait_engine(&mut self) -> Option<G::Move> {
        while self.phase == Phase::Evaluating {
            let reply = self.replies.recv().ok()?;
            if let Some(mv) = self.deliver(reply) {
                return Some(mv);
            }
        }
        None
    }

    fn deliver(&mut self, reply: EngineReply<G::Move>) -> Option<G::Move> {
        if reply.epoch != self.epoch || self.phase != Phase::Evaluating {
            debug!(
                "discarding engine reply from epoch {} (current {})",
                reply.epoch, self.epoch
            );
            return None;
        }
        let Some(mv) = reply.mv else {
            // Searches only start on non-terminal positions.
            warn!("engine found no move");
            self.phase = Phase::Terminal(self.state.classify());
            return None;
        };
        match self.state.apply_human_move(mv) {
            Ok(next) => {
                debug!("engine played {:?}", mv);
                self.accept(next);
                Some(mv)
            }
            Err(err) => {
                warn!("engine move {:?} was rejected: {}", mv, err);
                self.phase = Phase::AwaitingHuman;
                None
            }
        }
    }

    fn ensure_human_turn(&self) -> Result<(), EngineError> {
        match self.phase {
            Phase::Evaluating => Err(EngineError::Busy),
            Phase::Terminal(_) => Err(EngineError::GameOver),
            Phase::AwaitingHuman if self.state.side_to_move() != self.config.human_side => {
                Err(EngineError::IllegalMove)
            }
            Phase::AwaitingHuman => Ok(()),
        }
    }

    fn accept(&mut self, next: G) {
        self.state = next;
        self.begin_turn();
    }

    fn begin_turn(&mut self) {
        let outcome = self.state.classify();
        if outcome.is_terminal() {
            info!("{} finished: {:?}", G::NAME, outcome);
            self.phase = Phase::Terminal(outcome);
        } else if self.state.side_to_move() == self.engine_side() {
            self.spawn_search();
        } else {
            self.phase = Phase::AwaitingHuman;
        }
    }

    fn spawn_search(&mut self) {
        self.phase = Phase::Evaluating;
        let epoch = self.epoch;
        let depth = self.config.search_depth::<G>();
        let skill = self.config.search_skill();
        let mut rng = self.rng.fork();
        let mut game = self.state.snapshot();
        let sender = self.sender.clone();

        thread::spawn(move || {
            let mut search = Search::new(G::Evaluator::default());
            let mv = search.pick_move(&mut game, depth, skill, &mut rng);
            // The session may be gone already; nobody is left to tell.
            let _ = sender.send(EngineReply { epoch, mv });
        });
    }
}

impl Session<ChessState> {
    pub fn select_token(&mut self, position: Position) -> Result<&ChessState, EngineError> {
        self.ensure_human_turn()?;
        self.state = self.state.select_token(position)?;
        Ok(&self.state)
    }

    /// Moves the selected token, or clears the selection when `position` is
    /// not one of its targets.
    pub fn attempt_move(&mut self, position: Position) -> Result<&ChessState, EngineError> {
        self.ensure_human_turn()?;
        let next = self.state.attempt_move(position)?;
        if next.history.len() > self.state.history.len() {
            self.accept(next);
        } else {
            self.state = next;
        }
        Ok(&self.state)
    }
}

impl Session<ConnectFourState> {
    pub fn drop_token(&mut self, column: Column) -> Result<&ConnectFourState, EngineError> {
        self.submit(column)
    }
}
