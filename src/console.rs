//! Line-oriented text front end. One command per line, one reply per
//! command; engine replies are awaited before the next prompt.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};

use crate::board::{Position, Side};
use crate::chess::ChessState;
use crate::config::{Difficulty, SessionConfig};
use crate::connect_four::{Column, ConnectFourState};
use crate::movegen::Move;
use crate::rules::GameRules;
use crate::session::{Phase, Session};

const HELP: &str = "\
commands:
  new chess|connect4 [easy|medium|hard] [first|second]
  show | status | reset | help | quit
  chess:     moves <sq> | select <sq> | to <sq> | move e2e4[q]
  connect4:  drop <col>
";

enum ActiveGame {
    Chess(Session<ChessState>),
    ConnectFour(Session<ConnectFourState>),
}

pub struct Console {
    config: SessionConfig,
    game: Option<ActiveGame>,
}

impl Console {
    pub fn new(config: SessionConfig) -> Self {
        Console { config, game: None }
    }

    pub fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut reader = stdin.lock();
        let mut line = String::new();

        writeln!(stdout, "{}", HELP)?;
        while reader.read_line(&mut line)? > 0 {
            let command = line.trim();
            if command == "quit" {
                break;
            }
            match self.handle_command(command) {
                Ok(reply) => write!(stdout, "{}", reply)?,
                Err(err) => writeln!(stdout, "error: {:#}", err)?,
            }
            stdout.flush()?;
            line.clear();
        }
        Ok(())
    }

    pub fn handle_command(&mut self, command: &str) -> Result<String> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some((&head, args)) = parts.split_first() else {
            return Ok(String::new());
        };

        match head {
            "help" => Ok(HELP.to_string()),
            "quit" => Ok(String::new()),
            "new" => self.handle_new(args),
            "reset" => {
                match self.active()? {
                    ActiveGame::Chess(session) => session.reset(),
                    ActiveGame::ConnectFour(session) => session.reset(),
                }
                self.settle()
            }
            "show" => self.render(),
            "status" => self.status(),
            "moves" => self.handle_moves(args),
            "select" => {
                let position = square_arg(args)?;
                self.chess()?.select_token(position)?;
                self.render()
            }
            "to" => {
                let position = square_arg(args)?;
                self.chess()?.attempt_move(position)?;
                self.settle()
            }
            "move" => {
                let text = args.first().ok_or_else(|| anyhow!("usage: move e2e4[q]"))?;
                let (from, to, promotion) =
                    Move::parse(text).ok_or_else(|| anyhow!("cannot read move '{}'", text))?;
                let session = self.chess()?;
                let piece = session
                    .state()
                    .board
                    .piece_at(from)
                    .ok_or_else(|| anyhow!("no token on {}", from))?;
                let mv = Move {
                    promotion,
                    ..Move::new(from, to, piece.kind)
                };
                session.submit(mv)?;
                self.settle()
            }
            "drop" => {
                let text = args.first().ok_or_else(|| anyhow!("usage: drop <col>"))?;
                let column: Column = text
                    .parse()
                    .with_context(|| format!("cannot read column '{}'", text))?;
                self.connect_four()?.drop_token(column)?;
                self.settle()
            }
            other => bail!("unknown command '{}', try 'help'", other),
        }
    }

    fn handle_new(&mut self, args: &[&str]) -> Result<String> {
        let (&game, options) = args
            .split_first()
            .ok_or_else(|| anyhow!("usage: new chess|connect4 [difficulty] [first|second]"))?;
        let mut config = self.config.clone();
        for option in options {
            config = match *option {
                "first" => config.with_human_side(Side::First),
                "second" => config.with_human_side(Side::Second),
                other => config.with_difficulty(other.parse::<Difficulty>().map_err(|e| anyhow!(e))?),
            };
        }
        self.game = Some(match game {
            "chess" => ActiveGame::Chess(Session::new(config)),
            "connect4" | "connect-four" => ActiveGame::ConnectFour(Session::new(config)),
            other => bail!("unknown game '{}'", other),
        });
        self.settle()
    }

    fn handle_moves(&mut self, args: &[&str]) -> Result<String> {
        let position = square_arg(args)?;
        let targets: Vec<String> = match self.active()? {
            ActiveGame::Chess(session) => session
                .state()
                .legal_moves_for(position)?
                .iter()
                .map(|mv| mv.to_string())
                .collect(),
            ActiveGame::ConnectFour(session) => session
                .state()
                .legal_moves_for(position)?
                .iter()
                .map(|column| format!("drop {}", column))
                .collect(),
        };
        if targets.is_empty() {
            Ok(format!("no moves from {}\n", position))
        } else {
            Ok(format!("{}\n", targets.join(" ")))
        }
    }

    /// Waits out any engine turn, then shows the board and status.
    fn settle(&mut self) -> Result<String> {
        let mut reply = String::new();
        match self.active()? {
            ActiveGame::Chess(session) => {
                if let Some(mv) = session.wait_engine() {
                    reply.push_str(&format!("engine plays {}\n", mv));
                }
            }
            ActiveGame::ConnectFour(session) => {
                if let Some(column) = session.wait_engine() {
                    reply.push_str(&format!("engine drops in {}\n", column));
                }
            }
        }
        reply.push_str(&self.render()?);
        Ok(reply)
    }

    fn render(&mut self) -> Result<String> {
        let board = match self.active()? {
            ActiveGame::Chess(session) => {
                let state = session.state();
                let mut text = format!("{}\n", state.board);
                if let Some(selected) = state.selection {
                    let targets: Vec<String> =
                        state.legal_moves.iter().map(|mv| mv.to.to_string()).collect();
                    text.push_str(&format!("selected {}: {}\n", selected, targets.join(" ")));
                }
                text
            }
            ActiveGame::ConnectFour(session) => format!("{}\n", session.state().board),
        };
        Ok(format!("{}{}", board, self.status()?))
    }

    fn status(&mut self) -> Result<String> {
        let (phase, outcome, to_move) = match self.active()? {
            ActiveGame::Chess(session) => {
                (session.phase(), session.outcome(), session.state().side_to_move())
            }
            ActiveGame::ConnectFour(session) => {
                (session.phase(), session.outcome(), session.state().side_to_move())
            }
        };
        let line = match phase {
            Phase::Terminal(outcome) => match outcome.winner() {
                Some(winner) => format!("game over: {:?}, {} wins", outcome, winner),
                None => format!("game over: {:?}", outcome),
            },
            Phase::Evaluating => "engine is thinking".to_string(),
            Phase::AwaitingHuman => format!("{} to move ({:?})", to_move, outcome),
        };
        Ok(format!("{}\n", line))
    }

    fn active(&mut self) -> Result<&mut ActiveGame> {
        self.game
            .as_mut()
            .ok_or_else(|| anyhow!("no game running, start one with 'new'"))
    }

    fn chess(&mut self) -> Result<&mut Session<ChessState>> {
        match self.active()? {
            ActiveGame::Chess(session) => Ok(session),
            ActiveGame::ConnectFour(_) => bail!("that command is for chess"),
        }
    }

    fn connect_four(&mut self) -> Result<&mut Session<ConnectFourState>> {
        match self.active()? {
            ActiveGame::ConnectFour(session) => Ok(session),
            ActiveGame::Chess(_) => bail!("that command is for connect-four"),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

fn square_arg(args: &[&str]) -> Result<Position> {
    let text = args.first().ok_or_else(|| anyhow!("missing square"))?;
    Position::parse(text).ok_or_else(|| anyhow!("cannot read square '{}'", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console() -> Console {
        Console::new(SessionConfig::default().with_depth(1).with_skill(1.0))
    }

    #[test]
    fn commands_need_a_game() {
        let mut console = console();
        assert!(console.handle_command("show").is_err());
        assert!(console.handle_command("drop 3").is_err());
        assert_eq!(console.handle_command("").unwrap(), "");
        assert!(console.handle_command("fly").is_err());
    }

    #[test]
    fn chess_round_trip_through_text() {
        let mut console = console();
        let opening = console.handle_command("new chess").unwrap();
        assert!(opening.contains("first to move"));

        let moves = console.handle_command("moves g1").unwrap();
        assert!(moves.contains("g1f3"));
        assert!(moves.contains("g1h3"));

        let reply = console.handle_command("move e2e4").unwrap();
        assert!(reply.contains("engine plays"));
        assert!(console.handle_command("move e2e4").is_err());
        assert!(console.handle_command("drop 2").is_err());
    }

    #[test]
    fn selection_commands() {
        let mut console = console();
        console.handle_command("new chess").unwrap();
        let shown = console.handle_command("select b1").unwrap();
        assert!(shown.contains("selected b1:"));
        assert!(shown.contains("a3") && shown.contains("c3"));
        let reply = console.handle_command("to c3").unwrap();
        assert!(reply.contains("engine plays"));
    }

    #[test]
    fn connect_four_with_engine_first() {
        let mut console = console();
        let opening = console.handle_command("new connect4 hard second").unwrap();
        assert!(opening.contains("engine drops in"));
        assert!(console.handle_command("drop 9").is_err());
        assert!(console.handle_command("drop x").is_err());
        let reply = console.handle_command("drop 0").unwrap();
        assert!(reply.contains("engine drops in"));
        assert!(console.handle_command("move e2e4").is_err());
    }

    #[test]
    fn new_rejects_unknown_options() {
        let mut console = console();
        assert!(console.handle_command("new checkers").is_err());
        assert!(console.handle_command("new chess brutal").is_err());
        assert!(console.handle_command("new").is_err());
    }
}
