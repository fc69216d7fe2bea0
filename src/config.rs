//! Per-session settings. Everything here is plain data so an external
//! settings store can persist it as it likes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::Side;
use crate::rules::GameRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Probability that the engine plays its searched move rather than a
    /// random legal one.
    pub fn skill(self) -> f64 {
        match self {
            Difficulty::Easy => 0.35,
            Difficulty::Medium => 0.7,
            Difficulty::Hard => 0.95,
        }
    }

    pub fn depth<G: GameRules>(self) -> u32 {
        let index = match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        };
        G::DEPTHS[index]
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub difficulty: Difficulty,
    /// The side typed in by the player; the engine plays the other one.
    pub human_side: Side,
    /// Seeds the session's random source once.
    pub seed: u64,
    /// Overrides the difficulty's search depth.
    pub depth: Option<u32>,
    /// Overrides the difficulty's skill.
    pub skill: Option<f64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            human_side: Side::First,
            seed: 42,
            depth: None,
            skill: None,
        }
    }
}

impl SessionConfig {
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_human_side(mut self, side: Side) -> Self {
        self.human_side = side;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_skill(mut self, skill: f64) -> Self {
        self.skill = Some(skill.clamp(0.0, 1.0));
        self
    }

    pub fn search_depth<G: GameRules>(&self) -> u32 {
        self.depth.unwrap_or_else(|| self.difficulty.depth::<G>())
    }

    pub fn search_skill(&self) -> f64 {
        self.skill.unwrap_or_else(|| self.difficulty.skill())
    }
}
