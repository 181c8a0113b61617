//! AI 算法模块：贪心、A* 与 Minimax 三种走子策略，以及共用的拥堵疏导。

pub mod agent;
pub mod astar;
pub mod greedy;
pub mod minimax;
pub mod monitor;
pub mod relief;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::game::{Board, Move, PlayerId, RuleError};

pub use agent::{choose_move, AiAgent, AiConfig, AiDecision, AiDifficulty, AiStrategy};
pub use astar::AStarAgent;
pub use greedy::GreedyAgent;
pub use minimax::{EvaluationPolicy, MinimaxAgent, SearchStats};
pub use monitor::{StallMonitor, StallWarning};
pub use relief::{free_up_entry, plan_relief, Relief, ReliefKind, ALMOST_FULL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveSource {
    Relief,
    /// Greedy's direct step or hop onto the deep target cell.
    Shortcut,
    Search,
    /// No candidate scored positively; the nearest landing was taken.
    Fallback,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mv: Option<Move>,
    /// Strategy-specific score of `mv`; higher is better for every strategy.
    pub score: f64,
    pub source: MoveSource,
    pub nodes: u64,
    pub depth_reached: u8,
}

impl Choice {
    pub fn relief(mv: Move) -> Self {
        Self {
            mv: Some(mv),
            score: 0.0,
            source: MoveSource::Relief,
            nodes: 0,
            depth_reached: 0,
        }
    }

    pub fn found(mv: Move, score: f64, source: MoveSource) -> Self {
        Self {
            mv: Some(mv),
            score,
            source,
            nodes: 0,
            depth_reached: 1,
        }
    }

    pub fn exhausted() -> Self {
        Self {
            mv: None,
            score: 0.0,
            source: MoveSource::Exhausted,
            nodes: 0,
            depth_reached: 0,
        }
    }

    pub fn with_stats(mut self, nodes: u64, depth_reached: u8) -> Self {
        self.nodes = nodes;
        self.depth_reached = depth_reached;
        self
    }
}

/// A move-selection strategy.
///
/// Implementations never mutate the board they are handed. Randomness comes in
/// through `rng` so a seeded generator reproduces a game exactly.
pub trait MoveChooser {
    fn decide(
        &self,
        board: &Board,
        player_id: PlayerId,
        rng: &mut dyn RngCore,
    ) -> Result<Choice, RuleError>;

    fn choose_move(
        &self,
        board: &Board,
        player_id: PlayerId,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Move>, RuleError> {
        Ok(self.decide(board, player_id, rng)?.mv)
    }
}
