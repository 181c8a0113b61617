use serde::{Deserialize, Serialize};

use rand::RngCore;

use crate::game::movegen::{all_moves, moves_from};
use crate::game::regions::{depth, in_stable, in_target};
use crate::game::{ensure_player, Board, Move, PlayerId, Position, RuleError, VictoryRule};

use super::relief::plan_relief;
use super::{AiConfig, Choice, MoveChooser, MoveSource};

/// How a leaf position is scored for the mover.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationPolicy {
    /// `-2·d` per piece, `+50` inside the target, `+100` more once stable.
    #[default]
    TargetReward,
    /// `-2·d` per piece and `-1000` for each piece already in the target, which
    /// pushes the search to keep outside pieces moving.
    IdlePenalty,
}

impl EvaluationPolicy {
    pub fn evaluate(&self, board: &Board, player_id: PlayerId) -> i32 {
        board
            .pieces(player_id)
            .into_iter()
            .map(|pos| self.piece_value(player_id, pos))
            .sum()
    }

    fn piece_value(&self, player_id: PlayerId, pos: Position) -> i32 {
        let distance = -2 * depth(player_id, pos) as i32;
        let inside = in_target(player_id, pos);
        match self {
            EvaluationPolicy::TargetReward => {
                let mut value = distance;
                if inside {
                    value += 50;
                    if in_stable(player_id, pos) {
                        value += 100;
                    }
                }
                value
            }
            EvaluationPolicy::IdlePenalty => distance - if inside { 1000 } else { 0 },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub depth_reached: u8,
    pub cutoffs: u64,
}

/// Depth-limited alpha-beta against one fixed opponent.
#[derive(Debug, Clone, Copy)]
pub struct MinimaxAgent {
    depth: u8,
    chain_depth: usize,
    almost_full: usize,
    evaluation: EvaluationPolicy,
    victory: VictoryRule,
    opponent: Option<PlayerId>,
}

impl MinimaxAgent {
    pub fn new(depth: u8, chain_depth: usize) -> Self {
        Self {
            depth,
            chain_depth,
            almost_full: super::relief::ALMOST_FULL,
            evaluation: EvaluationPolicy::default(),
            victory: VictoryRule::default(),
            opponent: None,
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            depth: config.depth,
            chain_depth: config.chain_depth,
            almost_full: config.almost_full,
            evaluation: config.evaluation,
            victory: config.victory,
            opponent: config.opponent,
        }
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationPolicy) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn with_opponent(mut self, opponent: PlayerId) -> Self {
        self.opponent = Some(opponent);
        self
    }

    /// The MIN player: the configured one, else 1, or 2 when the mover is 1.
    pub fn opponent_of(&self, player_id: PlayerId) -> PlayerId {
        self.opponent.unwrap_or(if player_id == 1 { 2 } else { 1 })
    }

    /// Root candidates: outside pieces first, every move as a fallback.
    fn candidates(&self, board: &Board, player_id: PlayerId) -> Vec<Move> {
        let outside: Vec<Position> = board
            .pieces(player_id)
            .into_iter()
            .filter(|&pos| !in_target(player_id, pos))
            .collect();
        let moves = moves_from(&outside, board, self.chain_depth);
        if moves.is_empty() {
            all_moves(board, player_id, self.chain_depth)
        } else {
            moves
        }
    }

    pub fn search(
        &self,
        board: &Board,
        player_id: PlayerId,
        stats: &mut SearchStats,
    ) -> Option<(Move, i32)> {
        let opponent = self.opponent_of(player_id);
        let depth = self.depth.max(1);
        let mut alpha = i32::MIN;
        let mut best: Option<(Move, i32)> = None;
        for mv in self.candidates(board, player_id) {
            let child = board.with_move(mv);
            let value = self.min_value(
                &child,
                player_id,
                opponent,
                depth - 1,
                alpha,
                i32::MAX,
                1,
                stats,
            );
            if best.map_or(true, |(_, best_value)| value > best_value) {
                best = Some((mv, value));
                alpha = alpha.max(value);
            }
        }
        best
    }

    fn leaf(&self, board: &Board, player_id: PlayerId, ply: u8, stats: &mut SearchStats) -> i32 {
        // Leaves are always scored for the mover, whichever layer reached them.
        stats.nodes += 1;
        stats.depth_reached = stats.depth_reached.max(ply);
        self.evaluation.evaluate(board, player_id)
    }

    #[allow(clippy::too_many_arguments)]
    fn max_value(
        &self,
        board: &Board,
        player_id: PlayerId,
        opponent: PlayerId,
        depth_remaining: u8,
        mut alpha: i32,
        beta: i32,
        ply: u8,
        stats: &mut SearchStats,
    ) -> i32 {
        if depth_remaining == 0 || self.victory.is_terminal(board) {
            return self.leaf(board, player_id, ply, stats);
        }
        let moves = all_moves(board, player_id, self.chain_depth);
        if moves.is_empty() {
            return self.leaf(board, player_id, ply, stats);
        }
        stats.nodes += 1;
        let mut value = i32::MIN;
        for mv in moves {
            let child = board.with_move(mv);
            value = value.max(self.min_value(
                &child,
                player_id,
                opponent,
                depth_remaining - 1,
                alpha,
                beta,
                ply + 1,
                stats,
            ));
            if value >= beta {
                stats.cutoffs += 1;
                return value;
            }
            alpha = alpha.max(value);
        }
        value
    }

    #[allow(clippy::too_many_arguments)]
    fn min_value(
        &self,
        board: &Board,
        player_id: PlayerId,
        opponent: PlayerId,
        depth_remaining: u8,
        alpha: i32,
        mut beta: i32,
        ply: u8,
        stats: &mut SearchStats,
    ) -> i32 {
        if depth_remaining == 0 || self.victory.is_terminal(board) {
            return self.leaf(board, player_id, ply, stats);
        }
        let moves = all_moves(board, opponent, self.chain_depth);
        if moves.is_empty() {
            return self.leaf(board, player_id, ply, stats);
        }
        stats.nodes += 1;
        let mut value = i32::MAX;
        for mv in moves {
            let child = board.with_move(mv);
            value = value.min(self.max_value(
                &child,
                player_id,
                opponent,
                depth_remaining - 1,
                alpha,
                beta,
                ply + 1,
                stats,
            ));
            if value <= alpha {
                stats.cutoffs += 1;
                return value;
            }
            beta = beta.min(value);
        }
        value
    }
}

impl MoveChooser for MinimaxAgent {
    fn decide(
        &self,
        board: &Board,
        player_id: PlayerId,
        _rng: &mut dyn RngCore,
    ) -> Result<Choice, RuleError> {
        ensure_player(player_id)?;
        if let Some(opponent) = self.opponent {
            ensure_player(opponent)?;
        }
        if let Some(relief) = plan_relief(board, player_id, self.almost_full) {
            return Ok(Choice::relief(relief.mv));
        }
        let mut stats = SearchStats::default();
        Ok(match self.search(board, player_id, &mut stats) {
            Some((mv, value)) => Choice::found(mv, f64::from(value), MoveSource::Search)
                .with_stats(stats.nodes, stats.depth_reached),
            None => Choice::exhausted().with_stats(stats.nodes, 0),
        })
    }
}
