use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::console_log;
use crate::game::{Board, Move, PlayerId, RuleError, VictoryRule, DEFAULT_CHAIN_DEPTH};

use super::astar::AStarAgent;
use super::greedy::GreedyAgent;
use super::minimax::{EvaluationPolicy, MinimaxAgent};
use super::relief::ALMOST_FULL;
use super::{Choice, MoveChooser, MoveSource};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiStrategy {
    Greedy,
    AStar,
    Minimax,
}

impl FromStr for AiStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" => Ok(AiStrategy::Greedy),
            "astar" | "a*" | "a_star" | "pathfinder" => Ok(AiStrategy::AStar),
            "minimax" | "alphabeta" | "alpha_beta" => Ok(AiStrategy::Minimax),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(AiDifficulty::Easy),
            "normal" | "medium" => Ok(AiDifficulty::Normal),
            "hard" => Ok(AiDifficulty::Hard),
            "expert" | "extreme" => Ok(AiDifficulty::Expert),
            _ => Err(()),
        }
    }
}

/// Agent configuration. Every field has a default, so partial JSON is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    pub strategy: AiStrategy,
    /// Minimax plies; values below one search one ply.
    pub depth: u8,
    pub chain_depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub evaluation: EvaluationPolicy,
    pub victory: VictoryRule,
    /// Target occupancy that triggers evacuation during congestion relief.
    pub almost_full: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent: Option<PlayerId>,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        let base = Self {
            strategy: AiStrategy::Greedy,
            depth: 2,
            chain_depth: DEFAULT_CHAIN_DEPTH,
            seed: None,
            evaluation: EvaluationPolicy::TargetReward,
            victory: VictoryRule::FillTarget,
            almost_full: ALMOST_FULL,
            opponent: None,
        };
        match difficulty {
            AiDifficulty::Easy => Self {
                depth: 1,
                chain_depth: 1,
                ..base
            },
            AiDifficulty::Normal => base,
            AiDifficulty::Hard => Self {
                strategy: AiStrategy::Minimax,
                ..base
            },
            AiDifficulty::Expert => Self {
                strategy: AiStrategy::Minimax,
                depth: 3,
                ..base
            },
        }
    }

    pub fn with_strategy(mut self, strategy: AiStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parses a config, taking `victory` from the running game unless the JSON names one.
    pub fn from_json_under(json: &str, victory: VictoryRule) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let explicit = value.get("victory").is_some();
        let mut config: AiConfig = serde_json::from_value(value)?;
        if !explicit {
            config.victory = victory;
        }
        Ok(config)
    }

    fn chooser(&self) -> Box<dyn MoveChooser> {
        match self.strategy {
            AiStrategy::Greedy => Box::new(GreedyAgent::from_config(self)),
            AiStrategy::AStar => Box::new(AStarAgent::from_config(self)),
            AiStrategy::Minimax => Box::new(MinimaxAgent::from_config(self)),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(AiDifficulty::Normal)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
    pub mv: Option<Move>,
    pub evaluation: f64,
    pub source: MoveSource,
    pub depth_reached: u8,
    pub nodes: u64,
    pub strategy: AiStrategy,
}

impl AiDecision {
    fn from_choice(choice: Choice, strategy: AiStrategy) -> Self {
        Self {
            mv: choice.mv,
            evaluation: choice.score,
            source: choice.source,
            depth_reached: choice.depth_reached,
            nodes: choice.nodes,
            strategy,
        }
    }
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    /// Seeds from `config.seed` when present, else from entropy.
    pub fn new(config: AiConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn decide_move(
        &mut self,
        board: &Board,
        player_id: PlayerId,
    ) -> Result<AiDecision, RuleError> {
        let strategy = self.config.strategy;
        let choice = self.config.chooser().decide(board, player_id, &mut self.rng)?;
        match (choice.mv, choice.source) {
            (Some(mv), MoveSource::Relief) => {
                console_log!("[ai] player {player_id} relieves congestion with {mv}")
            }
            (Some(mv), source) => console_log!(
                "[ai] player {player_id} {strategy:?} picks {mv} ({source:?}, score {}, {} nodes)",
                choice.score,
                choice.nodes
            ),
            (None, _) => console_log!("[ai] player {player_id} has no move"),
        }
        Ok(AiDecision::from_choice(choice, strategy))
    }
}

/// One-shot move choice with a throwaway agent.
pub fn choose_move(
    strategy: AiStrategy,
    board: &Board,
    player_id: PlayerId,
    config: &AiConfig,
) -> Result<Option<Move>, RuleError> {
    let mut agent = AiAgent::new(config.clone().with_strategy(strategy));
    Ok(agent.decide_move(board, player_id)?.mv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::movegen::destinations;
    use crate::game::{Position, RuleEngine, EMPTY};

    #[test]
    fn strategies_and_difficulties_parse() {
        assert_eq!("Greedy".parse::<AiStrategy>(), Ok(AiStrategy::Greedy));
        assert_eq!("a*".parse::<AiStrategy>(), Ok(AiStrategy::AStar));
        assert_eq!("alphabeta".parse::<AiStrategy>(), Ok(AiStrategy::Minimax));
        assert!("mcts".parse::<AiStrategy>().is_err());
        let expert = AiConfig::from_difficulty("extreme".parse().expect("known difficulty"));
        assert_eq!(expert.strategy, AiStrategy::Minimax);
        assert_eq!(expert.depth, 3);
    }

    #[test]
    fn partial_json_config_uses_defaults() {
        let config: AiConfig = serde_json::from_str(r#"{"strategy":"minimax","depth":1,"seed":9}"#)
            .expect("valid config");
        assert_eq!(config.strategy, AiStrategy::Minimax);
        assert_eq!(config.depth, 1);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.chain_depth, DEFAULT_CHAIN_DEPTH);
        assert_eq!(config.almost_full, ALMOST_FULL);
        assert_eq!(config.victory, VictoryRule::FillTarget);

        let scored: AiConfig = serde_json::from_str(
            r#"{"victory":{"type":"score_threshold","points":12},"evaluation":"idle_penalty"}"#,
        )
        .expect("valid config");
        assert_eq!(scored.victory, VictoryRule::ScoreThreshold { points: 12 });
        assert_eq!(scored.evaluation, EvaluationPolicy::IdlePenalty);
    }

    #[test]
    fn game_victory_rule_fills_in_unless_named() {
        let game_rule = VictoryRule::ScoreThreshold { points: 15 };
        let inherited = AiConfig::from_json_under(r#"{"strategy":"minimax"}"#, game_rule)
            .expect("valid config");
        assert_eq!(inherited.victory, game_rule);
        assert_eq!(inherited.strategy, AiStrategy::Minimax);

        let named = AiConfig::from_json_under(r#"{"victory":{"type":"fill_target"}}"#, game_rule)
            .expect("valid config");
        assert_eq!(named.victory, VictoryRule::FillTarget);
        assert!(AiConfig::from_json_under("[1]", game_rule).is_err());
    }

    #[test]
    fn seeded_agents_repeat_their_choices() {
        let board = Board::new_game(4).expect("four player layout");
        let config = AiConfig::default().with_seed(42);
        let mut first = AiAgent::new(config.clone());
        let mut second = AiAgent::new(config);
        for player_id in 1..=4 {
            let a = first.decide_move(&board, player_id).expect("valid player");
            let b = second.decide_move(&board, player_id).expect("valid player");
            assert_eq!(a.mv, b.mv);
        }
    }

    fn is_legal(board: &Board, player_id: PlayerId, mv: Move) -> bool {
        let mut copy = board.clone();
        destinations(mv.from, board, DEFAULT_CHAIN_DEPTH).contains(&mv.to)
            && RuleEngine::try_apply_move(&mut copy, player_id, mv).is_ok()
    }

    #[test]
    fn every_strategy_returns_a_legal_move() {
        let mut board = Board::new_game(2).expect("two player layout");
        // Open one cell in each target.
        board.relocate(Move::new(Position::at(0, 3), Position::at(0, 4)));
        board.relocate(Move::new(Position::at(11, 8), Position::at(11, 7)));
        let config = AiConfig::default().with_seed(3);
        for strategy in [AiStrategy::Greedy, AiStrategy::AStar, AiStrategy::Minimax] {
            for player_id in 1..=2 {
                let mv = choose_move(strategy, &board, player_id, &config)
                    .expect("valid player")
                    .expect("moves exist");
                assert!(is_legal(&board, player_id, mv), "{strategy:?} chose {mv}");
            }
        }
    }

    #[test]
    fn boxed_in_player_gets_no_move_from_any_strategy() {
        let mut board = Board::empty();
        for pos in Board::positions() {
            board.set(pos, 2);
        }
        board.set(Position::at(0, 0), 1);
        board.set(Position::at(11, 11), EMPTY);
        for strategy in [AiStrategy::Greedy, AiStrategy::AStar, AiStrategy::Minimax] {
            let decision = AiAgent::with_seed(AiConfig::default().with_strategy(strategy), 1)
                .decide_move(&board, 1)
                .expect("valid player");
            assert_eq!(decision.mv, None);
            assert_eq!(decision.source, MoveSource::Exhausted);
        }
    }

    #[test]
    fn decision_serializes_move_field() {
        let board = Board::new_game(2).expect("two player layout");
        let decision = AiAgent::with_seed(AiConfig::default(), 5)
            .decide_move(&board, 1)
            .expect("valid player");
        let json = serde_json::to_value(&decision).expect("serializable");
        assert!(json.get("move").is_some());
        assert_eq!(json["strategy"], "greedy");
    }
}
