pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{
    choose_move, AiAgent, AiConfig, AiDecision, AiDifficulty, AiStrategy, EvaluationPolicy,
    MoveChooser, StallMonitor, StallWarning,
};
pub use game::{
    all_moves, apply_move, is_terminal, Board, GameEvent, GameState, IntegrityError, Move,
    PlayerId, Position, RuleEngine, RuleError, RuleResolution, VictoryReason, VictoryRule,
    VictoryState, MAX_PLAYERS,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

/// Full JSON config wins; otherwise a difficulty preset, then the strategy override.
/// The game's victory rule applies unless the JSON names its own.
fn resolve_config(
    config_json: Option<String>,
    difficulty: Option<String>,
    strategy: Option<String>,
    victory: VictoryRule,
) -> Result<AiConfig, JsValue> {
    let mut config = match config_json {
        Some(json) => AiConfig::from_json_under(&json, victory).map_err(serde_to_js_error)?,
        None => {
            let diff = difficulty
                .as_deref()
                .and_then(|value| AiDifficulty::from_str(value).ok())
                .unwrap_or(AiDifficulty::Normal);
            AiConfig {
                victory,
                ..AiConfig::from_difficulty(diff)
            }
        }
    };
    if let Some(strategy) = strategy
        .as_deref()
        .and_then(|value| AiStrategy::from_str(value).ok())
    {
        config = config.with_strategy(strategy);
    }
    Ok(config)
}

/// The seat's agent, rebuilt only when its config changes so a seeded rng keeps running.
fn seat_agent(
    agents: &mut [Option<AiAgent>],
    player_id: PlayerId,
    config: AiConfig,
) -> Option<&mut AiAgent> {
    let slot = agents.get_mut(usize::from(player_id).checked_sub(1)?)?;
    if slot.as_ref().map_or(true, |agent| agent.config() != &config) {
        *slot = Some(AiAgent::new(config));
    }
    slot.as_mut()
}

fn config_from_js(config: JsValue) -> Result<AiConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        Ok(AiConfig::default())
    } else {
        from_value(config).map_err(JsValue::from)
    }
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<RuleResolution>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<StallWarning>,
}

#[derive(Serialize)]
struct ApplyOutcome {
    applied: bool,
    board: Board,
}

#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
    rules: RuleEngine,
    monitors: Vec<StallMonitor>,
    agents: Vec<Option<AiAgent>>,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(
        player_count: Option<u8>,
        initial_state_json: Option<String>,
    ) -> Result<GameEngine, JsValue> {
        let state = match initial_state_json {
            Some(json) => {
                let state: GameState = serde_json::from_str(&json).map_err(serde_to_js_error)?;
                state
                    .integrity_check()
                    .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
                state
            }
            None => GameState::new(player_count.unwrap_or(2)).map_err(to_js_error)?,
        };
        Ok(GameEngine {
            state,
            rules: RuleEngine::new(),
            monitors: (1..=MAX_PLAYERS).map(StallMonitor::new).collect(),
            agents: (1..=MAX_PLAYERS).map(|_| None).collect(),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        state
            .integrity_check()
            .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
        self.state = state;
        self.monitors.iter_mut().for_each(StallMonitor::reset);
        self.agents.iter_mut().for_each(|agent| *agent = None);
        Ok(())
    }

    pub fn board_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.board).map_err(serde_to_js_error)
    }

    pub fn set_victory_rule_json(&mut self, json: &str) -> Result<(), JsValue> {
        let rule: VictoryRule = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.rules = RuleEngine::with_victory_rule(rule);
        Ok(())
    }

    pub fn current_player(&self) -> u8 {
        self.state.current_player
    }

    pub fn legal_moves_json(
        &self,
        player_id: u8,
        chain_depth: Option<usize>,
    ) -> Result<String, JsValue> {
        game::ensure_player(player_id).map_err(to_js_error)?;
        let moves = all_moves(
            &self.state.board,
            player_id,
            chain_depth.unwrap_or(game::DEFAULT_CHAIN_DEPTH),
        );
        serde_json::to_string(&moves).map_err(serde_to_js_error)
    }

    pub fn play_move_json(&mut self, move_json: &str) -> Result<String, JsValue> {
        let mv: Move = serde_json::from_str(move_json).map_err(serde_to_js_error)?;
        let player_id = self.state.current_player;
        let events = self
            .rules
            .play_move(&mut self.state, player_id, mv)
            .map_err(to_js_error)?;
        make_resolution_json(RuleResolution::new(self.state.clone(), events))
    }

    pub fn pass_turn(&mut self) -> Result<String, JsValue> {
        let player_id = self.state.current_player;
        let events = self
            .rules
            .pass_turn(&mut self.state, player_id)
            .map_err(to_js_error)?;
        make_resolution_json(RuleResolution::new(self.state.clone(), events))
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_finished() || self.rules.victory_rule().is_terminal(&self.state.board)
    }

    /// Declares the target leader the winner, for games stopped on a move cap.
    pub fn conclude_json(&mut self) -> Result<String, JsValue> {
        let outcome = self
            .rules
            .conclude_by_leader(&mut self.state)
            .map_err(to_js_error)?;
        serde_json::to_string(&outcome).map_err(serde_to_js_error)
    }

    pub fn apply_ai_move(
        &mut self,
        config_json: Option<String>,
        difficulty: Option<String>,
        strategy: Option<String>,
    ) -> Result<String, JsValue> {
        if self.state.is_finished() {
            return Err(to_js_error(RuleError::GameFinished));
        }
        let config = resolve_config(
            config_json,
            difficulty,
            strategy,
            self.rules.victory_rule(),
        )?;
        let player_id = self.state.current_player;

        let agent = seat_agent(&mut self.agents, player_id, config)
            .ok_or_else(|| to_js_error(RuleError::UnknownPlayer { player_id }))?;
        let decision = agent
            .decide_move(&self.state.board, player_id)
            .map_err(to_js_error)?;

        let events = match decision.mv {
            Some(mv) => self.rules.play_move(&mut self.state, player_id, mv),
            None => self.rules.pass_turn(&mut self.state, player_id),
        }
        .map_err(to_js_error)?;
        let applied = Some(RuleResolution::new(self.state.clone(), events));

        let monitor = usize::from(player_id)
            .checked_sub(1)
            .and_then(|index| self.monitors.get_mut(index));
        let warnings = match monitor {
            Some(monitor) => monitor.observe(&self.state.board, decision.mv),
            None => Vec::new(),
        };

        let response = AiMoveResponse {
            decision,
            applied,
            warnings,
        };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    pub fn think_ai(
        &self,
        config_json: Option<String>,
        difficulty: Option<String>,
        strategy: Option<String>,
        delay_ms: Option<u32>,
    ) -> Promise {
        let board = self.state.board.clone();
        let player_id = self.state.current_player;
        let config = resolve_config(
            config_json,
            difficulty,
            strategy,
            self.rules.victory_rule(),
        );
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(config?);
            let decision = agent
                .decide_move(&board, player_id)
                .map_err(to_js_error)?;
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

/// 返回指定人数的开局棋盘（二维数组）。
#[wasm_bindgen(js_name = "newBoard")]
pub fn new_board(player_count: u8) -> Result<JsValue, JsValue> {
    let board = Board::new_game(player_count).map_err(to_js_error)?;
    to_value(&board).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state(player_count: u8) -> Result<JsValue, JsValue> {
    let state = GameState::new(player_count).map_err(to_js_error)?;
    to_value(&state).map_err(JsValue::from)
}

/// 列出某玩家的全部合法走法。
#[wasm_bindgen(js_name = "legalMoves")]
pub fn legal_moves(
    board: JsValue,
    player_id: u8,
    chain_depth: Option<usize>,
) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    game::ensure_player(player_id).map_err(to_js_error)?;
    let moves = all_moves(
        &board,
        player_id,
        chain_depth.unwrap_or(game::DEFAULT_CHAIN_DEPTH),
    );
    to_value(&moves).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "chainJumps")]
pub fn chain_jumps(
    board: JsValue,
    row: u8,
    col: u8,
    max_depth: Option<usize>,
) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let origin = Position::new(row, col).map_err(to_js_error)?;
    let paths = game::chain_jumps(
        origin,
        &board,
        &[],
        max_depth.unwrap_or(game::DEFAULT_CHAIN_DEPTH),
    );
    to_value(&paths).map_err(JsValue::from)
}

/// 应用一步走法，返回是否成功以及更新后的棋盘。
#[wasm_bindgen(js_name = "applyMove")]
pub fn apply_board_move(board: JsValue, mv: JsValue) -> Result<JsValue, JsValue> {
    let mut board: Board = from_value(board).map_err(JsValue::from)?;
    let mv: Move = from_value(mv).map_err(JsValue::from)?;
    let applied = apply_move(&mut board, mv);
    to_value(&ApplyOutcome { applied, board }).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "isTerminal")]
pub fn is_terminal_board(board: JsValue) -> Result<bool, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    Ok(is_terminal(&board))
}

#[wasm_bindgen(js_name = "chooseMove")]
pub fn choose_board_move(
    strategy: &str,
    board: JsValue,
    player_id: u8,
    config: JsValue,
) -> Result<JsValue, JsValue> {
    let strategy = AiStrategy::from_str(strategy)
        .map_err(|_| JsValue::from_str(&format!("unknown strategy {strategy}")))?;
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let config = config_from_js(config)?;
    let mv = choose_move(strategy, &board, player_id, &config).map_err(to_js_error)?;
    to_value(&mv).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(board: JsValue, player_id: u8, config: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let mut agent = AiAgent::new(config_from_js(config)?);
    let decision = agent
        .decide_move(&board, player_id)
        .map_err(to_js_error)?;
    to_value(&decision).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "freeUpEntry")]
pub fn free_up_entry(board: JsValue, player_id: u8) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    game::ensure_player(player_id).map_err(to_js_error)?;
    to_value(&ai::free_up_entry(&board, player_id)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "checkVictory")]
pub fn check_victory(state: JsValue, victory_rule: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let rule = if victory_rule.is_undefined() || victory_rule.is_null() {
        VictoryRule::default()
    } else {
        from_value(victory_rule).map_err(JsValue::from)?
    };
    let outcome = RuleEngine::with_victory_rule(rule).check_victory(&mut state);
    to_value(&outcome).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateBoard")]
pub fn validate_board(board: JsValue) -> Result<(), JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    board
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_agent_survives_between_turns() {
        let board = Board::new_game(2).expect("two player layout");
        let config = AiConfig::default().with_seed(17);
        let mut agents: Vec<Option<AiAgent>> = (1..=MAX_PLAYERS).map(|_| None).collect();
        let mut reference = AiAgent::new(config.clone());
        for _ in 0..3 {
            let agent = seat_agent(&mut agents, 1, config.clone()).expect("seat 1 exists");
            let played = agent.decide_move(&board, 1).expect("valid player").mv;
            let expected = reference.decide_move(&board, 1).expect("valid player").mv;
            assert_eq!(played, expected);
        }

        let minimax = config.with_strategy(AiStrategy::Minimax);
        let agent = seat_agent(&mut agents, 1, minimax.clone()).expect("seat 1 exists");
        assert_eq!(agent.config(), &minimax);
        assert!(agents[1].is_none());
        assert!(seat_agent(&mut agents, 0, AiConfig::default()).is_none());
    }
}
