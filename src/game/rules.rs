use serde::{Deserialize, Serialize};
use std::fmt;

use super::state::{
    ensure_player, Board, GameEvent, GameState, IntegrityError, Move, PlayerId, VictoryReason,
    VictoryState, EMPTY, PIECES_PER_PLAYER,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    GameFinished,
    NotPlayerTurn {
        expected: PlayerId,
        actual: PlayerId,
    },
    OutOfBounds {
        row: u8,
        col: u8,
    },
    UnknownPlayer {
        player_id: PlayerId,
    },
    InvalidPlayerCount {
        count: u8,
    },
    EmptySource {
        row: u8,
        col: u8,
    },
    NotOwner {
        player_id: PlayerId,
        row: u8,
        col: u8,
    },
    DestinationOccupied {
        row: u8,
        col: u8,
    },
    IntegrityViolation {
        error: IntegrityError,
    },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::GameFinished => write!(f, "game already finished"),
            RuleError::NotPlayerTurn { expected, actual } => {
                write!(f, "player {actual} moved during player {expected}'s turn")
            }
            RuleError::OutOfBounds { row, col } => write!(f, "({row}, {col}) is off the board"),
            RuleError::UnknownPlayer { player_id } => write!(f, "unknown player id {player_id}"),
            RuleError::InvalidPlayerCount { count } => {
                write!(f, "unsupported player count {count}")
            }
            RuleError::EmptySource { row, col } => write!(f, "no piece at ({row}, {col})"),
            RuleError::NotOwner { player_id, row, col } => {
                write!(f, "piece at ({row}, {col}) does not belong to player {player_id}")
            }
            RuleError::DestinationOccupied { row, col } => {
                write!(f, "destination ({row}, {col}) is occupied")
            }
            RuleError::IntegrityViolation { error } => write!(f, "corrupt board: {error:?}"),
        }
    }
}

impl std::error::Error for RuleError {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VictoryRule {
    /// A player's target holds that player's full army.
    FillTarget,
    /// Target occupancy plus bonus squares reaches `points`, or the target is filled.
    ScoreThreshold { points: u32 },
}

impl Default for VictoryRule {
    fn default() -> Self {
        VictoryRule::FillTarget
    }
}

impl VictoryRule {
    /// First player (ascending id) meeting the rule, with the reason.
    pub fn winner(&self, board: &Board) -> Option<(PlayerId, VictoryReason)> {
        for player_id in board.players() {
            if board.target_count(player_id) == PIECES_PER_PLAYER {
                return Some((player_id, VictoryReason::TargetFilled));
            }
            if let VictoryRule::ScoreThreshold { points } = *self {
                let score = board.score(player_id);
                if score >= points {
                    return Some((player_id, VictoryReason::ScoreReached { points: score }));
                }
            }
        }
        None
    }

    pub fn is_terminal(&self, board: &Board) -> bool {
        self.winner(board).is_some()
    }
}

/// Moves `mv.from` to `mv.to` when the destination is empty. Returns `false` and
/// leaves the board untouched otherwise.
pub fn apply_move(board: &mut Board, mv: Move) -> bool {
    if !mv.from.in_bounds() || !mv.to.in_bounds() {
        return false;
    }
    if board.get(mv.from) == EMPTY || !board.is_empty(mv.to) {
        return false;
    }
    board.relocate(mv);
    true
}

/// True when some player's target is filled with their own pieces.
pub fn is_terminal(board: &Board) -> bool {
    VictoryRule::FillTarget.is_terminal(board)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victory: Option<VictoryState>,
}

impl RuleResolution {
    pub fn new(state: GameState, events: Vec<GameEvent>) -> Self {
        let victory = state.outcome.clone();
        Self {
            state,
            events,
            victory,
        }
    }
}

/// 回合与胜负规则引擎。
#[derive(Debug, Default, Clone)]
pub struct RuleEngine {
    victory_rule: VictoryRule,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_victory_rule(victory_rule: VictoryRule) -> Self {
        Self { victory_rule }
    }

    pub fn victory_rule(&self) -> VictoryRule {
        self.victory_rule
    }

    fn ensure_turn_owner(state: &GameState, player_id: PlayerId) -> Result<(), RuleError> {
        if state.current_player != player_id {
            return Err(RuleError::NotPlayerTurn {
                expected: state.current_player,
                actual: player_id,
            });
        }
        Ok(())
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    /// Checked move application explaining why a move is rejected.
    pub fn try_apply_move(
        board: &mut Board,
        player_id: PlayerId,
        mv: Move,
    ) -> Result<(), RuleError> {
        ensure_player(player_id)?;
        for pos in [mv.from, mv.to] {
            if !pos.in_bounds() {
                return Err(RuleError::OutOfBounds {
                    row: pos.row,
                    col: pos.col,
                });
            }
        }
        match board.get(mv.from) {
            EMPTY => {
                return Err(RuleError::EmptySource {
                    row: mv.from.row,
                    col: mv.from.col,
                })
            }
            owner if owner != player_id => {
                return Err(RuleError::NotOwner {
                    player_id,
                    row: mv.from.row,
                    col: mv.from.col,
                })
            }
            _ => {}
        }
        if !board.is_empty(mv.to) {
            return Err(RuleError::DestinationOccupied {
                row: mv.to.row,
                col: mv.to.col,
            });
        }
        board.relocate(mv);
        Ok(())
    }

    /// Plays `mv` for the current player, records it and passes the turn.
    pub fn play_move(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
        mv: Move,
    ) -> Result<Vec<GameEvent>, RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        Self::ensure_turn_owner(state, player_id)?;
        Self::try_apply_move(&mut state.board, player_id, mv)?;

        let mut events = vec![GameEvent::PieceMoved { player_id, mv }];
        state.record_event(events[0].clone());
        if let Some(outcome) = self.check_victory(state) {
            events.push(GameEvent::GameWon {
                winner: outcome.winner,
                reason: outcome.reason,
            });
        } else {
            state.end_turn();
        }
        Ok(events)
    }

    /// Records that `player_id` had no move and hands the turn on.
    pub fn pass_turn(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        Self::ensure_turn_owner(state, player_id)?;
        let event = GameEvent::TurnPassed { player_id };
        state.record_event(event.clone());
        state.end_turn();
        Ok(vec![event])
    }

    pub fn check_victory(&self, state: &mut GameState) -> Option<VictoryState> {
        if let Some(outcome) = &state.outcome {
            return Some(outcome.clone());
        }
        let (winner, reason) = self.victory_rule.winner(&state.board)?;
        Some(state.declare_victory(winner, reason))
    }

    /// Ends a game that ran out of moves: the player with most pieces in their
    /// target wins. An all-zero board or a shared lead produces no winner.
    pub fn conclude_by_leader(&self, state: &mut GameState) -> Result<Option<VictoryState>, RuleError> {
        Self::ensure_integrity(state)?;
        if let Some(outcome) = self.check_victory(state) {
            return Ok(Some(outcome));
        }
        Ok(Self::leader(&state.board).map(|(winner, score)| {
            state.declare_victory(winner, VictoryReason::MoveLimit { score })
        }))
    }

    /// The unique player with the highest target occupancy.
    pub fn leader(board: &Board) -> Option<(PlayerId, u32)> {
        let scores: Vec<(PlayerId, u32)> = board
            .players()
            .into_iter()
            .map(|player_id| (player_id, board.target_count(player_id) as u32))
            .collect();
        let best = scores.iter().map(|&(_, score)| score).max()?;
        let mut leaders = scores.iter().filter(|&&(_, score)| score == best);
        let leader = *leaders.next()?;
        if best == 0 || leaders.next().is_some() {
            return None;
        }
        Some(leader)
    }
}
