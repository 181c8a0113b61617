use serde::{Deserialize, Serialize};
use std::fmt;

use super::regions;
use super::rules::RuleError;

pub const BOARD_SIZE: usize = 12;
/// 每位玩家的棋子数量，开局后不再变化。
pub const PIECES_PER_PLAYER: usize = 10;
/// 支持的最大玩家数（扩展的四人变体）。
pub const MAX_PLAYERS: u8 = 4;
pub const EMPTY: u8 = 0;

/// Diamond squares score 3 points for their occupant.
pub const DIAMOND_CELLS: [Position; 2] = [Position::at(5, 5), Position::at(6, 6)];
/// Gold squares score 1 point for their occupant.
pub const GOLD_CELLS: [Position; 2] = [Position::at(5, 6), Position::at(6, 5)];

/// 玩家标识，取值 1..=4。
pub type PlayerId = u8;

pub fn ensure_player(player_id: PlayerId) -> Result<(), RuleError> {
    if (1..=MAX_PLAYERS).contains(&player_id) {
        Ok(())
    } else {
        Err(RuleError::UnknownPlayer { player_id })
    }
}

/// A board coordinate; `row` and `col` are both in `0..12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub fn new(row: u8, col: u8) -> Result<Self, RuleError> {
        if (row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE {
            Ok(Self { row, col })
        } else {
            Err(RuleError::OutOfBounds { row, col })
        }
    }

    pub(crate) const fn at(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(self) -> bool {
        (self.row as usize) < BOARD_SIZE && (self.col as usize) < BOARD_SIZE
    }

    /// The cell `(dr, dc)` away, or `None` when that falls off the board.
    pub fn offset(self, dr: i8, dc: i8) -> Option<Position> {
        let row = self.row as i16 + dr as i16;
        let col = self.col as i16 + dc as i16;
        if (0..BOARD_SIZE as i16).contains(&row) && (0..BOARD_SIZE as i16).contains(&col) {
            Some(Position::at(row as u8, col as u8))
        } else {
            None
        }
    }

    pub fn manhattan(self, other: Position) -> u32 {
        (self.row.abs_diff(other.row) + self.col.abs_diff(other.col)) as u32
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Position,
    pub to: Position,
}

impl Move {
    pub fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    InvalidCell { row: u8, col: u8, value: u8 },
    PieceCount { player_id: PlayerId, count: usize },
    UnseatedPlayer { player_id: PlayerId },
}

/// The 12×12 grid. `0` is empty, `1..=4` is the owning player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[u8; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub const fn empty() -> Self {
        Self {
            cells: [[EMPTY; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Fresh layout: every seated player's ten pieces fill the triangular wedge in
    /// their home corner. Two players sit at seats 1 and 2, four use every seat.
    pub fn new_game(player_count: u8) -> Result<Self, RuleError> {
        let players = seated_players(player_count)?;
        let mut board = Self::empty();
        for &player_id in players {
            for &pos in regions::home_cells(player_id) {
                board.set(pos, player_id);
            }
        }
        Ok(board)
    }

    pub fn from_rows(cells: [[u8; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    pub fn rows(&self) -> &[[u8; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    pub fn get(&self, pos: Position) -> u8 {
        self.cells[pos.row as usize][pos.col as usize]
    }

    pub fn set(&mut self, pos: Position, value: u8) {
        self.cells[pos.row as usize][pos.col as usize] = value;
    }

    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos) == EMPTY
    }

    pub fn positions() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE as u8).flat_map(|row| (0..BOARD_SIZE as u8).map(move |col| Position::at(row, col)))
    }

    pub fn pieces(&self, player_id: PlayerId) -> Vec<Position> {
        Self::positions()
            .filter(|&pos| self.get(pos) == player_id)
            .collect()
    }

    pub fn piece_count(&self, player_id: PlayerId) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell == player_id)
            .count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&cell| cell != EMPTY).count()
    }

    /// Players with at least one piece on the board, ascending.
    pub fn players(&self) -> Vec<PlayerId> {
        (1..=MAX_PLAYERS)
            .filter(|&player_id| self.piece_count(player_id) > 0)
            .collect()
    }

    /// Relocates a piece without any legality checks. Search code calls this on
    /// private copies only.
    pub fn relocate(&mut self, mv: Move) {
        let piece = self.get(mv.from);
        self.set(mv.from, EMPTY);
        self.set(mv.to, piece);
    }

    pub fn with_move(&self, mv: Move) -> Board {
        let mut next = self.clone();
        next.relocate(mv);
        next
    }

    /// Own pieces sitting inside the player's target region.
    pub fn target_count(&self, player_id: PlayerId) -> usize {
        regions::target_cells(player_id)
            .iter()
            .filter(|&&pos| self.get(pos) == player_id)
            .count()
    }

    pub fn bonus_points(&self, player_id: PlayerId) -> u32 {
        let diamonds = DIAMOND_CELLS.iter().filter(|&&pos| self.get(pos) == player_id).count() as u32;
        let gold = GOLD_CELLS.iter().filter(|&&pos| self.get(pos) == player_id).count() as u32;
        diamonds * 3 + gold
    }

    /// Target occupancy plus bonus-square points.
    pub fn score(&self, player_id: PlayerId) -> u32 {
        self.target_count(player_id) as u32 + self.bonus_points(player_id)
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        for pos in Self::positions() {
            let value = self.get(pos);
            if value > MAX_PLAYERS {
                return Err(IntegrityError::InvalidCell {
                    row: pos.row,
                    col: pos.col,
                    value,
                });
            }
        }
        for player_id in self.players() {
            let count = self.piece_count(player_id);
            if count != PIECES_PER_PLAYER {
                return Err(IntegrityError::PieceCount { player_id, count });
            }
        }
        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: Vec<String> = row
                .iter()
                .map(|&cell| if cell == EMPTY { ".".to_string() } else { cell.to_string() })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

pub(crate) fn seated_players(player_count: u8) -> Result<&'static [PlayerId], RuleError> {
    match player_count {
        2 => Ok(&[1, 2]),
        4 => Ok(&[1, 2, 3, 4]),
        count => Err(RuleError::InvalidPlayerCount { count }),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum VictoryReason {
    TargetFilled,
    ScoreReached { points: u32 },
    MoveLimit { score: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VictoryState {
    pub winner: PlayerId,
    pub reason: VictoryReason,
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    PieceMoved { player_id: PlayerId, mv: Move },
    TurnPassed { player_id: PlayerId },
    GameWon { winner: PlayerId, reason: VictoryReason },
}

/// 游戏整体状态：棋盘、座位与回合信息。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub players: Vec<PlayerId>,
    pub current_player: PlayerId,
    pub turn: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VictoryState>,
}

impl GameState {
    pub fn new(player_count: u8) -> Result<Self, RuleError> {
        let board = Board::new_game(player_count)?;
        let players = seated_players(player_count)?.to_vec();
        Ok(Self {
            board,
            current_player: players[0],
            players,
            turn: 1,
            event_log: Vec::new(),
            outcome: None,
        })
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn next_player(&self, player_id: PlayerId) -> PlayerId {
        let index = self
            .players
            .iter()
            .position(|&id| id == player_id)
            .unwrap_or(0);
        self.players[(index + 1) % self.players.len()]
    }

    pub fn end_turn(&mut self) {
        self.current_player = self.next_player(self.current_player);
        self.turn += 1;
    }

    pub fn declare_victory(&mut self, winner: PlayerId, reason: VictoryReason) -> VictoryState {
        let victory = VictoryState { winner, reason };
        if self.outcome.is_none() {
            self.record_event(GameEvent::GameWon {
                winner: victory.winner,
                reason: victory.reason.clone(),
            });
            self.outcome = Some(victory.clone());
        }
        victory
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if !self.players.contains(&self.current_player) {
            return Err(IntegrityError::UnseatedPlayer {
                player_id: self.current_player,
            });
        }
        self.board.integrity_check()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            board: Board::empty(),
            players: vec![1, 2],
            current_player: 1,
            turn: 1,
            event_log: Vec::new(),
            outcome: None,
        }
    }
}
