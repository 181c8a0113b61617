//! 游戏核心逻辑模块（棋盘、区域、走法生成与规则）。

pub mod movegen;
pub mod regions;
pub mod rules;
pub mod state;

pub use movegen::{
    all_moves, chain_jumps, destinations, moves_from, single_jumps, step_moves, Path,
    DEFAULT_CHAIN_DEPTH,
};
pub use regions::Seat;
pub use rules::{apply_move, is_terminal, RuleEngine, RuleError, RuleResolution, VictoryRule};
pub use state::{
    ensure_player, Board, GameEvent, GameState, IntegrityError, Move, PlayerId, Position,
    VictoryReason, VictoryState, BOARD_SIZE, EMPTY, MAX_PLAYERS, PIECES_PER_PLAYER,
};
