//! 卡死检测：记录最近的走法与棋盘指纹，发现原地打转时发出警告。

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::console_warn;
use crate::game::{Board, Move, PlayerId, Position};

pub const DEFAULT_MOVE_WINDOW: usize = 20;
pub const DEFAULT_BOARD_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StallWarning {
    /// Every move in the window started from the same cell.
    SamePiece { from: Position, moves: usize },
    /// The board fingerprint did not change across the window.
    FrozenBoard { turns: usize },
}

/// Watches one player's moves for an agent that has stopped making progress.
#[derive(Debug, Clone)]
pub struct StallMonitor {
    player_id: PlayerId,
    move_window: usize,
    board_window: usize,
    recent_moves: VecDeque<Move>,
    recent_boards: VecDeque<u64>,
}

fn fingerprint(board: &Board) -> u64 {
    let mut hasher = DefaultHasher::new();
    board.hash(&mut hasher);
    hasher.finish()
}

impl StallMonitor {
    pub fn new(player_id: PlayerId) -> Self {
        Self::with_windows(player_id, DEFAULT_MOVE_WINDOW, DEFAULT_BOARD_WINDOW)
    }

    pub fn with_windows(player_id: PlayerId, move_window: usize, board_window: usize) -> Self {
        Self {
            player_id,
            move_window: move_window.max(1),
            board_window: board_window.max(1),
            recent_moves: VecDeque::new(),
            recent_boards: VecDeque::new(),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Records the board after a turn and the move that produced it, if any.
    pub fn observe(&mut self, board: &Board, mv: Option<Move>) -> Vec<StallWarning> {
        if let Some(mv) = mv {
            if self.recent_moves.len() == self.move_window {
                self.recent_moves.pop_front();
            }
            self.recent_moves.push_back(mv);
        }
        if self.recent_boards.len() == self.board_window {
            self.recent_boards.pop_front();
        }
        self.recent_boards.push_back(fingerprint(board));

        let mut warnings = Vec::new();
        if self.recent_moves.len() == self.move_window {
            let from = self.recent_moves[0].from;
            if self.recent_moves.iter().all(|mv| mv.from == from) {
                warnings.push(StallWarning::SamePiece {
                    from,
                    moves: self.move_window,
                });
            }
        }
        if self.recent_boards.len() == self.board_window {
            let first = self.recent_boards[0];
            if self.recent_boards.iter().all(|&hash| hash == first) {
                warnings.push(StallWarning::FrozenBoard {
                    turns: self.board_window,
                });
            }
        }
        for warning in &warnings {
            console_warn!("[monitor] player {} may be stuck: {warning:?}", self.player_id);
        }
        warnings
    }

    pub fn reset(&mut self) {
        self.recent_moves.clear();
        self.recent_boards.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_source_cell_is_flagged() {
        let mut monitor = StallMonitor::with_windows(1, 3, 10);
        let mut board = Board::new_game(2).expect("two player layout");
        let a = Position::at(3, 0);
        let b = Position::at(4, 0);
        for turn in 0..3 {
            let mv = if turn % 2 == 0 { Move::new(a, b) } else { Move::new(b, a) };
            board.relocate(mv);
            let warnings = monitor.observe(&board, Some(Move::new(a, b)));
            if turn < 2 {
                assert!(warnings.is_empty());
            } else {
                assert_eq!(warnings, vec![StallWarning::SamePiece { from: a, moves: 3 }]);
            }
        }
    }

    #[test]
    fn progress_clears_the_warning() {
        let mut monitor = StallMonitor::with_windows(1, 2, 10);
        let board = Board::new_game(2).expect("two player layout");
        let first = Move::new(Position::at(3, 0), Position::at(4, 0));
        let second = Move::new(Position::at(2, 1), Position::at(3, 1));
        monitor.observe(&board, Some(first));
        assert!(!monitor.observe(&board, Some(first)).is_empty());
        let warnings = monitor.observe(&board.with_move(second), Some(second));
        assert!(!warnings
            .iter()
            .any(|w| matches!(w, StallWarning::SamePiece { .. })));
    }

    #[test]
    fn unchanged_board_is_flagged() {
        let mut monitor = StallMonitor::with_windows(2, 20, 3);
        let board = Board::new_game(2).expect("two player layout");
        assert!(monitor.observe(&board, None).is_empty());
        assert!(monitor.observe(&board, None).is_empty());
        assert_eq!(
            monitor.observe(&board, None),
            vec![StallWarning::FrozenBoard { turns: 3 }]
        );
        monitor.reset();
        assert!(monitor.observe(&board, None).is_empty());
    }
}
