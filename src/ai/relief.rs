//! Congestion relief: unblocks a player's own target doorway.
//!
//! Every strategy consults this before its own search. Without it the agents
//! reach positions where their own pieces sit on the target border with nothing
//! behind them able to get in.

use serde::{Deserialize, Serialize};

use crate::game::regions::{self, Seat};
use crate::game::{Board, Move, PlayerId};

/// Target occupancy at which the last slots count as jammed.
pub const ALMOST_FULL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliefKind {
    AdvanceEntry,
    /// A target piece steps back out to make room for a reshuffle.
    Evacuate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relief {
    pub mv: Move,
    pub kind: ReliefKind,
}

/// [`plan_relief`] with the default threshold, reduced to the move.
pub fn free_up_entry(board: &Board, player_id: PlayerId) -> Option<Move> {
    plan_relief(board, player_id, ALMOST_FULL).map(|relief| relief.mv)
}

/// `player_id` must name a seat; callers validate it first.
pub fn plan_relief(board: &Board, player_id: PlayerId, almost_full: usize) -> Option<Relief> {
    let waiting = board
        .pieces(player_id)
        .into_iter()
        .any(|pos| !regions::in_target(player_id, pos));
    if !waiting {
        return None;
    }

    let seat = Seat::of(player_id);
    for &entry in regions::entry_cells(player_id) {
        if board.get(entry) != player_id {
            continue;
        }
        let deeper = seat
            .forward_steps()
            .iter()
            .filter_map(|&(dr, dc)| entry.offset(dr, dc))
            .filter(|&cell| board.is_empty(cell) && regions::in_target(player_id, cell))
            .min_by_key(|cell| cell.manhattan(seat.target));
        if let Some(to) = deeper {
            return Some(Relief {
                mv: Move::new(entry, to),
                kind: ReliefKind::AdvanceEntry,
            });
        }
    }

    if board.target_count(player_id) < almost_full {
        return None;
    }
    for &pos in regions::target_cells(player_id) {
        if board.get(pos) != player_id {
            continue;
        }
        let exit = seat
            .outward_steps()
            .iter()
            .filter_map(|&(dr, dc)| pos.offset(dr, dc))
            .find(|&cell| board.is_empty(cell) && !regions::in_target(player_id, cell));
        if let Some(to) = exit {
            return Some(Relief {
                mv: Move::new(pos, to),
                kind: ReliefKind::Evacuate,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Position, EMPTY};

    fn place(board: &mut Board, player_id: PlayerId, cells: &[(u8, u8)]) {
        for &(row, col) in cells {
            board.set(Position::at(row, col), player_id);
        }
    }

    #[test]
    fn fresh_game_needs_no_relief() {
        let board = Board::new_game(2).expect("two player layout");
        for player_id in 1..=2 {
            assert_eq!(free_up_entry(&board, player_id), None);
        }
        let board = Board::new_game(4).expect("four player layout");
        for player_id in 1..=4 {
            assert_eq!(free_up_entry(&board, player_id), None);
        }
    }

    #[test]
    fn blocked_entry_advances_deeper() {
        let mut board = Board::empty();
        place(&mut board, 1, &[(8, 11), (9, 10), (10, 9), (11, 8)]);
        place(&mut board, 1, &[(11, 11), (10, 10)]);
        place(&mut board, 1, &[(5, 5), (6, 6), (7, 7), (4, 4)]);
        let relief = plan_relief(&board, 1, ALMOST_FULL).expect("entry is jammed");
        assert_eq!(relief.kind, ReliefKind::AdvanceEntry);
        assert_eq!(relief.mv, Move::new(Position::at(8, 11), Position::at(9, 11)));
        assert!(regions::depth(1, relief.mv.to) < regions::depth(1, relief.mv.from));
    }

    #[test]
    fn diagonal_candidate_wins_when_closest() {
        let mut board = Board::empty();
        place(&mut board, 1, &[(9, 10), (0, 0)]);
        let relief = plan_relief(&board, 1, ALMOST_FULL).expect("entry piece can advance");
        assert_eq!(relief.mv, Move::new(Position::at(9, 10), Position::at(10, 11)));
    }

    #[test]
    fn no_relief_without_waiting_pieces() {
        let mut board = Board::empty();
        for &pos in regions::target_cells(1) {
            board.set(pos, 1);
        }
        board.set(Position::at(11, 11), EMPTY);
        board.set(Position::at(10, 11), EMPTY);
        assert_eq!(free_up_entry(&board, 1), None);
    }

    #[test]
    fn almost_full_target_evacuates_outward() {
        let mut board = Board::empty();
        for &pos in regions::target_cells(2) {
            board.set(pos, 2);
        }
        // The one free slot is the deep corner, unreachable from any entry cell.
        board.set(Position::at(0, 0), EMPTY);
        board.set(Position::at(7, 7), 2);
        let relief = plan_relief(&board, 2, ALMOST_FULL).expect("target is jammed");
        assert_eq!(relief.kind, ReliefKind::Evacuate);
        assert!(regions::in_target(2, relief.mv.from));
        assert!(!regions::in_target(2, relief.mv.to));
        assert!(board.is_empty(relief.mv.to));
        assert_eq!(plan_relief(&board, 2, 10), None);
    }

    #[test]
    fn other_players_pieces_on_entry_do_not_trigger() {
        let mut board = Board::empty();
        place(&mut board, 2, &[(8, 11), (9, 10), (10, 9), (11, 8)]);
        place(&mut board, 1, &[(5, 5)]);
        assert_eq!(free_up_entry(&board, 1), None);
    }
}
