//! One-ply greedy strategy: take the landing that gains the most ground.

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::game::movegen::{destinations, single_jumps, step_moves};
use crate::game::regions::{deep_target, in_stable, in_target};
use crate::game::{ensure_player, Board, Move, PlayerId, Position, RuleError};

use super::relief::plan_relief;
use super::{AiConfig, Choice, MoveChooser, MoveSource};

/// Bonus for a move that brings an outside piece into the target.
pub const TARGET_BONUS: i64 = 50;
/// Bonus when that piece is the last one still outside.
pub const LAST_PIECE_BONUS: i64 = 200;

#[derive(Debug, Clone, Copy)]
pub struct GreedyAgent {
    chain_depth: usize,
    almost_full: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    mv: Move,
    score: i64,
    distance: u32,
}

impl GreedyAgent {
    pub fn new(chain_depth: usize, almost_full: usize) -> Self {
        Self {
            chain_depth,
            almost_full,
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(config.chain_depth, config.almost_full)
    }

    /// A step or single hop landing on the empty deep target cell.
    fn deep_target_shortcut(&self, board: &Board, player_id: PlayerId) -> Option<Move> {
        let deep = deep_target(player_id);
        if !board.is_empty(deep) {
            return None;
        }
        board.pieces(player_id).into_iter().find_map(|from| {
            let reaches = step_moves(from, board).contains(&deep)
                || single_jumps(from, board).contains(&deep);
            reaches.then(|| Move::new(from, deep))
        })
    }

    fn candidates(
        &self,
        board: &Board,
        player_id: PlayerId,
        pool: &[Position],
        bonus: i64,
    ) -> Vec<Candidate> {
        let deep = deep_target(player_id);
        let mut found = Vec::new();
        for &from in pool {
            let inside = in_target(player_id, from);
            let current = from.manhattan(deep) as i64;
            for to in destinations(from, board, self.chain_depth) {
                // Settled pieces only shuffle within the target.
                if inside && !in_target(player_id, to) {
                    continue;
                }
                let distance = to.manhattan(deep);
                let mut score = current - distance as i64;
                if !inside && in_target(player_id, to) {
                    score += bonus;
                }
                if !in_stable(player_id, from) && in_stable(player_id, to) {
                    score += 2 * bonus;
                }
                found.push(Candidate {
                    mv: Move::new(from, to),
                    score,
                    distance,
                });
            }
        }
        found
    }
}

impl MoveChooser for GreedyAgent {
    fn decide(
        &self,
        board: &Board,
        player_id: PlayerId,
        rng: &mut dyn RngCore,
    ) -> Result<Choice, RuleError> {
        ensure_player(player_id)?;
        if let Some(relief) = plan_relief(board, player_id, self.almost_full) {
            return Ok(Choice::relief(relief.mv));
        }
        if let Some(mv) = self.deep_target_shortcut(board, player_id) {
            let gain = mv.from.manhattan(mv.to) as f64;
            return Ok(Choice::found(mv, gain, MoveSource::Shortcut));
        }

        let pieces = board.pieces(player_id);
        let outside: Vec<Position> = pieces
            .iter()
            .copied()
            .filter(|&pos| !in_target(player_id, pos))
            .collect();
        let bonus = if outside.len() == 1 {
            LAST_PIECE_BONUS
        } else {
            TARGET_BONUS
        };
        let mut pool = if outside.is_empty() {
            pieces
                .into_iter()
                .filter(|&pos| !in_stable(player_id, pos))
                .collect()
        } else {
            outside
        };
        pool.shuffle(rng);

        let candidates = self.candidates(board, player_id, &pool, bonus);
        let nodes = candidates.len() as u64;
        let Some(best) = candidates.iter().map(|c| c.score).max() else {
            return Ok(Choice::exhausted());
        };

        let (ties, source): (Vec<&Candidate>, _) = if best > 0 {
            (
                candidates.iter().filter(|c| c.score == best).collect(),
                MoveSource::Search,
            )
        } else {
            let nearest = candidates.iter().map(|c| c.distance).min().unwrap_or(0);
            (
                candidates.iter().filter(|c| c.distance == nearest).collect(),
                MoveSource::Fallback,
            )
        };
        Ok(ties
            .choose(rng)
            .map(|c| Choice::found(c.mv, c.score as f64, source).with_stats(nodes, 1))
            .unwrap_or_else(Choice::exhausted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::regions::{depth, target_cells};
    use crate::ai::ALMOST_FULL;
    use crate::game::{DEFAULT_CHAIN_DEPTH, EMPTY};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn agent() -> GreedyAgent {
        GreedyAgent::new(DEFAULT_CHAIN_DEPTH, ALMOST_FULL)
    }

    #[test]
    fn opening_move_advances_toward_target() {
        let board = Board::new_game(2).expect("two player layout");
        for seed in 0..8 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let choice = agent().decide(&board, 1, &mut rng).expect("valid player");
            let mv = choice.mv.expect("opening has moves");
            assert_eq!(choice.source, MoveSource::Search);
            assert_eq!(board.get(mv.from), 1);
            assert!(board.is_empty(mv.to));
            assert!(depth(1, mv.to) < depth(1, mv.from));
        }
    }

    #[test]
    fn same_seed_same_move() {
        let board = Board::new_game(4).expect("four player layout");
        let first = agent()
            .choose_move(&board, 3, &mut SmallRng::seed_from_u64(7))
            .expect("valid player");
        let second = agent()
            .choose_move(&board, 3, &mut SmallRng::seed_from_u64(7))
            .expect("valid player");
        assert_eq!(first, second);
    }

    #[test]
    fn shortcut_onto_deep_target() {
        let mut board = Board::empty();
        board.set(Position::at(11, 10), 1);
        board.set(Position::at(2, 2), 1);
        let choice = agent()
            .decide(&board, 1, &mut SmallRng::seed_from_u64(1))
            .expect("valid player");
        assert_eq!(choice.source, MoveSource::Shortcut);
        assert_eq!(choice.mv, Some(Move::new(Position::at(11, 10), Position::at(11, 11))));
    }

    #[test]
    fn entering_the_target_beats_raw_distance() {
        let mut board = Board::empty();
        // 7,11 steps onto the entry cell 8,11; 0,0 can only gain one cell.
        board.set(Position::at(7, 11), 1);
        board.set(Position::at(0, 0), 1);
        board.set(Position::at(11, 11), 2);
        let mv = agent()
            .choose_move(&board, 1, &mut SmallRng::seed_from_u64(3))
            .expect("valid player")
            .expect("pieces can move");
        assert!(in_target(1, mv.to));
        assert_eq!(mv, Move::new(Position::at(7, 11), Position::at(8, 11)));
    }

    #[test]
    fn retreat_only_position_takes_nearest_landing() {
        let mut board = Board::empty();
        board.set(Position::at(8, 8), 1);
        // Forward steps and their hops are blocked; 7,8 only allows a hop back to 6,8.
        for (row, col) in [(9, 8), (10, 8), (8, 9), (8, 10), (7, 8)] {
            board.set(Position::at(row, col), 2);
        }
        let candidates = agent().candidates(&board, 1, &[Position::at(8, 8)], TARGET_BONUS);
        assert!(candidates.iter().all(|c| c.score <= 0));
        let nearest = candidates.iter().map(|c| c.distance).min().expect("moves exist");

        let choice = agent()
            .decide(&board, 1, &mut SmallRng::seed_from_u64(6))
            .expect("valid player");
        let mv = choice.mv.expect("a retreat exists");
        assert_eq!(choice.source, MoveSource::Fallback);
        assert_eq!(mv.to.manhattan(deep_target(1)), nearest);
        assert_eq!(mv, Move::new(Position::at(8, 8), Position::at(8, 7)));
    }

    #[test]
    fn settled_pieces_stay_inside() {
        let mut board = Board::empty();
        for &pos in target_cells(1) {
            board.set(pos, 1);
        }
        // Empty the inner corner so the border pieces have somewhere deeper to go.
        board.set(Position::at(11, 11), EMPTY);
        board.set(Position::at(10, 11), EMPTY);
        board.set(Position::at(11, 10), EMPTY);
        board.set(Position::at(10, 10), EMPTY);
        let choice = agent()
            .decide(&board, 1, &mut SmallRng::seed_from_u64(5))
            .expect("valid player");
        let mv = choice.mv.expect("a shuffle exists");
        assert!(in_target(1, mv.to));
    }

    #[test]
    fn boxed_in_player_returns_none() {
        let mut board = Board::empty();
        for pos in Board::positions() {
            board.set(pos, 2);
        }
        board.set(Position::at(0, 0), 1);
        board.set(Position::at(11, 11), EMPTY);
        let choice = agent()
            .decide(&board, 1, &mut SmallRng::seed_from_u64(0))
            .expect("valid player");
        assert_eq!(choice.mv, None);
        assert_eq!(choice.source, MoveSource::Exhausted);
    }

    #[test]
    fn unknown_player_is_rejected() {
        let board = Board::new_game(2).expect("two player layout");
        let err = agent()
            .decide(&board, 9, &mut SmallRng::seed_from_u64(0))
            .expect_err("player 9 does not exist");
        assert_eq!(err, RuleError::UnknownPlayer { player_id: 9 });
    }
}
