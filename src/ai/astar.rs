//! Per-piece A* toward the nearest free target cell.
//!
//! Each candidate piece gets a shortest-path search over the static board
//! (every step, hop or chain landing costs one). Only the first step of the
//! best path is played; the search runs again next turn against the new board.
//! When no free target cell can be reached the search settles for the explored
//! cell closest to the goals, or to the deep target cell if the target is full.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::game::movegen::destinations;
use crate::game::regions::{deep_target, in_target, target_cells};
use crate::game::{ensure_player, Board, Move, PlayerId, Position, RuleError};

use super::relief::plan_relief;
use super::{AiConfig, Choice, MoveChooser, MoveSource};

#[derive(Debug, Clone, Copy)]
pub struct AStarAgent {
    chain_depth: usize,
    almost_full: usize,
}

/// Open-set entry. Ordered so the max-heap pops the lowest `f`, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f: u32,
    seq: u64,
    g: u32,
    pos: Position,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn heuristic(pos: Position, goals: &[Position]) -> u32 {
    goals
        .iter()
        .map(|&goal| pos.manhattan(goal))
        .min()
        .unwrap_or(0)
}

/// Empty target cells, or the deep target cell alone when none is empty.
fn goal_cells(board: &Board, player_id: PlayerId) -> Vec<Position> {
    let free: Vec<Position> = target_cells(player_id)
        .iter()
        .copied()
        .filter(|&pos| board.is_empty(pos))
        .collect();
    if free.is_empty() {
        vec![deep_target(player_id)]
    } else {
        free
    }
}

fn trace(came_from: &HashMap<Position, Position>, end: Position) -> Vec<Position> {
    let mut path = vec![end];
    let mut cursor = end;
    while let Some(&prev) = came_from.get(&cursor) {
        path.push(prev);
        cursor = prev;
    }
    path.reverse();
    path
}

impl AStarAgent {
    pub fn new(chain_depth: usize, almost_full: usize) -> Self {
        Self {
            chain_depth,
            almost_full,
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(config.chain_depth, config.almost_full)
    }

    /// Shortest path from `start` to an empty target cell, start included.
    ///
    /// Without a reachable one, the path ends on the explored cell nearest the
    /// goals instead. `None` means no reachable cell is nearer than `start`.
    pub fn find_path(
        &self,
        board: &Board,
        player_id: PlayerId,
        start: Position,
        nodes: &mut u64,
    ) -> Option<Vec<Position>> {
        let goals = goal_cells(board, player_id);
        let start_h = heuristic(start, &goals);

        let mut open = BinaryHeap::new();
        let mut best_g: HashMap<Position, u32> = HashMap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        // (h, g, pos) of the nearest expanded cell other than `start`.
        let mut closest: Option<(u32, u32, Position)> = None;
        let mut seq = 0u64;
        open.push(OpenNode {
            f: start_h,
            seq,
            g: 0,
            pos: start,
        });
        best_g.insert(start, 0);

        while let Some(node) = open.pop() {
            if best_g.get(&node.pos).is_some_and(|&best| node.g > best) {
                continue;
            }
            *nodes += 1;
            if in_target(player_id, node.pos) && board.is_empty(node.pos) {
                return Some(trace(&came_from, node.pos));
            }
            if node.pos != start {
                let h = heuristic(node.pos, &goals);
                if closest.map_or(true, |(near_h, near_g, _)| (h, node.g) < (near_h, near_g)) {
                    closest = Some((h, node.g, node.pos));
                }
            }
            for next in destinations(node.pos, board, self.chain_depth) {
                let g = node.g + 1;
                if best_g.get(&next).is_some_and(|&best| best <= g) {
                    continue;
                }
                best_g.insert(next, g);
                came_from.insert(next, node.pos);
                seq += 1;
                open.push(OpenNode {
                    f: g + heuristic(next, &goals),
                    seq,
                    g,
                    pos: next,
                });
            }
        }
        closest
            .filter(|&(h, _, _)| h < start_h)
            .map(|(_, _, end)| trace(&came_from, end))
    }

    /// Best first step among `pieces`, scored by the heuristic at its landing.
    fn best_first_step(
        &self,
        board: &Board,
        player_id: PlayerId,
        pieces: &[Position],
        nodes: &mut u64,
    ) -> Option<(Move, u32)> {
        let goals = goal_cells(board, player_id);
        let mut best: Option<(Move, u32)> = None;
        for &from in pieces {
            let Some(path) = self.find_path(board, player_id, from, nodes) else {
                continue;
            };
            let Some(&step) = path.get(1) else {
                continue;
            };
            let h = heuristic(step, &goals);
            if best.map_or(true, |(_, best_h)| h < best_h) {
                best = Some((Move::new(from, step), h));
            }
        }
        best
    }
}

impl MoveChooser for AStarAgent {
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

        let pieces = board.pieces(player_id);
        let mut outside: Vec<Position> = pieces
            .iter()
            .copied()
            .filter(|&pos| !in_target(player_id, pos))
            .collect();
        outside.shuffle(rng);

        let mut nodes = 0u64;
        let best = self
            .best_first_step(board, player_id, &outside, &mut nodes)
            .or_else(|| self.best_first_step(board, player_id, &pieces, &mut nodes));
        Ok(match best {
            // Lower heuristic is better; negate so larger scores stay better.
            Some((mv, h)) => {
                Choice::found(mv, -f64::from(h), MoveSource::Search).with_stats(nodes, 1)
            }
            None => Choice::exhausted().with_stats(nodes, 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ALMOST_FULL;
    use crate::game::{DEFAULT_CHAIN_DEPTH, EMPTY};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn agent() -> AStarAgent {
        AStarAgent::new(DEFAULT_CHAIN_DEPTH, ALMOST_FULL)
    }

    #[test]
    fn open_nodes_pop_lowest_f_then_oldest() {
        let mut heap = BinaryHeap::new();
        for (f, seq) in [(4, 0), (2, 1), (2, 2), (7, 3)] {
            heap.push(OpenNode {
                f,
                seq,
                g: 0,
                pos: Position::at(0, 0),
            });
        }
        let order: Vec<(u32, u64)> =
            std::iter::from_fn(|| heap.pop().map(|n| (n.f, n.seq))).collect();
        assert_eq!(order, vec![(2, 1), (2, 2), (4, 0), (7, 3)]);
    }

    #[test]
    fn piece_next_to_target_steps_in() {
        let mut board = Board::empty();
        board.set(Position::at(7, 11), 1);
        board.set(Position::at(0, 5), 2);
        let choice = agent()
            .decide(&board, 1, &mut SmallRng::seed_from_u64(11))
            .expect("valid player");
        let mv = choice.mv.expect("path exists");
        assert_eq!(mv.from, Position::at(7, 11));
        assert!(in_target(1, mv.to));
        assert_eq!(choice.score, 0.0);
    }

    #[test]
    fn path_uses_hops() {
        let mut board = Board::empty();
        board.set(Position::at(5, 11), 1);
        board.set(Position::at(6, 11), 2);
        board.set(Position::at(8, 11), 2);
        let mut nodes = 0;
        let path = agent()
            .find_path(&board, 1, Position::at(5, 11), &mut nodes)
            .expect("target reachable");
        assert_eq!(path.first(), Some(&Position::at(5, 11)));
        let last = *path.last().expect("non-empty path");
        assert!(in_target(1, last));
        assert!(board.is_empty(last));
        // One chain of two hops reaches 9,11 directly.
        assert_eq!(path.len(), 2);
        assert!(nodes > 0);
    }

    #[test]
    fn full_target_still_approaches_the_corner() {
        let mut board = Board::empty();
        for &pos in target_cells(1) {
            board.set(pos, 2);
        }
        board.set(Position::at(4, 4), 1);
        let mut nodes = 0;
        let path = agent()
            .find_path(&board, 1, Position::at(4, 4), &mut nodes)
            .expect("open board leads toward the corner");
        let last = *path.last().expect("non-empty path");
        assert!(!in_target(1, last));
        assert_eq!(last.manhattan(Position::at(11, 11)), 4);
        let choice = agent()
            .decide(&board, 1, &mut SmallRng::seed_from_u64(2))
            .expect("valid player");
        assert_eq!(choice.mv.map(|mv| mv.from), Some(Position::at(4, 4)));
        assert_eq!(choice.source, MoveSource::Search);
    }

    #[test]
    fn moves_from_the_opening_for_both_seats() {
        let board = Board::new_game(2).expect("two player layout");
        let mut rng = SmallRng::seed_from_u64(4);
        for player_id in 1..=2 {
            let mv = agent()
                .choose_move(&board, player_id, &mut rng)
                .expect("valid player")
                .expect("opening has a move");
            assert_eq!(board.get(mv.from), player_id);
            assert!(destinations(mv.from, &board, DEFAULT_CHAIN_DEPTH).contains(&mv.to));
        }
    }

    #[test]
    fn self_play_keeps_moving() {
        let mut board = Board::new_game(2).expect("two player layout");
        let mut rng = SmallRng::seed_from_u64(20);
        let mut made = 0;
        for turn in 0..20 {
            let player_id = 1 + turn % 2;
            if let Some(mv) = agent()
                .choose_move(&board, player_id, &mut rng)
                .expect("valid player")
            {
                assert!(destinations(mv.from, &board, DEFAULT_CHAIN_DEPTH).contains(&mv.to));
                board.relocate(mv);
                made += 1;
            }
        }
        assert_eq!(made, 20);
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
}
