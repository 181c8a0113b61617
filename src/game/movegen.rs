//! 走法生成：单步、单跳与连跳。
//!
//! Generation is pure: every function reads a board snapshot and returns owned
//! results. Iteration order is fixed (row-major pieces, fixed direction tables)
//! so repeated calls on the same board yield identical sequences.

use super::state::{Board, Move, PlayerId, Position};

pub const DEFAULT_CHAIN_DEPTH: usize = 5;

/// Orthogonal single steps: up, down, left, right.
pub const STEP_DIRECTIONS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Jump directions, row-major around the origin.
pub const JUMP_DIRECTIONS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

pub type Path = Vec<Position>;

pub fn step_moves(pos: Position, board: &Board) -> Vec<Position> {
    if !pos.in_bounds() {
        return Vec::new();
    }
    STEP_DIRECTIONS
        .iter()
        .filter_map(|&(dr, dc)| pos.offset(dr, dc))
        .filter(|&next| board.is_empty(next))
        .collect()
}

fn hop(board: &Board, pos: Position, (dr, dc): (i8, i8)) -> Option<Position> {
    let over = pos.offset(dr, dc)?;
    let landing = pos.offset(2 * dr, 2 * dc)?;
    (!board.is_empty(over) && board.is_empty(landing)).then_some(landing)
}

/// Every cell reachable by hopping over one adjacent piece (any owner) onto an
/// empty cell two steps away.
pub fn single_jumps(pos: Position, board: &Board) -> Vec<Position> {
    if !pos.in_bounds() {
        return Vec::new();
    }
    JUMP_DIRECTIONS
        .iter()
        .filter_map(|&dir| hop(board, pos, dir))
        .collect()
}

/// Enumerates chain jumps from `origin`.
///
/// Each returned path starts at `origin` and contains at least one hop; both
/// intermediate and maximal chains are listed, in depth-first pre-order. A chain
/// never revisits one of its own cells and holds at most `max_depth` hops.
/// `visited` seeds cells the chain must avoid in addition to its own path.
pub fn chain_jumps(
    origin: Position,
    board: &Board,
    visited: &[Position],
    max_depth: usize,
) -> Vec<Path> {
    let mut paths = Vec::new();
    if !origin.in_bounds() || max_depth == 0 {
        return paths;
    }

    // Each frame owns its path, which doubles as that branch's visited set.
    let mut stack: Vec<Path> = vec![vec![origin]];
    while let Some(path) = stack.pop() {
        let hops = path.len() - 1;
        let tip = path[hops];
        if hops > 0 {
            paths.push(path.clone());
        }
        if hops == max_depth {
            continue;
        }
        // Reverse push keeps direction order on pop.
        for &dir in JUMP_DIRECTIONS.iter().rev() {
            let Some(landing) = hop(board, tip, dir) else {
                continue;
            };
            if path.contains(&landing) || visited.contains(&landing) {
                continue;
            }
            let mut branch = path.clone();
            branch.push(landing);
            stack.push(branch);
        }
    }
    paths
}

/// Distinct destinations of one piece: steps, single jumps, then chain landings.
pub fn destinations(pos: Position, board: &Board, chain_depth: usize) -> Vec<Position> {
    let mut found = step_moves(pos, board);
    let jumps = single_jumps(pos, board);
    let chains = chain_jumps(pos, board, &[], chain_depth);
    for landing in jumps
        .into_iter()
        .chain(chains.into_iter().filter_map(|path| path.last().copied()))
    {
        if landing != pos && !found.contains(&landing) {
            found.push(landing);
        }
    }
    found
}

pub fn moves_from(pieces: &[Position], board: &Board, chain_depth: usize) -> Vec<Move> {
    pieces
        .iter()
        .flat_map(|&from| {
            destinations(from, board, chain_depth)
                .into_iter()
                .map(move |to| Move::new(from, to))
        })
        .collect()
}

/// All moves of `player_id`, pieces in row-major order.
pub fn all_moves(board: &Board, player_id: PlayerId, chain_depth: usize) -> Vec<Move> {
    moves_from(&board.pieces(player_id), board, chain_depth)
}
