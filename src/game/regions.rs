//! 棋盘区域：起始区、目标区、稳定区与入口格。
//!
//! Every region is a triangle hugging one corner. A player's target corner is the
//! corner diagonally opposite their home corner; the deep target cell is that
//! corner itself. All predicates are pure functions of `(player, position)`.

use once_cell::sync::Lazy;

use super::state::{Board, PlayerId, Position, BOARD_SIZE, MAX_PLAYERS};

/// Cells within this Manhattan distance of a corner form its triangle (10 cells).
pub const TRIANGLE_RADIUS: u32 = 3;
/// Innermost sub-triangle of the target considered settled (6 cells).
pub const STABLE_RADIUS: u32 = 2;

const LAST: u8 = BOARD_SIZE as u8 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    pub home: Position,
    pub target: Position,
    /// Unit step pointing from the target boundary toward the deep target cell.
    pub inward: (i8, i8),
}

impl Seat {
    pub const fn of(player_id: PlayerId) -> Seat {
        match player_id {
            1 => Seat {
                home: Position::at(0, 0),
                target: Position::at(LAST, LAST),
                inward: (1, 1),
            },
            2 => Seat {
                home: Position::at(LAST, LAST),
                target: Position::at(0, 0),
                inward: (-1, -1),
            },
            3 => Seat {
                home: Position::at(LAST, 0),
                target: Position::at(0, LAST),
                inward: (-1, 1),
            },
            4 => Seat {
                home: Position::at(0, LAST),
                target: Position::at(LAST, 0),
                inward: (1, -1),
            },
            _ => panic!("unknown player id"),
        }
    }

    /// Steps that move strictly deeper into the target: row, column, diagonal.
    pub const fn forward_steps(&self) -> [(i8, i8); 3] {
        let (dr, dc) = self.inward;
        [(dr, 0), (0, dc), (dr, dc)]
    }

    /// Steps that leave the target toward the board centre.
    pub const fn outward_steps(&self) -> [(i8, i8); 3] {
        let (dr, dc) = self.inward;
        [(-dr, 0), (0, -dc), (-dr, -dc)]
    }
}

struct RegionTable {
    home: Vec<Position>,
    target: Vec<Position>,
    entry: Vec<Position>,
}

impl RegionTable {
    fn build(player_id: PlayerId) -> Self {
        let seat = Seat::of(player_id);
        let home = Board::positions()
            .filter(|pos| pos.manhattan(seat.home) <= TRIANGLE_RADIUS)
            .collect();
        let target = Board::positions()
            .filter(|pos| pos.manhattan(seat.target) <= TRIANGLE_RADIUS)
            .collect();
        // Walk the outer diagonal starting on the target corner's column border.
        let (dr, dc) = seat.inward;
        let radius = TRIANGLE_RADIUS as i8;
        let entry = (0..=radius)
            .filter_map(|k| seat.target.offset(-dr * (radius - k), -dc * k))
            .collect();
        Self {
            home,
            target,
            entry,
        }
    }
}

static TABLES: Lazy<Vec<RegionTable>> =
    Lazy::new(|| (1..=MAX_PLAYERS).map(RegionTable::build).collect());

fn table(player_id: PlayerId) -> &'static RegionTable {
    &TABLES[player_id as usize - 1]
}

pub fn deep_target(player_id: PlayerId) -> Position {
    Seat::of(player_id).target
}

/// Manhattan distance to the deep target cell.
pub fn depth(player_id: PlayerId, pos: Position) -> u32 {
    pos.manhattan(deep_target(player_id))
}

pub fn in_home(player_id: PlayerId, pos: Position) -> bool {
    pos.manhattan(Seat::of(player_id).home) <= TRIANGLE_RADIUS
}

pub fn in_target(player_id: PlayerId, pos: Position) -> bool {
    depth(player_id, pos) <= TRIANGLE_RADIUS
}

pub fn in_stable(player_id: PlayerId, pos: Position) -> bool {
    depth(player_id, pos) <= STABLE_RADIUS
}

pub fn is_entry(player_id: PlayerId, pos: Position) -> bool {
    depth(player_id, pos) == TRIANGLE_RADIUS
}

pub fn home_cells(player_id: PlayerId) -> &'static [Position] {
    &table(player_id).home
}

pub fn target_cells(player_id: PlayerId) -> &'static [Position] {
    &table(player_id).target
}

/// Entry cells ordered outward-to-inward along the target border.
pub fn entry_cells(player_id: PlayerId) -> &'static [Position] {
    &table(player_id).entry
}
