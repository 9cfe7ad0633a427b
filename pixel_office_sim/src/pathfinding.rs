// Breadth-first pathfinding over the tile map.
//
// Every step between orthogonal walkable cells costs the same, so plain BFS
// already yields a shortest path by step count; no heuristic or priority
// queue is needed. Grids are capped at 64x64 (see `layout.rs`), which keeps a
// worst-case search (4096 cells) far below one frame's budget, so results are
// not cached and every request searches afresh.
//
// Predecessors and distances live in `Vec`s indexed by the tile map's flat
// cell index. Neighbor order comes from `TileMap::neighbors`, so for a given
// map the same request always returns the same path.
//
// The start cell is never required to be walkable: a character left standing
// inside furniture by a layout rebuild must still be able to walk out.
//
// See also: `tile_map.rs` for the grid, `office.rs` which calls `find_path`
// for every move request.

use std::collections::VecDeque;

use crate::tile_map::TileMap;
use crate::types::TileCoord;

/// Shortest path from `from` to `to`.
///
/// The returned cells exclude `from` and end with `to`, so `len()` is the
/// step count. `from == to` yields an empty path (already there). Returns
/// `None` when `to` is blocked, off the grid, or in a disconnected region.
pub fn find_path(map: &TileMap, from: TileCoord, to: TileCoord) -> Option<Vec<TileCoord>> {
    if from == to {
        return Some(Vec::new());
    }
    if !map.is_walkable(to) {
        return None;
    }
    let start = map.index_of(from)?;
    let goal = map.index_of(to)?;

    let mut came_from: Vec<Option<usize>> = vec![None; map.cell_count()];
    let mut visited = vec![false; map.cell_count()];
    let mut frontier = VecDeque::new();
    visited[start] = true;
    frontier.push_back(start);

    while let Some(current) = frontier.pop_front() {
        if current == goal {
            return Some(reconstruct_path(map, &came_from, start, goal));
        }
        for next in map.neighbors(map.coord_of(current)) {
            // neighbors() only yields walkable, hence in-bounds, cells.
            let Some(ni) = map.index_of(next) else {
                continue;
            };
            if visited[ni] {
                continue;
            }
            visited[ni] = true;
            came_from[ni] = Some(current);
            frontier.push_back(ni);
        }
    }

    None
}

/// Step distance from `from` to every cell; `None` for unreachable cells.
/// Indexed by `TileMap::index_of`.
pub fn distance_field(map: &TileMap, from: TileCoord) -> Vec<Option<u32>> {
    let mut dist = vec![None; map.cell_count()];
    let Some(start) = map.index_of(from) else {
        return dist;
    };
    dist[start] = Some(0);
    let mut frontier = VecDeque::from([start]);
    while let Some(current) = frontier.pop_front() {
        let d = dist[current].unwrap_or(0);
        for next in map.neighbors(map.coord_of(current)) {
            if let Some(ni) = map.index_of(next) {
                if dist[ni].is_none() {
                    dist[ni] = Some(d + 1);
                    frontier.push_back(ni);
                }
            }
        }
    }
    dist
}

pub fn is_reachable(map: &TileMap, from: TileCoord, to: TileCoord) -> bool {
    find_path(map, from, to).is_some()
}

fn reconstruct_path(
    map: &TileMap,
    came_from: &[Option<usize>],
    start: usize,
    goal: usize,
) -> Vec<TileCoord> {
    let mut cells = Vec::new();
    let mut current = goal;
    while current != start {
        cells.push(map.coord_of(current));
        match came_from[current] {
            Some(prev) => current = prev,
            None => break,
        }
    }
    cells.reverse();
    cells
}
