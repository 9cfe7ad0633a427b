// BFS cost on the largest grid a layout may declare.
//
// Two shapes: an open 64x64 floor (corner to corner) and a serpentine of
// walls that forces the search to visit nearly every cell before reaching
// the goal. Both must stay far below a 16 ms frame.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pixel_office_sim::layout::{MAX_COLS, MAX_ROWS, OfficeLayout, Terrain};
use pixel_office_sim::{TileCoord, TileMap, distance_field, find_path};

fn serpentine() -> OfficeLayout {
    let mut layout = OfficeLayout::open_floor(MAX_COLS, MAX_ROWS);
    let cols = MAX_COLS as i32;
    for row in (1..MAX_ROWS as i32).step_by(2) {
        let gap = if (row / 2) % 2 == 0 { cols - 1 } else { 0 };
        for col in 0..cols {
            if col != gap {
                layout.set_terrain(TileCoord::new(col, row), Terrain::Wall);
            }
        }
    }
    layout
}

fn bench_find_path(c: &mut Criterion) {
    let open = TileMap::from_layout(&OfficeLayout::open_floor(MAX_COLS, MAX_ROWS))
        .expect("open floor layout");
    let maze = TileMap::from_layout(&serpentine()).expect("serpentine layout");
    let from = TileCoord::new(0, 0);
    let far = TileCoord::new(MAX_COLS as i32 - 1, MAX_ROWS as i32 - 1);
    // The last row is a wall in the serpentine; aim for the floor row above.
    let maze_goal = TileCoord::new(MAX_COLS as i32 - 1, MAX_ROWS as i32 - 2);

    c.bench_function("find_path open 64x64", |b| {
        b.iter(|| find_path(black_box(&open), black_box(from), black_box(far)))
    });
    c.bench_function("find_path serpentine 64x64", |b| {
        b.iter(|| find_path(black_box(&maze), black_box(from), black_box(maze_goal)))
    });
    c.bench_function("distance_field open 64x64", |b| {
        b.iter(|| distance_field(black_box(&open), black_box(from)))
    });
}

criterion_group!(benches, bench_find_path);
criterion_main!(benches);
