use glam::DVec2;
use shove::*;
use std::time::Instant;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn main() {
    let mut world = World::new(8.0).unwrap();

    let n = 20_000u64; // number of items
    let mut seed = 1u32;
    for i in 0..n {
        let x = (lcg(&mut seed) as f64 / u32::MAX as f64) * 2000.0 - 1000.0;
        let y = (lcg(&mut seed) as f64 / u32::MAX as f64) * 2000.0 - 1000.0;
        world.add(i, Rect::new(x, y, 2.0, 2.0)).unwrap();
    }

    let t0 = Instant::now();
    let mut collisions = 0usize;
    for i in 0..n {
        let rect = world.get_rect(i).unwrap();
        let dx = (lcg(&mut seed) as f64 / u32::MAX as f64) * 8.0 - 4.0;
        let dy = (lcg(&mut seed) as f64 / u32::MAX as f64) * 8.0 - 4.0;
        let goal = DVec2::new(rect.x + dx, rect.y + dy);
        let (_, cols) = world.move_item(i, goal).unwrap();
        collisions += cols.len();
    }
    let t_move = t0.elapsed();

    let t1 = Instant::now();
    let mut touched = 0usize;
    for q in 0..1000 {
        let x = (q as f64 / 1000.0) * 2000.0 - 1000.0;
        touched += world.query_rect(Rect::new(x, -1000.0, 16.0, 2000.0)).len();
    }
    let t_query = t1.elapsed();

    let stats = world.debug_stats();
    println!(
        "N={} cell_size={} moves={:.3}ms (collisions={}) queries={:.3}ms (touched={}) cells={} max/cell={}",
        n,
        world.cell_size(),
        t_move.as_secs_f64() * 1000.0,
        collisions,
        t_query.as_secs_f64() * 1000.0,
        touched,
        stats.cells,
        stats.max_cell_items
    );
}
