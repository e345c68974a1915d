use glam::DVec2;
use shove::*;

fn main() {
    let mut world = World::new(32.0).unwrap();
    world.add(10, Rect::new(40.0, 0.0, 20.0, 80.0)).unwrap();
    world.add(20, Rect::new(100.0, 10.0, 30.0, 30.0)).unwrap();
    world.add(30, Rect::new(170.0, -20.0, 20.0, 120.0)).unwrap();

    let from = DVec2::new(0.0, 25.0);
    let to = DVec2::new(220.0, 25.0);
    println!(
        "probe ({:.0},{:.0}) -> ({:.0},{:.0})",
        from.x, from.y, to.x, to.y
    );
    for info in world.query_segment_with_coords(from, to) {
        println!(
            "  item {} enters at ({:.1},{:.1}) t={:.3}, leaves at ({:.1},{:.1}) t={:.3}",
            info.item, info.p1.x, info.p1.y, info.ti1, info.p2.x, info.p2.y, info.ti2
        );
    }

    // Same probe, ignoring the middle box.
    let filtered = world.query_segment_filtered(from, to, |item| item != 20);
    println!("ignoring 20: {filtered:?}");
}
