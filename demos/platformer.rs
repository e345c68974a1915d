use glam::DVec2;
use shove::*;

const FLOOR: ItemKey = 1;
const LEFT_WALL: ItemKey = 2;
const RIGHT_WALL: ItemKey = 3;
const SPRING: ItemKey = 4;
const PLAYER: ItemKey = 100;

fn main() {
    let mut world = World::default();
    world.add(FLOOR, Rect::new(0.0, 480.0, 640.0, 32.0)).unwrap();
    world.add(LEFT_WALL, Rect::new(-32.0, 0.0, 32.0, 512.0)).unwrap();
    world.add(RIGHT_WALL, Rect::new(640.0, 0.0, 32.0, 512.0)).unwrap();
    world.add(SPRING, Rect::new(300.0, 448.0, 32.0, 32.0)).unwrap();
    world.add(PLAYER, Rect::new(48.0, 48.0, 16.0, 24.0)).unwrap();

    // Fall onto the floor, then run right; the spring bounces, walls slide.
    let mut velocity = DVec2::new(90.0, 0.0);
    let dt = 1.0 / 30.0;
    for frame in 0..120 {
        velocity.y = (velocity.y + 600.0 * dt).min(480.0);
        let rect = world.get_rect(PLAYER).unwrap();
        let goal = rect.pos() + velocity * dt;
        let (actual, cols) = world
            .move_item_filtered(PLAYER, goal, |_, other| {
                if other == SPRING {
                    Some(BOUNCE)
                } else {
                    Some(SLIDE)
                }
            })
            .unwrap();
        for col in &cols {
            if col.contact.normal.y != 0 {
                velocity.y = if col.response == BOUNCE { -360.0 } else { 0.0 };
            }
            if col.contact.normal.x != 0 {
                velocity.x = -velocity.x;
            }
            println!(
                "frame {frame:3}: hit {} n=({},{}) via {}",
                col.other, col.contact.normal.x, col.contact.normal.y, col.response
            );
        }
        if frame % 30 == 0 {
            println!("frame {frame:3}: player at ({:.1}, {:.1})", actual.x, actual.y);
        }
    }

    let stats = world.debug_stats();
    println!(
        "done: items={} cells={} refs={} max/cell={}",
        stats.items, stats.cells, stats.cell_refs, stats.max_cell_items
    );
}
