//! Cell coordinate mapping and segment traversal over a uniform grid.
//! Cells are 1-based: cell `(1, 1)` spans `[0, cell_size)` on both axes.

use glam::DVec2;

use crate::types::{CellSpan, Rect};

/// World position of a cell's top-left corner.
pub fn to_world(cell_size: f64, cx: i32, cy: i32) -> DVec2 {
    DVec2::new((cx - 1) as f64 * cell_size, (cy - 1) as f64 * cell_size)
}

/// Cell containing a world position.
pub fn to_cell(cell_size: f64, x: f64, y: f64) -> (i32, i32) {
    (
        (x / cell_size).floor() as i32 + 1,
        (y / cell_size).floor() as i32 + 1,
    )
}

/// Inclusive cell span covered by a rectangle.
pub fn to_cell_span(cell_size: f64, rect: Rect) -> CellSpan {
    let (cl, ct) = to_cell(cell_size, rect.x, rect.y);
    let cr = ((rect.x + rect.w) / cell_size).ceil() as i32;
    let cb = ((rect.y + rect.h) / cell_size).ceil() as i32;
    CellSpan {
        l: cl,
        t: ct,
        w: cr - cl + 1,
        h: cb - ct + 1,
    }
}

/// Per-axis traversal setup: step direction, t advance per cell crossing,
/// and t of the first cell boundary. Zero velocity pins the axis at
/// infinity so it never steps.
fn init_step(cell_size: f64, ct: i32, t1: f64, t2: f64) -> (i32, f64, f64) {
    let v = t2 - t1;
    if v > 0.0 {
        (1, cell_size / v, (ct as f64 * cell_size - t1) / v)
    } else if v < 0.0 {
        (-1, -cell_size / v, ((ct - 1) as f64 * cell_size - t1) / v)
    } else {
        (0, f64::INFINITY, f64::INFINITY)
    }
}

/// Visits the cells crossed by the segment `p1 → p2`, in order.
///
/// Two deviations from the textbook grid walk: a step exactly through a
/// grid corner also emits the diagonal neighbor (so corner-touching items
/// are not missed), and iteration stops once within Manhattan distance 1
/// of the end cell, emitting the end cell if it was not reached. The
/// early stop sidesteps an infinite loop from float drift near the
/// endpoint.
pub fn traverse(cell_size: f64, p1: DVec2, p2: DVec2, mut f: impl FnMut(i32, i32)) {
    let (cx1, cy1) = to_cell(cell_size, p1.x, p1.y);
    let (cx2, cy2) = to_cell(cell_size, p2.x, p2.y);
    let (step_x, dx, mut tx) = init_step(cell_size, cx1, p1.x, p2.x);
    let (step_y, dy, mut ty) = init_step(cell_size, cy1, p1.y, p2.y);
    let (mut cx, mut cy) = (cx1, cy1);

    f(cx, cy);
    while (cx - cx2).abs() + (cy - cy2).abs() > 1 {
        if tx < ty {
            tx += dx;
            cx += step_x;
            f(cx, cy);
        } else {
            // Exactly on a corner: both neighbor cells are crossed.
            if tx == ty {
                f(cx + step_x, cy);
            }
            ty += dy;
            cy += step_y;
            f(cx, cy);
        }
    }
    if cx != cx2 || cy != cy2 {
        f(cx2, cy2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cell_basic() {
        assert_eq!(to_cell(64.0, 0.0, 0.0), (1, 1));
        assert_eq!(to_cell(64.0, 63.9, 63.9), (1, 1));
        assert_eq!(to_cell(64.0, 64.0, 64.0), (2, 2));
        assert_eq!(to_cell(64.0, -0.1, -0.1), (0, 0));
    }

    #[test]
    fn test_to_world_inverts_to_cell() {
        assert_eq!(to_world(64.0, 1, 1), DVec2::new(0.0, 0.0));
        assert_eq!(to_world(64.0, 2, 3), DVec2::new(64.0, 128.0));
    }

    #[test]
    fn test_round_trip_random() {
        let mut seed = 3u32;
        let mut lcg = |s: &mut u32| {
            *s = s.wrapping_mul(1664525).wrapping_add(1013904223);
            *s
        };
        for _ in 0..300 {
            let x = (lcg(&mut seed) as f64 / u32::MAX as f64) * 2000.0 - 1000.0;
            let y = (lcg(&mut seed) as f64 / u32::MAX as f64) * 2000.0 - 1000.0;
            let (cx, cy) = to_cell(64.0, x, y);
            let w = to_world(64.0, cx, cy);
            assert!(w.x >= x - 64.0 && w.x <= x);
            assert!(w.y >= y - 64.0 && w.y <= y);
        }
    }

    #[test]
    fn test_to_cell_span() {
        let span = to_cell_span(64.0, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(
            span,
            CellSpan {
                l: 1,
                t: 1,
                w: 1,
                h: 1
            }
        );
        let span = to_cell_span(64.0, Rect::new(60.0, 60.0, 10.0, 10.0));
        assert_eq!(
            span,
            CellSpan {
                l: 1,
                t: 1,
                w: 2,
                h: 2
            }
        );
        assert_eq!(span.r(), 2);
        assert_eq!(span.b(), 2);
    }

    #[test]
    fn test_traverse_straight_line() {
        let mut cells = Vec::new();
        traverse(10.0, DVec2::new(5.0, 5.0), DVec2::new(35.0, 5.0), |cx, cy| {
            cells.push((cx, cy))
        });
        assert_eq!(cells, vec![(1, 1), (2, 1), (3, 1), (4, 1)]);
    }

    #[test]
    fn test_traverse_single_cell() {
        let mut cells = Vec::new();
        traverse(10.0, DVec2::new(5.0, 5.0), DVec2::new(6.0, 6.0), |cx, cy| {
            cells.push((cx, cy))
        });
        assert_eq!(cells, vec![(1, 1)]);
    }

    #[test]
    fn test_traverse_vertical() {
        let mut cells = Vec::new();
        traverse(
            10.0,
            DVec2::new(5.0, 25.0),
            DVec2::new(5.0, -5.0),
            |cx, cy| cells.push((cx, cy)),
        );
        assert_eq!(cells, vec![(1, 3), (1, 2), (1, 1), (1, 0)]);
    }

    #[test]
    fn test_traverse_corner_emits_diagonal_neighbors() {
        // The diagonal passes exactly through grid corners; both
        // neighbor cells of every corner must be visited.
        let mut cells = Vec::new();
        traverse(
            10.0,
            DVec2::new(5.0, 5.0),
            DVec2::new(25.0, 25.0),
            |cx, cy| cells.push((cx, cy)),
        );
        for expected in [(1, 1), (2, 1), (1, 2), (2, 2), (3, 2), (2, 3), (3, 3)] {
            assert!(cells.contains(&expected), "missing cell {expected:?}");
        }
        assert_eq!(*cells.last().unwrap(), (3, 3));
    }

    #[test]
    fn test_traverse_ends_at_end_cell() {
        let mut cells = Vec::new();
        traverse(
            10.0,
            DVec2::new(1.0, 1.0),
            DVec2::new(97.0, 33.0),
            |cx, cy| cells.push((cx, cy)),
        );
        assert_eq!(cells.first(), Some(&(1, 1)));
        assert_eq!(cells.last(), Some(&(10, 4)));
    }
}
