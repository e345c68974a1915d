use glam::{DVec2, IVec2};

use crate::api::NarrowphaseApi;
use crate::types::{Contact, Rect, SegmentClip, EPSILON};

/// Rect primitive implementations.
pub struct Narrowphase;

fn nearest(v: f64, a: f64, b: f64) -> f64 {
    if (a - v).abs() < (b - v).abs() {
        a
    } else {
        b
    }
}

fn sign(v: f64) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

impl NarrowphaseApi for Narrowphase {
    fn minkowski_diff(a: Rect, b: Rect) -> Rect {
        Rect {
            x: b.x - a.x - a.w,
            y: b.y - a.y - a.h,
            w: a.w + b.w,
            h: a.h + b.h,
        }
    }

    fn nearest_corner(rect: Rect, p: DVec2) -> DVec2 {
        DVec2::new(
            nearest(p.x, rect.x, rect.x + rect.w),
            nearest(p.y, rect.y, rect.y + rect.h),
        )
    }

    fn contains_point(rect: Rect, p: DVec2) -> bool {
        p.x - rect.x > EPSILON
            && p.y - rect.y > EPSILON
            && rect.x + rect.w - p.x > EPSILON
            && rect.y + rect.h - p.y > EPSILON
    }

    fn is_intersecting(a: Rect, b: Rect) -> bool {
        a.x < b.x + b.w && b.x < a.x + a.w && a.y < b.y + b.h && b.y < a.y + a.h
    }

    fn square_distance(a: Rect, b: Rect) -> f64 {
        let dx = a.x - b.x + (a.w - b.w) / 2.0;
        let dy = a.y - b.y + (a.h - b.h) / 2.0;
        dx * dx + dy * dy
    }

    fn segment_intersection(
        rect: Rect,
        p1: DVec2,
        p2: DVec2,
        ti1: f64,
        ti2: f64,
    ) -> Option<SegmentClip> {
        let (dx, dy) = (p2.x - p1.x, p2.y - p1.y);
        let mut ti1 = ti1;
        let mut ti2 = ti2;
        let mut n1 = IVec2::ZERO;
        let mut n2 = IVec2::ZERO;

        // Half-planes in fixed order: left, right, top, bottom.
        let sides = [
            (IVec2::new(-1, 0), -dx, p1.x - rect.x),
            (IVec2::new(1, 0), dx, rect.x + rect.w - p1.x),
            (IVec2::new(0, -1), -dy, p1.y - rect.y),
            (IVec2::new(0, 1), dy, rect.y + rect.h - p1.y),
        ];
        for (n, p, q) in sides {
            if p == 0.0 {
                // Parallel to this slab; outside means a clean miss.
                if q <= 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    if r > ti2 {
                        return None;
                    }
                    if r > ti1 {
                        ti1 = r;
                        n1 = n;
                    }
                } else {
                    if r < ti1 {
                        return None;
                    }
                    if r < ti2 {
                        ti2 = r;
                        n2 = n;
                    }
                }
            }
        }

        Some(SegmentClip {
            ti1,
            ti2,
            normal1: n1,
            normal2: n2,
        })
    }

    fn detect_collision(a: Rect, b: Rect, goal: DVec2) -> Option<Contact> {
        let motion = goal - a.pos();
        let diff = Self::minkowski_diff(a, b);

        if Self::contains_point(diff, DVec2::ZERO) {
            // Already overlapping; the negated intersection area becomes
            // the sort key, so deeper overlaps resolve first.
            let corner = Self::nearest_corner(diff, DVec2::ZERO);
            let wi = a.w.min(corner.x.abs());
            let hi = a.h.min(corner.y.abs());
            let ti = -wi * hi;

            let (normal, touch) = if motion == DVec2::ZERO {
                // Static overlap: displace along the shallower axis.
                let mut p = corner;
                if p.x.abs() < p.y.abs() {
                    p.y = 0.0;
                } else {
                    p.x = 0.0;
                }
                (IVec2::new(sign(p.x), sign(p.y)), a.pos() + p)
            } else {
                // Moving overlap: the clip supplies normal and touch
                // point while `ti` keeps carrying the overlap area.
                let clip =
                    Self::segment_intersection(diff, DVec2::ZERO, motion, f64::NEG_INFINITY, 1.0)?;
                (clip.normal1, a.pos() + motion * clip.ti1)
            };

            return Some(Contact {
                overlaps: true,
                ti,
                motion,
                normal,
                touch,
                item_rect: a,
                other_rect: b,
            });
        }

        let clip = Self::segment_intersection(
            diff,
            DVec2::ZERO,
            motion,
            f64::NEG_INFINITY,
            f64::INFINITY,
        )?;
        // |ti1 - ti2| below the margin means the segment grazes a corner
        // of the difference rect; that is not a collision.
        if clip.ti1 < 1.0
            && (clip.ti1 - clip.ti2).abs() >= EPSILON
            && (clip.ti1 > -EPSILON || (clip.ti1 == 0.0 && clip.ti2 > 0.0))
        {
            Some(Contact {
                overlaps: false,
                ti: clip.ti1,
                motion,
                normal: clip.normal1,
                touch: a.pos() + motion * clip.ti1,
                item_rect: a,
                other_rect: b,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, w, h)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_minkowski_diff_basic() {
        let d = Narrowphase::minkowski_diff(rect(0.0, 0.0, 8.0, 8.0), rect(8.0, 0.0, 100.0, 8.0));
        assert_eq!(d, rect(0.0, -8.0, 108.0, 16.0));
    }

    #[test]
    fn test_nearest_corner() {
        let r = rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(
            Narrowphase::nearest_corner(r, DVec2::new(2.0, 9.0)),
            DVec2::new(0.0, 10.0)
        );
        assert_eq!(
            Narrowphase::nearest_corner(r, DVec2::new(8.0, 1.0)),
            DVec2::new(10.0, 0.0)
        );
    }

    #[test]
    fn test_contains_point_is_strict() {
        let r = rect(10.0, 10.0, 10.0, 10.0);
        assert!(!Narrowphase::contains_point(r, DVec2::new(10.0, 10.0)));
        assert!(!Narrowphase::contains_point(r, DVec2::new(20.0, 15.0)));
        assert!(Narrowphase::contains_point(r, DVec2::new(10.001, 10.001)));
        assert!(Narrowphase::contains_point(r, DVec2::new(15.0, 15.0)));
    }

    #[test]
    fn test_is_intersecting_open_interval() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(10.0, 0.0, 10.0, 10.0);
        // Touching edges do not count.
        assert!(!Narrowphase::is_intersecting(a, b));
        let c = rect(9.0, 0.0, 10.0, 10.0);
        assert!(Narrowphase::is_intersecting(a, c));
        assert!(Narrowphase::is_intersecting(c, a));
    }

    #[test]
    fn test_is_intersecting_symmetric_random() {
        let mut seed = 7u32;
        let mut lcg = |s: &mut u32| {
            *s = s.wrapping_mul(1664525).wrapping_add(1013904223);
            *s
        };
        for _ in 0..200 {
            let mut next = |range: f64| (lcg(&mut seed) as f64 / u32::MAX as f64) * range;
            let a = rect(next(100.0), next(100.0), 1.0 + next(20.0), 1.0 + next(20.0));
            let b = rect(next(100.0), next(100.0), 1.0 + next(20.0), 1.0 + next(20.0));
            assert_eq!(
                Narrowphase::is_intersecting(a, b),
                Narrowphase::is_intersecting(b, a)
            );
        }
    }

    #[test]
    fn test_segment_intersection_hit() {
        let r = rect(-1.0, -1.0, 2.0, 2.0);
        let clip = Narrowphase::segment_intersection(
            r,
            DVec2::new(-5.0, 0.0),
            DVec2::new(5.0, 0.0),
            0.0,
            1.0,
        )
        .unwrap();
        assert!(approx(clip.ti1, 0.4));
        assert!(approx(clip.ti2, 0.6));
        assert_eq!(clip.normal1, IVec2::new(-1, 0));
        assert_eq!(clip.normal2, IVec2::new(1, 0));
    }

    #[test]
    fn test_segment_intersection_miss() {
        let r = rect(-1.0, -1.0, 2.0, 2.0);
        // Parallel to the rect, outside the vertical slab.
        let miss = Narrowphase::segment_intersection(
            r,
            DVec2::new(-5.0, 2.0),
            DVec2::new(5.0, 2.0),
            0.0,
            1.0,
        );
        assert!(miss.is_none());
        // Pointing away.
        let away = Narrowphase::segment_intersection(
            r,
            DVec2::new(-5.0, 0.0),
            DVec2::new(-9.0, 0.0),
            0.0,
            1.0,
        );
        assert!(away.is_none());
    }

    #[test]
    fn test_detect_tunneling() {
        let contact = Narrowphase::detect_collision(
            rect(0.0, 0.0, 2.0, 2.0),
            rect(500.0, 0.0, 2.0, 2.0),
            DVec2::new(1000.0, 0.0),
        )
        .unwrap();
        assert!(!contact.overlaps);
        assert!(approx(contact.ti, 0.498));
        assert_eq!(contact.normal, IVec2::new(-1, 0));
        assert!(approx(contact.touch.x, 498.0));
        assert!(approx(contact.touch.y, 0.0));
    }

    #[test]
    fn test_detect_requires_forward_motion() {
        let contact = Narrowphase::detect_collision(
            rect(0.0, 0.0, 2.0, 2.0),
            rect(10.0, 0.0, 2.0, 2.0),
            DVec2::new(-5.0, 0.0),
        );
        assert!(contact.is_none());
    }

    #[test]
    fn test_detect_corner_graze_rejected() {
        // B touches A's top-right corner; moving down-right the segment
        // passes exactly through the corner of the difference rect, so
        // entry and exit coincide and no collision is produced.
        let contact = Narrowphase::detect_collision(
            rect(0.0, 0.0, 1.0, 1.0),
            rect(1.0, -1.0, 1.0, 1.0),
            DVec2::new(2.0, 2.0),
        );
        assert!(contact.is_none());
    }

    #[test]
    fn test_detect_overlap_static() {
        let contact = Narrowphase::detect_collision(
            rect(0.0, 0.0, 8.0, 8.0),
            rect(4.0, 0.0, 8.0, 8.0),
            DVec2::new(0.0, 0.0),
        )
        .unwrap();
        assert!(contact.overlaps);
        // Overlap region is 4x8, so ti is its negated area.
        assert!(approx(contact.ti, -32.0));
        assert_eq!(contact.normal, IVec2::new(-1, 0));
        assert!(approx(contact.touch.x, -4.0));
        assert!(approx(contact.touch.y, 0.0));
    }

    #[test]
    fn test_detect_overlap_moving_keeps_area_ti() {
        let contact = Narrowphase::detect_collision(
            rect(0.0, 0.0, 8.0, 8.0),
            rect(4.0, 0.0, 8.0, 8.0),
            DVec2::new(10.0, 0.0),
        )
        .unwrap();
        assert!(contact.overlaps);
        // The clip supplies touch/normal; ti stays the overlap area.
        assert!(approx(contact.ti, -32.0));
        assert_eq!(contact.normal, IVec2::new(-1, 0));
        assert!(approx(contact.touch.x, -4.0));
    }

    #[test]
    fn test_detect_sign_property_random() {
        let mut seed = 99u32;
        let mut lcg = |s: &mut u32| {
            *s = s.wrapping_mul(1664525).wrapping_add(1013904223);
            *s
        };
        for _ in 0..500 {
            let mut next = |range: f64| (lcg(&mut seed) as f64 / u32::MAX as f64) * range;
            let a = rect(next(60.0), next(60.0), 1.0 + next(10.0), 1.0 + next(10.0));
            let b = rect(next(60.0), next(60.0), 1.0 + next(10.0), 1.0 + next(10.0));
            let goal = DVec2::new(next(120.0) - 60.0, next(120.0) - 60.0);
            if let Some(contact) = Narrowphase::detect_collision(a, b, goal) {
                if contact.overlaps {
                    assert!(contact.ti < 0.0, "overlap must carry a negative sort key");
                } else {
                    assert!(contact.ti > -EPSILON && contact.ti < 1.0);
                }
            }
        }
    }
}
