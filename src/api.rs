use glam::DVec2;

use crate::types::{Collision, Contact, ItemKey, Rect, ResponseName, SegmentClip};
use crate::world::World;

/// Pair filter driving movement: returns the name of the response to use
/// when `item` touches `other`, or `None` to ignore the pair.
///
/// `item` is `None` for hypothetical projections. The name must be
/// registered on the world by the time `check`/`move_item` resolves it.
pub type Filter<'a> = &'a mut dyn FnMut(Option<ItemKey>, ItemKey) -> Option<ResponseName>;

/// Item screen for queries; returning `false` drops the candidate.
pub type QueryFilter<'a> = &'a mut dyn FnMut(ItemKey) -> bool;

/// A response turns one collision into a revised goal plus the next
/// projection set. It receives the world, the collision (mutated in
/// place to record derived goals), the original source rect, the current
/// goal, and the resolution loop's filter.
///
/// Responses are invoked synchronously and must not mutate the world.
pub type Response =
    Box<dyn Fn(&World, &mut Collision, Rect, DVec2, Filter<'_>) -> (DVec2, Vec<Collision>)>;

/// Rect primitive signatures: pure functions on AABBs.
pub trait NarrowphaseApi {
    /// Minkowski difference of `a` and `b`. "Does `a` moving by `d` hit
    /// `b`?" reduces to "does the segment from the origin to `d` enter
    /// this rect?".
    fn minkowski_diff(a: Rect, b: Rect) -> Rect;

    /// Corner of `rect` nearest to `p`.
    fn nearest_corner(rect: Rect, p: DVec2) -> DVec2;

    /// Strict interior test with the [`EPSILON`](crate::types::EPSILON)
    /// margin; points on the boundary are outside.
    fn contains_point(rect: Rect, p: DVec2) -> bool;

    /// Open-interval overlap test (touching edges do not intersect).
    fn is_intersecting(a: Rect, b: Rect) -> bool;

    /// Squared distance between the rect centers.
    fn square_distance(a: Rect, b: Rect) -> f64;

    /// Generalized Liang–Barsky clip of the segment `p1 → p2` against
    /// `rect`, tightening the initial parameter range `[ti1, ti2]`.
    /// Returns `None` when the segment misses the rect entirely.
    fn segment_intersection(
        rect: Rect,
        p1: DVec2,
        p2: DVec2,
        ti1: f64,
        ti2: f64,
    ) -> Option<SegmentClip>;

    /// Continuous collision of `a` moving toward `goal` against a static
    /// `b`, covering both the already-overlapping and the tunneling
    /// regime. Returns `None` when the movement produces no contact.
    fn detect_collision(a: Rect, b: Rect, goal: DVec2) -> Option<Contact>;
}
