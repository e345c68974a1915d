use glam::{DVec2, IVec2};
use thiserror::Error;

/// Comparison margin for containment tests and corner-graze rejection.
pub const EPSILON: f64 = 1e-5;

/// Cell size used by `World::default`.
pub const DEFAULT_CELL_SIZE: f64 = 64.0;

/// User-defined opaque key identifying an item (e.g., pack your entity id).
/// The world never interprets it; it is only a registry key and is echoed
/// back verbatim in collision records and query results.
pub type ItemKey = u64;

/// Name of a collision response registered on a world.
pub type ResponseName = &'static str;

/// Axis-aligned rectangle: top-left corner plus non-negative extents.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        debug_assert!(w >= 0.0 && h >= 0.0, "rect extents must be non-negative");
        Self { x, y, w, h }
    }

    /// Top-left corner.
    pub fn pos(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Center point.
    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Inclusive span of grid cells covered by a rectangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellSpan {
    /// Leftmost column.
    pub l: i32,
    /// Topmost row.
    pub t: i32,
    /// Width in cells.
    pub w: i32,
    /// Height in cells.
    pub h: i32,
}

impl CellSpan {
    /// Rightmost column of the span.
    pub fn r(&self) -> i32 {
        self.l + self.w - 1
    }

    /// Bottom row of the span.
    pub fn b(&self) -> i32 {
        self.t + self.h - 1
    }
}

/// Result of clipping a segment against a rectangle's four half-planes.
///
/// The entry/exit normals are only meaningful when the corresponding end
/// of the initial clip range was unbounded.
#[derive(Copy, Clone, Debug)]
pub struct SegmentClip {
    /// Parameter where the segment enters the rect.
    pub ti1: f64,
    /// Parameter where the segment leaves the rect.
    pub ti2: f64,
    /// Normal of the side crossed on entry.
    pub normal1: IVec2,
    /// Normal of the side crossed on exit.
    pub normal2: IVec2,
}

/// Narrowphase result for one moving rect against one static rect.
#[derive(Copy, Clone, Debug)]
pub struct Contact {
    /// True iff the rects already intersected at the start of the step.
    pub overlaps: bool,
    /// Time of impact in `[0, 1]` for tunneling contacts; the negated
    /// intersection area when `overlaps` is set, so deeper overlaps sort
    /// first.
    pub ti: f64,
    /// Requested displacement (goal minus current position).
    pub motion: DVec2,
    /// Axis-aligned unit normal at the contact.
    pub normal: IVec2,
    /// Position the moving rect occupies at first contact.
    pub touch: DVec2,
    /// Moving rect at the moment of detection.
    pub item_rect: Rect,
    /// Static rect at the moment of detection.
    pub other_rect: Rect,
}

/// Contact tagged with the colliding pair and the response the filter
/// chose for it.
#[derive(Copy, Clone, Debug)]
pub struct Collision {
    /// Moving item; `None` for hypothetical projections.
    pub item: Option<ItemKey>,
    /// Item collided against.
    pub other: ItemKey,
    /// Response name the filter returned for this pair.
    pub response: ResponseName,
    pub contact: Contact,
    /// Post-response goal recorded by the `slide` response.
    pub slide: Option<DVec2>,
    /// Post-response goal recorded by the `bounce` response.
    pub bounce: Option<DVec2>,
}

/// Segment query result with entry/exit detail.
#[derive(Copy, Clone, Debug)]
pub struct SegmentInfo {
    pub item: ItemKey,
    /// Entry time along the segment, clipped to `[0, 1]`.
    pub ti1: f64,
    /// Exit time along the segment, clipped to `[0, 1]`.
    pub ti2: f64,
    /// World coordinates where the segment enters the rect.
    pub p1: DVec2,
    /// World coordinates where the segment leaves the rect.
    pub p2: DVec2,
}

/// Debug/occupancy statistics for a world.
#[derive(Copy, Clone, Debug, Default)]
pub struct WorldStats {
    pub items: usize,
    /// Cells currently holding at least one item.
    pub cells: usize,
    /// Sum of per-cell item counts (an item spanning k cells counts k times).
    pub cell_refs: usize,
    /// Largest single-cell occupancy.
    pub max_cell_items: usize,
}

/// Errors emitted by the world.
///
/// All of these are programmer errors; no operation mutates state before
/// validating, so the world's invariants hold even after an error.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum WorldError {
    #[error("cell size must be a positive number, got {0}")]
    BadCellSize(f64),
    #[error("item {0} added twice")]
    DuplicateItem(ItemKey),
    #[error("item {0} is not present in the world")]
    UnknownItem(ItemKey),
    #[error("no response registered under {0:?}")]
    UnknownResponse(ResponseName),
}
