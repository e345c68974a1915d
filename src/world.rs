use glam::DVec2;
use rustc_hash::{FxHashMap, FxHashSet};

use std::cell::RefCell;
use std::collections::HashMap;

use crate::api::{Filter, NarrowphaseApi, QueryFilter, Response};
use crate::grid;
use crate::narrowphase::Narrowphase;
use crate::types::*;

/// Built-in response names, pre-registered on every world.
pub const TOUCH: ResponseName = "touch";
pub const CROSS: ResponseName = "cross";
pub const SLIDE: ResponseName = "slide";
pub const BOUNCE: ResponseName = "bounce";

/// Collision world: an item registry plus a sparse uniform grid.
///
/// Single-threaded and non-reentrant; filters and responses run
/// synchronously and must not mutate the world.
pub struct World {
    cell_size: f64,
    rects: FxHashMap<ItemKey, Rect>,
    // row -> col -> cell; a cell exists iff at least one item occupies it.
    rows: FxHashMap<i32, FxHashMap<i32, Cell>>,
    responses: HashMap<ResponseName, Response>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("cell_size", &self.cell_size)
            .field("rects", &self.rects)
            .field("rows", &self.rows)
            .field("responses", &self.responses.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Default, Debug)]
struct Cell {
    items: FxHashSet<ItemKey>,
}

struct SegmentHit {
    item: ItemKey,
    ti1: f64,
    ti2: f64,
    weight: f64,
}

fn default_filter(_item: Option<ItemKey>, _other: ItemKey) -> Option<ResponseName> {
    Some(SLIDE)
}

impl Default for World {
    fn default() -> Self {
        Self::build(DEFAULT_CELL_SIZE)
    }
}

impl World {
    /// Creates a world with the given cell size.
    ///
    /// # Errors
    /// Returns [`WorldError::BadCellSize`] when `cell_size` is not a
    /// positive number.
    pub fn new(cell_size: f64) -> Result<Self, WorldError> {
        if !(cell_size > 0.0) {
            return Err(WorldError::BadCellSize(cell_size));
        }
        Ok(Self::build(cell_size))
    }

    fn build(cell_size: f64) -> Self {
        let mut world = Self {
            cell_size,
            rects: FxHashMap::default(),
            rows: FxHashMap::default(),
            responses: HashMap::new(),
        };
        world.add_response(TOUCH, Box::new(touch_response));
        world.add_response(CROSS, Box::new(cross_response));
        world.add_response(SLIDE, Box::new(slide_response));
        world.add_response(BOUNCE, Box::new(bounce_response));
        world
    }

    /// Cell size the world was created with.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Registers or overrides a response under `name`. Overriding the
    /// four built-ins is permitted.
    pub fn add_response(&mut self, name: ResponseName, response: Response) {
        self.responses.insert(name, response);
    }

    // --- Item registry -----------------------------------------------------

    /// Registers `item` with the given rectangle.
    ///
    /// # Errors
    /// Returns [`WorldError::DuplicateItem`] when the item is already
    /// present.
    pub fn add(&mut self, item: ItemKey, rect: Rect) -> Result<(), WorldError> {
        if self.rects.contains_key(&item) {
            return Err(WorldError::DuplicateItem(item));
        }
        self.rects.insert(item, rect);
        let span = grid::to_cell_span(self.cell_size, rect);
        for cy in span.t..=span.b() {
            for cx in span.l..=span.r() {
                self.add_to_cell(item, cx, cy);
            }
        }
        Ok(())
    }

    /// Removes `item` and frees the cells it occupied.
    ///
    /// # Errors
    /// Returns [`WorldError::UnknownItem`] when the item is not present.
    pub fn remove(&mut self, item: ItemKey) -> Result<(), WorldError> {
        let rect = self
            .rects
            .remove(&item)
            .ok_or(WorldError::UnknownItem(item))?;
        let span = grid::to_cell_span(self.cell_size, rect);
        for cy in span.t..=span.b() {
            for cx in span.l..=span.r() {
                self.remove_from_cell(item, cx, cy);
            }
        }
        Ok(())
    }

    /// Moves and/or resizes `item`; omitted extents keep their current
    /// values. Cell membership is refreshed as a symmetric difference of
    /// the old and new spans, so a small move only touches the cells
    /// entering or leaving the span.
    ///
    /// # Errors
    /// Returns [`WorldError::UnknownItem`] when the item is not present.
    pub fn update(
        &mut self,
        item: ItemKey,
        x: f64,
        y: f64,
        w: Option<f64>,
        h: Option<f64>,
    ) -> Result<(), WorldError> {
        let old = self.get_rect(item)?;
        let new = Rect::new(x, y, w.unwrap_or(old.w), h.unwrap_or(old.h));
        if old == new {
            return Ok(());
        }
        let old_span = grid::to_cell_span(self.cell_size, old);
        let new_span = grid::to_cell_span(self.cell_size, new);
        if old_span != new_span {
            let (r1, b1) = (old_span.r(), old_span.b());
            let (r2, b2) = (new_span.r(), new_span.b());
            for cy in old_span.t..=b1 {
                let cy_out = cy < new_span.t || cy > b2;
                for cx in old_span.l..=r1 {
                    if cy_out || cx < new_span.l || cx > r2 {
                        self.remove_from_cell(item, cx, cy);
                    }
                }
            }
            for cy in new_span.t..=b2 {
                let cy_out = cy < old_span.t || cy > b1;
                for cx in new_span.l..=r2 {
                    if cy_out || cx < old_span.l || cx > r1 {
                        self.add_to_cell(item, cx, cy);
                    }
                }
            }
        }
        self.rects.insert(item, new);
        Ok(())
    }

    /// Current rectangle of `item`.
    ///
    /// # Errors
    /// Returns [`WorldError::UnknownItem`] when the item is not present.
    pub fn get_rect(&self, item: ItemKey) -> Result<Rect, WorldError> {
        self.rects
            .get(&item)
            .copied()
            .ok_or(WorldError::UnknownItem(item))
    }

    pub fn has_item(&self, item: ItemKey) -> bool {
        self.rects.contains_key(&item)
    }

    pub fn items(&self) -> Vec<ItemKey> {
        self.rects.keys().copied().collect()
    }

    pub fn count_items(&self) -> usize {
        self.rects.len()
    }

    /// Number of cells currently holding at least one item.
    pub fn count_cells(&self) -> usize {
        self.rows.values().map(FxHashMap::len).sum()
    }

    pub fn to_cell(&self, x: f64, y: f64) -> (i32, i32) {
        grid::to_cell(self.cell_size, x, y)
    }

    pub fn to_world(&self, cx: i32, cy: i32) -> DVec2 {
        grid::to_world(self.cell_size, cx, cy)
    }

    /// Occupancy snapshot for debugging and perf sweeps.
    pub fn debug_stats(&self) -> WorldStats {
        let mut stats = WorldStats {
            items: self.rects.len(),
            ..Default::default()
        };
        for row in self.rows.values() {
            stats.cells += row.len();
            for cell in row.values() {
                stats.cell_refs += cell.items.len();
                stats.max_cell_items = stats.max_cell_items.max(cell.items.len());
            }
        }
        stats
    }

    // --- Queries -----------------------------------------------------------

    /// Items whose rectangles intersect the query rect (open-interval
    /// test, so edge contact does not count). Result order is arbitrary
    /// but deterministic.
    pub fn query_rect(&self, rect: Rect) -> Vec<ItemKey> {
        self.query_rect_filtered(rect, |_| true)
    }

    pub fn query_rect_filtered(
        &self,
        rect: Rect,
        mut filter: impl FnMut(ItemKey) -> bool,
    ) -> Vec<ItemKey> {
        let span = grid::to_cell_span(self.cell_size, rect);
        let mut out = Vec::new();
        for item in self.items_in_span(span) {
            if Narrowphase::is_intersecting(self.rects[&item], rect) && filter(item) {
                out.push(item);
            }
        }
        out
    }

    /// Items strictly containing the point (with the `EPSILON` margin).
    pub fn query_point(&self, x: f64, y: f64) -> Vec<ItemKey> {
        self.query_point_filtered(x, y, |_| true)
    }

    pub fn query_point_filtered(
        &self,
        x: f64,
        y: f64,
        mut filter: impl FnMut(ItemKey) -> bool,
    ) -> Vec<ItemKey> {
        let (cl, ct) = self.to_cell(x, y);
        let span = CellSpan {
            l: cl,
            t: ct,
            w: 1,
            h: 1,
        };
        let p = DVec2::new(x, y);
        let mut out = Vec::new();
        for item in self.items_in_span(span) {
            if Narrowphase::contains_point(self.rects[&item], p) && filter(item) {
                out.push(item);
            }
        }
        out
    }

    /// Items touched by the segment, ordered along it.
    pub fn query_segment(&self, p1: DVec2, p2: DVec2) -> Vec<ItemKey> {
        self.query_segment_filtered(p1, p2, |_| true)
    }

    pub fn query_segment_filtered(
        &self,
        p1: DVec2,
        p2: DVec2,
        mut filter: impl FnMut(ItemKey) -> bool,
    ) -> Vec<ItemKey> {
        self.segment_hits(p1, p2, &mut filter)
            .into_iter()
            .map(|hit| hit.item)
            .collect()
    }

    /// Like [`query_segment`](World::query_segment), with entry/exit
    /// times and world coordinates per item.
    pub fn query_segment_with_coords(&self, p1: DVec2, p2: DVec2) -> Vec<SegmentInfo> {
        self.query_segment_with_coords_filtered(p1, p2, |_| true)
    }

    pub fn query_segment_with_coords_filtered(
        &self,
        p1: DVec2,
        p2: DVec2,
        mut filter: impl FnMut(ItemKey) -> bool,
    ) -> Vec<SegmentInfo> {
        let delta = p2 - p1;
        self.segment_hits(p1, p2, &mut filter)
            .into_iter()
            .map(|hit| SegmentInfo {
                item: hit.item,
                ti1: hit.ti1,
                ti2: hit.ti2,
                p1: p1 + delta * hit.ti1,
                p2: p1 + delta * hit.ti2,
            })
            .collect()
    }

    // --- Movement ----------------------------------------------------------

    /// Collision set for a (possibly hypothetical) rect moved toward
    /// `goal`, using the default `slide` filter. Does not mutate the
    /// world; `item`, when given, is excluded from the candidates.
    pub fn project(&self, item: Option<ItemKey>, rect: Rect, goal: DVec2) -> Vec<Collision> {
        self.project_filtered(item, rect, goal, default_filter)
    }

    /// Sorted by time of impact, ties broken by squared center distance,
    /// so overlapping collisions resolve deepest-first.
    pub fn project_filtered(
        &self,
        item: Option<ItemKey>,
        rect: Rect,
        goal: DVec2,
        mut filter: impl FnMut(Option<ItemKey>, ItemKey) -> Option<ResponseName>,
    ) -> Vec<Collision> {
        // Bounding rect of the whole movement, expanded to cells. A cell
        // raster of the swept quad would visit fewer cells for long
        // diagonal moves; the bounding rect keeps the candidate set a
        // superset of that.
        let tl = goal.x.min(rect.x);
        let tt = goal.y.min(rect.y);
        let tr = (goal.x + rect.w).max(rect.x + rect.w);
        let tb = (goal.y + rect.h).max(rect.y + rect.h);
        let span = grid::to_cell_span(self.cell_size, Rect::new(tl, tt, tr - tl, tb - tt));

        let mut collisions = Vec::new();
        for other in self.items_in_span(span) {
            if Some(other) == item {
                continue;
            }
            let Some(response) = filter(item, other) else {
                continue;
            };
            let other_rect = self.rects[&other];
            if let Some(contact) = Narrowphase::detect_collision(rect, other_rect, goal) {
                collisions.push(Collision {
                    item,
                    other,
                    response,
                    contact,
                    slide: None,
                    bounce: None,
                });
            }
        }
        collisions.sort_by(|a, b| {
            a.contact.ti.total_cmp(&b.contact.ti).then_with(|| {
                let da = Narrowphase::square_distance(a.contact.item_rect, a.contact.other_rect);
                let db = Narrowphase::square_distance(b.contact.item_rect, b.contact.other_rect);
                da.total_cmp(&db)
            })
        });
        collisions
    }

    /// Resolves a movement of `item` toward `goal` without committing
    /// it: returns the position actually reached and the collisions met
    /// along the way, in resolution order.
    ///
    /// # Errors
    /// Returns [`WorldError::UnknownItem`] for items never added and
    /// [`WorldError::UnknownResponse`] when the filter names an
    /// unregistered response.
    pub fn check(
        &self,
        item: ItemKey,
        goal: DVec2,
    ) -> Result<(DVec2, Vec<Collision>), WorldError> {
        self.check_filtered(item, goal, default_filter)
    }

    pub fn check_filtered(
        &self,
        item: ItemKey,
        goal: DVec2,
        mut filter: impl FnMut(Option<ItemKey>, ItemKey) -> Option<ResponseName>,
    ) -> Result<(DVec2, Vec<Collision>), WorldError> {
        let rect = self.get_rect(item)?;

        // Each resolved `other` is blocked from re-entering the loop,
        // which bounds the iteration count by the item population.
        let visited = RefCell::new(FxHashSet::default());
        visited.borrow_mut().insert(item);
        let mut visited_filter = |itm: Option<ItemKey>, other: ItemKey| {
            if visited.borrow().contains(&other) {
                return None;
            }
            filter(itm, other)
        };

        let mut goal = goal;
        let mut collisions = Vec::new();
        let mut projected = self.project_filtered(Some(item), rect, goal, &mut visited_filter);
        loop {
            let Some(&first) = projected.first() else {
                break;
            };
            let mut col = first;
            visited.borrow_mut().insert(col.other);
            let response = self
                .responses
                .get(col.response)
                .ok_or(WorldError::UnknownResponse(col.response))?;
            // Responses receive the original source rect but the
            // rewritten goal; repositioning happens via re-projection
            // from the touch point.
            let (next_goal, next) = response(self, &mut col, rect, goal, &mut visited_filter);
            goal = next_goal;
            projected = next;
            collisions.push(col);
        }
        Ok((goal, collisions))
    }

    /// Resolves a movement and commits the resulting position (width and
    /// height are kept).
    ///
    /// # Errors
    /// Same conditions as [`check`](World::check).
    pub fn move_item(
        &mut self,
        item: ItemKey,
        goal: DVec2,
    ) -> Result<(DVec2, Vec<Collision>), WorldError> {
        self.move_item_filtered(item, goal, default_filter)
    }

    pub fn move_item_filtered(
        &mut self,
        item: ItemKey,
        goal: DVec2,
        filter: impl FnMut(Option<ItemKey>, ItemKey) -> Option<ResponseName>,
    ) -> Result<(DVec2, Vec<Collision>), WorldError> {
        let (actual, collisions) = self.check_filtered(item, goal, filter)?;
        self.update(item, actual.x, actual.y, None, None)?;
        Ok((actual, collisions))
    }

    // --- Cell plumbing -----------------------------------------------------

    fn add_to_cell(&mut self, item: ItemKey, cx: i32, cy: i32) {
        self.rows
            .entry(cy)
            .or_default()
            .entry(cx)
            .or_default()
            .items
            .insert(item);
    }

    /// Removes `item` from a cell, freeing the cell (and then its row)
    /// once the occupancy drops to zero.
    fn remove_from_cell(&mut self, item: ItemKey, cx: i32, cy: i32) -> bool {
        let mut drop_row = false;
        let mut removed = false;
        if let Some(row) = self.rows.get_mut(&cy) {
            if let Some(cell) = row.get_mut(&cx) {
                removed = cell.items.remove(&item);
                if removed && cell.items.is_empty() {
                    row.remove(&cx);
                    drop_row = row.is_empty();
                }
            }
        }
        if drop_row {
            self.rows.remove(&cy);
        }
        removed
    }

    /// Union of the items in all cells of the span, deduplicated.
    fn items_in_span(&self, span: CellSpan) -> FxHashSet<ItemKey> {
        let mut found = FxHashSet::default();
        for cy in span.t..=span.b() {
            if let Some(row) = self.rows.get(&cy) {
                for cx in span.l..=span.r() {
                    if let Some(cell) = row.get(&cx) {
                        found.extend(cell.items.iter().copied());
                    }
                }
            }
        }
        found
    }

    fn segment_hits(&self, p1: DVec2, p2: DVec2, filter: QueryFilter<'_>) -> Vec<SegmentHit> {
        let mut seen_cells: FxHashSet<(i32, i32)> = FxHashSet::default();
        let mut seen: FxHashSet<ItemKey> = FxHashSet::default();
        let mut hits = Vec::new();
        grid::traverse(self.cell_size, p1, p2, |cx, cy| {
            if !seen_cells.insert((cx, cy)) {
                return;
            }
            let Some(cell) = self.rows.get(&cy).and_then(|row| row.get(&cx)) else {
                return;
            };
            for &item in &cell.items {
                if !seen.insert(item) || !filter(item) {
                    continue;
                }
                let rect = self.rects[&item];
                let Some(clip) = Narrowphase::segment_intersection(rect, p1, p2, 0.0, 1.0) else {
                    continue;
                };
                if (0.0 < clip.ti1 && clip.ti1 < 1.0) || (0.0 < clip.ti2 && clip.ti2 < 1.0) {
                    // Order by the parameter of the infinite line, not
                    // the clipped segment.
                    let Some(line) = Narrowphase::segment_intersection(
                        rect,
                        p1,
                        p2,
                        f64::NEG_INFINITY,
                        f64::INFINITY,
                    ) else {
                        continue;
                    };
                    hits.push(SegmentHit {
                        item,
                        ti1: clip.ti1,
                        ti2: clip.ti2,
                        weight: line.ti1.min(line.ti2),
                    });
                }
            }
        });
        hits.sort_by(|a, b| a.weight.total_cmp(&b.weight));
        hits
    }
}

// --- Built-in responses ----------------------------------------------------

fn touch_response(
    _world: &World,
    col: &mut Collision,
    _rect: Rect,
    _goal: DVec2,
    _filter: Filter<'_>,
) -> (DVec2, Vec<Collision>) {
    (col.contact.touch, Vec::new())
}

fn cross_response(
    world: &World,
    col: &mut Collision,
    rect: Rect,
    goal: DVec2,
    filter: Filter<'_>,
) -> (DVec2, Vec<Collision>) {
    let next = world.project_filtered(col.item, rect, goal, filter);
    (goal, next)
}

fn slide_response(
    world: &World,
    col: &mut Collision,
    rect: Rect,
    mut goal: DVec2,
    filter: Filter<'_>,
) -> (DVec2, Vec<Collision>) {
    let touch = col.contact.touch;
    if col.contact.motion != DVec2::ZERO {
        // Cancel the goal component along the contact normal.
        if col.contact.normal.x != 0 {
            goal.x = touch.x;
        } else {
            goal.y = touch.y;
        }
    }
    col.slide = Some(goal);
    let from = Rect::new(touch.x, touch.y, rect.w, rect.h);
    let next = world.project_filtered(col.item, from, goal, filter);
    (goal, next)
}

fn bounce_response(
    world: &World,
    col: &mut Collision,
    rect: Rect,
    goal: DVec2,
    filter: Filter<'_>,
) -> (DVec2, Vec<Collision>) {
    let touch = col.contact.touch;
    let mut bounced = touch;
    if col.contact.motion != DVec2::ZERO {
        // Reflect the residual movement about the contact axis.
        let mut residual = goal - touch;
        if col.contact.normal.x == 0 {
            residual.y = -residual.y;
        } else {
            residual.x = -residual.x;
        }
        bounced = touch + residual;
    }
    col.bounce = Some(bounced);
    let from = Rect::new(touch.x, touch.y, rect.w, rect.h);
    let next = world.project_filtered(col.item, from, bounced, filter);
    (bounced, next)
}
