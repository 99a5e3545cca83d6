//! Aggregations over the event log.
//!
//! Each aggregator is fed events one at a time (in log order) and produces
//! its result with `finish`, so backends can stream rows into it without
//! materialising the log.

use std::collections::{BTreeMap, HashMap};

use hotspot_core::events::{EventData, TrackingEvent};
use hotspot_core::types::{ElementInteraction, HeatmapPoint, PageStats, ScrollDepthBucket};

/// Grid cell size for click heatmaps, in page pixels.
pub const CLICK_GRID: f64 = 10.0;
/// Grid cell size for mouse-movement heatmaps.
pub const MOUSE_GRID: f64 = 20.0;
/// Scroll histogram bin width, in percent.
pub const SCROLL_BIN: u32 = 10;
/// Length of the element-interaction ranking.
pub const TOP_ELEMENTS: usize = 50;

/// Nearest multiple of `cell`, halves rounding up.
fn snap(value: f64, cell: f64) -> f64 {
    (value / cell + 0.5).floor() * cell
}

/// Counts points per (cell x, cell y, path).
///
/// A cell's viewport coordinates and selector come from the first point seen
/// in it. Output is sorted by count, descending; ties keep first-seen order.
#[derive(Debug)]
pub struct HeatmapGrid {
    cell: f64,
    index: HashMap<(i64, i64, String), usize>,
    points: Vec<HeatmapPoint>,
}

impl HeatmapGrid {
    pub fn new(cell: f64) -> Self {
        Self {
            cell,
            index: HashMap::new(),
            points: Vec::new(),
        }
    }

    pub fn clicks() -> Self {
        Self::new(CLICK_GRID)
    }

    pub fn mouse() -> Self {
        Self::new(MOUSE_GRID)
    }

    /// Add one `click`; clicks without page coordinates are skipped.
    pub fn add_click(&mut self, event: &TrackingEvent) {
        if let EventData::Click(click) = &event.data {
            if let (Some(page_x), Some(page_y)) = (click.page_x, click.page_y) {
                let selector = click.element.as_ref().map(|e| e.selector.clone());
                self.add_point(click.x, click.y, page_x, page_y, &event.path, selector);
            }
        }
    }

    /// Add every point of one `mouse_trail`.
    pub fn add_trail(&mut self, event: &TrackingEvent) {
        if let EventData::MouseTrail(trail) = &event.data {
            for p in &trail.points {
                self.add_point(p.x, p.y, p.page_x, p.page_y, &event.path, None);
            }
        }
    }

    fn add_point(
        &mut self,
        x: f64,
        y: f64,
        page_x: f64,
        page_y: f64,
        path: &str,
        selector: Option<String>,
    ) {
        let gx = snap(page_x, self.cell);
        let gy = snap(page_y, self.cell);
        let key = (gx as i64, gy as i64, path.to_string());

        match self.index.get(&key) {
            Some(&idx) => self.points[idx].value += 1,
            None => {
                self.index.insert(key, self.points.len());
                self.points.push(HeatmapPoint {
                    x,
                    y,
                    page_x: gx,
                    page_y: gy,
                    value: 1,
                    path: path.to_string(),
                    element_selector: selector,
                });
            }
        }
    }

    pub fn finish(self) -> Vec<HeatmapPoint> {
        let mut points = self.points;
        points.sort_by(|a, b| b.value.cmp(&a.value));
        points
    }
}

/// Scroll-percent samples in 10-point bins, ascending.
#[derive(Debug, Default)]
pub struct ScrollHistogram {
    bins: BTreeMap<u32, u64>,
}

impl ScrollHistogram {
    pub fn add(&mut self, event: &TrackingEvent) {
        if let EventData::Scroll(scroll) = &event.data {
            if let Some(percent) = scroll.scroll_percent {
                *self.bins.entry(percent / SCROLL_BIN * SCROLL_BIN).or_default() += 1;
            }
        }
    }

    pub fn finish(self) -> Vec<ScrollDepthBucket> {
        self.bins
            .into_iter()
            .map(|(depth, count)| ScrollDepthBucket { depth, count })
            .collect()
    }
}

#[derive(Debug, Default)]
struct PageAccumulator {
    views: u64,
    clicks: u64,
    rage_clicks: u64,
    depth_sum: u64,
    depth_samples: u64,
}

/// Per-path views, clicks, rage clicks and mean sampled max depth.
///
/// Paths are reported in the order they first appear in the log. Every event
/// creates its path's entry, whatever its kind.
#[derive(Debug, Default)]
pub struct PageRollup {
    order: Vec<String>,
    pages: HashMap<String, PageAccumulator>,
}

impl PageRollup {
    pub fn add(&mut self, event: &TrackingEvent) {
        if !self.pages.contains_key(&event.path) {
            self.order.push(event.path.clone());
        }
        let page = self.pages.entry(event.path.clone()).or_default();

        match &event.data {
            EventData::PageView(_) => page.views += 1,
            EventData::Click(_) => page.clicks += 1,
            EventData::RageClick(_) => page.rage_clicks += 1,
            EventData::Scroll(scroll) => {
                if let Some(depth) = scroll.max_depth {
                    page.depth_sum += u64::from(depth);
                    page.depth_samples += 1;
                }
            }
            _ => {}
        }
    }

    pub fn finish(mut self) -> Vec<PageStats> {
        self.order
            .into_iter()
            .filter_map(|path| {
                let page = self.pages.remove(&path)?;
                let avg_scroll_depth = if page.depth_samples == 0 {
                    0
                } else {
                    (page.depth_sum as f64 / page.depth_samples as f64).round() as u32
                };
                Some(PageStats {
                    path,
                    views: page.views,
                    clicks: page.clicks,
                    avg_scroll_depth,
                    rage_clicks: page.rage_clicks,
                })
            })
            .collect()
    }
}

/// Click counts per element selector; top 50, descending.
///
/// The text shown for a selector is the one from its first click.
#[derive(Debug, Default)]
pub struct ElementRanking {
    index: HashMap<String, usize>,
    entries: Vec<ElementInteraction>,
}

impl ElementRanking {
    pub fn add(&mut self, event: &TrackingEvent) {
        let EventData::Click(click) = &event.data else {
            return;
        };
        let Some(element) = click.element.as_ref().filter(|e| !e.selector.is_empty()) else {
            return;
        };

        match self.index.get(&element.selector) {
            Some(&idx) => self.entries[idx].clicks += 1,
            None => {
                self.index
                    .insert(element.selector.clone(), self.entries.len());
                self.entries.push(ElementInteraction {
                    selector: element.selector.clone(),
                    clicks: 1,
                    text: element.text.clone(),
                });
            }
        }
    }

    pub fn finish(self) -> Vec<ElementInteraction> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.clicks.cmp(&a.clicks));
        entries.truncate(TOP_ELEMENTS);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotspot_core::events::{ClickData, MouseTrailData, PageViewData, ScrollData};
    use hotspot_core::types::{ElementMeta, TrailPoint, ViewportSnapshot};

    fn at(path: &str, data: EventData) -> TrackingEvent {
        TrackingEvent {
            timestamp: 0,
            session_id: "s".to_string(),
            user_id: "u".to_string(),
            url: String::new(),
            path: path.to_string(),
            viewport: ViewportSnapshot::default(),
            data,
        }
    }

    fn click(path: &str, x: f64, y: f64, selector: &str) -> TrackingEvent {
        at(
            path,
            EventData::Click(ClickData {
                x,
                y,
                page_x: Some(x),
                page_y: Some(y),
                element: Some(ElementMeta {
                    selector: selector.to_string(),
                    text: format!("{selector} text"),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        )
    }

    fn scroll(path: &str, percent: u32, max: u32) -> TrackingEvent {
        at(
            path,
            EventData::Scroll(ScrollData {
                scroll_y: 0.0,
                scroll_percent: Some(percent),
                max_depth: Some(max),
            }),
        )
    }

    #[test]
    fn test_snap_rounds_half_up() {
        assert_eq!(snap(124.0, 10.0), 120.0);
        assert_eq!(snap(125.0, 10.0), 130.0);
        assert_eq!(snap(-5.0, 10.0), 0.0);
        assert_eq!(snap(29.9, 20.0), 20.0);
        assert_eq!(snap(30.0, 20.0), 40.0);
    }

    #[test]
    fn test_click_grid_buckets() {
        let mut grid = HeatmapGrid::clicks();
        for e in [
            click("/", 121.0, 342.0, "a"),
            click("/", 118.0, 338.0, "b"),
            click("/", 300.0, 300.0, "c"),
            click("/other", 121.0, 342.0, "a"),
        ] {
            grid.add_click(&e);
        }

        let points = grid.finish();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].value, 2);
        assert_eq!((points[0].page_x, points[0].page_y), (120.0, 340.0));
        // Representative position and selector come from the first click.
        assert_eq!((points[0].x, points[0].y), (121.0, 342.0));
        assert_eq!(points[0].element_selector.as_deref(), Some("a"));
        assert_eq!(points[1].path, "/");
        assert_eq!(points[2].path, "/other");
    }

    #[test]
    fn test_clicks_without_page_coordinates_skipped() {
        let mut grid = HeatmapGrid::clicks();
        grid.add_click(&at("/", EventData::Click(ClickData::default())));
        assert!(grid.finish().is_empty());
    }

    #[test]
    fn test_mouse_grid_uses_trail_points() {
        let trail = at(
            "/",
            EventData::MouseTrail(MouseTrailData {
                points: vec![
                    TrailPoint {
                        x: 5.0,
                        y: 5.0,
                        page_x: 5.0,
                        page_y: 5.0,
                        t: 0,
                    },
                    TrailPoint {
                        x: 9.0,
                        y: 9.0,
                        page_x: 9.0,
                        page_y: 9.0,
                        t: 1,
                    },
                    TrailPoint {
                        x: 50.0,
                        y: 50.0,
                        page_x: 50.0,
                        page_y: 50.0,
                        t: 2,
                    },
                ],
            }),
        );
        let mut grid = HeatmapGrid::mouse();
        grid.add_trail(&trail);

        let points = grid.finish();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 2);
        assert_eq!((points[0].page_x, points[0].page_y), (0.0, 0.0));
        assert_eq!((points[1].page_x, points[1].page_y), (60.0, 60.0));
        assert!(points[0].element_selector.is_none());
    }

    #[test]
    fn test_scroll_histogram_bins() {
        let mut hist = ScrollHistogram::default();
        for p in [0, 9, 10, 19, 55, 100, 100] {
            hist.add(&scroll("/", p, p));
        }
        let depths: Vec<(u32, u64)> = hist
            .finish()
            .into_iter()
            .map(|b| (b.depth, b.count))
            .collect();
        assert_eq!(depths, vec![(0, 2), (10, 2), (50, 1), (100, 2)]);
    }

    #[test]
    fn test_page_rollup_pools_depth_samples() {
        let mut rollup = PageRollup::default();
        for e in [
            at("/docs", EventData::PageView(PageViewData::default())),
            scroll("/docs", 20, 20),
            scroll("/docs", 60, 60),
            scroll("/docs", 30, 61),
            click("/docs", 1.0, 1.0, "a"),
            at("/", EventData::PageView(PageViewData::default())),
        ] {
            rollup.add(&e);
        }

        let stats = rollup.finish();
        assert_eq!(stats[0].path, "/docs");
        assert_eq!(stats[0].views, 1);
        assert_eq!(stats[0].clicks, 1);
        assert_eq!(stats[0].avg_scroll_depth, 47);
        assert_eq!(stats[1].path, "/");
        assert_eq!(stats[1].avg_scroll_depth, 0);
    }

    #[test]
    fn test_element_ranking_order_and_cap() {
        let mut ranking = ElementRanking::default();
        for _ in 0..2 {
            ranking.add(&click("/", 0.0, 0.0, "a.nav-link"));
        }
        for _ in 0..5 {
            ranking.add(&click("/", 0.0, 0.0, "button#submit"));
        }
        for i in 0..60 {
            ranking.add(&click("/", 0.0, 0.0, &format!("li:nth-child({i})")));
        }

        let ranked = ranking.finish();
        assert_eq!(ranked.len(), TOP_ELEMENTS);
        assert_eq!(ranked[0].selector, "button#submit");
        assert_eq!(ranked[0].clicks, 5);
        assert_eq!(ranked[0].text, "button#submit text");
        assert_eq!(ranked[1].selector, "a.nav-link");
        assert_eq!(ranked[1].clicks, 2);
    }
}
