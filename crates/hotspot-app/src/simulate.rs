//! Synthetic traffic: real trackers driven over a scripted host and a
//! virtual DOM.
//!
//! Each visit lands on a small storefront page, moves the pointer, scrolls,
//! clicks (sometimes in frustrated bursts), fills a form field, follows one
//! client-side route change and leaves. Batches go to the ingestion endpoint
//! through [`HttpTransport`], or with `--dry-run` into a throwaway in-memory
//! store whose overview is printed.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use hotspot_api::ingest::parse_batch;
use hotspot_core::config::HotspotConfig;
use hotspot_core::types::{EpochMillis, ViewportSnapshot};
use hotspot_core::Result;
use hotspot_store::AnalyticsStore;
use hotspot_tracker::detectors::element_visibility::{tracked_elements, VISIBILITY_THRESHOLDS};
use hotspot_tracker::{
    ErrorReport, HistoryInterceptor, HttpTransport, IntersectionEntry, MemoryTransport,
    NavigationTiming, PointerInput, ScriptedHost, Tracker, Transport, VirtualNode,
};

use crate::cli::SimulateArgs;

const ORIGIN: &str = "https://shop.example";

/// 2024-01-01T00:00:00Z; visits are spaced ten minutes apart from here.
const EPOCH_START: EpochMillis = 1_704_067_200_000;

#[derive(Debug, Default)]
pub struct SimulationReport {
    pub sessions: usize,
    /// Only known for dry runs.
    pub batches: Option<usize>,
    pub events: Option<usize>,
}

/// The storefront every visit lands on.
struct Storefront {
    body: VirtualNode,
    targets: Vec<VirtualNode>,
    email: VirtualNode,
}

impl Storefront {
    fn build() -> Self {
        let body = VirtualNode::document();

        let header = body.append(VirtualNode::element("header").with_class("site-header"));
        let nav = header.append(VirtualNode::element("nav"));
        let mut targets: Vec<VirtualNode> = ["Home", "Pricing", "Docs"]
            .iter()
            .map(|label| {
                nav.append(
                    VirtualNode::element("a")
                        .with_class("nav-link")
                        .with_attr("href", &format!("/{}", label.to_lowercase()))
                        .with_text(label),
                )
            })
            .collect();

        let main = body.append(VirtualNode::element("main").with_id("content"));
        let card = main.append(VirtualNode::element("section").with_class("card"));
        targets.push(card.append(
            VirtualNode::element("button")
                .with_id("buy")
                .with_class("btn")
                .with_class("btn-primary")
                .with_text("Buy now"),
        ));
        targets.push(card.append(
            VirtualNode::element("button")
                .with_class("btn")
                .with_text("Add to cart"),
        ));

        let form = main.append(VirtualNode::element("form").with_attr("data-track", "newsletter"));
        let email = form.append(
            VirtualNode::element("input")
                .with_attr("type", "email")
                .with_attr("name", "email"),
        );
        targets.push(form.append(VirtualNode::element("button").with_text("Subscribe")));

        body.append(VirtualNode::element("footer").with_text("(c) Shop"));

        Self {
            body,
            targets,
            email,
        }
    }
}

fn page_timing(rng: &mut StdRng) -> NavigationTiming {
    let ttfb = rng.random_range(40.0..400.0);
    NavigationTiming {
        fetch_start: 1.0,
        domain_lookup_start: 2.0,
        domain_lookup_end: 14.0,
        connect_start: 14.0,
        connect_end: 38.0,
        request_start: 39.0,
        response_start: 39.0 + ttfb,
        dom_interactive: 120.0 + ttfb,
        dom_content_loaded_event_end: 260.0 + ttfb,
        load_event_end: 700.0 + ttfb,
        transfer_size: rng.random_range(8_000..90_000),
    }
}

/// Drive one visit from landing to page hide.
fn run_visit(
    index: usize,
    args: &SimulateArgs,
    config: &HotspotConfig,
    endpoint: &str,
    transport: Rc<dyn Transport>,
    rng: &mut StdRng,
) {
    let host = Rc::new(
        ScriptedHost::new(
            EPOCH_START + index as i64 * 600_000,
            &format!("{ORIGIN}/"),
        )
        .with_referrer("https://search.example/?q=shop"),
    );
    host.set_title("Shop");
    host.set_viewport(ViewportSnapshot {
        width: 1280.0,
        height: 720.0,
        doc_width: 1280.0,
        doc_height: 3_200.0,
        ..Default::default()
    });

    let mut tracker_config = config.tracker.clone();
    tracker_config.endpoint = endpoint.to_string();
    tracker_config.user_id = format!("visitor-{}", index % 5);

    let tracker = Rc::new(RefCell::new(Tracker::new(
        tracker_config,
        host.clone(),
        transport,
    )));
    let mut history = HistoryInterceptor::new(host.clone());
    Tracker::attach_history(&tracker, &mut history);

    let page = Storefront::build();
    {
        let mut t = tracker.borrow_mut();
        t.start();
        host.advance(800);
        t.on_load(Some(&page_timing(rng)));
        t.on_largest_contentful_paint(&[420.0, rng.random_range(600.0..2_400.0)]);

        let regions: Vec<IntersectionEntry<VirtualNode>> = tracked_elements(&page.body)
            .into_iter()
            .map(|target| IntersectionEntry {
                target,
                is_intersecting: true,
                intersection_ratio: VISIBILITY_THRESHOLDS
                    [rng.random_range(0..VISIBILITY_THRESHOLDS.len())],
            })
            .collect();
        t.on_intersections(&regions);
    }

    let route_change_at = args.clicks / 2;
    for n in 0..args.clicks {
        if n == route_change_at {
            host.advance(400);
            history.push_state(&format!("{ORIGIN}/pricing"));
            host.set_title("Pricing");
        }

        let mut t = tracker.borrow_mut();
        for _ in 0..rng.random_range(2..6) {
            host.advance(120);
            t.on_mouse_move(&PointerInput::at(
                rng.random_range(0.0..1_280.0),
                rng.random_range(0.0..720.0),
            ));
        }

        host.advance(rng.random_range(300..2_500));
        let scroll_y = rng.random_range(0.0..2_480.0);
        host.scroll_to(scroll_y);
        t.on_scroll();

        let target = &page.targets[rng.random_range(0..page.targets.len())];
        let (x, y) = (rng.random_range(40.0..1_240.0), rng.random_range(40.0..680.0));
        let input = PointerInput {
            client_x: x,
            client_y: y,
            page_x: x,
            page_y: y + scroll_y,
            button: 0,
        };
        if n == 1 {
            t.on_first_input(input.client_x, input.client_x + rng.random_range(1.0..40.0));
        }
        t.on_click(&input, target);

        // A frustrated burst on the same spot.
        if rng.random_bool(0.15) {
            for _ in 0..3 {
                host.advance(150);
                t.on_click(&input, target);
            }
        }
        t.tick();
    }

    let mut t = tracker.borrow_mut();
    host.advance(900);
    t.on_focus_in(&page.email);
    page.email.set_value("visitor@example.com");
    host.advance(3_200);
    t.on_focus_out(&page.email);

    if rng.random_bool(0.2) {
        t.on_error(ErrorReport {
            message: "TypeError: cart is undefined".to_string(),
            filename: Some(format!("{ORIGIN}/static/app.js")),
            line: Some(212),
            col: Some(17),
            stack: Some(
                "TypeError: cart is undefined\n    at addToCart (app.js:212:17)".to_string(),
            ),
        });
    }

    host.advance(1_000);
    t.on_visibility_change(true, "hidden");
    t.on_page_hide();
    info!(visit = index, session_id = %t.session_id(), "Visit finished");
}

/// Run `args.sessions` visits.
pub async fn run(args: &SimulateArgs, config: &HotspotConfig) -> Result<SimulationReport> {
    let endpoint = args.resolve_endpoint(config);
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut report = SimulationReport {
        sessions: args.sessions,
        ..Default::default()
    };

    if args.dry_run {
        let transport = Rc::new(MemoryTransport::new());
        for index in 0..args.sessions {
            run_visit(index, args, config, &endpoint, transport.clone(), &mut rng);
        }

        let store = AnalyticsStore::in_memory(config.store.max_events);
        let payloads = transport.take();
        let mut events = 0;
        for (n, payload) in payloads.iter().enumerate() {
            match parse_batch(payload, EPOCH_START) {
                Ok(parsed) => events += store.add_events(&parsed.batch)?.accepted,
                Err(e) => warn!(batch = n, error = %e, "Simulated batch did not validate"),
            }
        }
        report.batches = Some(payloads.len());
        report.events = Some(events);

        println!("{}", serde_json::to_string_pretty(&store.overview()?)?);
    } else {
        info!(endpoint = %endpoint, sessions = args.sessions, "Simulating traffic");
        let transport = Rc::new(HttpTransport::new());
        for index in 0..args.sessions {
            run_visit(index, args, config, &endpoint, transport.clone(), &mut rng);
        }
        transport.settle().await;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotspot_tracker::describe;

    fn args(sessions: usize, clicks: usize) -> SimulateArgs {
        SimulateArgs {
            endpoint: None,
            sessions,
            clicks,
            seed: 11,
            dry_run: true,
        }
    }

    #[test]
    fn test_storefront_targets() {
        let page = Storefront::build();
        assert_eq!(page.targets.len(), 6);
        assert!(!tracked_elements(&page.body).is_empty());

        let buy = describe(&page.targets[3]);
        assert_eq!(buy.id.as_deref(), Some("buy"));
        assert_eq!(buy.classes, vec!["btn".to_string(), "btn-primary".to_string()]);
    }

    #[tokio::test]
    async fn test_dry_run_ingests_every_batch() {
        let report = run(&args(2, 6), &HotspotConfig::default()).await.unwrap();
        assert_eq!(report.sessions, 2);
        assert!(report.batches.unwrap() >= 2);
        assert!(report.events.unwrap() > 2 * 6);
    }

    #[test]
    fn test_visit_reaches_second_route() {
        let transport = Rc::new(MemoryTransport::new());
        let mut rng = StdRng::seed_from_u64(3);
        run_visit(
            0,
            &args(1, 4),
            &HotspotConfig::default(),
            "/api/tracking",
            transport.clone(),
            &mut rng,
        );

        let paths: Vec<String> = transport
            .take_batches()
            .into_iter()
            .flat_map(|b| b.events)
            .map(|e| e.path)
            .collect();
        assert!(paths.iter().any(|p| p == "/"));
        assert!(paths.iter().any(|p| p == "/pricing"));
    }
}
