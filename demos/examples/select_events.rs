// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer routing: hover reveals auto-hidden labels, clicks select elements.
//!
//! Run:
//! - `cargo run -p sysmap_demos --example select_events`

use futures::executor::block_on;
use kurbo::Point;
use sysmap::{Map, MapConfig, MapOptions, SelectEvent, SelementId, StaticImages};

fn main() {
    let images = StaticImages::new().with("imgstore.php?iconid=1", 32.0, 32.0);
    let config = MapConfig {
        can_select_element: true,
        ..MapConfig::default()
    };
    let mut map = Map::new(config, images);

    let options = MapOptions::from_json(
        r#"{
            "show_element_label": 0,
            "elements": [
                {"selementid": "1", "x": 0, "y": 0, "icon": 1, "label": "web-01",
                 "elementtype": 0, "elementid": "10101"},
                {"selementid": "2", "x": 100, "y": 0, "icon": 1, "label": "Linux servers",
                 "elementtype": 3, "elementid": "2"}
            ]
        }"#,
    )
    .expect("payload parses");
    block_on(map.update(options, false)).expect("update succeeds");

    let web = SelementId::from("1");
    let label = map
        .element(&web)
        .and_then(|e| e.label_node())
        .expect("label drawn");

    println!("label visible at rest: {}", map.canvas().is_visible(label));
    map.pointer_move(Point::new(16.0, 16.0));
    println!("label visible on hover: {}", map.canvas().is_visible(label));
    map.pointer_move(Point::new(60.0, 200.0));
    println!("label visible after leave: {}", map.canvas().is_visible(label));
    let damage = map.commit();
    println!("hover damage: {} changed nodes", damage.changed.len());

    for pt in [Point::new(16.0, 16.0), Point::new(116.0, 16.0), Point::new(60.0, 60.0)] {
        match map.click(pt) {
            Some(event) => print_event(&event),
            None => println!("click at {pt:?}: nothing selectable"),
        }
    }
    println!("selected: {:?}", map.selected());
}

fn print_event(event: &SelectEvent) {
    println!(
        "{}: {}",
        SelectEvent::NAME,
        serde_json::to_string(event).expect("event serializes")
    );
}
