// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated refresh ticks and the damage each one produces.
//!
//! The first tick draws everything, the second is identical and touches nothing,
//! the third changes one link color and drops one element, and the fourth
//! reorders elements, which makes a live refresh redraw the whole element set.
//!
//! Run:
//! - `cargo run -p sysmap_demos --example live_refresh`

use futures::executor::block_on;
use serde_json::{Value, json};
use sysmap::{Map, MapConfig, MapOptions, StaticImages};

fn tick(map: &mut Map<StaticImages>, name: &str, payload: Value) {
    let options: MapOptions = serde_json::from_value(payload).expect("payload parses");
    let damage = block_on(map.update(options, false)).expect("update succeeds");
    println!(
        "{name:>10}: +{} ~{} -{} | {} elements, {} links",
        damage.added.len(),
        damage.changed.len(),
        damage.removed.len(),
        map.elements().count(),
        map.links().count()
    );
}

fn payload(link_color: &str, with_third: bool, first_zindex: i64) -> Value {
    let mut elements = vec![
        json!({"selementid": "1", "x": 20, "y": 20, "icon": 1, "label": "a", "zindex": first_zindex}),
        json!({"selementid": "2", "x": 120, "y": 20, "icon": 1, "label": "b", "zindex": 1}),
    ];
    let mut links = vec![json!({
        "linkid": "1", "selementid1": "1", "selementid2": "2", "color": link_color
    })];
    if with_third {
        elements.push(json!({"selementid": "3", "x": 220, "y": 20, "icon": 1, "label": "c", "zindex": 2}));
        links.push(json!({"linkid": "2", "selementid1": "2", "selementid2": "3"}));
    }
    json!({"caller": "refresh", "elements": elements, "links": links})
}

fn main() {
    let images = StaticImages::new().with("imgstore.php?iconid=1", 24.0, 24.0);
    let mut map = Map::new(MapConfig::default(), images);

    tick(&mut map, "initial", payload("000000", true, 0));
    tick(&mut map, "identical", payload("000000", true, 0));
    tick(&mut map, "shrink", payload("FF0000", false, 0));
    tick(&mut map, "reorder", payload("FF0000", false, 5));
}
