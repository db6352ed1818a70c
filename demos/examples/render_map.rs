// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw a small map and print it as SVG.
//!
//! Run:
//! - `cargo run -p sysmap_demos --example render_map > map.svg`

use futures::executor::block_on;
use sysmap::{Map, MapConfig, MapOptions, StaticImages};

const PAYLOAD: &str = r#"{
    "canvas": {"width": 480, "height": 260},
    "background": 20,
    "background_scale": 1,
    "show_timestamp": 1,
    "timestamp": "2025-06-01 09:30:00",
    "shapes": [
        {
            "sysmap_shapeid": "1", "type": 0, "x": 20, "y": 20, "width": 440, "height": 220,
            "border_type": 2, "border_width": 3, "border_color": "6B7A85",
            "text": "Data center", "text_halign": 1, "text_valign": 1, "font_color": "333333"
        }
    ],
    "elements": [
        {"selementid": "1", "x": 60, "y": 100, "width": 48, "height": 48, "icon": 1,
         "label": "core-router", "elementtype": 0, "elementid": "10084",
         "highlight": {"st": null, "hl": "E45959", "ack": 0}},
        {"selementid": "2", "x": 220, "y": 100, "icon": 2, "label": "switch-a",
         "label_location": 3, "latelyChanged": 1},
        {"selementid": "3", "x": 380, "y": 100, "icon": 2, "label": "switch-b",
         "label_location": 2, "permission": 0}
    ],
    "links": [
        {"linkid": "1", "selementid1": "1", "selementid2": "2", "drawtype": 2,
         "color": "00AA00", "label": "10G"},
        {"linkid": "2", "selementid1": "2", "selementid2": "3", "hover_link": 1,
         "links": [
            {"color": "00AA00", "label": "uplink 1"},
            {"color": "E45959", "label": "uplink 2"}
         ]}
    ]
}"#;

fn main() {
    let images = StaticImages::new()
        .with("imgstore.php?iconid=1", 48.0, 48.0)
        .with("imgstore.php?iconid=2", 32.0, 32.0)
        .with("imgstore.php?iconid=20", 1024.0, 768.0);
    let mut map = Map::new(MapConfig::default(), images);
    map.set_grid(40);

    let options = MapOptions::from_json(PAYLOAD).expect("payload parses");
    let damage = block_on(map.update(options, false)).expect("update succeeds");
    eprintln!(
        "first pass: {} added, {} changed, {} removed",
        damage.added.len(),
        damage.changed.len(),
        damage.removed.len()
    );

    println!("{}", map.to_svg());
}
