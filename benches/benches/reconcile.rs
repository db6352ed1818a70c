// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use futures::executor::block_on;
use serde_json::{Value, json};
use sysmap::{Map, MapConfig, MapOptions, StaticImages};

const ICONS: u64 = 8;

fn images() -> StaticImages {
    (1..=ICONS).fold(StaticImages::new(), |images, id| {
        images.with(format!("imgstore.php?iconid={id}"), 24.0, 24.0)
    })
}

/// An `n`×`n` grid of elements, each linked to its right and lower neighbor.
fn grid_payload(n: usize, color: &str) -> Value {
    let mut elements = Vec::with_capacity(n * n);
    let mut links = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let id = y * n + x;
            elements.push(json!({
                "selementid": id.to_string(),
                "x": x * 80,
                "y": y * 80,
                "icon": (id as u64 % ICONS) + 1,
                "label": format!("node {id}"),
                "elementtype": 0,
                "zindex": id
            }));
            if x + 1 < n {
                links.push(json!({
                    "linkid": format!("h{id}"),
                    "selementid1": id.to_string(),
                    "selementid2": (id + 1).to_string(),
                    "color": color
                }));
            }
            if y + 1 < n {
                links.push(json!({
                    "linkid": format!("v{id}"),
                    "selementid1": id.to_string(),
                    "selementid2": (id + n).to_string(),
                    "color": color
                }));
            }
        }
    }
    json!({
        "canvas": {"width": n * 80, "height": n * 80},
        "elements": elements,
        "links": links
    })
}

fn payload(value: &Value) -> MapOptions {
    serde_json::from_value(value.clone()).expect("valid payload")
}

fn drawn_map(value: &Value) -> Map<StaticImages> {
    let mut map = Map::new(MapConfig::default(), images());
    block_on(map.update(payload(value), false)).expect("initial update");
    map
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    for &n in &[8_usize, 16, 32] {
        let base = grid_payload(n, "000000");
        let recolored = grid_payload(n, "FF0000");
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("initial_draw_{n}x{n}"), |b| {
            b.iter_batched(
                || (Map::new(MapConfig::default(), images()), payload(&base)),
                |(mut map, options)| {
                    let damage = block_on(map.update(options, false)).expect("update");
                    black_box(damage.len());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("noop_refresh_{n}x{n}"), |b| {
            b.iter_batched(
                || (drawn_map(&base), payload(&base)),
                |(mut map, options)| {
                    let damage = block_on(map.update(options, false)).expect("update");
                    assert!(damage.is_empty(), "identical payload must not redraw");
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("recolor_links_{n}x{n}"), |b| {
            b.iter_batched(
                || (drawn_map(&base), payload(&recolored)),
                |(mut map, options)| {
                    let damage = block_on(map.update(options, false)).expect("update");
                    black_box(damage.len());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_svg(c: &mut Criterion) {
    let map = drawn_map(&grid_payload(16, "000000"));
    c.bench_function("to_svg_16x16", |b| b.iter(|| black_box(map.to_svg().len())));
}

criterion_group!(benches, bench_reconcile, bench_svg);
criterion_main!(benches);
