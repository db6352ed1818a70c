// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sysmap: a declarative reconciler for network maps.
//!
//! A host periodically hands the [`Map`] a [`MapOptions`] payload describing
//! elements, links, shapes, and the background. The map diffs every node against
//! what it applied last time and only touches the retained [`Canvas`] where
//! something changed.
//!
//! - Shapes are static rectangles, ellipses, and lines with clipped text.
//! - Links connect element centers, or two host-group areas.
//! - Elements draw an icon, a label, a problem highlight, recently-changed
//!   markers, and a selection ring.
//!
//! Every icon is preloaded through an [`ImageSource`] before anything is drawn,
//! because element geometry comes from the natural icon size.
//!
//! ## Minimal example
//!
//! ```
//! use futures::executor::block_on;
//! use sysmap::{Map, MapConfig, MapOptions, StaticImages};
//!
//! let images = StaticImages::new().with("imgstore.php?iconid=1", 24.0, 24.0);
//! let mut map = Map::new(MapConfig::default(), images);
//!
//! let options = MapOptions::from_json(r#"{
//!     "elements": [
//!         {"selementid": "1", "x": 10, "y": 10, "icon": 1, "label": "core"},
//!         {"selementid": "2", "x": 200, "y": 10, "icon": 1, "label": "edge"}
//!     ],
//!     "links": [{"linkid": "1", "selementid1": "1", "selementid2": "2", "color": "00AA00"}]
//! }"#).unwrap();
//!
//! let damage = block_on(map.update(options.clone(), false)).unwrap();
//! assert!(!damage.is_empty());
//!
//! // Re-applying the same payload touches nothing.
//! let damage = block_on(map.update(options, false)).unwrap();
//! assert!(damage.is_empty());
//! ```
//!
//! ## Tracing
//!
//! Update passes, invalidations, node removal, and image loading are reported
//! through `tracing` at `debug` level, per-node redraws at `trace` level.

mod config;
mod diff;
mod element;
mod error;
mod image;
mod lenient;
mod link;
mod map;
mod options;
mod shape;
mod text;

pub use config::{CanvasSize, MapConfig, Theme};
pub use diff::is_changed;
pub use element::{ElementNode, LabelPlacement, Listeners, ResolvedElement, SelectEvent};
pub use error::{Error, Result};
pub use image::{ImageCache, ImageSource, StaticImages};
pub use link::{LinkNode, ResolvedLink};
pub use map::{Collection, Map};
pub use options::{
    BackgroundScale, BorderType, ElementOptions, ElementType, ElementUrl, HAlign, Highlight,
    ImageId, LabelLocation, LabelType, LinkDrawType, LinkId, LinkOptions, LinkSummary, MapOptions,
    Permission, SelementId, ShapeId, ShapeOptions, ShapeType, ShowLabel, VAlign,
    correct_zindexes,
};
pub use shape::{ResolvedShape, ShapeNode, ShapeText, Stroke};
pub use sysmap_scene::{Canvas, Damage, NodeId};
