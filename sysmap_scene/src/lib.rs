// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sysmap Scene: a Kurbo-native retained SVG scene.
//!
//! This is the drawing surface that the map reconciler in the `sysmap` crate mutates.
//!
//! - Five fixed layers ([`Layer`]) in paint order: background, grid, shapes, elements, marks.
//! - Typed drawable nodes ([`Drawable`], [`Tag`]) addressed by generational handles ([`NodeId`]).
//! - Batched mutations with a [`Canvas::commit`] step that yields the [`Damage`] since the previous commit.
//! - Point hit testing in paint order honoring [`NodeFlags`].
//! - Serialization to an SVG document with [`Canvas::to_svg`].
//!
//! The scene does not decide what to draw; it only retains it. Setters compare
//! against the current value and report whether anything changed, so a caller
//! that re-applies identical content produces empty damage.
//!
//! ## API overview
//!
//! - [`Canvas::insert`] / [`Canvas::insert_before`] → [`NodeId`]
//! - [`Canvas::set_attributes`], [`Canvas::set_text`], [`Canvas::set_visible`], [`Canvas::set_bounds`]
//! - [`Canvas::replace`] keeps the sibling position and yields a fresh handle.
//! - [`Canvas::patch`] updates a subtree in place when its structure matches, else replaces it.
//! - [`Canvas::remove`] drops a node and its subtree; stale handles are ignored by every setter.
//! - [`Canvas::hit_test`] returns the topmost visible, pickable node and its path.
//!
//! ## Example
//!
//! ```rust
//! use sysmap_scene::{Canvas, Drawable, Layer, NodeFlags, Tag};
//! use kurbo::{Point, Rect};
//!
//! let mut canvas = Canvas::new(200.0, 100.0);
//! let icon = canvas.insert(
//!     canvas.layer(Layer::Elements),
//!     Drawable::new(Tag::Image)
//!         .attr("href", "imgstore.php?iconid=7")
//!         .bounds(Rect::new(10.0, 10.0, 42.0, 42.0))
//!         .flags(NodeFlags::VISIBLE | NodeFlags::PICKABLE),
//! );
//!
//! let damage = canvas.commit();
//! assert_eq!(damage.added, vec![icon]);
//!
//! // Re-applying the same content is not a change.
//! let attrs = canvas.get(icon).unwrap().attributes.clone();
//! assert!(!canvas.set_attributes(icon, attrs));
//! assert!(canvas.commit().is_empty());
//!
//! assert_eq!(canvas.hit_test(Point::new(20.0, 20.0)).unwrap().node, icon);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod canvas;
mod damage;
mod svg;
mod types;

pub use canvas::{Canvas, Hit};
pub use damage::Damage;
pub use types::{Attributes, Drawable, Layer, NodeFlags, NodeId, Tag};
