// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: node identifiers, flags, layers, and drawables.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use kurbo::Rect;

/// Identifier for a node in the scene.
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `NodeId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// Use [`Canvas::is_alive`](crate::Canvas::is_alive) to check whether a `NodeId` still refers to a live node.
/// Stale `NodeId`s never alias a different live node because the generation must match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Node flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible (painted, serialized without `display="none"`).
        const VISIBLE  = 0b0000_0001;
        /// Node is pickable (participates in hit testing).
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE
    }
}

/// Drawing layers, listed in paint order (first is painted first).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Layer {
    /// Canvas fill and the optional background image.
    Background,
    /// Editor grid.
    Grid,
    /// Static decorations.
    Shapes,
    /// Links and map elements.
    Elements,
    /// Fixed-position marks such as the timestamp footer.
    Marks,
}

impl Layer {
    /// All layers in paint order.
    pub const ALL: [Self; 5] = [
        Self::Background,
        Self::Grid,
        Self::Shapes,
        Self::Elements,
        Self::Marks,
    ];

    pub(crate) const fn idx(self) -> usize {
        self as usize
    }

    /// Class name emitted on the layer group.
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Background => "map-background",
            Self::Grid => "map-grid",
            Self::Shapes => "map-shapes",
            Self::Elements => "map-elements",
            Self::Marks => "map-marks",
        }
    }
}

/// SVG element kinds the scene knows how to emit.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Tag {
    /// `<g>`
    Group,
    /// `<image>`
    Image,
    /// `<rect>`
    Rect,
    /// `<ellipse>`
    Ellipse,
    /// `<line>`
    Line,
    /// `<path>`
    Path,
    /// `<text>`
    Text,
    /// `<tspan>`
    Tspan,
    /// `<clipPath>`
    ClipPath,
}

impl Tag {
    /// SVG element name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Group => "g",
            Self::Image => "image",
            Self::Rect => "rect",
            Self::Ellipse => "ellipse",
            Self::Line => "line",
            Self::Path => "path",
            Self::Text => "text",
            Self::Tspan => "tspan",
            Self::ClipPath => "clipPath",
        }
    }
}

/// Attribute set of a drawable, ordered by name for deterministic output.
pub type Attributes = BTreeMap<String, String>;

/// Content of a scene node.
///
/// A `Drawable` may carry `children`; they are inserted as child nodes together
/// with their parent, after which the stored drawable keeps an empty child list.
#[derive(Clone, Debug, PartialEq)]
pub struct Drawable {
    /// Element kind.
    pub tag: Tag,
    /// SVG attributes.
    pub attributes: Attributes,
    /// Text content (for `text`/`tspan`).
    pub text: Option<String>,
    /// World-space bounds used for hit testing. `None` never hits.
    pub bounds: Option<Rect>,
    /// Visibility and picking flags.
    pub flags: NodeFlags,
    /// Child drawables inserted along with this one.
    pub children: Vec<Drawable>,
}

impl Drawable {
    /// Create an empty drawable of the given kind.
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: Attributes::new(),
            text: None,
            bounds: None,
            flags: NodeFlags::default(),
            children: Vec::new(),
        }
    }

    /// Set an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl ToString) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Set an attribute when `value` is present.
    #[must_use]
    pub fn attr_opt(self, name: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// Set text content.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set hit-test bounds.
    #[must_use]
    pub fn bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Replace flags.
    #[must_use]
    pub fn flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Append a child drawable.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Look up an attribute value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
