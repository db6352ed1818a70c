// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update payloads as the backend sends them.
//!
//! These types are deliberately loose: every collection is optional so partial
//! updates are expressible, and numbers, ids, and flags accept the string
//! encodings used on the wire. Normalization into draw-ready values happens in
//! the node modules.

use core::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{CanvasSize, Theme};
use crate::error::Result;
use crate::lenient;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the raw id.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
                lenient::id(d).map(Self)
            }
        }
    };
}

string_id!(
    /// Stable identity of a map element (`selementid`).
    SelementId
);
string_id!(
    /// Stable identity of a link (`linkid`).
    LinkId
);
string_id!(
    /// Stable identity of a shape (`sysmap_shapeid`).
    ShapeId
);

/// Opaque image id; `0` means "no image".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ImageId(pub u64);

impl ImageId {
    /// Returns true for the "no image" sentinel.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ImageId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
        let n = lenient::int(d)?;
        u64::try_from(n)
            .map(Self)
            .map_err(|_| D::Error::custom(format!("negative image id {n}")))
    }
}

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Numeric code used on the wire.
            pub const fn code(self) -> i64 {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            /// Variant for a wire code.
            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
                s.serialize_i64(self.code())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
                let code = lenient::int(d)?;
                Self::from_code(code).ok_or_else(|| {
                    D::Error::custom(format!(concat!("unknown ", stringify!($name), " code {}"), code))
                })
            }
        }
    };
}

code_enum!(
    /// What a map element stands for.
    #[derive(Default)]
    ElementType {
        /// A monitored host.
        Host = 0,
        /// A nested map.
        Map = 1,
        /// A trigger.
        Trigger = 2,
        /// A host group.
        HostGroup = 3,
        /// A bare decorative image.
        #[default]
        Image = 4,
    }
);

code_enum!(
    /// Requested label placement relative to the icon.
    #[derive(Default)]
    LabelLocation {
        /// Inherit the map-wide setting.
        #[default]
        Default = -1,
        /// Centered below the icon.
        Bottom = 0,
        /// Right-aligned to the left of the icon.
        Left = 1,
        /// Left-aligned to the right of the icon.
        Right = 2,
        /// Centered above the icon.
        Top = 3,
    }
);

code_enum!(
    /// Label visibility mode.
    #[derive(Default)]
    ShowLabel {
        /// Inherit the map-wide setting.
        #[default]
        Default = -1,
        /// Hidden until the pointer hovers the icon.
        AutoHide = 0,
        /// Always shown.
        Always = 1,
    }
);

code_enum!(
    /// Map-wide label content selector.
    LabelType {
        /// Element label.
        Label = 0,
        /// Host IP address.
        IpAddress = 1,
        /// Element name.
        Name = 2,
        /// Status only.
        Status = 3,
        /// No label at all.
        Nothing = 4,
        /// Custom label text.
        Custom = 5,
    }
);

code_enum!(
    /// Link line style.
    #[derive(Default)]
    LinkDrawType {
        /// Thin solid line.
        #[default]
        Line = 0,
        /// Thick solid line.
        Bold = 2,
        /// Dotted line.
        Dotted = 3,
        /// Dashed line.
        Dashed = 4,
    }
);

code_enum!(
    /// Shape geometry.
    ShapeType {
        /// Axis-aligned rectangle.
        Rectangle = 0,
        /// Ellipse inscribed in the shape box.
        Ellipse = 1,
        /// Line from `(x, y)` to `(width, height)`.
        Line = 2,
    }
);

code_enum!(
    /// Shape border style.
    #[derive(Default)]
    BorderType {
        /// No border.
        None = 0,
        /// Solid border.
        #[default]
        Solid = 1,
        /// Dotted border.
        Dotted = 2,
        /// Dashed border.
        Dashed = 3,
    }
);

code_enum!(
    /// Horizontal alignment of shape text.
    #[derive(Default)]
    HAlign {
        /// Centered.
        #[default]
        Center = 0,
        /// Left edge.
        Left = 1,
        /// Right edge.
        Right = 2,
    }
);

code_enum!(
    /// Vertical alignment of shape text.
    #[derive(Default)]
    VAlign {
        /// Centered.
        #[default]
        Middle = 0,
        /// Top edge.
        Top = 1,
        /// Bottom edge.
        Bottom = 2,
    }
);

code_enum!(
    /// How the background image is fitted to the canvas.
    #[derive(Default)]
    BackgroundScale {
        /// Natural image size anchored at the origin.
        #[default]
        Natural = 0,
        /// Scaled to cover the whole canvas.
        Cover = 1,
    }
);

code_enum!(
    /// Viewer permission on the object behind an element.
    #[derive(Default)]
    Permission {
        /// No access.
        Deny = 0,
        /// Read-only access.
        #[default]
        Read = 2,
        /// Read-write access.
        ReadWrite = 3,
    }
);

/// Root update payload.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MapOptions {
    /// Present when the update comes from a live refresh; enables top-level invalidation checks.
    #[serde(default)]
    pub caller: Option<String>,
    /// New canvas size.
    #[serde(default)]
    pub canvas: Option<CanvasSize>,
    /// New color palette.
    #[serde(default)]
    pub theme: Option<Theme>,
    /// Map elements.
    #[serde(default)]
    pub elements: Option<Vec<ElementOptions>>,
    /// Links.
    #[serde(default)]
    pub links: Option<Vec<LinkOptions>>,
    /// Additional links sharing an element pair, reconciled together with `links`.
    #[serde(default)]
    pub duplicated_links: Option<Vec<LinkOptions>>,
    /// Shapes.
    #[serde(default)]
    pub shapes: Option<Vec<ShapeOptions>>,
    /// Background image; `0` removes it.
    #[serde(default)]
    pub background: Option<ImageId>,
    /// Background fitting mode.
    #[serde(default)]
    pub background_scale: Option<BackgroundScale>,
    /// Map-wide label placement inherited by elements using [`LabelLocation::Default`].
    #[serde(default)]
    pub label_location: Option<LabelLocation>,
    /// Map-wide label visibility inherited by elements using [`ShowLabel::Default`].
    #[serde(default)]
    pub show_element_label: Option<ShowLabel>,
    /// Map-wide label content selector.
    #[serde(default)]
    pub label_type: Option<LabelType>,
    /// Whether to render the timestamp footer.
    #[serde(default, deserialize_with = "lenient::opt_flag")]
    pub show_timestamp: Option<bool>,
    /// Timestamp footer text.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl MapOptions {
    /// Parse a JSON payload.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Regular and duplicated links in payload order, or `None` if neither was supplied.
    pub fn all_links(&self) -> Option<Vec<&LinkOptions>> {
        if self.links.is_none() && self.duplicated_links.is_none() {
            return None;
        }
        Some(
            self.links
                .iter()
                .chain(self.duplicated_links.iter())
                .flatten()
                .collect(),
        )
    }
}

fn default_label_location() -> Option<LabelLocation> {
    Some(LabelLocation::Default)
}

/// One map element as sent by the backend.
#[derive(Clone, Debug, Deserialize)]
pub struct ElementOptions {
    /// Identity.
    pub selementid: SelementId,
    /// Identity this element had before an in-place id migration; links naming it still attach.
    #[serde(default)]
    pub selementid_orig: Option<SelementId>,
    /// Declared top-left x.
    #[serde(deserialize_with = "lenient::int")]
    pub x: i64,
    /// Declared top-left y.
    #[serde(deserialize_with = "lenient::int")]
    pub y: i64,
    /// Declared width; only used to keep the icon centered.
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub width: Option<i64>,
    /// Declared height; only used to keep the icon centered.
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub height: Option<i64>,
    /// Icon image id.
    pub icon: ImageId,
    /// Resolved label text.
    #[serde(default)]
    pub label: Option<String>,
    /// Label placement; JSON `null` means no placement.
    #[serde(default = "default_label_location")]
    pub label_location: Option<LabelLocation>,
    /// Label visibility.
    #[serde(default)]
    pub show_label: ShowLabel,
    /// Element kind.
    #[serde(default)]
    pub elementtype: ElementType,
    /// Id of the host or host group behind the element.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub elementid: Option<String>,
    /// Problem highlight.
    #[serde(default)]
    pub highlight: Option<Highlight>,
    /// Whether the underlying state changed recently.
    #[serde(default, rename = "latelyChanged", deserialize_with = "lenient::flag")]
    pub lately_changed: bool,
    /// Context-menu descriptor, passed through to the host untouched.
    #[serde(default)]
    pub actions: Option<serde_json::Value>,
    /// Viewer permission level.
    #[serde(default)]
    pub permission: Permission,
    /// Configured element URLs.
    #[serde(default)]
    pub urls: Vec<ElementUrl>,
    /// Stacking order.
    #[serde(default, deserialize_with = "lenient::int")]
    pub zindex: i64,
}

/// Problem highlight of an element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Highlight {
    /// Status fill color (hex without `#`).
    #[serde(default)]
    pub st: Option<String>,
    /// Halo color (hex without `#`).
    #[serde(default)]
    pub hl: Option<String>,
    /// Whether the problem is acknowledged.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub ack: bool,
}

/// A URL configured on an element.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ElementUrl {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Target.
    #[serde(default)]
    pub url: String,
}

fn default_link_color() -> String {
    String::from("000000")
}

/// One link as sent by the backend.
#[derive(Clone, Debug, Deserialize)]
pub struct LinkOptions {
    /// Identity.
    pub linkid: LinkId,
    /// First endpoint.
    pub selementid1: SelementId,
    /// Second endpoint.
    pub selementid2: SelementId,
    /// Line style.
    #[serde(default)]
    pub drawtype: LinkDrawType,
    /// Line color (hex without `#`).
    #[serde(default = "default_link_color")]
    pub color: String,
    /// Inline label.
    #[serde(default)]
    pub label: Option<String>,
    /// Render as an invisible hit region with a hint box instead of a visible line.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub hover_link: bool,
    /// Logical links collapsed into this edge, listed in the hint box.
    #[serde(default)]
    pub links: Vec<LinkSummary>,
}

impl LinkOptions {
    /// Returns true if the link touches `id`, in either direction.
    pub fn touches(&self, id: &SelementId) -> bool {
        &self.selementid1 == id || &self.selementid2 == id
    }
}

/// One logical link listed in a hover hint box.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkSummary {
    /// Swatch color (hex without `#`).
    #[serde(default = "default_link_color")]
    pub color: String,
    /// Label text.
    #[serde(default)]
    pub label: String,
}

fn default_font() -> i64 {
    9
}

fn default_font_size() -> i64 {
    11
}

fn default_border_width() -> i64 {
    1
}

/// One shape as sent by the backend.
#[derive(Clone, Debug, Deserialize)]
pub struct ShapeOptions {
    /// Identity.
    pub sysmap_shapeid: ShapeId,
    /// Raw geometry code, see [`ShapeType`]; validated during normalization.
    #[serde(rename = "type", default, deserialize_with = "lenient::int")]
    pub shape_type: i64,
    /// Left (or line start x).
    #[serde(default, deserialize_with = "lenient::int")]
    pub x: i64,
    /// Top (or line start y).
    #[serde(default, deserialize_with = "lenient::int")]
    pub y: i64,
    /// Width (or line end x).
    #[serde(default, deserialize_with = "lenient::int")]
    pub width: i64,
    /// Height (or line end y).
    #[serde(default, deserialize_with = "lenient::int")]
    pub height: i64,
    /// Text drawn inside the shape.
    #[serde(default)]
    pub text: Option<String>,
    /// Font family index.
    #[serde(default = "default_font", deserialize_with = "lenient::int")]
    pub font: i64,
    /// Font size in pixels.
    #[serde(default = "default_font_size", deserialize_with = "lenient::int")]
    pub font_size: i64,
    /// Font color (hex without `#`).
    #[serde(default)]
    pub font_color: String,
    /// Horizontal text alignment.
    #[serde(default)]
    pub text_halign: HAlign,
    /// Vertical text alignment.
    #[serde(default)]
    pub text_valign: VAlign,
    /// Border style.
    #[serde(default)]
    pub border_type: BorderType,
    /// Border width in pixels.
    #[serde(default = "default_border_width", deserialize_with = "lenient::int")]
    pub border_width: i64,
    /// Border color (hex without `#`).
    #[serde(default)]
    pub border_color: String,
    /// Fill color (hex without `#`).
    #[serde(default)]
    pub background_color: String,
    /// Stacking order.
    #[serde(default, deserialize_with = "lenient::int")]
    pub zindex: i64,
}

/// Reassign sequential element z-indexes.
///
/// Elements are ordered by numeric `zindex`, ties broken by comparing `selementid`
/// as strings (new elements carry ids like `new0`), and then numbered from zero.
/// Maps imported with all-zero or arbitrary z-indexes come out with a dense, stable order.
pub fn correct_zindexes(elements: &mut [ElementOptions]) {
    let mut order: Vec<usize> = (0..elements.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&elements[a], &elements[b]);
        a.zindex
            .cmp(&b.zindex)
            .then_with(|| a.selementid.cmp(&b.selementid))
    });
    for (zindex, idx) in (0_i64..).zip(order) {
        elements[idx].zindex = zindex;
    }
}
