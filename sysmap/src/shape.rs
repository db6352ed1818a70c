// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Static decorations: rectangles, ellipses, and lines with optional clipped text.

use std::sync::LazyLock;

use kurbo::Point;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use sysmap_scene::{Canvas, Drawable, Layer, NodeId, Tag};
use tracing::trace;

use crate::diff::is_changed;
use crate::error::{Error, Result};
use crate::options::{BorderType, HAlign, ShapeId, ShapeOptions, ShapeType, VAlign};
use crate::text::{HAnchor, TextBlock, VAnchor};

const TEXT_PADDING: f64 = 4.0;

const FONTS: [&str; 13] = [
    "Georgia, serif",
    "\"Palatino Linotype\", \"Book Antiqua\", Palatino, serif",
    "\"Times New Roman\", Times, serif",
    "Arial, Helvetica, sans-serif",
    "\"Arial Black\", Gadget, sans-serif",
    "\"Comic Sans MS\", cursive, sans-serif",
    "Impact, Charcoal, sans-serif",
    "\"Lucida Sans Unicode\", \"Lucida Grande\", sans-serif",
    "Tahoma, Geneva, sans-serif",
    "\"Trebuchet MS\", Helvetica, sans-serif",
    "Verdana, Geneva, sans-serif",
    "\"Courier New\", Courier, monospace",
    "\"Lucida Console\", Monaco, monospace",
];

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9A-Fa-f]{6}$").expect("hex color pattern is valid"));

/// `#rrggbb` for a well-formed hex color, `None` for anything else.
pub(crate) fn hex_color(raw: &str) -> Option<String> {
    let raw = raw.trim();
    HEX_COLOR.is_match(raw).then(|| format!("#{raw}"))
}

/// Dash pattern for a border style at `width`, and whether dots get round caps.
///
/// Pattern units scale with the stroke width. Past a width of 2 a dot unit stays
/// `1` with round caps, and the round caps eat one stroke width of every gap.
pub(crate) fn dash_pattern(border: BorderType, width: i64) -> (Option<String>, bool) {
    let base: &[i64] = match border {
        BorderType::Dotted => &[1, 2],
        BorderType::Dashed => &[4, 4],
        BorderType::None | BorderType::Solid => return (None, false),
    };
    let round = width > 2 && base.contains(&1);
    let values: Vec<String> = base
        .iter()
        .enumerate()
        .map(|(i, &v)| match (round, v, i % 2) {
            (true, 1, _) => 1,
            (true, _, 1) => v * width - width,
            _ => v * width,
        })
        .map(|v| v.to_string())
        .collect();
    (Some(values.join(",")), round)
}

/// Border paint of a shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Stroke {
    /// `#rrggbb` or `none`.
    pub color: String,
    /// Stroke width in pixels.
    pub width: i64,
    /// `stroke-dasharray` value.
    pub dasharray: Option<String>,
    /// Whether line caps are rounded.
    pub round_caps: bool,
}

impl Stroke {
    fn none() -> Self {
        Self {
            color: String::from("none"),
            width: 0,
            dasharray: None,
            round_caps: false,
        }
    }

    fn resolve(border: BorderType, width: i64, color: &str) -> Self {
        let Some(color) = hex_color(color) else {
            return Self::none();
        };
        if border == BorderType::None || width <= 0 {
            return Self::none();
        }
        let (dasharray, round_caps) = dash_pattern(border, width);
        Self {
            color,
            width,
            dasharray,
            round_caps,
        }
    }

    fn apply(&self, d: Drawable) -> Drawable {
        let d = d
            .attr("stroke", &self.color)
            .attr("stroke-width", self.width)
            .attr_opt("stroke-dasharray", self.dasharray.as_ref());
        if self.round_caps {
            d.attr("stroke-linecap", "round")
        } else {
            d
        }
    }
}

/// Text drawn inside a rectangle or ellipse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShapeText {
    /// Content; lines are split on newlines.
    pub text: String,
    /// CSS font family list.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: i64,
    /// `#rrggbb`; malformed input resolves to black.
    pub color: String,
    /// Horizontal alignment.
    pub halign: HAlign,
    /// Vertical alignment.
    pub valign: VAlign,
}

/// Draw-ready shape attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedShape {
    /// Geometry.
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    /// Left (line: start x).
    pub x: i64,
    /// Top (line: start y).
    pub y: i64,
    /// Width (line: end x).
    pub width: i64,
    /// Height (line: end y).
    pub height: i64,
    /// `#rrggbb` fill; `None` paints no fill. Always `None` for lines.
    pub fill: Option<String>,
    /// Border paint.
    pub stroke: Stroke,
    /// Text; always `None` for lines. Serialized as `null` when absent.
    pub text: Option<ShapeText>,
}

impl ResolvedShape {
    /// Normalize a payload. Fails on an unknown geometry code.
    pub fn resolve(raw: &ShapeOptions) -> Result<Self> {
        let shape_type =
            ShapeType::from_code(raw.shape_type).ok_or_else(|| Error::InvalidShapeType {
                shapeid: raw.sysmap_shapeid.clone(),
                code: raw.shape_type,
            })?;
        let is_line = shape_type == ShapeType::Line;
        let text = raw
            .text
            .as_deref()
            .filter(|t| !is_line && !t.trim().is_empty())
            .map(|t| ShapeText {
                text: t.to_owned(),
                font_family: String::from(font_family(raw.font)),
                font_size: raw.font_size.max(1),
                color: hex_color(&raw.font_color).unwrap_or_else(|| String::from("#000000")),
                halign: raw.text_halign,
                valign: raw.text_valign,
            });
        Ok(Self {
            shape_type,
            x: raw.x,
            y: raw.y,
            width: raw.width,
            height: raw.height,
            fill: if is_line {
                None
            } else {
                hex_color(&raw.background_color)
            },
            stroke: Stroke::resolve(raw.border_type, raw.border_width, &raw.border_color),
            text,
        })
    }

    /// Center of the shape (midpoint for lines).
    pub fn center(&self) -> Point {
        let (x, y, w, h) = self.geometry();
        match self.shape_type {
            ShapeType::Line => Point::new(x, y).midpoint(Point::new(w, h)),
            ShapeType::Rectangle | ShapeType::Ellipse => Point::new(x + w / 2.0, y + h / 2.0),
        }
    }

    fn geometry(&self) -> (f64, f64, f64, f64) {
        (
            self.x as f64,
            self.y as f64,
            self.width as f64,
            self.height as f64,
        )
    }

    /// Bare outline (no paint) of a rectangle or ellipse; used for the text clip.
    fn outline(&self) -> Drawable {
        let (x, y, w, h) = self.geometry();
        match self.shape_type {
            ShapeType::Ellipse => Drawable::new(Tag::Ellipse)
                .attr("cx", x + w / 2.0)
                .attr("cy", y + h / 2.0)
                .attr("rx", w / 2.0)
                .attr("ry", h / 2.0),
            ShapeType::Rectangle | ShapeType::Line => Drawable::new(Tag::Rect)
                .attr("x", x)
                .attr("y", y)
                .attr("width", w)
                .attr("height", h),
        }
    }

    /// The painted geometry node.
    pub fn figure(&self) -> Drawable {
        let figure = match self.shape_type {
            ShapeType::Line => Drawable::new(Tag::Line)
                .attr("x1", self.x)
                .attr("y1", self.y)
                .attr("x2", self.width)
                .attr("y2", self.height),
            ShapeType::Rectangle | ShapeType::Ellipse => self
                .outline()
                .attr("fill", self.fill.as_deref().unwrap_or("none")),
        };
        self.stroke.apply(figure)
    }

    fn text_drawable(&self, text: &ShapeText, clip_id: &str) -> Drawable {
        let (x, y, w, h) = self.geometry();
        let (tx, h_anchor) = match text.halign {
            HAlign::Left => (x + TEXT_PADDING, HAnchor::Left),
            HAlign::Center => (x + w / 2.0, HAnchor::Center),
            HAlign::Right => (x + w - TEXT_PADDING, HAnchor::Right),
        };
        let (ty, v_anchor) = match text.valign {
            VAlign::Top => (y + TEXT_PADDING, VAnchor::Top),
            VAlign::Middle => (y + h / 2.0, VAnchor::Middle),
            VAlign::Bottom => (y + h - TEXT_PADDING, VAnchor::Bottom),
        };
        TextBlock::new(
            &text.text,
            Point::new(tx, ty),
            h_anchor,
            v_anchor,
            text.font_size as f64,
        )
        .drawable()
        .attr("fill", &text.color)
        .attr("font-family", &text.font_family)
        .attr("clip-path", format!("url(#{clip_id})"))
    }
}

fn font_family(index: i64) -> &'static str {
    usize::try_from(index)
        .ok()
        .and_then(|i| FONTS.get(i))
        .copied()
        .unwrap_or(FONTS[9])
}

/// A shape on the canvas, reconciled in place by id.
#[derive(Debug)]
pub struct ShapeNode {
    id: ShapeId,
    group: Option<NodeId>,
    options: Option<ResolvedShape>,
    applied: Option<Value>,
    revision: u64,
}

impl ShapeNode {
    pub(crate) fn new(id: ShapeId) -> Self {
        Self {
            id,
            group: None,
            options: None,
            applied: None,
            revision: 0,
        }
    }

    /// Identity.
    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// Attributes applied by the last effective update.
    pub fn options(&self) -> Option<&ResolvedShape> {
        self.options.as_ref()
    }

    /// Group node holding the shape, if drawn.
    pub fn node(&self) -> Option<NodeId> {
        self.group
    }

    /// Number of effective updates so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a payload. Returns `Ok(false)` when nothing relevant changed.
    pub(crate) fn update(&mut self, raw: &ShapeOptions, canvas: &mut Canvas) -> Result<bool> {
        let resolved = ResolvedShape::resolve(raw)?;
        let value = serde_json::to_value(&resolved)?;
        if !is_changed(self.applied.as_ref(), &value) {
            return Ok(false);
        }
        trace!(shape = %self.id, "redrawing shape");

        let group = match self.group.filter(|&g| canvas.is_alive(g)) {
            Some(group) => {
                canvas.clear_children(group);
                group
            }
            None => canvas.insert(
                canvas.layer(Layer::Shapes),
                Drawable::new(Tag::Group).attr("data-shapeid", &self.id),
            ),
        };
        canvas.insert(group, resolved.figure());
        if let Some(text) = &resolved.text {
            let clip_id = format!("shape-clip-{}", self.id);
            canvas.insert(
                group,
                Drawable::new(Tag::ClipPath)
                    .attr("id", &clip_id)
                    .child(resolved.outline()),
            );
            canvas.insert(group, resolved.text_drawable(text, &clip_id));
        }

        self.group = Some(group);
        self.options = Some(resolved);
        self.applied = Some(value);
        self.revision += 1;
        Ok(true)
    }

    /// Drop drawn state so the next update redraws from scratch.
    pub(crate) fn invalidate(&mut self, canvas: &mut Canvas) {
        if let Some(group) = self.group.take() {
            canvas.remove(group);
        }
        self.applied = None;
    }

    /// Release every scene node.
    pub(crate) fn remove(&mut self, canvas: &mut Canvas) {
        self.invalidate(canvas);
        self.options = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape(value: Value) -> ShapeOptions {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn dotted_wide_border_keeps_dot_unit() {
        assert_eq!(
            dash_pattern(BorderType::Dotted, 3),
            (Some(String::from("1,3")), true)
        );
        assert_eq!(
            dash_pattern(BorderType::Dotted, 1),
            (Some(String::from("1,2")), false)
        );
        assert_eq!(
            dash_pattern(BorderType::Dotted, 2),
            (Some(String::from("2,4")), false)
        );
        assert_eq!(
            dash_pattern(BorderType::Dashed, 3),
            (Some(String::from("12,12")), false)
        );
        assert_eq!(dash_pattern(BorderType::Solid, 3), (None, false));
    }

    #[test]
    fn dotted_border_attributes() {
        let resolved = ResolvedShape::resolve(&shape(json!({
            "sysmap_shapeid": "1", "type": 0, "x": 0, "y": 0, "width": 100, "height": 50,
            "border_type": 2, "border_width": 3, "border_color": "000000"
        })))
        .unwrap();
        let figure = resolved.figure();
        assert_eq!(figure.get("stroke-dasharray"), Some("1,3"));
        assert_eq!(figure.get("stroke-linecap"), Some("round"));
        assert_eq!(figure.get("stroke-width"), Some("3"));
    }

    #[test]
    fn malformed_colors_degrade() {
        let resolved = ResolvedShape::resolve(&shape(json!({
            "sysmap_shapeid": "1", "type": 0, "width": 10, "height": 10,
            "background_color": "red", "border_color": "#12", "font_color": "zzzzzz",
            "text": "hello"
        })))
        .unwrap();
        assert_eq!(resolved.fill, None);
        assert_eq!(resolved.stroke.color, "none");
        assert_eq!(resolved.text.as_ref().unwrap().color, "#000000");
        assert_eq!(resolved.figure().get("fill"), Some("none"));

        assert_eq!(hex_color("A0b1C2").as_deref(), Some("#A0b1C2"));
        assert_eq!(hex_color(""), None);
    }

    #[test]
    fn line_shapes_drop_fill_and_text() {
        let resolved = ResolvedShape::resolve(&shape(json!({
            "sysmap_shapeid": "1", "type": 2, "x": 0, "y": 0, "width": 100, "height": 100,
            "background_color": "FF0000", "text": "not allowed", "border_color": "000000"
        })))
        .unwrap();
        assert!(resolved.text.is_none());
        assert!(resolved.fill.is_none());
        let figure = resolved.figure();
        assert!(!figure.attributes.contains_key("fill"));
        assert_eq!(figure.get("x2"), Some("100"));
        assert_eq!(resolved.center(), Point::new(50.0, 50.0));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = ResolvedShape::resolve(&shape(json!({"sysmap_shapeid": "9", "type": 7})));
        assert!(matches!(
            err,
            Err(Error::InvalidShapeType { code: 7, .. })
        ));
    }

    #[test]
    fn text_is_clipped_to_geometry() {
        let mut canvas = Canvas::new(200.0, 200.0);
        let mut node = ShapeNode::new(ShapeId::from("4"));
        let raw = shape(json!({
            "sysmap_shapeid": "4", "type": 1, "x": 10, "y": 10, "width": 80, "height": 40,
            "text": "Core", "text_halign": 1, "font_color": "333333"
        }));
        assert!(node.update(&raw, &mut canvas).unwrap());
        let group = node.node().unwrap();
        let children = canvas.children(group);
        assert_eq!(children.len(), 3);
        let clip = canvas.get(children[1]).unwrap();
        assert_eq!(clip.tag, Tag::ClipPath);
        let outline = canvas.get(canvas.children(children[1])[0]).unwrap();
        assert_eq!(outline.tag, Tag::Ellipse);
        let text = canvas.get(children[2]).unwrap();
        assert_eq!(text.get("clip-path"), Some("url(#shape-clip-4)"));
        assert_eq!(text.get("text-anchor"), Some("start"));
    }

    #[test]
    fn unchanged_update_is_a_noop() {
        let mut canvas = Canvas::new(200.0, 200.0);
        let mut node = ShapeNode::new(ShapeId::from("1"));
        let raw = shape(json!({"sysmap_shapeid": "1", "type": 0, "width": 10, "height": 10}));
        assert!(node.update(&raw, &mut canvas).unwrap());
        let _ = canvas.commit();
        assert!(!node.update(&raw, &mut canvas).unwrap());
        assert!(canvas.commit().is_empty());
        assert_eq!(node.revision(), 1);

        let moved = shape(json!({"sysmap_shapeid": "1", "type": 0, "x": 5, "width": 10, "height": 10}));
        let group = node.node();
        assert!(node.update(&moved, &mut canvas).unwrap());
        assert_eq!(node.node(), group, "group is reused");
    }

    #[test]
    fn clearing_text_removes_it() {
        let mut canvas = Canvas::new(200.0, 200.0);
        let mut node = ShapeNode::new(ShapeId::from("s"));
        let with_text = shape(json!({
            "sysmap_shapeid": "s", "type": 0, "width": 80, "height": 40, "text": "hello"
        }));
        assert!(node.update(&with_text, &mut canvas).unwrap());
        let group = node.node().unwrap();
        assert_eq!(canvas.children(group).len(), 3);
        let _ = canvas.commit();

        let cleared = shape(json!({
            "sysmap_shapeid": "s", "type": 0, "width": 80, "height": 40, "text": ""
        }));
        assert!(node.update(&cleared, &mut canvas).unwrap(), "cleared text is a change");
        assert!(!canvas.commit().is_empty());
        assert_eq!(canvas.children(group).len(), 1, "only the figure remains");
        assert!(node.options().unwrap().text.is_none());
        assert!(!canvas.to_svg().contains("hello"));
    }
}
