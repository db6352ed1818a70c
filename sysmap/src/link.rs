// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edges between element centers.

use kurbo::Point;
use serde::Serialize;
use serde_json::Value;
use sysmap_scene::{Canvas, Drawable, Layer, NodeId, Tag};
use tracing::trace;

use crate::config::Theme;
use crate::diff::is_changed;
use crate::error::Result;
use crate::options::{LinkDrawType, LinkId, LinkOptions, LinkSummary, SelementId};
use crate::text::{HAnchor, TextBlock, VAnchor};

const LABEL_FONT_SIZE: f64 = 10.0;
const HOVER_WIDTH: i64 = 10;

/// Resolve both endpoints of a link.
///
/// Element centers are tried first. If either endpoint is not an element, both
/// are retried against shape centers (host-group areas); a link between one
/// element and one area, or with any unknown endpoint, does not resolve.
pub(crate) fn resolve_endpoints(
    from: &SelementId,
    to: &SelementId,
    element_center: impl Fn(&SelementId) -> Option<Point>,
    shape_center: impl Fn(&SelementId) -> Option<Point>,
) -> Option<(Point, Point)> {
    if let (Some(a), Some(b)) = (element_center(from), element_center(to)) {
        return Some((a, b));
    }
    Some((shape_center(from)?, shape_center(to)?))
}

fn escape_html(raw: &str, out: &mut String) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// HTML rows of a hover hint box: a color swatch and a label per logical link.
pub(crate) fn hint_box_html(rows: &[LinkSummary]) -> String {
    let mut html = String::new();
    for row in rows {
        html.push_str("<div class=\"map-link-hint\"><span class=\"color-swatch\" style=\"background-color: #");
        escape_html(&row.color, &mut html);
        html.push_str("\"></span>");
        escape_html(&row.label, &mut html);
        html.push_str("</div>");
    }
    html
}

/// Draw-ready link attributes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedLink {
    /// First endpoint center.
    pub from: [f64; 2],
    /// Second endpoint center.
    pub to: [f64; 2],
    /// Line style.
    pub drawtype: LinkDrawType,
    /// `#rrggbb` line color.
    pub color: String,
    /// Inline label; `None` when empty.
    pub label: Option<String>,
    /// Whether the link is drawn as an invisible hit region with a hint box.
    pub hover_link: bool,
    /// Hint box rows, in input order.
    pub links: Vec<LinkSummary>,
    /// Label text color.
    pub text_color: String,
    /// Label backdrop color.
    pub backdrop_color: String,
}

impl ResolvedLink {
    fn resolve(options: &LinkOptions, (from, to): (Point, Point), theme: &Theme) -> Self {
        Self {
            from: [from.x, from.y],
            to: [to.x, to.y],
            drawtype: options.drawtype,
            color: format!("#{}", options.color),
            label: options
                .label
                .as_deref()
                .filter(|l| !l.is_empty())
                .map(str::to_owned),
            hover_link: options.hover_link,
            links: options.links.clone(),
            text_color: format!("#{}", theme.textcolor),
            backdrop_color: format!("#{}", theme.backgroundcolor),
        }
    }

    /// Midpoint of the segment; the label anchor.
    pub fn center(&self) -> Point {
        Point::new(self.from[0], self.from[1]).midpoint(Point::new(self.to[0], self.to[1]))
    }

    fn segment(&self) -> Drawable {
        Drawable::new(Tag::Line)
            .attr("x1", self.from[0])
            .attr("y1", self.from[1])
            .attr("x2", self.to[0])
            .attr("y2", self.to[1])
    }

    fn drawables(&self) -> Vec<Drawable> {
        if self.hover_link {
            return vec![
                self.segment()
                    .attr("stroke", "transparent")
                    .attr("stroke-width", HOVER_WIDTH)
                    .attr("cursor", "pointer")
                    .attr("data-hintbox-contents", hint_box_html(&self.links)),
            ];
        }

        let width = if self.drawtype == LinkDrawType::Bold { 2 } else { 1 };
        let dash = match self.drawtype {
            LinkDrawType::Dotted => Some("1,2"),
            LinkDrawType::Dashed => Some("4,4"),
            LinkDrawType::Line | LinkDrawType::Bold => None,
        };
        let mut out = vec![
            self.segment()
                .attr("stroke", &self.color)
                .attr("stroke-width", width)
                .attr_opt("stroke-dasharray", dash),
        ];
        if let Some(label) = &self.label {
            let block = TextBlock::new(
                label,
                self.center(),
                HAnchor::Center,
                VAnchor::Middle,
                LABEL_FONT_SIZE,
            );
            let backdrop = block.bounds().inflate(2.0, 1.0);
            out.push(
                Drawable::new(Tag::Rect)
                    .attr("x", backdrop.x0)
                    .attr("y", backdrop.y0)
                    .attr("width", backdrop.width())
                    .attr("height", backdrop.height())
                    .attr("fill", &self.backdrop_color)
                    .attr("opacity", "0.5"),
            );
            out.push(block.drawable().attr("fill", &self.text_color));
        }
        out
    }
}

/// A link on the canvas.
///
/// The link keeps one group node for its whole lifetime; changed attributes
/// rebuild the group's children.
#[derive(Debug)]
pub struct LinkNode {
    id: LinkId,
    group: Option<NodeId>,
    resolved: Option<ResolvedLink>,
    applied: Option<Value>,
    revision: u64,
}

impl LinkNode {
    pub(crate) fn new(id: LinkId) -> Self {
        Self {
            id,
            group: None,
            resolved: None,
            applied: None,
            revision: 0,
        }
    }

    /// Identity.
    pub fn id(&self) -> &LinkId {
        &self.id
    }

    /// Group node holding the link, if drawn.
    pub fn node(&self) -> Option<NodeId> {
        self.group
    }

    /// Attributes applied by the last effective update.
    pub fn options(&self) -> Option<&ResolvedLink> {
        self.resolved.as_ref()
    }

    /// Number of effective updates so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Hint box rows when drawn in hover mode.
    pub fn hint_box(&self) -> Option<&[LinkSummary]> {
        self.resolved
            .as_ref()
            .filter(|r| r.hover_link)
            .map(|r| r.links.as_slice())
    }

    /// Apply a payload between two resolved centers.
    ///
    /// A new group is inserted before `below` when given, so the link paints
    /// underneath that element. Returns `Ok(false)` when nothing changed.
    pub(crate) fn update(
        &mut self,
        options: &LinkOptions,
        endpoints: (Point, Point),
        theme: &Theme,
        canvas: &mut Canvas,
        below: Option<NodeId>,
    ) -> Result<bool> {
        let resolved = ResolvedLink::resolve(options, endpoints, theme);
        let value = serde_json::to_value(&resolved)?;
        if !is_changed(self.applied.as_ref(), &value) {
            return Ok(false);
        }
        trace!(link = %self.id, hover = resolved.hover_link, "redrawing link");

        let group = match self.group.filter(|&g| canvas.is_alive(g)) {
            Some(group) => {
                canvas.clear_children(group);
                group
            }
            None => {
                let d = Drawable::new(Tag::Group).attr("data-linkid", &self.id);
                match below.and_then(|b| canvas.insert_before(b, d.clone())) {
                    Some(group) => group,
                    None => canvas.insert(canvas.layer(Layer::Elements), d),
                }
            }
        };
        for d in resolved.drawables() {
            canvas.insert(group, d);
        }

        self.group = Some(group);
        self.resolved = Some(resolved);
        self.applied = Some(value);
        self.revision += 1;
        Ok(true)
    }

    /// Release every scene node.
    pub(crate) fn remove(&mut self, canvas: &mut Canvas) {
        if let Some(group) = self.group.take() {
            canvas.remove(group);
        }
        self.applied = None;
        self.resolved = None;
    }
}
