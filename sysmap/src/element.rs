// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Map elements: icon, label, highlight, change markers, and selection ring.
//!
//! An element owns one group node in the elements layer. Its parts live in that
//! group in a fixed order (highlight, selection, markers, image, label) and are
//! created, updated in place, or removed independently of each other.

use kurbo::{Point, Rect};
use serde::Serialize;
use serde_json::Value;
use sysmap_scene::{Canvas, Drawable, Layer, NodeFlags, NodeId, Tag};
use tracing::trace;

use crate::config::Theme;
use crate::diff::is_changed;
use crate::error::{Error, Result};
use crate::image::ImageCache;
use crate::options::{
    ElementOptions, ElementType, ElementUrl, Highlight, LabelLocation, LabelType, Permission,
    SelementId, ShowLabel,
};
use crate::text::{HAnchor, TextBlock, VAnchor};

const TEXT_PADDING: f64 = 5.0;
const LABEL_FONT_SIZE: f64 = 10.0;
const ACK_STROKE: &str = "#329632";
const SELECTION_STROKE: &str = "#4796C4";
const MARKER_FILL: &str = "#F44336";
const MARKER_STROKE: &str = "#B71C1C";
const CHEVRON: &str = "M11, 2.91 L5.87, 8 L11, 13.09 L8.07, 16 L0, 8 L8.07, 0, L11, 2.91";

bitflags::bitflags! {
    /// Pointer behaviours currently attached to an element.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Listeners: u8 {
        /// Pointer entering the icon shows the label and the selection ring.
        const MOUSE_OVER = 0b001;
        /// Pointer leaving the icon hides them again.
        const MOUSE_OUT  = 0b010;
        /// Clicking the icon selects the element.
        const CLICK      = 0b100;
    }
}

/// Resolved label placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPlacement {
    /// Centered on the icon.
    #[default]
    None,
    /// Centered below the icon.
    Bottom,
    /// Right-aligned to the left of the icon.
    Left,
    /// Left-aligned to the right of the icon.
    Right,
    /// Centered above the icon.
    Top,
}

impl LabelPlacement {
    fn from_location(location: LabelLocation) -> Self {
        match location {
            LabelLocation::Default => Self::None,
            LabelLocation::Bottom => Self::Bottom,
            LabelLocation::Left => Self::Left,
            LabelLocation::Right => Self::Right,
            LabelLocation::Top => Self::Top,
        }
    }
}

/// Map-wide label settings inherited by elements that ask for the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct LabelDefaults {
    pub(crate) location: LabelLocation,
    pub(crate) show: ShowLabel,
    pub(crate) label_type: Option<LabelType>,
}

/// Everything an element reads from its map during one pass.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ElementContext<'a> {
    pub(crate) images: &'a ImageCache,
    pub(crate) theme: &'a Theme,
    pub(crate) labels: LabelDefaults,
    pub(crate) can_select: bool,
}

/// The outbound `element.select` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectEvent {
    /// Clicked element.
    pub selected_element_id: SelementId,
    /// Host behind a host element.
    pub hostid: Option<String>,
    /// Host group behind a host-group element.
    pub hostgroupid: Option<String>,
}

impl SelectEvent {
    /// Event name hosts listen for.
    pub const NAME: &'static str = "element.select";
}

/// Draw-ready element attributes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedElement {
    /// Icon left edge, after centering over the declared box.
    pub x: i64,
    /// Icon top edge, after centering over the declared box.
    pub y: i64,
    /// Natural icon width.
    pub width: i64,
    /// Natural icon height.
    pub height: i64,
    /// Icon URL.
    pub href: String,
    /// Label text; may be empty.
    pub label: String,
    /// Label placement; always [`LabelPlacement::None`] for an empty label.
    pub label_placement: LabelPlacement,
    /// Whether the label is hidden until hovered.
    pub label_auto_hide: bool,
    /// Whether labels are switched off map-wide.
    pub label_suppressed: bool,
    /// Label color.
    pub text_color: String,
    /// Element kind.
    pub elementtype: ElementType,
    /// Host or host-group id.
    pub elementid: Option<String>,
    /// Problem highlight.
    pub highlight: Option<Highlight>,
    /// Recently changed state.
    pub lately_changed: bool,
    /// Serialized context-menu descriptor when a menu is attached.
    ///
    /// Kept as one string so any edit to the descriptor, removals included,
    /// counts as a change.
    pub menu: Option<String>,
    /// Viewer permission.
    pub permission: Permission,
    /// Configured URLs.
    pub urls: Vec<ElementUrl>,
    /// Whether the element reacts to clicks and shows a selection ring.
    pub selectable: bool,
}

impl ResolvedElement {
    /// Normalize a payload against the loaded icon and the map defaults.
    pub(crate) fn resolve(options: &ElementOptions, ctx: &ElementContext<'_>) -> Result<Self> {
        let size = ctx
            .images
            .get(options.icon)
            .ok_or_else(|| Error::InvalidElement {
                selementid: options.selementid.clone(),
                icon: options.icon,
            })?;
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Icon sizes are small whole pixel counts."
        )]
        let (width, height) = (size.width.round() as i64, size.height.round() as i64);

        let mut x = options.x;
        let mut y = options.y;
        if let Some(declared) = options.width {
            x += declared.div_euclid(2) - width.div_euclid(2);
        }
        if let Some(declared) = options.height {
            y += declared.div_euclid(2) - height.div_euclid(2);
        }

        let label = options.label.clone().unwrap_or_default();
        let label_placement = match options.label_location {
            _ if label.is_empty() => LabelPlacement::None,
            None => LabelPlacement::None,
            Some(LabelLocation::Default) => LabelPlacement::from_location(ctx.labels.location),
            Some(location) => LabelPlacement::from_location(location),
        };
        let show = match (options.show_label, ctx.labels.show) {
            (ShowLabel::Default, ShowLabel::Default) => ShowLabel::Always,
            (ShowLabel::Default, inherited) => inherited,
            (show, _) => show,
        };

        let mut href = ctx.images.url(options.icon);
        if options.permission.code() < Permission::Read.code() {
            href.push_str("&unavailable=1");
        }
        let menu = options
            .actions
            .clone()
            .filter(|a| !a.is_null())
            .filter(|_| !(options.elementtype == ElementType::Image && options.urls.is_empty()))
            .map(|a| a.to_string());
        let selectable = ctx.can_select
            && matches!(
                options.elementtype,
                ElementType::Host | ElementType::HostGroup
            );

        Ok(Self {
            x,
            y,
            width,
            height,
            href,
            label,
            label_placement,
            label_auto_hide: show == ShowLabel::AutoHide,
            label_suppressed: ctx.labels.label_type == Some(LabelType::Nothing),
            text_color: format!("#{}", ctx.theme.textcolor),
            elementtype: options.elementtype,
            elementid: options.elementid.clone(),
            highlight: options.highlight.clone(),
            lately_changed: options.lately_changed,
            menu,
            permission: options.permission,
            urls: options.urls.clone(),
            selectable,
        })
    }

    /// Icon box.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.x as f64,
            self.y as f64,
            (self.x + self.width) as f64,
            (self.y + self.height) as f64,
        )
    }

    /// Icon center; the anchor of links.
    pub fn center(&self) -> Point {
        self.rect().center()
    }

    fn listeners(&self) -> Listeners {
        let mut wanted = Listeners::empty();
        if self.selectable || self.label_auto_hide {
            wanted |= Listeners::MOUSE_OVER | Listeners::MOUSE_OUT;
        }
        if self.selectable {
            wanted |= Listeners::CLICK;
        }
        wanted
    }

    fn image(&self, listeners: Listeners) -> Drawable {
        let mut image = Drawable::new(Tag::Image)
            .attr("x", self.x)
            .attr("y", self.y)
            .attr("width", self.width)
            .attr("height", self.height)
            .attr("href", &self.href)
            .bounds(self.rect());
        if let Some(menu) = &self.menu {
            image = image
                .attr("data-menu-popup", menu)
                .attr("cursor", "pointer");
        }
        if !listeners.is_empty() || self.menu.is_some() {
            image = image.flags(NodeFlags::VISIBLE | NodeFlags::PICKABLE);
        }
        image
    }

    fn label(&self) -> Option<Drawable> {
        if self.label.is_empty() || self.label_suppressed {
            return None;
        }
        let r = self.rect();
        let c = r.center();
        let (at, h, v) = match self.label_placement {
            LabelPlacement::Bottom => (
                Point::new(c.x, r.y1 + TEXT_PADDING),
                HAnchor::Center,
                VAnchor::Top,
            ),
            LabelPlacement::Left => (
                Point::new(r.x0 - TEXT_PADDING, c.y),
                HAnchor::Right,
                VAnchor::Middle,
            ),
            LabelPlacement::Right => (
                Point::new(r.x1 + TEXT_PADDING, c.y),
                HAnchor::Left,
                VAnchor::Middle,
            ),
            LabelPlacement::Top => (
                Point::new(c.x, r.y0 - TEXT_PADDING),
                HAnchor::Center,
                VAnchor::Bottom,
            ),
            LabelPlacement::None => (c, HAnchor::Center, VAnchor::Middle),
        };
        Some(
            TextBlock::new(&self.label, at, h, v, LABEL_FONT_SIZE)
                .drawable()
                .attr("fill", &self.text_color),
        )
    }

    fn highlight(&self) -> Option<Drawable> {
        let highlight = self.highlight.as_ref()?;
        let c = self.center();
        if let Some(st) = highlight.st.as_deref().filter(|s| !s.is_empty()) {
            return Some(
                Drawable::new(Tag::Rect)
                    .attr("x", self.x - 2)
                    .attr("y", self.y - 2)
                    .attr("width", self.width + 4)
                    .attr("height", self.height + 4)
                    .attr("fill", format!("#{st}"))
                    .attr("fill-opacity", "0.5"),
            );
        }
        let hl = highlight.hl.as_deref().filter(|s| !s.is_empty())?;
        let radius = self.width.div_euclid(2) + 10;
        let ellipse = Drawable::new(Tag::Ellipse)
            .attr("cx", c.x)
            .attr("cy", c.y)
            .attr("rx", radius)
            .attr("ry", radius)
            .attr("fill", format!("#{hl}"));
        Some(if highlight.ack {
            ellipse
                .attr("stroke", ACK_STROKE)
                .attr("stroke-width", "4px")
        } else {
            ellipse.attr("stroke-width", "0")
        })
    }

    fn markers(&self) -> Option<Drawable> {
        if !self.lately_changed {
            return None;
        }
        let c = self.center();
        let r = (self.width.div_euclid(2) + 12) as f64;
        // Each chevron points at the icon.
        let sides = [
            (LabelPlacement::Bottom, 0.0, r, 90),
            (LabelPlacement::Left, -r, 0.0, 180),
            (LabelPlacement::Right, r, 0.0, 0),
            (LabelPlacement::Top, 0.0, -r, 270),
        ];
        let mut group = Drawable::new(Tag::Group)
            .attr("fill", MARKER_FILL)
            .attr("stroke", MARKER_STROKE);
        for (side, dx, dy, angle) in sides {
            if side == self.label_placement {
                continue;
            }
            group = group.child(
                Drawable::new(Tag::Path).attr("d", CHEVRON).attr(
                    "transform",
                    format!(
                        "translate({} {}) rotate({angle}) translate(-5.5 -8)",
                        c.x + dx,
                        c.y + dy
                    ),
                ),
            );
        }
        Some(group)
    }

    fn selection(&self) -> Option<Drawable> {
        if !self.selectable {
            return None;
        }
        let c = self.center();
        let radius = self.width.div_euclid(2) + 20;
        Some(
            Drawable::new(Tag::Ellipse)
                .attr("cx", c.x)
                .attr("cy", c.y)
                .attr("rx", radius)
                .attr("ry", radius)
                .attr("fill", "none")
                .attr("stroke", SELECTION_STROKE)
                .attr("stroke-width", 2),
        )
    }
}

/// Parts of an element in paint order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Part {
    Highlight,
    Selection,
    Markers,
    Image,
    Label,
}

impl Part {
    const ALL: [Self; 5] = [
        Self::Highlight,
        Self::Selection,
        Self::Markers,
        Self::Image,
        Self::Label,
    ];

    const fn idx(self) -> usize {
        self as usize
    }
}

/// A map element on the canvas.
#[derive(Debug)]
pub struct ElementNode {
    id: SelementId,
    group: Option<NodeId>,
    parts: [Option<NodeId>; 5],
    resolved: Option<ResolvedElement>,
    applied: Option<Value>,
    center: Option<Point>,
    listeners: Listeners,
    pending: bool,
    hovered: bool,
    selected: bool,
    revision: u64,
}

impl ElementNode {
    pub(crate) fn new(id: SelementId) -> Self {
        Self {
            id,
            group: None,
            parts: [None; 5],
            resolved: None,
            applied: None,
            center: None,
            listeners: Listeners::empty(),
            pending: false,
            hovered: false,
            selected: false,
            revision: 0,
        }
    }

    /// Identity.
    pub fn id(&self) -> &SelementId {
        &self.id
    }

    /// Attributes applied by the last effective update.
    pub fn options(&self) -> Option<&ResolvedElement> {
        self.resolved.as_ref()
    }

    /// Icon center, once resolved.
    pub fn center(&self) -> Option<Point> {
        self.center
    }

    /// Group node holding the element's parts, if drawn.
    pub fn node(&self) -> Option<NodeId> {
        self.group
    }

    /// Icon node, if drawn.
    pub fn image_node(&self) -> Option<NodeId> {
        self.parts[Part::Image.idx()]
    }

    /// Label node, if drawn.
    pub fn label_node(&self) -> Option<NodeId> {
        self.parts[Part::Label.idx()]
    }

    /// Highlight node, if drawn.
    pub fn highlight_node(&self) -> Option<NodeId> {
        self.parts[Part::Highlight.idx()]
    }

    /// Change-marker group, if drawn.
    pub fn markers_node(&self) -> Option<NodeId> {
        self.parts[Part::Markers.idx()]
    }

    /// Selection ring, if drawn.
    pub fn selection_node(&self) -> Option<NodeId> {
        self.parts[Part::Selection.idx()]
    }

    /// Attached pointer behaviours.
    pub fn listeners(&self) -> Listeners {
        self.listeners
    }

    /// Whether the element is selected.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Number of effective option updates so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Event emitted when this element is clicked.
    pub fn select_event(&self) -> SelectEvent {
        let elementid = self.resolved.as_ref().and_then(|r| r.elementid.clone());
        let elementtype = self.resolved.as_ref().map(|r| r.elementtype);
        SelectEvent {
            selected_element_id: self.id.clone(),
            hostid: elementid
                .clone()
                .filter(|_| elementtype == Some(ElementType::Host)),
            hostgroupid: elementid.filter(|_| elementtype == Some(ElementType::HostGroup)),
        }
    }

    /// Normalize and store a payload; drawing happens in [`ElementNode::render`].
    ///
    /// Returns `Ok(false)` when nothing relevant changed.
    pub(crate) fn update_options(
        &mut self,
        options: &ElementOptions,
        ctx: &ElementContext<'_>,
    ) -> Result<bool> {
        let resolved = ResolvedElement::resolve(options, ctx)?;
        let value = serde_json::to_value(&resolved)?;
        if !is_changed(self.applied.as_ref(), &value) {
            return Ok(false);
        }
        let moved = self.resolved.as_ref().is_none_or(|old| {
            (old.x, old.y, old.width, old.height)
                != (resolved.x, resolved.y, resolved.width, resolved.height)
        });
        if moved {
            self.center = Some(resolved.center());
        }
        self.resolved = Some(resolved);
        self.applied = Some(value);
        self.pending = true;
        self.revision += 1;
        Ok(true)
    }

    /// Draw the stored options if they changed since the last render.
    pub(crate) fn render(&mut self, canvas: &mut Canvas) {
        if !self.pending {
            return;
        }
        self.pending = false;
        let Some(resolved) = self.resolved.take() else {
            return;
        };
        trace!(element = %self.id, "redrawing element");
        let group = match self.group.filter(|&g| canvas.is_alive(g)) {
            Some(group) => group,
            None => {
                self.parts = [None; 5];
                canvas.insert(
                    canvas.layer(Layer::Elements),
                    Drawable::new(Tag::Group).attr("data-selementid", &self.id),
                )
            }
        };
        self.group = Some(group);
        self.attach_listeners(resolved.listeners());

        self.set_part(canvas, Part::Highlight, resolved.highlight());
        self.set_part(canvas, Part::Markers, resolved.markers());
        self.set_part(canvas, Part::Image, Some(resolved.image(self.listeners)));
        self.set_part(canvas, Part::Label, resolved.label());
        self.set_part(canvas, Part::Selection, resolved.selection());
        self.resolved = Some(resolved);
        self.sync_visibility(canvas);
    }

    fn attach_listeners(&mut self, wanted: Listeners) {
        let attach = wanted - self.listeners;
        let detach = self.listeners - wanted;
        if !attach.is_empty() || !detach.is_empty() {
            trace!(element = %self.id, ?attach, ?detach, "listeners");
        }
        self.listeners = wanted;
    }

    fn set_part(&mut self, canvas: &mut Canvas, part: Part, drawable: Option<Drawable>) {
        let slot = part.idx();
        let existing = self.parts[slot].filter(|&id| canvas.is_alive(id));
        self.parts[slot] = match (existing, drawable) {
            (None, None) => None,
            (Some(id), None) => {
                canvas.remove(id);
                None
            }
            (Some(id), Some(d)) => Some(Self::patch(canvas, id, d)),
            (None, Some(d)) => Some(self.insert_part(canvas, part, d)),
        };
    }

    fn patch(canvas: &mut Canvas, id: NodeId, d: Drawable) -> NodeId {
        canvas.patch(id, d).unwrap_or(id)
    }

    fn insert_part(&self, canvas: &mut Canvas, part: Part, d: Drawable) -> NodeId {
        let next = Part::ALL[part.idx() + 1..]
            .iter()
            .find_map(|p| self.parts[p.idx()].filter(|&id| canvas.is_alive(id)));
        match next.and_then(|sibling| canvas.insert_before(sibling, d.clone())) {
            Some(id) => id,
            None => {
                let group = self.group.unwrap_or_else(|| canvas.layer(Layer::Elements));
                canvas.insert(group, d)
            }
        }
    }

    fn sync_visibility(&self, canvas: &mut Canvas) {
        let Some(resolved) = &self.resolved else {
            return;
        };
        if let Some(label) = self.label_node() {
            canvas.set_visible(label, !resolved.label_auto_hide || self.hovered);
        }
        if let Some(selection) = self.selection_node() {
            canvas.set_visible(selection, self.selected || self.hovered);
        }
    }

    /// Pointer entered the icon. Ignored unless a mouse-over behaviour is attached.
    pub(crate) fn on_mouse_over(&mut self, canvas: &mut Canvas) {
        if !self.listeners.contains(Listeners::MOUSE_OVER) {
            return;
        }
        self.hovered = true;
        self.sync_visibility(canvas);
    }

    /// Pointer left the icon. Ignored unless a mouse-out behaviour is attached.
    pub(crate) fn on_mouse_out(&mut self, canvas: &mut Canvas) {
        if !self.listeners.contains(Listeners::MOUSE_OUT) {
            return;
        }
        self.hovered = false;
        self.sync_visibility(canvas);
    }

    /// Show or hide the selection ring.
    pub(crate) fn toggle_selection(&mut self, canvas: &mut Canvas, selected: bool) {
        self.selected = selected;
        self.sync_visibility(canvas);
    }

    /// Drop everything drawn while keeping identity, so the next pass redraws from scratch.
    pub(crate) fn invalidate(&mut self, canvas: &mut Canvas) {
        if let Some(group) = self.group.take() {
            canvas.remove(group);
        }
        self.parts = [None; 5];
        self.applied = None;
        self.listeners = Listeners::empty();
        self.hovered = false;
        self.pending = false;
    }

    /// Release every scene node.
    pub(crate) fn remove(&mut self, canvas: &mut Canvas) {
        self.invalidate(canvas);
        self.resolved = None;
        self.center = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::StaticImages;
    use crate::options::ImageId;
    use futures::executor::block_on;
    use serde_json::json;

    fn images() -> ImageCache {
        let source = StaticImages::new()
            .with("imgstore.php?iconid=1", 16.0, 16.0)
            .with("imgstore.php?iconid=2", 48.0, 48.0);
        let mut cache = ImageCache::new("imgstore.php");
        block_on(cache.preload(&source, [ImageId(1), ImageId(2)]));
        cache
    }

    fn element(value: Value) -> ElementOptions {
        serde_json::from_value(value).unwrap()
    }

    fn ctx<'a>(images: &'a ImageCache, theme: &'a Theme, can_select: bool) -> ElementContext<'a> {
        ElementContext {
            images,
            theme,
            labels: LabelDefaults::default(),
            can_select,
        }
    }

    fn drawn(options: &ElementOptions, can_select: bool) -> (Canvas, ElementNode) {
        let images = images();
        let theme = Theme::default();
        let mut canvas = Canvas::new(400.0, 400.0);
        let mut node = ElementNode::new(options.selementid.clone());
        assert!(node.update_options(options, &ctx(&images, &theme, can_select)).unwrap());
        node.render(&mut canvas);
        (canvas, node)
    }

    #[test]
    fn icon_is_centered_over_declared_box() {
        let (canvas, node) = drawn(
            &element(json!({
                "selementid": "A", "x": 10, "y": 10, "width": 32, "height": 32, "icon": 1
            })),
            false,
        );
        let r = node.options().unwrap();
        assert_eq!((r.x, r.y, r.width, r.height), (18, 18, 16, 16));
        assert_eq!(node.center(), Some(Point::new(26.0, 26.0)));
        let image = canvas.get(node.image_node().unwrap()).unwrap();
        assert_eq!(image.get("x"), Some("18"));
        assert_eq!(image.get("href"), Some("imgstore.php?iconid=1"));
    }

    #[test]
    fn missing_icon_is_an_error() {
        let images = images();
        let theme = Theme::default();
        let mut node = ElementNode::new(SelementId::from("A"));
        let err = node
            .update_options(
                &element(json!({"selementid": "A", "x": 0, "y": 0, "icon": 99})),
                &ctx(&images, &theme, false),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidElement { .. }));
        assert!(err.to_string().contains("invalid element configuration"));
    }

    #[test]
    fn empty_label_forces_no_placement() {
        for location in [json!(0), json!(1), json!(2), json!(3), json!(-1), json!(null)] {
            let (canvas, node) = drawn(
                &element(json!({
                    "selementid": "A", "x": 0, "y": 0, "icon": 1,
                    "label": "", "label_location": location
                })),
                false,
            );
            assert_eq!(node.options().unwrap().label_placement, LabelPlacement::None);
            assert!(node.label_node().is_none());
            assert_eq!(canvas.children(node.node().unwrap()).len(), 1, "image only");
        }
    }

    #[test]
    fn label_placements() {
        let at = |location: i64| {
            let (canvas, node) = drawn(
                &element(json!({
                    "selementid": "A", "x": 100, "y": 100, "icon": 1,
                    "label": "srv", "label_location": location
                })),
                false,
            );
            canvas.get(node.label_node().unwrap()).unwrap().clone()
        };
        assert_eq!(at(0).get("text-anchor"), Some("middle"));
        assert_eq!(at(1).get("text-anchor"), Some("end"));
        assert_eq!(at(2).get("text-anchor"), Some("start"));
        assert_eq!(at(0).get("fill"), Some("#1F2C33"));

        // A default that is not overridden map-wide lands on the icon center.
        assert_eq!(at(-1).get("text-anchor"), Some("middle"));
        let (_, node) = drawn(
            &element(json!({
                "selementid": "A", "x": 100, "y": 100, "icon": 1,
                "label": "srv", "label_location": -1
            })),
            false,
        );
        assert_eq!(node.options().unwrap().label_placement, LabelPlacement::None);
    }

    #[test]
    fn auto_hide_label_starts_hidden() {
        let (mut canvas, mut node) = drawn(
            &element(json!({
                "selementid": "A", "x": 0, "y": 0, "icon": 1,
                "label": "srv", "show_label": 0
            })),
            false,
        );
        let label = node.label_node().unwrap();
        assert!(!canvas.is_visible(label));
        assert!(node.listeners().contains(Listeners::MOUSE_OVER | Listeners::MOUSE_OUT));
        assert!(!node.listeners().contains(Listeners::CLICK));

        node.on_mouse_over(&mut canvas);
        assert!(canvas.is_visible(label));
        node.on_mouse_out(&mut canvas);
        assert!(!canvas.is_visible(label));
    }

    #[test]
    fn status_highlight_excludes_halo() {
        let (canvas, node) = drawn(
            &element(json!({
                "selementid": "A", "x": 10, "y": 10, "icon": 1,
                "highlight": {"st": "FF0000", "hl": "00FF00", "ack": true}
            })),
            false,
        );
        let highlight = canvas.get(node.highlight_node().unwrap()).unwrap();
        assert_eq!(highlight.tag, Tag::Rect);
        assert_eq!(highlight.get("fill"), Some("#FF0000"));
        assert_eq!(highlight.get("width"), Some("20"));
        let ellipses = canvas
            .children(node.node().unwrap())
            .iter()
            .filter(|&&id| canvas.get(id).unwrap().tag == Tag::Ellipse)
            .count();
        assert_eq!(ellipses, 0);
    }

    #[test]
    fn halo_highlight_with_ack() {
        let (canvas, node) = drawn(
            &element(json!({
                "selementid": "A", "x": 0, "y": 0, "icon": 1,
                "highlight": {"st": null, "hl": "00FF00", "ack": true}
            })),
            false,
        );
        let halo = canvas.get(node.highlight_node().unwrap()).unwrap();
        assert_eq!(halo.tag, Tag::Ellipse);
        assert_eq!(halo.get("rx"), Some("18"));
        assert_eq!(halo.get("stroke"), Some(ACK_STROKE));
        assert_eq!(halo.get("stroke-width"), Some("4px"));
    }

    #[test]
    fn highlight_removed_when_cleared() {
        let images = images();
        let theme = Theme::default();
        let mut canvas = Canvas::new(100.0, 100.0);
        let mut node = ElementNode::new(SelementId::from("A"));
        let ctx = ctx(&images, &theme, false);
        let lit = element(json!({
            "selementid": "A", "x": 0, "y": 0, "icon": 1, "highlight": {"hl": "FF0000"}
        }));
        node.update_options(&lit, &ctx).unwrap();
        node.render(&mut canvas);
        let halo = node.highlight_node().unwrap();

        let plain = element(json!({"selementid": "A", "x": 0, "y": 0, "icon": 1, "highlight": null}));
        assert!(node.update_options(&plain, &ctx).unwrap());
        node.render(&mut canvas);
        assert!(node.highlight_node().is_none());
        assert!(!canvas.is_alive(halo));
    }

    #[test]
    fn markers_skip_label_side() {
        let (canvas, node) = drawn(
            &element(json!({
                "selementid": "A", "x": 0, "y": 0, "icon": 1,
                "label": "srv", "label_location": 3, "latelyChanged": true
            })),
            false,
        );
        let markers = node.markers_node().unwrap();
        assert_eq!(canvas.children(markers).len(), 3);
        assert_eq!(canvas.get(markers).unwrap().get("fill"), Some(MARKER_FILL));

        let (canvas, node) = drawn(
            &element(json!({
                "selementid": "A", "x": 0, "y": 0, "icon": 1, "latelyChanged": true
            })),
            false,
        );
        assert_eq!(canvas.children(node.markers_node().unwrap()).len(), 4);
    }

    #[test]
    fn parts_keep_paint_order() {
        let images = images();
        let theme = Theme::default();
        let mut canvas = Canvas::new(100.0, 100.0);
        let mut node = ElementNode::new(SelementId::from("A"));
        let ctx = ctx(&images, &theme, true);
        node.update_options(
            &element(json!({"selementid": "A", "x": 0, "y": 0, "icon": 1, "label": "a", "elementtype": 0})),
            &ctx,
        )
        .unwrap();
        node.render(&mut canvas);
        node.update_options(
            &element(json!({
                "selementid": "A", "x": 0, "y": 0, "icon": 1, "label": "a", "elementtype": 0,
                "highlight": {"hl": "FF0000"}, "latelyChanged": 1
            })),
            &ctx,
        )
        .unwrap();
        node.render(&mut canvas);
        let order = [
            node.highlight_node(),
            node.selection_node(),
            node.markers_node(),
            node.image_node(),
            node.label_node(),
        ]
        .map(Option::unwrap);
        assert_eq!(canvas.children(node.node().unwrap()), order);
    }

    #[test]
    fn unchanged_options_are_a_noop() {
        let images = images();
        let theme = Theme::default();
        let mut canvas = Canvas::new(100.0, 100.0);
        let mut node = ElementNode::new(SelementId::from("A"));
        let ctx = ctx(&images, &theme, false);
        let options = element(json!({"selementid": "A", "x": 0, "y": 0, "icon": 1, "label": "a"}));
        assert!(node.update_options(&options, &ctx).unwrap());
        node.render(&mut canvas);
        let _ = canvas.commit();
        assert!(!node.update_options(&options, &ctx).unwrap());
        node.render(&mut canvas);
        assert!(canvas.commit().is_empty());
        assert_eq!(node.revision(), 1);
    }

    #[test]
    fn label_edit_keeps_center_and_image() {
        let images = images();
        let theme = Theme::default();
        let mut canvas = Canvas::new(100.0, 100.0);
        let mut node = ElementNode::new(SelementId::from("A"));
        let ctx = ctx(&images, &theme, false);
        node.update_options(
            &element(json!({"selementid": "A", "x": 4, "y": 4, "icon": 1, "label": "a"})),
            &ctx,
        )
        .unwrap();
        node.render(&mut canvas);
        let image = node.image_node();
        let _ = canvas.commit();

        node.update_options(
            &element(json!({"selementid": "A", "x": 4, "y": 4, "icon": 1, "label": "b"})),
            &ctx,
        )
        .unwrap();
        node.render(&mut canvas);
        assert_eq!(node.image_node(), image);
        assert_eq!(node.center(), Some(Point::new(12.0, 12.0)));
        let damage = canvas.commit();
        assert!(!damage.changed.contains(&image.unwrap()), "icon untouched");
    }

    #[test]
    fn unavailable_marker_and_menu() {
        let (canvas, node) = drawn(
            &element(json!({
                "selementid": "A", "x": 0, "y": 0, "icon": 1, "permission": 0,
                "elementtype": 0, "actions": {"type": "map_element"}
            })),
            false,
        );
        let image = canvas.get(node.image_node().unwrap()).unwrap();
        assert_eq!(image.get("href"), Some("imgstore.php?iconid=1&unavailable=1"));
        assert_eq!(image.get("cursor"), Some("pointer"));
        assert!(image.get("data-menu-popup").unwrap().contains("map_element"));
        assert!(image.flags.contains(NodeFlags::PICKABLE));

        let (canvas, node) = drawn(
            &element(json!({
                "selementid": "B", "x": 0, "y": 0, "icon": 1,
                "elementtype": 4, "actions": {"type": "map_element"}
            })),
            false,
        );
        let image = canvas.get(node.image_node().unwrap()).unwrap();
        assert_eq!(image.get("data-menu-popup"), None, "bare image without urls");
    }

    #[test]
    fn shrinking_menu_is_redrawn() {
        let images = images();
        let theme = Theme::default();
        let mut canvas = Canvas::new(100.0, 100.0);
        let mut node = ElementNode::new(SelementId::from("A"));
        let ctx = ctx(&images, &theme, false);
        let with = |actions: Value| {
            element(json!({
                "selementid": "A", "x": 0, "y": 0, "icon": 1, "elementtype": 0, "actions": actions
            }))
        };
        node.update_options(&with(json!({"type": "map_element", "urls": ["a", "b"]})), &ctx)
            .unwrap();
        node.render(&mut canvas);

        let fewer = with(json!({"type": "map_element"}));
        assert!(node.update_options(&fewer, &ctx).unwrap(), "dropped key is a change");
        node.render(&mut canvas);
        let image = canvas.get(node.image_node().unwrap()).unwrap();
        assert!(!image.get("data-menu-popup").unwrap().contains("urls"));
        assert!(!image.flags.contains(NodeFlags::PICKABLE));
    }

    #[test]
    fn selection_ring_and_event() {
        let (mut canvas, mut node) = drawn(
            &element(json!({
                "selementid": "7", "x": 0, "y": 0, "icon": 1,
                "elementtype": 3, "elementid": 42
            })),
            true,
        );
        let ring = node.selection_node().unwrap();
        assert!(!canvas.is_visible(ring));
        assert_eq!(canvas.get(ring).unwrap().get("rx"), Some("28"));
        assert!(node.listeners().contains(Listeners::CLICK));

        node.toggle_selection(&mut canvas, true);
        assert!(canvas.is_visible(ring));
        node.on_mouse_over(&mut canvas);
        node.on_mouse_out(&mut canvas);
        assert!(canvas.is_visible(ring), "selection outlives hover");

        let event = node.select_event();
        assert_eq!(event.selected_element_id.as_str(), "7");
        assert_eq!(event.hostgroupid.as_deref(), Some("42"));
        assert_eq!(event.hostid, None);
    }

    #[test]
    fn invalidate_keeps_identity() {
        let (mut canvas, mut node) = drawn(
            &element(json!({"selementid": "A", "x": 0, "y": 0, "icon": 2, "label": "a"})),
            false,
        );
        let group = node.node().unwrap();
        node.invalidate(&mut canvas);
        assert!(!canvas.is_alive(group));
        assert!(node.node().is_none());
        assert_eq!(node.id().as_str(), "A");
        assert!(node.options().is_some());
        assert_eq!(node.center(), Some(Point::new(24.0, 24.0)));
    }
}
