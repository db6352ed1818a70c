// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The map orchestrator.
//!
//! [`Map`] owns the canvas and every node. Each [`Map::update`] reconciles one
//! payload in a fixed order: invalidation check, z-order sort, image preload,
//! canvas resize, shapes, links and elements, background, timestamp. It ends with
//! a commit whose [`Damage`] is returned to the host.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use indexmap::IndexMap;
use kurbo::Point;
use sysmap_scene::{Canvas, Damage, Drawable, Layer, NodeId, Tag};
use tracing::debug;

use crate::config::{MapConfig, Theme};
use crate::element::{ElementContext, ElementNode, LabelDefaults, Listeners, SelectEvent};
use crate::error::Result;
use crate::image::{ImageCache, ImageSource};
use crate::link::{LinkNode, resolve_endpoints};
use crate::options::{
    BackgroundScale, ElementOptions, ImageId, LinkId, LinkOptions, MapOptions, SelementId,
    ShapeId, ShapeOptions,
};
use crate::shape::ShapeNode;
use crate::text::{HAnchor, TextBlock, VAnchor};

const TIMESTAMP_MARGIN: f64 = 5.0;
const TIMESTAMP_FONT_SIZE: f64 = 10.0;

/// Node collections that can be invalidated explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Elements lose their drawn parts and all links are removed.
    Elements,
    /// All links are removed.
    Links,
    /// Shapes lose their drawn nodes.
    Shapes,
}

/// A network map reconciled against a retained canvas.
///
/// `update` takes `&mut self`, so a second update cannot start while the future
/// of the previous one is alive.
pub struct Map<S: ImageSource> {
    config: MapConfig,
    source: S,
    images: ImageCache,
    canvas: Canvas,
    theme: Theme,
    state: MapOptions,
    elements: IndexMap<SelementId, ElementNode>,
    links: IndexMap<LinkId, LinkNode>,
    shapes: IndexMap<ShapeId, ShapeNode>,
    backdrop: NodeId,
    background: Option<NodeId>,
    grid: Option<NodeId>,
    grid_size: u32,
    timestamp: Option<NodeId>,
    hovered: Option<SelementId>,
    selected: Option<SelementId>,
}

impl<S: ImageSource> core::fmt::Debug for Map<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Map")
            .field("canvas", &self.canvas)
            .field("elements", &self.elements.len())
            .field("links", &self.links.len())
            .field("shapes", &self.shapes.len())
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

fn backdrop_drawable(canvas: &Canvas, theme: &Theme) -> Drawable {
    let size = canvas.size();
    Drawable::new(Tag::Rect)
        .attr("x", 0)
        .attr("y", 0)
        .attr("width", size.width)
        .attr("height", size.height)
        .attr("fill", format!("#{}", theme.backgroundcolor))
}

fn grid_drawable(canvas: &Canvas, theme: &Theme, step: u32) -> Drawable {
    let size = canvas.size();
    let step = f64::from(step);
    let mut group = Drawable::new(Tag::Group)
        .attr("stroke", format!("#{}", theme.gridcolor))
        .attr("stroke-width", 1);
    let mut x = step;
    while x < size.width {
        group = group.child(
            Drawable::new(Tag::Line)
                .attr("x1", x)
                .attr("y1", 0)
                .attr("x2", x)
                .attr("y2", size.height),
        );
        x += step;
    }
    let mut y = step;
    while y < size.height {
        group = group.child(
            Drawable::new(Tag::Line)
                .attr("x1", 0)
                .attr("y1", y)
                .attr("x2", size.width)
                .attr("y2", y),
        );
        y += step;
    }
    group
}

/// Unordered endpoint pair of a link.
fn endpoints(link: &LinkOptions) -> [&SelementId; 2] {
    let mut pair = [&link.selementid1, &link.selementid2];
    pair.sort();
    pair
}

/// Put `drawable` at `slot`: patch the live node in place or insert a new one into `layer`.
fn place(canvas: &mut Canvas, slot: &mut Option<NodeId>, layer: Layer, drawable: Drawable) {
    *slot = match slot.filter(|&id| canvas.is_alive(id)) {
        Some(id) => canvas.patch(id, drawable),
        None => Some(canvas.insert(canvas.layer(layer), drawable)),
    };
}

/// Replace entries of `stored` that share a key with `incoming` and append the rest.
fn upsert<T, K: Eq + Hash>(
    stored: &mut Option<Vec<T>>,
    incoming: Option<Vec<T>>,
    key: impl Fn(&T) -> K,
) {
    let Some(incoming) = incoming else {
        return;
    };
    let mut merged: IndexMap<K, T> = stored
        .take()
        .into_iter()
        .flatten()
        .map(|item| (key(&item), item))
        .collect();
    for item in incoming {
        merged.insert(key(&item), item);
    }
    *stored = Some(merged.into_values().collect());
}

fn clear(canvas: &mut Canvas, slot: &mut Option<NodeId>) {
    if let Some(id) = slot.take() {
        canvas.remove(id);
    }
}

impl<S: ImageSource> Map<S> {
    /// Create an empty map with its layers and theme backdrop.
    ///
    /// Content arrives through [`Map::update`].
    pub fn new(config: MapConfig, source: S) -> Self {
        let mut canvas = Canvas::new(config.canvas.width as f64, config.canvas.height as f64);
        let theme = config.theme.clone();
        let backdrop = canvas.insert(
            canvas.layer(Layer::Background),
            backdrop_drawable(&canvas, &theme),
        );
        Self {
            images: ImageCache::new(config.image_store.clone()),
            selected: config.selected_element_id.clone(),
            config,
            source,
            canvas,
            theme,
            state: MapOptions::default(),
            elements: IndexMap::new(),
            links: IndexMap::new(),
            shapes: IndexMap::new(),
            backdrop,
            background: None,
            grid: None,
            grid_size: 0,
            timestamp: None,
            hovered: None,
        }
    }

    /// Construction-time configuration.
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// The drawing surface.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Current palette.
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Element by id.
    pub fn element(&self, id: &SelementId) -> Option<&ElementNode> {
        self.elements.get(id)
    }

    /// Link by id.
    pub fn link(&self, id: &LinkId) -> Option<&LinkNode> {
        self.links.get(id)
    }

    /// Shape by id.
    pub fn shape(&self, id: &ShapeId) -> Option<&ShapeNode> {
        self.shapes.get(id)
    }

    /// Elements in creation order.
    pub fn elements(&self) -> impl Iterator<Item = &ElementNode> {
        self.elements.values()
    }

    /// Links in creation order.
    pub fn links(&self) -> impl Iterator<Item = &LinkNode> {
        self.links.values()
    }

    /// Shapes in creation order.
    pub fn shapes(&self) -> impl Iterator<Item = &ShapeNode> {
        self.shapes.values()
    }

    /// Currently selected element id.
    pub fn selected(&self) -> Option<&SelementId> {
        self.selected.as_ref()
    }

    /// Background image node, if drawn.
    pub fn background_node(&self) -> Option<NodeId> {
        self.background
    }

    /// Timestamp mark, if drawn.
    pub fn timestamp_node(&self) -> Option<NodeId> {
        self.timestamp
    }

    /// Grid group, if drawn.
    pub fn grid_node(&self) -> Option<NodeId> {
        self.grid
    }

    /// Serialize the whole canvas.
    pub fn to_svg(&self) -> String {
        self.canvas.to_svg()
    }

    /// Commit mutations made outside [`Map::update`] (selection, grid, pointer events).
    pub fn commit(&mut self) -> Damage {
        self.canvas.commit()
    }

    /// Reconcile the scene against `options`.
    ///
    /// With `incremental` set, nodes missing from the payload are kept. The first
    /// error aborts the pass and leaves already-reconciled nodes in their new state.
    pub async fn update(&mut self, mut options: MapOptions, incremental: bool) -> Result<Damage> {
        debug!(
            elements = options.elements.as_ref().map(Vec::len),
            links = options.links.as_ref().map(Vec::len),
            shapes = options.shapes.as_ref().map(Vec::len),
            incremental,
            caller = options.caller.as_deref(),
            "map update"
        );

        if !incremental && options.caller.is_some() && self.needs_invalidation(&options) {
            debug!("element set changed, invalidating elements");
            self.invalidate(Collection::Elements);
        }

        if let Some(elements) = options.elements.as_mut() {
            elements.sort_by_key(|e| e.zindex);
        }
        if let Some(shapes) = options.shapes.as_mut() {
            shapes.sort_by_key(|s| s.zindex);
        }

        let icons: Vec<ImageId> = options
            .elements
            .iter()
            .flatten()
            .map(|e| e.icon)
            .chain(options.background)
            .collect();
        self.images.preload(&self.source, icons).await;

        let resized = options
            .canvas
            .is_some_and(|c| self.canvas.resize(c.width as f64, c.height as f64));
        let rethemed = options.theme.as_ref().is_some_and(|t| *t != self.theme);
        if let Some(theme) = options.theme.clone() {
            self.theme = theme;
        }
        if resized || rethemed {
            let backdrop = backdrop_drawable(&self.canvas, &self.theme);
            self.canvas.set_attributes(self.backdrop, backdrop.attributes);
            self.redraw_grid();
        }

        self.update_shapes(options.shapes.as_deref(), incremental)?;
        self.update_elements(&options, incremental)?;
        self.update_background(&options, resized);
        self.update_timestamp(&options);

        self.merge(options, incremental);
        let mut damage = self.canvas.commit();

        let pending: Vec<String> = damage
            .added
            .iter()
            .filter_map(|&id| self.canvas.get(id))
            .filter(|d| d.tag == Tag::Image)
            .filter_map(|d| d.get("href"))
            .filter(|href| !self.images.is_loaded(href))
            .map(str::to_owned)
            .collect();
        self.images.load_urls(&self.source, pending).await;

        if let Some(selected) = self.selected.clone() {
            self.apply_selection(&selected);
        }
        damage.extend(self.canvas.commit());
        Ok(damage)
    }

    /// Whether a live refresh changed the element set enough to redraw everything.
    fn needs_invalidation(&self, options: &MapOptions) -> bool {
        if let Some(elements) = &options.elements {
            let previous = self.state.elements.as_deref().unwrap_or_default();
            if elements.len() != previous.len() {
                return true;
            }
            let zindex: HashMap<&SelementId, i64> =
                previous.iter().map(|e| (&e.selementid, e.zindex)).collect();
            if elements
                .iter()
                .any(|e| zindex.get(&e.selementid).is_some_and(|&z| z != e.zindex))
            {
                return true;
            }
        }
        if let Some(duplicated) = &options.duplicated_links {
            let previous = self.state.duplicated_links.as_deref().unwrap_or_default();
            if duplicated.len() != previous.len() {
                return true;
            }
        }
        if let Some(links) = &options.links {
            let previous = self.state.links.as_deref().unwrap_or_default();
            if links.len() != previous.len() {
                return true;
            }
            let pairs: HashMap<&LinkId, [&SelementId; 2]> =
                previous.iter().map(|l| (&l.linkid, endpoints(l))).collect();
            if links
                .iter()
                .any(|l| pairs.get(&l.linkid).is_some_and(|&p| p != endpoints(l)))
            {
                return true;
            }
        }
        false
    }

    /// Drop drawn state of a collection so the next update redraws it.
    pub fn invalidate(&mut self, collection: Collection) {
        debug!(?collection, "invalidate");
        match collection {
            Collection::Elements => {
                for element in self.elements.values_mut() {
                    element.invalidate(&mut self.canvas);
                }
                self.hovered = None;
                self.remove_links();
            }
            Collection::Links => self.remove_links(),
            Collection::Shapes => {
                for shape in self.shapes.values_mut() {
                    shape.invalidate(&mut self.canvas);
                }
            }
        }
    }

    fn remove_links(&mut self) {
        for (_, mut link) in self.links.drain(..) {
            link.remove(&mut self.canvas);
        }
    }

    fn update_shapes(&mut self, payload: Option<&[ShapeOptions]>, incremental: bool) -> Result<()> {
        if let (Some(shapes), false) = (payload, incremental) {
            let keep: HashSet<&ShapeId> = shapes.iter().map(|s| &s.sysmap_shapeid).collect();
            let canvas = &mut self.canvas;
            self.shapes.retain(|id, shape| {
                let keep = keep.contains(id);
                if !keep {
                    debug!(shape = %id, "removing shape");
                    shape.remove(canvas);
                }
                keep
            });
        }
        let stored;
        let shapes = match payload {
            Some(shapes) => shapes,
            None => {
                stored = self.state.shapes.clone().unwrap_or_default();
                &stored[..]
            }
        };
        for options in shapes {
            self.shapes
                .entry(options.sysmap_shapeid.clone())
                .or_insert_with(|| ShapeNode::new(options.sysmap_shapeid.clone()))
                .update(options, &mut self.canvas)?;
        }
        Ok(())
    }

    fn update_elements(&mut self, options: &MapOptions, incremental: bool) -> Result<()> {
        let elements: Vec<ElementOptions> = match &options.elements {
            Some(elements) => elements.clone(),
            None => self.state.elements.clone().unwrap_or_default(),
        };
        let links: Vec<LinkOptions> = match options.all_links() {
            Some(links) => links.into_iter().cloned().collect(),
            None => self
                .state
                .all_links()
                .map(|links| links.into_iter().cloned().collect())
                .unwrap_or_default(),
        };

        if !incremental {
            if options.elements.is_some() {
                let keep: HashSet<&SelementId> = elements.iter().map(|e| &e.selementid).collect();
                let canvas = &mut self.canvas;
                let hovered = &mut self.hovered;
                self.elements.retain(|id, element| {
                    let keep = keep.contains(id);
                    if !keep {
                        debug!(element = %id, "removing element");
                        if hovered.as_ref() == Some(id) {
                            *hovered = None;
                        }
                        element.remove(canvas);
                    }
                    keep
                });
            }
            if options.all_links().is_some() {
                let keep: HashSet<&LinkId> = links.iter().map(|l| &l.linkid).collect();
                let canvas = &mut self.canvas;
                self.links.retain(|id, link| {
                    let keep = keep.contains(id);
                    if !keep {
                        debug!(link = %id, "removing link");
                        link.remove(canvas);
                    }
                    keep
                });
            }
        }

        let ctx = ElementContext {
            images: &self.images,
            theme: &self.theme,
            labels: LabelDefaults {
                location: options
                    .label_location
                    .or(self.state.label_location)
                    .unwrap_or_default(),
                show: options
                    .show_element_label
                    .or(self.state.show_element_label)
                    .unwrap_or_default(),
                label_type: options.label_type.or(self.state.label_type),
            },
            can_select: self.config.can_select_element,
        };
        for e in &elements {
            let element = self
                .elements
                .entry(e.selementid.clone())
                .or_insert_with(|| ElementNode::new(e.selementid.clone()));
            if element.update_options(e, &ctx)? {
                debug!(element = %e.selementid, revision = element.revision(), "element changed");
            }
        }

        let aliases: HashMap<&SelementId, &SelementId> = elements
            .iter()
            .filter_map(|e| Some((e.selementid_orig.as_ref()?, &e.selementid)))
            .filter(|(orig, id)| orig != id)
            .collect();

        let mut drawn: HashSet<&LinkId> = HashSet::new();
        for e in &elements {
            let id = &e.selementid;
            let below = self.elements.get(id).and_then(ElementNode::node);
            for link in links.iter().filter(|l| {
                l.touches(id) || e.selementid_orig.as_ref().is_some_and(|o| l.touches(o))
            }) {
                if drawn.insert(&link.linkid) {
                    self.draw_link(link, &aliases, below)?;
                }
            }
            if let Some(element) = self.elements.get_mut(id) {
                element.render(&mut self.canvas);
            }
        }
        for link in &links {
            if drawn.insert(&link.linkid) {
                self.draw_link(link, &aliases, None)?;
            }
        }
        Ok(())
    }

    fn draw_link(
        &mut self,
        options: &LinkOptions,
        aliases: &HashMap<&SelementId, &SelementId>,
        below: Option<NodeId>,
    ) -> Result<()> {
        let elements = &self.elements;
        let shapes = &self.shapes;
        let resolved = resolve_endpoints(
            &options.selementid1,
            &options.selementid2,
            |id| {
                let id = aliases.get(id).copied().unwrap_or(id);
                elements.get(id)?.center()
            },
            |id| {
                let shape = shapes.get(&ShapeId::from(id.as_str()))?;
                Some(shape.options()?.center())
            },
        );
        let Some(ends) = resolved else {
            if let Some(mut link) = self.links.shift_remove(&options.linkid) {
                debug!(link = %options.linkid, "link endpoint missing, removing link");
                link.remove(&mut self.canvas);
            }
            return Ok(());
        };
        self.links
            .entry(options.linkid.clone())
            .or_insert_with(|| LinkNode::new(options.linkid.clone()))
            .update(options, ends, &self.theme, &mut self.canvas, below)?;
        Ok(())
    }

    fn update_background(&mut self, options: &MapOptions, resized: bool) {
        if options.background.is_none() && options.background_scale.is_none() && !resized {
            return;
        }
        let id = options.background.or(self.state.background);
        let scale = options
            .background_scale
            .or(self.state.background_scale)
            .unwrap_or_default();
        let Some(id) = id.filter(|id| !id.is_none()) else {
            clear(&mut self.canvas, &mut self.background);
            return;
        };
        let Some(natural) = self.images.get(id) else {
            debug!(%id, "background image not loaded");
            clear(&mut self.canvas, &mut self.background);
            return;
        };
        let mut image = Drawable::new(Tag::Image)
            .attr("x", 0)
            .attr("y", 0)
            .attr("href", self.images.url(id));
        image = match scale {
            BackgroundScale::Cover => {
                let size = self.canvas.size();
                image
                    .attr("width", size.width)
                    .attr("height", size.height)
                    .attr("preserveAspectRatio", "xMidYMid slice")
            }
            BackgroundScale::Natural => image
                .attr("width", natural.width)
                .attr("height", natural.height),
        };
        place(
            &mut self.canvas,
            &mut self.background,
            Layer::Background,
            image,
        );
    }

    fn update_timestamp(&mut self, options: &MapOptions) {
        let show = options
            .show_timestamp
            .or(self.state.show_timestamp)
            .unwrap_or(self.config.show_timestamp);
        let text = options
            .timestamp
            .as_deref()
            .or(self.state.timestamp.as_deref())
            .unwrap_or_default();
        if !show || text.is_empty() {
            clear(&mut self.canvas, &mut self.timestamp);
            return;
        }
        let size = self.canvas.size();
        let mark = TextBlock::new(
            text,
            Point::new(size.width - TIMESTAMP_MARGIN, size.height - TIMESTAMP_MARGIN),
            HAnchor::Right,
            VAnchor::Bottom,
            TIMESTAMP_FONT_SIZE,
        )
        .drawable()
        .attr("fill", format!("#{}", self.theme.textcolor));
        place(&mut self.canvas, &mut self.timestamp, Layer::Marks, mark);
    }

    /// Fold a pass into the stored state. Incremental passes upsert collections by id.
    fn merge(&mut self, mut options: MapOptions, incremental: bool) {
        if incremental {
            let state = &mut self.state;
            upsert(&mut state.elements, options.elements.take(), |e| e.selementid.clone());
            upsert(&mut state.links, options.links.take(), |l| l.linkid.clone());
            upsert(&mut state.duplicated_links, options.duplicated_links.take(), |l| {
                l.linkid.clone()
            });
            upsert(&mut state.shapes, options.shapes.take(), |s| s.sysmap_shapeid.clone());
            if let Some(elements) = state.elements.as_mut() {
                elements.sort_by_key(|e| e.zindex);
            }
            if let Some(shapes) = state.shapes.as_mut() {
                shapes.sort_by_key(|s| s.zindex);
            }
        }
        macro_rules! merge {
            ($($field:ident),+ $(,)?) => {
                $(if options.$field.is_some() {
                    self.state.$field = options.$field;
                })+
            };
        }
        merge!(
            caller,
            canvas,
            theme,
            elements,
            links,
            duplicated_links,
            shapes,
            background,
            background_scale,
            label_location,
            show_element_label,
            label_type,
            show_timestamp,
            timestamp,
        );
    }

    /// Draw grid lines every `size` pixels; `0` removes the grid.
    pub fn set_grid(&mut self, size: u32) {
        self.grid_size = size;
        self.redraw_grid();
    }

    fn redraw_grid(&mut self) {
        clear(&mut self.canvas, &mut self.grid);
        if self.grid_size > 0 {
            let grid = grid_drawable(&self.canvas, &self.theme, self.grid_size);
            self.grid = Some(self.canvas.insert(self.canvas.layer(Layer::Grid), grid));
        }
    }

    /// Select exactly one element, clearing the selection ring of every other one.
    pub fn select(&mut self, id: &SelementId) {
        self.selected = Some(id.clone());
        self.apply_selection(id);
    }

    fn apply_selection(&mut self, id: &SelementId) {
        for element in self.elements.values_mut() {
            let selected = element.id() == id;
            element.toggle_selection(&mut self.canvas, selected);
        }
    }

    /// Element currently under the pointer, as tracked by [`Map::pointer_move`].
    pub fn hovered(&self) -> Option<&SelementId> {
        self.hovered.as_ref()
    }

    /// Element whose group lies on the hit path under `pt`.
    fn element_at(&self, pt: Point) -> Option<SelementId> {
        let hit = self.canvas.hit_test(pt)?;
        hit.path.iter().rev().find_map(|&node| {
            self.elements
                .values()
                .find(|e| e.node() == Some(node))
                .map(|e| e.id().clone())
        })
    }

    /// Route a pointer move: fires the mouse-out behaviour of the element the
    /// pointer left and the mouse-over behaviour of the one it entered.
    pub fn pointer_move(&mut self, pt: Point) {
        let target = self.element_at(pt);
        if target == self.hovered {
            return;
        }
        if let Some(element) = self.hovered.take().and_then(|id| self.elements.get_mut(&id)) {
            element.on_mouse_out(&mut self.canvas);
        }
        if let Some(element) = target.as_ref().and_then(|id| self.elements.get_mut(id)) {
            element.on_mouse_over(&mut self.canvas);
        }
        self.hovered = target;
    }

    /// Route a click. Clicking a selectable element selects it and returns the
    /// `element.select` event for the host.
    pub fn click(&mut self, pt: Point) -> Option<SelectEvent> {
        let id = self.element_at(pt)?;
        let element = self.elements.get(&id)?;
        if !element.listeners().contains(Listeners::CLICK) {
            return None;
        }
        let event = element.select_event();
        debug!(element = %event.selected_element_id, "element selected");
        self.select(&event.selected_element_id);
        Some(event)
    }
}
