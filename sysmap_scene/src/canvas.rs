// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core canvas implementation: structure, mutations, queries.

use alloc::string::String;
use alloc::vec::Vec;
use kurbo::{Point, Rect, Size};

use crate::damage::Damage;
use crate::types::{Attributes, Drawable, Layer, NodeFlags, NodeId, Tag};

/// Retained drawing surface made of fixed layers of drawable nodes.
pub struct Canvas {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    layers: [NodeId; 5],
    size: Size,
    epoch: u64,
    removed: Vec<NodeId>,
}

impl core::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.len();
        let free = self.free_list.len();
        f.debug_struct("Canvas")
            .field("size", &self.size)
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

/// Results of a hit test.
#[derive(Clone, Debug)]
pub struct Hit {
    /// The matched node.
    pub node: NodeId,
    /// Path from the layer group to node (inclusive).
    pub path: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub(crate) drawable: Drawable,
    // Inserted since the last commit.
    fresh: bool,
    dirty: bool,
}

impl Node {
    fn new(generation: u32, drawable: Drawable) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            drawable,
            fresh: true,
            dirty: false,
        }
    }
}

impl Canvas {
    /// Create a canvas of the given logical size with its empty layers attached.
    pub fn new(width: f64, height: f64) -> Self {
        let mut canvas = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            layers: [NodeId::new(0, 0); 5],
            size: Size::new(width, height),
            epoch: 0,
            removed: Vec::new(),
        };
        for layer in Layer::ALL {
            let group = Drawable::new(Tag::Group).attr("class", layer.class_name());
            canvas.layers[layer.idx()] = canvas.alloc(group);
        }
        canvas
    }

    /// Logical drawing surface size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Resize the surface. Returns true if the size actually changed.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        let size = Size::new(width, height);
        if size == self.size {
            return false;
        }
        self.size = size;
        true
    }

    /// Group node of a layer.
    pub fn layer(&self, layer: Layer) -> NodeId {
        self.layers[layer.idx()]
    }

    /// Number of live nodes, layer groups included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns true if no node besides the layer groups is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == self.layers.len()
    }

    fn alloc(&mut self, drawable: Drawable) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, drawable));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId slots are 32-bit."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, drawable)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId slots are 32-bit."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        NodeId::new(idx, generation)
    }

    fn insert_at(&mut self, parent: NodeId, index: Option<usize>, mut drawable: Drawable) -> NodeId {
        let children = core::mem::take(&mut drawable.children);
        let id = self.alloc(drawable);
        if let Some(p) = self.node_opt_mut(parent) {
            match index {
                Some(i) if i <= p.children.len() => p.children.insert(i, id),
                _ => p.children.push(id),
            }
            self.node_mut(id).parent = Some(parent);
        }
        for child in children {
            self.insert_at(id, None, child);
        }
        id
    }

    /// Append `drawable` (and its children) as the last child of `parent`.
    pub fn insert(&mut self, parent: NodeId, drawable: Drawable) -> NodeId {
        self.insert_at(parent, None, drawable)
    }

    /// Insert `drawable` right before `sibling`. Returns `None` if `sibling` is stale or a layer.
    pub fn insert_before(&mut self, sibling: NodeId, drawable: Drawable) -> Option<NodeId> {
        let parent = self.node_opt(sibling)?.parent?;
        let index = self.position(parent, sibling)?;
        Some(self.insert_at(parent, Some(index), drawable))
    }

    /// Replace a node (and its subtree) with `drawable`, keeping its position among its siblings.
    ///
    /// The old handle becomes stale. Returns `None` if `id` is stale or a layer.
    pub fn replace(&mut self, id: NodeId, drawable: Drawable) -> Option<NodeId> {
        let parent = self.node_opt(id)?.parent?;
        let index = self.position(parent, id)?;
        self.remove(id);
        Some(self.insert_at(parent, Some(index), drawable))
    }

    /// Bring a node (and its subtree) in line with `drawable`.
    ///
    /// When tags and child counts match at every depth the live nodes are kept and
    /// only those whose content differs are marked changed. Otherwise this is
    /// [`Canvas::replace`]. Returns the handle now holding the content, or `None`
    /// if `id` is stale or a layer.
    pub fn patch(&mut self, id: NodeId, drawable: Drawable) -> Option<NodeId> {
        if !self.is_alive(id) || self.layers.contains(&id) {
            return None;
        }
        if !self.same_structure(id, &drawable) {
            return self.replace(id, drawable);
        }
        self.patch_in_place(id, drawable);
        Some(id)
    }

    fn same_structure(&self, id: NodeId, drawable: &Drawable) -> bool {
        let node = self.node(id);
        node.drawable.tag == drawable.tag
            && node.children.len() == drawable.children.len()
            && node
                .children
                .iter()
                .zip(&drawable.children)
                .all(|(&child, d)| self.same_structure(child, d))
    }

    fn patch_in_place(&mut self, id: NodeId, mut drawable: Drawable) {
        let children = core::mem::take(&mut drawable.children);
        self.modify(id, |d| {
            if *d == drawable {
                return false;
            }
            *d = drawable;
            true
        });
        let ids = self.node(id).children.clone();
        for (child, d) in ids.into_iter().zip(children) {
            self.patch_in_place(child, d);
        }
    }

    /// Remove a node (and its subtree). Layer groups cannot be removed.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) || self.layers.contains(&id) {
            return;
        }
        if let Some(parent) = self.node(id).parent {
            if let Some(p) = self.node_opt_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let children = core::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.free_subtree(child);
        }
        if !self.node(id).fresh {
            self.removed.push(id);
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Remove every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let Some(node) = self.node_opt(id) else {
            return;
        };
        for child in node.children.clone() {
            self.remove(child);
        }
    }

    /// Replace the whole attribute set. Returns true if anything differed.
    pub fn set_attributes(&mut self, id: NodeId, attributes: Attributes) -> bool {
        self.modify(id, |d| {
            if d.attributes == attributes {
                return false;
            }
            d.attributes = attributes;
            true
        })
    }

    /// Set a single attribute. Returns true if the value differed.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: String) -> bool {
        self.modify(id, |d| {
            if d.get(name) == Some(value.as_str()) {
                return false;
            }
            d.attributes.insert(String::from(name), value);
            true
        })
    }

    /// Set text content. Returns true if it differed.
    pub fn set_text(&mut self, id: NodeId, text: Option<String>) -> bool {
        self.modify(id, |d| {
            if d.text == text {
                return false;
            }
            d.text = text;
            true
        })
    }

    /// Update hit-test bounds. Returns true if they differed.
    pub fn set_bounds(&mut self, id: NodeId, bounds: Option<Rect>) -> bool {
        self.modify(id, |d| {
            if d.bounds == bounds {
                return false;
            }
            d.bounds = bounds;
            true
        })
    }

    /// Update flags. Returns true if they differed.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) -> bool {
        self.modify(id, |d| {
            if d.flags == flags {
                return false;
            }
            d.flags = flags;
            true
        })
    }

    /// Toggle [`NodeFlags::VISIBLE`]. Returns true if visibility changed.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        let Some(node) = self.node_opt(id) else {
            return false;
        };
        let mut flags = node.drawable.flags;
        flags.set(NodeFlags::VISIBLE, visible);
        self.set_flags(id, flags)
    }

    fn modify(&mut self, id: NodeId, f: impl FnOnce(&mut Drawable) -> bool) -> bool {
        let Some(node) = self.node_opt_mut(id) else {
            return false;
        };
        let changed = f(&mut node.drawable);
        node.dirty |= changed;
        changed
    }

    /// Drawable content of a live node.
    pub fn get(&self, id: NodeId) -> Option<&Drawable> {
        self.node_opt(id).map(|n| &n.drawable)
    }

    /// Children of a node in paint order. Empty for stale handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node_opt(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Parent of a node, `None` for layer groups and stale handles.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id)?.parent
    }

    /// Returns true if the node and all of its ancestors are visible.
    pub fn is_visible(&self, mut id: NodeId) -> bool {
        loop {
            let Some(node) = self.node_opt(id) else {
                return false;
            };
            if !node.drawable.flags.contains(NodeFlags::VISIBLE) {
                return false;
            }
            match node.parent {
                Some(parent) => id = parent,
                None => return true,
            }
        }
    }

    /// Commit pending mutations and return the damage accumulated since the previous commit.
    pub fn commit(&mut self) -> Damage {
        self.epoch = self.epoch.wrapping_add(1);
        let mut damage = Damage {
            removed: core::mem::take(&mut self.removed),
            ..Default::default()
        };
        for (i, slot) in self.nodes.iter_mut().enumerate() {
            let Some(node) = slot else {
                continue;
            };
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId slots are 32-bit."
            )]
            let id = NodeId::new(i as u32, node.generation);
            if node.fresh {
                if !self.layers.contains(&id) {
                    damage.added.push(id);
                }
            } else if node.dirty {
                damage.changed.push(id);
            }
            node.fresh = false;
            node.dirty = false;
        }
        damage
    }

    /// Returns the topmost visible, pickable node whose bounds contain `pt`.
    ///
    /// Paint order decides: later layers beat earlier ones, later siblings beat earlier ones,
    /// and descendants beat their ancestors.
    pub fn hit_test(&self, pt: Point) -> Option<Hit> {
        let mut path = Vec::new();
        let mut best = None;
        for layer in self.layers {
            self.hit_recursive(layer, pt, &mut path, &mut best);
        }
        best.map(|path: Vec<NodeId>| Hit {
            node: path[path.len() - 1],
            path,
        })
    }

    fn hit_recursive(
        &self,
        id: NodeId,
        pt: Point,
        path: &mut Vec<NodeId>,
        best: &mut Option<Vec<NodeId>>,
    ) {
        let Some(node) = self.node_opt(id) else {
            return;
        };
        let flags = node.drawable.flags;
        if !flags.contains(NodeFlags::VISIBLE) {
            return;
        }
        path.push(id);
        if flags.contains(NodeFlags::PICKABLE)
            && node.drawable.bounds.is_some_and(|b| b.contains(pt))
        {
            *best = Some(path.clone());
        }
        for &child in &node.children {
            self.hit_recursive(child, pt, path, best);
        }
        path.pop();
    }

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node_opt(parent)?.children.iter().position(|&c| c == child)
    }

    /// Access a node; panics if `id` is stale.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a node mutably; panics if `id` is stale.
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    pub(crate) fn node_opt(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .filter(|n| n.generation == id.1)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.idx())
            .and_then(|n| n.as_mut())
            .filter(|n| n.generation == id.1)
    }

    pub(crate) fn layer_ids(&self) -> [NodeId; 5] {
        self.layers
    }

    pub(crate) fn child_ids(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Drawable {
        Drawable::new(Tag::Rect)
            .attr("x", x)
            .attr("y", y)
            .attr("width", w)
            .attr("height", h)
            .bounds(Rect::new(x, y, x + w, y + h))
            .flags(NodeFlags::VISIBLE | NodeFlags::PICKABLE)
    }

    #[test]
    fn layers_exist_and_are_not_damage() {
        let mut canvas = Canvas::new(100.0, 100.0);
        assert_eq!(canvas.len(), 5);
        assert!(canvas.is_empty());
        assert!(canvas.commit().is_empty());
        let layer = canvas.layer(Layer::Elements);
        canvas.remove(layer);
        assert!(canvas.is_alive(layer), "layers survive removal");
    }

    #[test]
    fn insert_with_children_and_commit() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let group = canvas.insert(
            canvas.layer(Layer::Shapes),
            Drawable::new(Tag::Group).child(rect(0.0, 0.0, 10.0, 10.0)),
        );
        assert_eq!(canvas.children(group).len(), 1);
        assert!(canvas.get(group).unwrap().children.is_empty());
        let damage = canvas.commit();
        assert_eq!(damage.added.len(), 2);
        assert!(canvas.commit().is_empty());
    }

    #[test]
    fn unchanged_setters_produce_no_damage() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let id = canvas.insert(canvas.layer(Layer::Shapes), rect(0.0, 0.0, 10.0, 10.0));
        let _ = canvas.commit();
        let attrs = canvas.get(id).unwrap().attributes.clone();
        assert!(!canvas.set_attributes(id, attrs));
        assert!(!canvas.set_visible(id, true));
        assert!(!canvas.set_text(id, None));
        assert!(canvas.commit().is_empty());

        assert!(canvas.set_attribute(id, "fill", String::from("#ff0000")));
        assert_eq!(canvas.commit().changed, vec![id]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let layer = canvas.layer(Layer::Elements);
        let a = canvas.insert(layer, rect(0.0, 0.0, 1.0, 1.0));
        let b = canvas.insert(layer, rect(1.0, 0.0, 1.0, 1.0));
        let c = canvas.insert(layer, rect(2.0, 0.0, 1.0, 1.0));
        let _ = canvas.commit();
        let b2 = canvas.replace(b, Drawable::new(Tag::Ellipse)).unwrap();
        assert!(!canvas.is_alive(b));
        assert_eq!(canvas.children(layer), &[a, b2, c]);
        let damage = canvas.commit();
        assert_eq!(damage.added, vec![b2]);
        assert_eq!(damage.removed, vec![b]);
    }

    #[test]
    fn patch_keeps_matching_subtrees() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let layer = canvas.layer(Layer::Marks);
        let text = |s: &str| {
            Drawable::new(Tag::Text)
                .attr("x", 5)
                .child(Drawable::new(Tag::Tspan).text(s))
        };
        let id = canvas.insert(layer, text("noon"));
        let tspan = canvas.children(id)[0];
        let _ = canvas.commit();

        assert_eq!(canvas.patch(id, text("noon")), Some(id));
        assert!(canvas.commit().is_empty(), "identical subtree is untouched");

        assert_eq!(canvas.patch(id, text("dusk")), Some(id));
        assert_eq!(canvas.commit().changed, vec![tspan]);
        assert_eq!(canvas.get(tspan).unwrap().text.as_deref(), Some("dusk"));

        let two_lines = text("a").child(Drawable::new(Tag::Tspan).text("b"));
        let replaced = canvas.patch(id, two_lines).unwrap();
        assert_ne!(replaced, id, "structure change replaces the node");
        assert_eq!(canvas.children(layer), &[replaced]);
        assert_eq!(canvas.patch(layer, Drawable::new(Tag::Group)), None);
    }

    #[test]
    fn insert_before_sibling() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let layer = canvas.layer(Layer::Elements);
        let a = canvas.insert(layer, rect(0.0, 0.0, 1.0, 1.0));
        let b = canvas.insert_before(a, rect(1.0, 0.0, 1.0, 1.0)).unwrap();
        assert_eq!(canvas.children(layer), &[b, a]);
        assert!(canvas.insert_before(layer, Drawable::new(Tag::Group)).is_none());
    }

    #[test]
    fn insert_then_remove_within_batch_is_invisible() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let id = canvas.insert(canvas.layer(Layer::Shapes), rect(0.0, 0.0, 10.0, 10.0));
        canvas.remove(id);
        assert!(canvas.commit().is_empty());
    }

    #[test]
    fn liveness_insert_remove_reuse() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let layer = canvas.layer(Layer::Shapes);
        let id1 = canvas.insert(layer, rect(0.0, 0.0, 10.0, 10.0));
        canvas.remove(id1);
        let id2 = canvas.insert(layer, rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(id1.idx(), id2.idx(), "slot is reused");
        assert_ne!(id1, id2, "generation differs");
        assert!(!canvas.is_alive(id1));
        assert!(canvas.is_alive(id2));
        assert!(!canvas.set_visible(id1, false), "stale handles are ignored");
    }

    #[test]
    fn hit_test_prefers_paint_order() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let shapes = canvas.layer(Layer::Shapes);
        let elements = canvas.layer(Layer::Elements);
        let below = canvas.insert(elements, rect(0.0, 0.0, 50.0, 50.0));
        let above = canvas.insert(elements, rect(10.0, 10.0, 50.0, 50.0));
        let _shape = canvas.insert(shapes, rect(0.0, 0.0, 100.0, 100.0));

        let hit = canvas.hit_test(Point::new(20.0, 20.0)).unwrap();
        assert_eq!(hit.node, above);
        assert_eq!(hit.path, vec![elements, above]);

        let hit = canvas.hit_test(Point::new(5.0, 5.0)).unwrap();
        assert_eq!(hit.node, below);

        canvas.set_visible(above, false);
        let hit = canvas.hit_test(Point::new(20.0, 20.0)).unwrap();
        assert_eq!(hit.node, below);
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let group = canvas.insert(
            canvas.layer(Layer::Elements),
            Drawable::new(Tag::Group).child(rect(0.0, 0.0, 10.0, 10.0)),
        );
        let child = canvas.children(group)[0];
        assert!(canvas.is_visible(child));
        canvas.set_visible(group, false);
        assert!(!canvas.is_visible(child));
        assert!(canvas.hit_test(Point::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn resize_reports_change() {
        let mut canvas = Canvas::new(100.0, 100.0);
        assert!(!canvas.resize(100.0, 100.0));
        assert!(canvas.resize(200.0, 100.0));
        assert_eq!(canvas.size(), Size::new(200.0, 100.0));
    }
}
