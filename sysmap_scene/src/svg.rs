// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SVG serialization of a [`Canvas`].

use alloc::format;
use alloc::string::String;

use crate::canvas::Canvas;
use crate::types::{NodeFlags, NodeId};

impl Canvas {
    /// Serialize the live scene to an SVG document.
    ///
    /// Hidden nodes are emitted with `display="none"` so the output mirrors the
    /// retained state; pickability and bounds are not serialized.
    pub fn to_svg(&self) -> String {
        let size = self.size();
        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = size.width,
            h = size.height,
        );
        for layer in self.layer_ids() {
            self.write_node(&mut out, layer);
        }
        out.push_str("</svg>");
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        let d = &self.node(id).drawable;
        let name = d.tag.name();
        out.push('<');
        out.push_str(name);
        for (key, value) in &d.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_into(out, value);
            out.push('"');
        }
        if !d.flags.contains(NodeFlags::VISIBLE) {
            out.push_str(r#" display="none""#);
        }
        let children = self.child_ids(id);
        if children.is_empty() && d.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &d.text {
            escape_into(out, text);
        }
        for &child in children {
            self.write_node(out, child);
        }
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}

fn escape_into(out: &mut String, raw: &str) {
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

#[cfg(test)]
mod tests {
    use crate::{Canvas, Drawable, Layer, Tag};

    #[test]
    fn serializes_layers_in_paint_order() {
        let canvas = Canvas::new(320.0, 200.0);
        let svg = canvas.to_svg();
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="320" height="200""#));
        let bg = svg.find("map-background").unwrap();
        let marks = svg.find("map-marks").unwrap();
        assert!(bg < marks);
    }

    #[test]
    fn escapes_text_and_attributes() {
        let mut canvas = Canvas::new(10.0, 10.0);
        let id = canvas.insert(
            canvas.layer(Layer::Marks),
            Drawable::new(Tag::Text).attr("data-x", "a\"b").text("<R&D>"),
        );
        canvas.set_visible(id, false);
        let svg = canvas.to_svg();
        assert!(svg.contains(r#"<text data-x="a&quot;b" display="none">&lt;R&amp;D&gt;</text>"#));
    }
}
