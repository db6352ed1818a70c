// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-line text blocks anchored at a point.
//!
//! Text is not measured; widths use an average glyph advance, which is enough
//! to size label backdrops and keep blocks aligned.

use kurbo::{Point, Rect};
use sysmap_scene::{Drawable, Tag};

const LINE_HEIGHT: f64 = 1.2;
const GLYPH_ADVANCE: f64 = 0.6;

/// Horizontal anchor of a text block relative to its anchor point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HAnchor {
    Left,
    Center,
    Right,
}

/// Vertical anchor of a text block relative to its anchor point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VAnchor {
    Top,
    Middle,
    Bottom,
}

/// A laid-out block of lines.
#[derive(Clone, Debug)]
pub(crate) struct TextBlock {
    lines: Vec<String>,
    font_size: f64,
    bounds: Rect,
    h: HAnchor,
}

impl TextBlock {
    pub(crate) fn new(text: &str, at: Point, h: HAnchor, v: VAnchor, font_size: f64) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = longest as f64 * font_size * GLYPH_ADVANCE;
        let height = lines.len() as f64 * font_size * LINE_HEIGHT;
        let x0 = match h {
            HAnchor::Left => at.x,
            HAnchor::Center => at.x - width / 2.0,
            HAnchor::Right => at.x - width,
        };
        let y0 = match v {
            VAnchor::Top => at.y,
            VAnchor::Middle => at.y - height / 2.0,
            VAnchor::Bottom => at.y - height,
        };
        Self {
            lines,
            font_size,
            bounds: Rect::new(x0, y0, x0 + width, y0 + height),
            h,
        }
    }

    /// Estimated extent of the block.
    pub(crate) fn bounds(&self) -> Rect {
        self.bounds
    }

    /// `<text>` node with one `<tspan>` per line. Callers add font and fill attributes.
    pub(crate) fn drawable(&self) -> Drawable {
        let (x, anchor) = match self.h {
            HAnchor::Left => (self.bounds.x0, "start"),
            HAnchor::Center => (self.bounds.center().x, "middle"),
            HAnchor::Right => (self.bounds.x1, "end"),
        };
        let mut text = Drawable::new(Tag::Text)
            .attr("text-anchor", anchor)
            .attr("font-size", format!("{}px", self.font_size));
        let mut baseline = self.bounds.y0 + self.font_size;
        for line in &self.lines {
            text = text.child(
                Drawable::new(Tag::Tspan)
                    .attr("x", x)
                    .attr("y", baseline)
                    .text(line.as_str()),
            );
            baseline += self.font_size * LINE_HEIGHT;
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_block_straddles_anchor() {
        let block = TextBlock::new("ab\nabcd", Point::new(100.0, 50.0), HAnchor::Center, VAnchor::Middle, 10.0);
        let b = block.bounds();
        assert!((b.center().x - 100.0).abs() < 1e-9);
        assert!((b.center().y - 50.0).abs() < 1e-9);
        assert!((b.width() - 24.0).abs() < 1e-9, "4 glyphs at 6px");
        let text = block.drawable();
        assert_eq!(text.get("text-anchor"), Some("middle"));
        assert_eq!(text.children.len(), 2);
    }

    #[test]
    fn right_anchor_ends_at_point() {
        let block = TextBlock::new("abc", Point::new(10.0, 0.0), HAnchor::Right, VAnchor::Top, 10.0);
        assert!((block.bounds().x1 - 10.0).abs() < 1e-9);
        assert_eq!(block.drawable().get("text-anchor"), Some("end"));
    }
}
