// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction-time configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lenient;
use crate::options::SelementId;

/// Logical drawing surface size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CanvasSize {
    /// Width.
    #[serde(deserialize_with = "lenient::int")]
    pub width: i64,
    /// Height.
    #[serde(deserialize_with = "lenient::int")]
    pub height: i64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

fn default_background_color() -> String {
    String::from("FFFFFF")
}

fn default_grid_color() -> String {
    String::from("CCD5D9")
}

fn default_text_color() -> String {
    String::from("1F2C33")
}

/// Color palette; colors are hex strings without `#`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Theme {
    /// Canvas fill; also the label backdrop of links.
    #[serde(default = "default_background_color")]
    pub backgroundcolor: String,
    /// Grid lines.
    #[serde(default = "default_grid_color")]
    pub gridcolor: String,
    /// Labels and the timestamp mark.
    #[serde(default = "default_text_color")]
    pub textcolor: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            backgroundcolor: default_background_color(),
            gridcolor: default_grid_color(),
            textcolor: default_text_color(),
        }
    }
}

fn default_image_store() -> String {
    String::from("imgstore.php")
}

/// Everything a [`Map`](crate::Map) needs before its first update.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MapConfig {
    /// Initial canvas size.
    #[serde(default)]
    pub canvas: CanvasSize,
    /// Initial palette.
    #[serde(default)]
    pub theme: Theme,
    /// Whether host and host-group elements react to clicks and show a selection ring.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub can_select_element: bool,
    /// Element selected right after construction.
    #[serde(default)]
    pub selected_element_id: Option<SelementId>,
    /// Whether the timestamp footer mark is shown.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub show_timestamp: bool,
    /// Image endpoint; icons resolve to `<image_store>?iconid=<id>`.
    #[serde(default = "default_image_store")]
    pub image_store: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasSize::default(),
            theme: Theme::default(),
            can_select_element: false,
            selected_element_id: None,
            show_timestamp: false,
            image_store: default_image_store(),
        }
    }
}

impl MapConfig {
    /// Parse a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = MapConfig::from_json(
            r#"{"canvas": {"width": "1024", "height": 768}, "can_select_element": 1}"#,
        )
        .unwrap();
        assert_eq!(
            config.canvas,
            CanvasSize {
                width: 1024,
                height: 768
            }
        );
        assert!(config.can_select_element);
        assert!(!config.show_timestamp);
        assert_eq!(config.theme, Theme::default());
        assert_eq!(config.image_store, "imgstore.php");
    }
}
