// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image resolution and preloading.
//!
//! Drawing reads the natural size of every icon, so all images referenced by an
//! update are loaded before any node is touched.

use std::collections::HashMap;
use std::future::Future;

use futures::future::join_all;
use kurbo::Size;
use tracing::debug;

use crate::options::ImageId;

/// Something that can fetch an image and report its natural size.
///
/// This is the seam to whatever actually downloads images: a browser image
/// cache, an HTTP client, or a fixed table.
pub trait ImageSource {
    /// Fetch `url`, resolving to the natural size or `None` if it cannot be loaded.
    fn load(&self, url: &str) -> impl Future<Output = Option<Size>>;
}

/// In-memory [`ImageSource`] with sizes known up front.
#[derive(Clone, Debug, Default)]
pub struct StaticImages {
    sizes: HashMap<String, Size>,
}

impl StaticImages {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the natural size of `url`.
    pub fn insert(&mut self, url: impl Into<String>, size: Size) {
        self.sizes.insert(url.into(), size);
    }

    /// Builder form of [`StaticImages::insert`].
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, width: f64, height: f64) -> Self {
        self.insert(url, Size::new(width, height));
        self
    }
}

impl ImageSource for StaticImages {
    fn load(&self, url: &str) -> impl Future<Output = Option<Size>> {
        std::future::ready(self.sizes.get(url).copied())
    }
}

/// Builds image URLs and remembers the natural size of every loaded image.
///
/// Failed loads are not remembered, so the next update retries them.
#[derive(Clone, Debug)]
pub struct ImageCache {
    store: String,
    loaded: HashMap<String, Size>,
}

impl ImageCache {
    /// Create a cache resolving ids against `store` (for example `imgstore.php`).
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            loaded: HashMap::new(),
        }
    }

    /// URL of an icon.
    pub fn url(&self, id: ImageId) -> String {
        format!("{}?iconid={}", self.store, id)
    }

    /// Natural size of a loaded icon.
    pub fn get(&self, id: ImageId) -> Option<Size> {
        self.loaded.get(&self.url(id)).copied()
    }

    /// Returns true if `url` has been loaded.
    pub fn is_loaded(&self, url: &str) -> bool {
        self.loaded.contains_key(url)
    }

    /// Load every id not loaded yet. The "no image" id is skipped.
    pub async fn preload<S: ImageSource>(
        &mut self,
        source: &S,
        ids: impl IntoIterator<Item = ImageId>,
    ) {
        let urls = ids
            .into_iter()
            .filter(|id| !id.is_none())
            .map(|id| self.url(id))
            .collect();
        self.load_urls(source, urls).await;
    }

    /// Load every URL not loaded yet, concurrently.
    pub async fn load_urls<S: ImageSource>(&mut self, source: &S, mut urls: Vec<String>) {
        urls.sort();
        urls.dedup();
        urls.retain(|url| !self.loaded.contains_key(url));
        if urls.is_empty() {
            return;
        }
        debug!(count = urls.len(), "loading images");
        let loads = urls.into_iter().map(|url| async move {
            let size = source.load(&url).await;
            (url, size)
        });
        for (url, size) in join_all(loads).await {
            match size {
                Some(size) => {
                    self.loaded.insert(url, size);
                }
                None => debug!(%url, "image failed to load"),
            }
        }
    }
}
