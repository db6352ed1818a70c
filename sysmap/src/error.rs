// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type shared by every reconciliation step.

use crate::options::{ImageId, SelementId, ShapeId};

/// Failures that abort an update pass.
///
/// Nodes touched before the failing one keep their new state; there is no rollback.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An element references an icon that was not loaded by the preload step.
    #[error("invalid element configuration: element {selementid} references icon {icon} which is not loaded")]
    InvalidElement {
        /// Offending element.
        selementid: SelementId,
        /// Icon that could not be resolved.
        icon: ImageId,
    },
    /// A shape carries a geometry code outside rectangle, ellipse, and line.
    #[error("invalid shape configuration: shape {shapeid} has unknown type {code}")]
    InvalidShapeType {
        /// Offending shape.
        shapeid: ShapeId,
        /// Raw geometry code.
        code: i64,
    },
    /// Payload parsing or value conversion failed.
    #[error("map payload JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
