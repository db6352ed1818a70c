// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage summary produced by [`Canvas::commit`](crate::Canvas::commit).

use alloc::vec::Vec;

use crate::types::NodeId;

/// A batched set of scene mutations since the previous commit.
///
/// A node inserted and removed within the same batch appears in neither list.
/// A node inserted and then modified within the same batch is only reported as added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Damage {
    /// Nodes inserted since the last commit, in insertion order.
    pub added: Vec<NodeId>,
    /// Previously committed nodes whose attributes, text, bounds, or flags changed.
    pub changed: Vec<NodeId>,
    /// Previously committed nodes that were removed.
    pub removed: Vec<NodeId>,
}

impl Damage {
    /// Returns true if nothing was mutated.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Total number of reported mutations.
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.removed.len()
    }

    /// Fold a later batch into this one.
    pub fn extend(&mut self, later: Self) {
        self.added.extend(later.added);
        for id in later.changed {
            if !self.added.contains(&id) && !self.changed.contains(&id) {
                self.changed.push(id);
            }
        }
        self.removed.extend(later.removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn extend_skips_changes_to_freshly_added_nodes() {
        let a = NodeId::new(0, 1);
        let b = NodeId::new(1, 1);
        let mut first = Damage {
            added: vec![a],
            ..Default::default()
        };
        first.extend(Damage {
            changed: vec![a, b],
            ..Default::default()
        });
        assert_eq!(first.added, vec![a]);
        assert_eq!(first.changed, vec![b]);
        assert_eq!(first.len(), 2);
    }
}
