//! Focal-relative levels for layered rendering.
//!
//! `level(t)` is the longest parent-edge distance from the focal task to `t`.
//! A task with parents at different depths sits above the deepest of them, so
//! every drawn connector spans exactly one layer.

use std::collections::{HashMap, HashSet};

use crate::store::TaskStore;

/// A drawn dependency arrow between adjacent layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connector {
    pub child: i64,
    pub parent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelMap {
    focal: i64,
    levels: HashMap<i64, usize>,
    buckets: Vec<Vec<i64>>,
    connectors: Vec<Connector>,
}

impl LevelMap {
    pub fn focal(&self) -> i64 {
        self.focal
    }

    pub fn level_of(&self, id: i64) -> Option<usize> {
        self.levels.get(&id).copied()
    }

    /// `buckets()[i]` holds the tasks at level `i`, in discovery order
    pub fn buckets(&self) -> &[Vec<i64>] {
        &self.buckets
    }

    pub fn max_level(&self) -> usize {
        self.buckets.len().saturating_sub(1)
    }

    /// Number of tasks reached from the focal task
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Child-to-parent connectors where `level(parent) == level(child) + 1`.
    ///
    /// Edges skipping layers are left out; they would cross intermediate rows.
    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }
}

enum Frame {
    Enter { id: i64, level: usize },
    Exit(i64),
}

pub struct LevelAssigner<'a> {
    store: &'a TaskStore,
}

impl<'a> LevelAssigner<'a> {
    pub fn new(store: &'a TaskStore) -> Self {
        Self { store }
    }

    /// Levels for everything reachable from `focal` through parent edges.
    ///
    /// Returns `None` if the focal task is not in the store.
    pub fn assign(&self, focal: i64) -> Option<LevelMap> {
        self.store.find_by_id(focal)?;

        // No simple path in the store is longer than this
        let cap = self.store.len().saturating_sub(1);

        let mut levels: HashMap<i64, usize> = HashMap::new();
        let mut discovered: Vec<i64> = Vec::new();
        let mut on_path: HashSet<i64> = HashSet::new();
        let mut stack = vec![Frame::Enter {
            id: focal,
            level: 0,
        }];

        while let Some(frame) = stack.pop() {
            let (id, level) = match frame {
                Frame::Exit(id) => {
                    on_path.remove(&id);
                    continue;
                },
                Frame::Enter { id, level } => (id, level),
            };

            if on_path.contains(&id) {
                continue;
            }
            match levels.get(&id) {
                Some(&known) if known >= level => continue,
                Some(_) => {},
                None => discovered.push(id),
            }
            levels.insert(id, level);

            let Some(task) = self.store.find_by_id(id) else {
                continue;
            };
            on_path.insert(id);
            stack.push(Frame::Exit(id));

            if level >= cap {
                continue;
            }
            // Reverse so parents are visited in ascending id order
            for &parent in task.parent_ids.iter().rev() {
                if self.store.contains(parent) {
                    stack.push(Frame::Enter {
                        id: parent,
                        level: level + 1,
                    });
                }
            }
        }

        let max_level = levels.values().copied().max().unwrap_or(0);
        let mut buckets = vec![Vec::new(); max_level + 1];
        for &id in &discovered {
            buckets[levels[&id]].push(id);
        }

        let mut connectors = Vec::new();
        for &child in &discovered {
            let Some(task) = self.store.find_by_id(child) else {
                continue;
            };
            for &parent in &task.parent_ids {
                if levels.get(&parent) == Some(&(levels[&child] + 1)) {
                    connectors.push(Connector { child, parent });
                }
            }
        }

        tracing::debug!(
            focal,
            reached = levels.len(),
            max_level,
            "Levels assigned"
        );

        Some(LevelMap {
            focal,
            levels,
            buckets,
            connectors,
        })
    }
}
