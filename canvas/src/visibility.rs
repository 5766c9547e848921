//! Which nodes are drawn: the display level plus the cascading checked-set.
//!
//! The checked-set is separate from the selection cursor. It drives bulk
//! operations and, when non-empty, filters what the map shows at the current
//! display level.

#[cfg(test)]
#[path = "visibility_test.rs"]
mod visibility_test;

use std::collections::HashSet;

use crate::doc::{DocStore, Level, Node, NodeId};

/// Display level and checked-set.
#[derive(Debug, Clone, PartialEq)]
pub struct Visibility {
    display_level: Level,
    checked: HashSet<NodeId>,
}

impl Default for Visibility {
    fn default() -> Self {
        Self { display_level: Level::Polje, checked: HashSet::new() }
    }
}

impl Visibility {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn display_level(&self) -> Level {
        self.display_level
    }

    #[must_use]
    pub fn checked(&self) -> &HashSet<NodeId> {
        &self.checked
    }

    #[must_use]
    pub fn is_checked(&self, id: &str) -> bool {
        self.checked.contains(id)
    }

    /// Switch the display level. `globina` is refused and leaves state unchanged.
    pub fn set_display_level(&mut self, level: Level) -> bool {
        if !level.is_navigable() {
            log::debug!("refusing non-navigable display level {level}");
            return false;
        }
        self.display_level = level;
        true
    }

    /// Nodes at the display level, in draw order. An empty checked-set shows
    /// every node at that level; otherwise only checked ones.
    #[must_use]
    pub fn compute_visible<'a>(&self, doc: &'a DocStore) -> Vec<&'a Node> {
        doc.iter()
            .filter(|n| n.level == self.display_level)
            .filter(|n| self.checked.is_empty() || self.checked.contains(&n.id))
            .collect()
    }

    /// Check or uncheck `id` and cascade downward.
    ///
    /// A `polje` cascades to every `subzone` and `vrsta` below it, a `subzone`
    /// to its `vrsta`. Rows never cascade. Unknown ids are ignored.
    pub fn set_checked(&mut self, doc: &DocStore, id: &str, checked: bool) {
        let Some(node) = doc.get(id) else {
            return;
        };
        let mut targets = vec![node.id.clone()];
        if matches!(node.level, Level::Polje | Level::Subzone) {
            targets.extend(
                doc.descendants(id)
                    .into_iter()
                    .filter(|d| matches!(d.level, Level::Subzone | Level::Vrsta))
                    .map(|d| d.id.clone()),
            );
        }
        for t in targets {
            if checked {
                self.checked.insert(t);
            } else {
                self.checked.remove(&t);
            }
        }
    }

    /// Check every `polje` matching `term` (all of them when blank), cascading.
    /// Returns how many poljas matched.
    pub fn check_visible(&mut self, doc: &DocStore, term: &str) -> usize {
        let ids: Vec<NodeId> = doc
            .iter()
            .filter(|n| n.level == Level::Polje && search_matches(n, term))
            .map(|n| n.id.clone())
            .collect();
        for id in &ids {
            self.set_checked(doc, id, true);
        }
        ids.len()
    }

    /// Uncheck every node matching `term` (everything when blank). Returns the
    /// number of ids removed.
    pub fn uncheck_visible(&mut self, doc: &DocStore, term: &str) -> usize {
        let before = self.checked.len();
        if term.trim().is_empty() {
            self.checked.clear();
        } else {
            let matching: Vec<NodeId> = doc.iter().filter(|n| search_matches(n, term)).map(|n| n.id.clone()).collect();
            for id in matching {
                self.checked.remove(&id);
            }
        }
        before - self.checked.len()
    }

    /// Drop every checked id.
    pub fn clear(&mut self) {
        self.checked.clear();
    }
}

/// Case-insensitive match of `term` against `"{name} {cona} {level}"`.
/// A blank term matches everything.
#[must_use]
pub fn search_matches(node: &Node, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let haystack = format!("{} {} {}", node.name, node.cona.as_deref().unwrap_or_default(), node.level).to_lowercase();
    haystack.contains(&needle)
}
