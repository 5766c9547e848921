//! Document model: hierarchy levels, nodes, and the in-memory store.
//!
//! Two shapes of the same data live here. [`HierarchyDocument`] is the owned
//! tree (what conversion produces and consumes). [`DocStore`] is the flat
//! runtime index the engine edits: nodes keyed by id with parent/child id
//! links, kept in load order so draw order is stable.
//!
//! The store is the authoritative document. The drag state machine never
//! writes to it per frame; it calls [`DocStore::commit_geometry`] exactly once
//! when a gesture ends.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::INHERITED_COLOR_FACTOR;
use crate::geom::{Point, ensure_closed_ring};

/// Stable, session-local node identifier.
pub type NodeId = String;

/// Hierarchy level, strictly ordered parent → child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Storage field (top level).
    Polje,
    /// Sub-zone inside a field.
    Subzone,
    /// Row inside a sub-zone.
    Vrsta,
    /// Depth slot inside a row. Stored but never displayed.
    Globina,
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown level: {0}")]
pub struct ParseLevelError(pub String);

impl Level {
    /// All levels in parent → child order.
    pub const ALL: [Level; 4] = [Level::Polje, Level::Subzone, Level::Vrsta, Level::Globina];

    /// Wire name of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polje => "polje",
            Self::Subzone => "subzone",
            Self::Vrsta => "vrsta",
            Self::Globina => "globina",
        }
    }

    /// The level directly below this one, if any.
    #[must_use]
    pub fn child(self) -> Option<Level> {
        match self {
            Self::Polje => Some(Self::Subzone),
            Self::Subzone => Some(Self::Vrsta),
            Self::Vrsta => Some(Self::Globina),
            Self::Globina => None,
        }
    }

    /// Whether the level can be chosen as the display level.
    #[must_use]
    pub fn is_navigable(self) -> bool {
        !matches!(self, Self::Globina)
    }

    /// Fallback colour for nodes with no explicit or inherited colour.
    #[must_use]
    pub fn default_color(self) -> &'static str {
        match self {
            Self::Polje => "#3B82F6",
            Self::Subzone => "#10B981",
            Self::Vrsta => "#F59E0B",
            Self::Globina => "#EF4444",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| ParseLevelError(s.to_owned()))
    }
}

/// Length units of the local coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    M,
    Cm,
    Mm,
    Px,
}

/// One zone/row/sub-zone polygon in tree form. Children are owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
    pub level: Level,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opomba: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_local_id: Option<NodeId>,
    /// Local ring; closing point optional.
    pub polygon: Vec<Point>,
    /// Same outline in map/GL coordinates, when the store provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_gl: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_coord_gl: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_coord_gl: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_capacity: Option<i64>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// A bare node with the given identity and ring; everything else empty.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, level: Level, name: impl Into<String>, polygon: Vec<Point>) -> Self {
        Self {
            id: id.into(),
            remote_id: None,
            level,
            name: name.into(),
            opomba: None,
            color: None,
            parent_local_id: None,
            polygon,
            shape_gl: None,
            x_coord_gl: None,
            y_coord_gl: None,
            cona: None,
            max_capacity: None,
            taken_capacity: None,
            locked: false,
            visible: None,
            order: None,
            depth: None,
            children: Vec::new(),
        }
    }
}

/// A whole floor plan: frame origin, units and the top-level forest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HierarchyDocument {
    pub origin: Point,
    #[serde(default)]
    pub units: Units,
    pub nodes: Vec<HierarchyNode>,
}

/// Error returned when an attribute edit cannot be built from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseAttributeError {
    #[error("unknown attribute: {0}")]
    UnknownField(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// A single editable attribute, as sent in a field-level PATCH.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeEdit {
    Name(String),
    Color(String),
    Opomba(String),
    Cona(String),
    MaxCapacity(i64),
    TakenCapacity(i64),
    Locked(bool),
}

impl AttributeEdit {
    /// Build an edit from a wire field name and its textual value.
    ///
    /// # Errors
    /// Fails on unknown fields and on values that don't parse as the
    /// field's type.
    pub fn parse(field: &str, value: &str) -> Result<Self, ParseAttributeError> {
        fn number(field: &'static str, value: &str) -> Result<i64, ParseAttributeError> {
            value.trim().parse().map_err(|_| ParseAttributeError::InvalidValue { field, value: value.to_owned() })
        }
        match field {
            "name" => Ok(Self::Name(value.to_owned())),
            "color" => Ok(Self::Color(value.to_owned())),
            "opomba" => Ok(Self::Opomba(value.to_owned())),
            "cona" => Ok(Self::Cona(value.to_owned())),
            "max_capacity" => number("max_capacity", value).map(Self::MaxCapacity),
            "taken_capacity" => number("taken_capacity", value).map(Self::TakenCapacity),
            "locked" => match value.trim() {
                "true" => Ok(Self::Locked(true)),
                "false" => Ok(Self::Locked(false)),
                _ => Err(ParseAttributeError::InvalidValue { field: "locked", value: value.to_owned() }),
            },
            other => Err(ParseAttributeError::UnknownField(other.to_owned())),
        }
    }

    /// Wire field name.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Color(_) => "color",
            Self::Opomba(_) => "opomba",
            Self::Cona(_) => "cona",
            Self::MaxCapacity(_) => "max_capacity",
            Self::TakenCapacity(_) => "taken_capacity",
            Self::Locked(_) => "locked",
        }
    }

    /// The `{field: value}` PATCH body.
    #[must_use]
    pub fn to_patch_body(&self) -> serde_json::Value {
        let value = match self {
            Self::Name(v) | Self::Color(v) | Self::Opomba(v) | Self::Cona(v) => serde_json::json!(v),
            Self::MaxCapacity(v) | Self::TakenCapacity(v) => serde_json::json!(v),
            Self::Locked(v) => serde_json::json!(v),
        };
        let mut body = serde_json::Map::new();
        body.insert(self.field().to_owned(), value);
        serde_json::Value::Object(body)
    }
}

/// Runtime node: the tree node flattened, with id links instead of ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub remote_id: Option<i64>,
    pub level: Level,
    pub name: String,
    pub opomba: Option<String>,
    /// Resolved once at load.
    pub color: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub polygon: Vec<Point>,
    pub shape_gl: Option<Vec<Point>>,
    pub x_coord_gl: Option<f64>,
    pub y_coord_gl: Option<f64>,
    pub cona: Option<String>,
    pub max_capacity: Option<i64>,
    pub taken_capacity: Option<i64>,
    pub locked: bool,
    pub visible: Option<bool>,
    pub order: Option<i64>,
    pub depth: Option<i64>,
    /// Geometry was committed during this session.
    pub edited: bool,
}

impl Node {
    /// Closed ring to draw. `shape_gl` wins while the node is selected and
    /// has been edited this session; `polygon` otherwise.
    #[must_use]
    pub fn render_ring(&self, selected: bool) -> Vec<Point> {
        match &self.shape_gl {
            Some(gl) if selected && self.edited => ensure_closed_ring(gl),
            _ => ensure_closed_ring(&self.polygon),
        }
    }

    /// Ring sent to the feature store: `shape_gl` when present, else `polygon`.
    #[must_use]
    pub fn persisted_ring(&self) -> &[Point] {
        self.shape_gl.as_deref().unwrap_or(&self.polygon)
    }
}

/// In-memory store of hierarchy nodes.
#[derive(Debug, Clone, Default)]
pub struct DocStore {
    origin: Point,
    units: Units,
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    roots: Vec<NodeId>,
    commits: u64,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a document into a store, resolving colours on the way down.
    #[must_use]
    pub fn from_document(doc: HierarchyDocument) -> Self {
        let mut store = Self { origin: doc.origin, units: doc.units, ..Self::default() };
        for root in doc.nodes {
            let id = root.id.clone();
            if store.insert_subtree(root, None, None) {
                store.roots.push(id);
            }
        }
        store
    }

    /// `inherited` is the nearest coloured ancestor's colour and the number
    /// of steps between it and `node`'s parent. Returns `false` when `node`
    /// replaced an earlier node with the same id.
    fn insert_subtree(&mut self, node: HierarchyNode, parent: Option<NodeId>, inherited: Option<(String, u32)>) -> bool {
        let explicit = node.color.filter(|c| !c.is_empty());
        let color = match (&explicit, &inherited) {
            (Some(c), _) => c.clone(),
            (None, Some((base, steps))) => darken_color(base, INHERITED_COLOR_FACTOR.powi(i32::try_from(*steps + 1).unwrap_or(i32::MAX))),
            (None, None) => node.level.default_color().to_owned(),
        };
        let next_inherited = match explicit {
            Some(c) => Some((c, 0)),
            None => inherited.map(|(c, steps)| (c, steps + 1)),
        };

        let id = node.id.clone();
        let child_ids = node.children.iter().map(|c| c.id.clone()).collect();
        let record = Node {
            id: id.clone(),
            remote_id: node.remote_id,
            level: node.level,
            name: node.name,
            opomba: node.opomba,
            color,
            parent,
            children: child_ids,
            polygon: node.polygon,
            shape_gl: node.shape_gl,
            x_coord_gl: node.x_coord_gl,
            y_coord_gl: node.y_coord_gl,
            cona: node.cona,
            max_capacity: node.max_capacity,
            taken_capacity: node.taken_capacity,
            locked: node.locked,
            visible: node.visible,
            order: node.order,
            depth: node.depth,
            edited: false,
        };
        let fresh = self.nodes.insert(id.clone(), record).is_none();
        if fresh {
            self.order.push(id.clone());
        } else {
            log::warn!("duplicate node id {id}; keeping the later one");
        }
        for child in node.children {
            self.insert_subtree(child, Some(id.clone()), next_inherited.clone());
        }
        fresh
    }

    /// Rebuild the owned tree form. Colours come back resolved.
    #[must_use]
    pub fn to_document(&self) -> HierarchyDocument {
        let nodes = self.roots.iter().filter_map(|id| self.build_tree(id)).collect();
        HierarchyDocument { origin: self.origin, units: self.units, nodes }
    }

    fn build_tree(&self, id: &str) -> Option<HierarchyNode> {
        let n = self.nodes.get(id)?;
        Some(HierarchyNode {
            id: n.id.clone(),
            remote_id: n.remote_id,
            level: n.level,
            name: n.name.clone(),
            opomba: n.opomba.clone(),
            color: Some(n.color.clone()),
            parent_local_id: n.parent.clone(),
            polygon: n.polygon.clone(),
            shape_gl: n.shape_gl.clone(),
            x_coord_gl: n.x_coord_gl,
            y_coord_gl: n.y_coord_gl,
            cona: n.cona.clone(),
            max_capacity: n.max_capacity,
            taken_capacity: n.taken_capacity,
            locked: n.locked,
            visible: n.visible,
            order: n.order,
            depth: n.depth,
            children: n.children.iter().filter_map(|c| self.build_tree(c)).collect(),
        })
    }

    /// Return a node by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in load (draw) order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Top-level nodes in load order.
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Direct children of `id` in order.
    #[must_use]
    pub fn children(&self, id: &str) -> Vec<&Node> {
        self.nodes
            .get(id)
            .map(|n| n.children.iter().filter_map(|c| self.nodes.get(c)).collect())
            .unwrap_or_default()
    }

    /// All descendants of `id`, pre-order, excluding `id` itself.
    #[must_use]
    pub fn descendants(&self, id: &str) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack: Vec<&Node> = self.children(id).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(&n.id).into_iter().rev());
        }
        out
    }

    /// Replace a node's geometry. This is the one authoritative geometry write
    /// per gesture; returns `false` if the node vanished. The node only counts
    /// as edited once a commit actually changes one of its rings.
    pub fn commit_geometry(&mut self, id: &str, polygon: Vec<Point>, shape_gl: Option<Vec<Point>>) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let same = |a: &[Point], b: &[Point]| ensure_closed_ring(a) == ensure_closed_ring(b);
        let changed = !same(&node.polygon, &polygon)
            || shape_gl.as_deref().is_some_and(|gl| node.shape_gl.as_deref().is_none_or(|old| !same(old, gl)));
        node.polygon = polygon;
        if shape_gl.is_some() {
            node.shape_gl = shape_gl;
        }
        if let Some(anchor) = node.persisted_ring().first().copied() {
            node.x_coord_gl = Some(anchor.x);
            node.y_coord_gl = Some(anchor.y);
        }
        node.edited |= changed;
        self.commits += 1;
        true
    }

    /// Number of geometry commits since the store was created.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    /// Apply an attribute edit locally. Returns `false` if the node doesn't exist.
    pub fn apply_attribute(&mut self, id: &str, edit: &AttributeEdit) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        match edit {
            AttributeEdit::Name(v) => node.name.clone_from(v),
            AttributeEdit::Color(v) => node.color.clone_from(v),
            AttributeEdit::Opomba(v) => node.opomba = Some(v.clone()),
            AttributeEdit::Cona(v) => node.cona = Some(v.clone()),
            AttributeEdit::MaxCapacity(v) => node.max_capacity = Some(*v),
            AttributeEdit::TakenCapacity(v) => node.taken_capacity = Some(*v),
            AttributeEdit::Locked(v) => node.locked = *v,
        }
        true
    }

    /// Number of nodes currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the store contains no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Scale each RGB channel of a `#rrggbb` colour by `factor` (floored).
///
/// Malformed input is returned unchanged.
#[must_use]
pub fn darken_color(hex: &str, factor: f64) -> String {
    let h = hex.trim_start_matches('#');
    if h.len() != 6 || !h.is_ascii() {
        return hex.to_owned();
    }
    let mut out = String::from("#");
    for i in 0..3 {
        let Ok(channel) = u8::from_str_radix(&h[i * 2..i * 2 + 2], 16) else {
            return hex.to_owned();
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = (f64::from(channel) * factor).floor().clamp(0.0, 255.0) as u8;
        out.push_str(&format!("{scaled:02x}"));
    }
    out
}
