//! Conversion between the owned hierarchy and flat feature collections.
//!
//! Two flat shapes are understood. The exchange format is what the editor
//! imports and exports: string ids, a `parent_id` back reference, a
//! materialised `path`, and closed rings in local meters. The store format is
//! what the feature store's `GET /features/geojson` returns: numeric ids and
//! whatever geometry the store keeps, `Polygon` or `MultiPolygon`.
//!
//! Both loaders drop features whose outer ring has fewer than three distinct
//! points and keep going.

#[cfg(test)]
#[path = "convert_test.rs"]
mod convert_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::consts::MIN_RING_VERTICES;
use crate::doc::{HierarchyDocument, HierarchyNode, Level, NodeId, Units};
use crate::geom::{Point, distinct_vertex_count, ensure_closed_ring, strip_closing_point};

/// Value of `coordinateSystem` on exported collections.
pub const LOCAL_METERS: &str = "local-meters";

/// Prefix for node ids minted from store ids.
pub const STORE_ID_PREFIX: &str = "backend_";

// =============================================================
// Geometry
// =============================================================

/// GeoJSON geometry, restricted to the polygon kinds the editor handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<Point>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Point>>> },
    /// Points, lines and anything else; never loaded.
    #[serde(other)]
    Unsupported,
}

impl Geometry {
    /// Closed polygon geometry around a single ring.
    #[must_use]
    pub fn polygon(ring: &[Point]) -> Self {
        Self::Polygon { coordinates: vec![ensure_closed_ring(ring)] }
    }

    /// Outer ring of the (first) polygon.
    #[must_use]
    pub fn exterior_ring(&self) -> Option<&[Point]> {
        match self {
            Self::Polygon { coordinates } => coordinates.first().map(Vec::as_slice),
            Self::MultiPolygon { coordinates } => coordinates.first().and_then(|p| p.first()).map(Vec::as_slice),
            Self::Unsupported => None,
        }
    }
}

// =============================================================
// Exchange format
// =============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "coordinateSystem", default, skip_serializing_if = "Option::is_none")]
    pub coordinate_system: Option<String>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: NodeId,
    pub properties: FeatureProperties,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub level: Level,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opomba: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
}

fn has_enough_vertices(id: &str, ring: &[Point]) -> bool {
    let distinct = distinct_vertex_count(ring);
    if distinct < MIN_RING_VERTICES {
        log::warn!("dropping feature {id}: ring has {distinct} distinct points");
        return false;
    }
    true
}

/// Flatten a document, pre-order, into the exchange format. Rings are closed.
#[must_use]
pub fn tree_to_flat(doc: &HierarchyDocument) -> FeatureCollection {
    fn walk(node: &HierarchyNode, parent: Option<&str>, parent_path: &str, out: &mut Vec<Feature>) {
        let path = if parent_path.is_empty() { node.id.clone() } else { format!("{parent_path}/{}", node.id) };
        out.push(Feature {
            kind: "Feature".into(),
            id: node.id.clone(),
            properties: FeatureProperties {
                level: node.level,
                parent_id: parent.map(str::to_owned),
                path: path.clone(),
                name: node.name.clone(),
                opomba: node.opomba.clone(),
                color: node.color.clone(),
                visible: node.visible,
                order: node.order,
                depth: node.depth,
            },
            geometry: Geometry::polygon(&node.polygon),
        });
        for child in &node.children {
            walk(child, Some(&node.id), &path, out);
        }
    }

    let mut features = Vec::new();
    for root in &doc.nodes {
        walk(root, None, "", &mut features);
    }
    FeatureCollection { kind: "FeatureCollection".into(), coordinate_system: Some(LOCAL_METERS.into()), features }
}

/// Rebuild the owned tree from the exchange format.
///
/// Child order follows feature order. Features whose `parent_id` is missing
/// or unknown become roots.
#[must_use]
pub fn flat_to_tree(fc: &FeatureCollection) -> HierarchyDocument {
    let mut entries = Vec::with_capacity(fc.features.len());
    for f in &fc.features {
        let Some(ring) = f.geometry.exterior_ring() else {
            log::warn!("dropping feature {}: no polygon geometry", f.id);
            continue;
        };
        if !has_enough_vertices(&f.id, ring) {
            continue;
        }
        let p = &f.properties;
        let name = if p.name.is_empty() { f.id.clone() } else { p.name.clone() };
        let mut node = HierarchyNode::new(f.id.clone(), p.level, name, strip_closing_point(ring));
        node.opomba.clone_from(&p.opomba);
        node.color.clone_from(&p.color);
        node.visible = p.visible;
        node.order = p.order;
        node.depth = p.depth;
        node.parent_local_id.clone_from(&p.parent_id);
        entries.push(node);
    }
    HierarchyDocument { origin: Point::default(), units: Units::M, nodes: assemble(entries) }
}

/// Build a document from the feature store's collection.
#[must_use]
pub fn document_from_store(fc: &StoreFeatureCollection) -> HierarchyDocument {
    let mut entries = Vec::with_capacity(fc.features.len());
    for f in &fc.features {
        let p = &f.properties;
        let id = format!("{STORE_ID_PREFIX}{}", p.id);
        let Ok(level) = p.level.parse::<Level>() else {
            log::warn!("dropping feature {id}: unknown level {:?}", p.level);
            continue;
        };
        let Some(ring) = f.geometry.as_ref().and_then(Geometry::exterior_ring) else {
            log::warn!("dropping feature {id}: no polygon geometry");
            continue;
        };
        if !has_enough_vertices(&id, ring) {
            continue;
        }
        let name = p.name.clone().unwrap_or_default();
        let mut node = HierarchyNode::new(id, level, name, strip_closing_point(ring));
        node.remote_id = Some(p.id);
        node.shape_gl = Some(ensure_closed_ring(ring));
        node.x_coord_gl = p.x_coord;
        node.y_coord_gl = p.y_coord;
        node.color = p.color.clone().filter(|c| !c.is_empty());
        node.opomba.clone_from(&p.opomba);
        node.cona.clone_from(&p.cona);
        node.max_capacity = p.max_capacity;
        node.taken_capacity = p.taken_capacity;
        node.locked = p.locked.unwrap_or(false);
        node.order = p.order_index;
        node.depth = p.depth;
        node.parent_local_id = p.parent_id.map(|pid| format!("{STORE_ID_PREFIX}{pid}"));
        entries.push(node);
    }
    HierarchyDocument { origin: Point::default(), units: Units::M, nodes: assemble(entries) }
}

/// Nest flat nodes under their `parent_local_id`, preserving input order.
///
/// Nodes pointing at an absent parent become roots with the back reference
/// cleared. Nodes caught in a parent cycle are also promoted to roots so no
/// input is lost.
fn assemble(entries: Vec<HierarchyNode>) -> Vec<HierarchyNode> {
    let known: HashSet<NodeId> = entries.iter().map(|n| n.id.clone()).collect();
    let mut children_of: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut root_ids = Vec::new();
    let mut order = Vec::with_capacity(entries.len());
    let mut pool: HashMap<NodeId, HierarchyNode> = HashMap::with_capacity(entries.len());

    for mut node in entries {
        order.push(node.id.clone());
        match node.parent_local_id.as_ref().filter(|p| known.contains(*p) && **p != node.id) {
            Some(parent) => children_of.entry(parent.clone()).or_default().push(node.id.clone()),
            None => {
                node.parent_local_id = None;
                root_ids.push(node.id.clone());
            }
        }
        pool.insert(node.id.clone(), node);
    }

    let mut roots: Vec<HierarchyNode> = root_ids.iter().filter_map(|id| take(id, &mut pool, &children_of)).collect();
    for id in &order {
        if pool.contains_key(id) {
            log::warn!("feature {id} is part of a parent cycle; promoting to root");
            if let Some(mut node) = take(id, &mut pool, &children_of) {
                node.parent_local_id = None;
                roots.push(node);
            }
        }
    }
    roots
}

fn take(id: &str, pool: &mut HashMap<NodeId, HierarchyNode>, children_of: &HashMap<NodeId, Vec<NodeId>>) -> Option<HierarchyNode> {
    let mut node = pool.remove(id)?;
    if let Some(kids) = children_of.get(id) {
        node.children = kids.iter().filter_map(|k| take(k, pool, children_of)).collect();
    }
    Some(node)
}

// =============================================================
// Store format
// =============================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreFeatureCollection {
    #[serde(default)]
    pub features: Vec<StoreFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreFeature {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    pub properties: StoreProperties,
}

/// Properties of a store feature. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreProperties {
    pub id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Kept as text so one bad row cannot fail the whole collection.
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub opomba: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub cona: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<i64>,
    #[serde(default)]
    pub taken_capacity: Option<i64>,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub order_index: Option<i64>,
    #[serde(default)]
    pub depth: Option<i64>,
    #[serde(default)]
    pub x_coord: Option<f64>,
    #[serde(default)]
    pub y_coord: Option<f64>,
}
