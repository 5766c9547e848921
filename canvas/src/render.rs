//! Render-sync: keeps the map's sources and layers in step with engine state.
//!
//! This module is the only place that builds MapLibre style JSON. It never
//! mutates the document. Two refresh paths exist: [`RenderSync::refresh_source`]
//! swaps the annotation data in one `setData` call and runs every frame during
//! a drag; [`RenderSync::rebuild_layers`] tears down and recreates the
//! annotation source and layers and runs only on structural changes.
//!
//! Map call failures are logged and swallowed. A failed call never stops the
//! next frame from rendering.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use serde_json::{Value, json};

use crate::consts::{
    ANNOTATION_SOURCE, BASEMAP_LAYER, BASEMAP_SOURCE, FILL_LAYER, HANDLE_HOVER_RADIUS_PX, HANDLE_RADIUS_PX, LABEL_LAYER,
    OUTLINE_LAYER, SELECTED_FILL, SELECTED_OUTLINE, VERTEX_HOVER_LAYER, VERTEX_LAYER, VERTEX_SOURCE,
};
use crate::doc::Node;
use crate::geom::{Point, ensure_closed_ring};
use crate::surface::{MapSurface, SurfaceError};

/// Vector-tile basemap location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasemapConfig {
    /// `{z}/{x}/{y}.pbf` URL template.
    pub tiles_url: String,
    pub source_layer: String,
}

/// One polygon to draw and the ring to draw it with.
#[derive(Debug, Clone)]
pub struct DrawItem<'a> {
    pub node: &'a Node,
    pub ring: Vec<Point>,
}

/// Tracks what the bridge has installed on the map.
#[derive(Debug, Clone, Default)]
pub struct RenderSync {
    basemap_installed: bool,
    handles_for: Option<String>,
    styled_for: Option<String>,
}

fn logged(op: &str, result: Result<(), SurfaceError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{op}: {e}");
            false
        }
    }
}

impl RenderSync {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Node whose vertex handles are on the map, if any.
    #[must_use]
    pub fn handles_for(&self) -> Option<&str> {
        self.handles_for.as_deref()
    }

    /// Add the basemap source and its line layer once, below any annotations.
    pub fn install_basemap(&mut self, surface: &mut impl MapSurface, config: &BasemapConfig) {
        if self.basemap_installed || surface.has_source(BASEMAP_SOURCE) {
            self.basemap_installed = true;
            return;
        }
        let source = json!({ "type": "vector", "tiles": [config.tiles_url] });
        if !logged("add basemap source", surface.add_source(BASEMAP_SOURCE, &source)) {
            return;
        }
        let before = surface.has_layer(FILL_LAYER).then_some(FILL_LAYER);
        self.basemap_installed = logged("add basemap layer", surface.add_layer(&basemap_layer(&config.source_layer), before));
    }

    /// Push new annotation data. Falls back to a full rebuild when the
    /// source is missing.
    pub fn refresh_source(&mut self, surface: &mut impl MapSurface, items: &[DrawItem<'_>], selected: Option<&str>) {
        let data = annotation_collection(items);
        if surface.has_source(ANNOTATION_SOURCE) {
            logged("refresh annotations", surface.set_source_data(ANNOTATION_SOURCE, &data));
        } else {
            self.rebuild_with(surface, &data, selected);
        }
    }

    /// Remove and recreate the annotation source and layers, then restack
    /// vertex handles on top.
    pub fn rebuild_layers(&mut self, surface: &mut impl MapSurface, items: &[DrawItem<'_>], selected: Option<&str>) {
        self.rebuild_with(surface, &annotation_collection(items), selected);
    }

    fn rebuild_with(&mut self, surface: &mut impl MapSurface, data: &Value, selected: Option<&str>) {
        for layer in [LABEL_LAYER, OUTLINE_LAYER, FILL_LAYER] {
            if surface.has_layer(layer) {
                logged("remove annotation layer", surface.remove_layer(layer));
            }
        }
        if surface.has_source(ANNOTATION_SOURCE) {
            logged("remove annotation source", surface.remove_source(ANNOTATION_SOURCE));
        }
        let source = json!({ "type": "geojson", "data": data });
        if !logged("add annotation source", surface.add_source(ANNOTATION_SOURCE, &source)) {
            return;
        }
        for definition in annotation_layers(selected) {
            logged("add annotation layer", surface.add_layer(&definition, None));
        }
        self.styled_for = selected.map(str::to_owned);
        restack_handles(surface);
    }

    /// Restyle for a new selection without touching data.
    pub fn set_selected(&mut self, surface: &mut impl MapSurface, selected: Option<&str>) {
        if self.styled_for.as_deref() == selected {
            return;
        }
        self.styled_for = selected.map(str::to_owned);
        let paints = [
            (FILL_LAYER, "fill-color", fill_color(selected)),
            (FILL_LAYER, "fill-opacity", fill_opacity(selected)),
            (OUTLINE_LAYER, "line-color", line_color(selected)),
            (OUTLINE_LAYER, "line-width", line_width(selected)),
        ];
        for (layer, name, value) in paints {
            if surface.has_layer(layer) {
                logged("restyle selection", surface.set_paint_property(layer, name, &value));
            }
        }
    }

    /// Draw handles for `node_id` at `ring`'s unique vertices.
    pub fn show_vertex_handles(&mut self, surface: &mut impl MapSurface, node_id: &str, ring: &[Point]) {
        let data = vertex_collection(node_id, ring);
        let ok = if surface.has_source(VERTEX_SOURCE) {
            logged("refresh handles", surface.set_source_data(VERTEX_SOURCE, &data))
        } else {
            logged("add handle source", surface.add_source(VERTEX_SOURCE, &json!({ "type": "geojson", "data": data })))
        };
        if !ok {
            return;
        }
        if !surface.has_layer(VERTEX_LAYER) {
            logged("add handle layer", surface.add_layer(&vertex_layer(), None));
        }
        if !surface.has_layer(VERTEX_HOVER_LAYER) {
            logged("add hover layer", surface.add_layer(&vertex_hover_layer(), None));
        }
        restack_handles(surface);
        self.handles_for = Some(node_id.to_owned());
    }

    /// Remove handle layers and their source.
    pub fn hide_vertex_handles(&mut self, surface: &mut impl MapSurface) {
        for layer in [VERTEX_HOVER_LAYER, VERTEX_LAYER] {
            if surface.has_layer(layer) {
                logged("remove handle layer", surface.remove_layer(layer));
            }
        }
        if surface.has_source(VERTEX_SOURCE) {
            logged("remove handle source", surface.remove_source(VERTEX_SOURCE));
        }
        self.handles_for = None;
    }

    /// Highlight one handle, or none.
    pub fn set_hover(&self, surface: &mut impl MapSurface, index: Option<usize>) {
        let Some(node_id) = self.handles_for.as_deref() else {
            return;
        };
        if !surface.has_layer(VERTEX_HOVER_LAYER) {
            return;
        }
        let target = index.map(|i| vertex_id(node_id, i)).unwrap_or_default();
        logged("hover handle", surface.set_filter(VERTEX_HOVER_LAYER, &json!(["==", ["get", "id"], target])));
    }
}

/// Keep handles above annotations, hover above handles.
fn restack_handles(surface: &mut impl MapSurface) {
    for layer in [VERTEX_LAYER, VERTEX_HOVER_LAYER] {
        if surface.has_layer(layer) {
            logged("restack handles", surface.move_layer(layer, None));
        }
    }
}

// =============================================================
// Style JSON
// =============================================================

fn selection_case(selected: Option<&str>, when: Value, otherwise: Value) -> Value {
    json!(["case", ["==", ["get", "id"], selected.unwrap_or_default()], when, otherwise])
}

fn fill_color(selected: Option<&str>) -> Value {
    selection_case(selected, json!(SELECTED_FILL), json!(["get", "color"]))
}

fn fill_opacity(selected: Option<&str>) -> Value {
    selection_case(selected, json!(0.9), json!(0.8))
}

fn line_color(selected: Option<&str>) -> Value {
    selection_case(selected, json!(SELECTED_OUTLINE), json!(["get", "color"]))
}

fn line_width(selected: Option<&str>) -> Value {
    selection_case(selected, json!(4), json!(3))
}

/// Fill, outline and label layer specs, bottom to top.
#[must_use]
pub fn annotation_layers(selected: Option<&str>) -> [Value; 3] {
    [
        json!({
            "id": FILL_LAYER,
            "type": "fill",
            "source": ANNOTATION_SOURCE,
            "paint": { "fill-color": fill_color(selected), "fill-opacity": fill_opacity(selected) },
        }),
        json!({
            "id": OUTLINE_LAYER,
            "type": "line",
            "source": ANNOTATION_SOURCE,
            "paint": { "line-color": line_color(selected), "line-width": line_width(selected) },
        }),
        json!({
            "id": LABEL_LAYER,
            "type": "symbol",
            "source": ANNOTATION_SOURCE,
            "layout": {
                "text-field": [
                    "concat",
                    ["get", "name"],
                    "\n",
                    ["to-string", ["get", "taken_capacity"]],
                    " / ",
                    ["to-string", ["get", "max_capacity"]],
                ],
                "text-font": ["Open Sans Regular", "Arial Unicode MS Regular"],
                "text-size": 12,
                "text-anchor": "center",
                "text-line-height": 1.2,
            },
            "paint": { "text-color": "#000", "text-halo-color": "#fff", "text-halo-width": 1.5 },
        }),
    ]
}

fn basemap_layer(source_layer: &str) -> Value {
    json!({
        "id": BASEMAP_LAYER,
        "type": "line",
        "source": BASEMAP_SOURCE,
        "source-layer": source_layer,
        "minzoom": 0,
        "maxzoom": 16,
        "paint": { "line-color": "#ffffff", "line-width": 1, "line-opacity": 0.4 },
        "layout": { "line-join": "round", "line-cap": "round", "visibility": "visible" },
    })
}

fn vertex_layer() -> Value {
    json!({
        "id": VERTEX_LAYER,
        "type": "circle",
        "source": VERTEX_SOURCE,
        "paint": {
            "circle-radius": HANDLE_RADIUS_PX,
            "circle-color": "#ffff00",
            "circle-stroke-color": "#000000",
            "circle-stroke-width": 2,
        },
    })
}

fn vertex_hover_layer() -> Value {
    json!({
        "id": VERTEX_HOVER_LAYER,
        "type": "circle",
        "source": VERTEX_SOURCE,
        "paint": {
            "circle-radius": HANDLE_HOVER_RADIUS_PX,
            "circle-color": "#ffd54f",
            "circle-stroke-color": "#000000",
            "circle-stroke-width": 2,
        },
        "filter": ["==", ["get", "id"], ""],
    })
}

// =============================================================
// Feature data
// =============================================================

/// Visible annotations as a GeoJSON feature collection. Rings are closed.
#[must_use]
pub fn annotation_collection(items: &[DrawItem<'_>]) -> Value {
    let features: Vec<Value> = items
        .iter()
        .map(|item| {
            let n = item.node;
            json!({
                "type": "Feature",
                "properties": {
                    "id": n.id,
                    "name": n.name,
                    "level": n.level,
                    "color": n.color,
                    "cona": n.cona,
                    "max_capacity": n.max_capacity,
                    "taken_capacity": n.taken_capacity,
                },
                "geometry": { "type": "Polygon", "coordinates": [ensure_closed_ring(&item.ring)] },
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

/// Stable id of a handle feature.
#[must_use]
pub fn vertex_id(node_id: &str, index: usize) -> String {
    format!("vertex-{node_id}-{index}")
}

/// One point feature per unique vertex of `ring`.
#[must_use]
pub fn vertex_collection(node_id: &str, ring: &[Point]) -> Value {
    let closed = ensure_closed_ring(ring);
    let unique = closed.len().saturating_sub(1);
    let features: Vec<Value> = closed
        .iter()
        .take(unique)
        .enumerate()
        .map(|(i, p)| {
            json!({
                "type": "Feature",
                "id": vertex_id(node_id, i),
                "properties": { "id": vertex_id(node_id, i), "annotationId": node_id, "vertexIndex": i },
                "geometry": { "type": "Point", "coordinates": p },
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}
