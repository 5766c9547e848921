//! The seam between the engine and the map widget.
//!
//! [`MapSurface`] is the small slice of the MapLibre map API the engine needs:
//! sources, layers, paint/filter updates, drag-pan, cursor and fit-bounds.
//! [`JsMapSurface`] forwards each call to a live JS map object.
//! [`HeadlessSurface`] keeps the same state in memory for native hosts and
//! tests.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use std::collections::{BTreeMap, HashSet};

use js_sys::{Array, Function, Reflect};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};

use crate::geom::Bounds;

/// Failure of a single map call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("map.{method} failed: {message}")]
    Js { method: String, message: String },
    #[error("map has no method {0}")]
    MissingMethod(String),
    #[error("unknown source {0}")]
    MissingSource(String),
    #[error("unknown layer {0}")]
    MissingLayer(String),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("source {0} is still used by a layer")]
    InUse(String),
    #[error("map.{0} unavailable")]
    Unavailable(String),
}

/// Map operations used by the render-sync bridge.
///
/// Source and layer specs are MapLibre style JSON.
pub trait MapSurface {
    /// # Errors
    /// Fails if the source exists or the map rejects the definition.
    fn add_source(&mut self, id: &str, definition: &Value) -> Result<(), SurfaceError>;
    /// # Errors
    /// Fails if the source is unknown or still referenced.
    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError>;
    fn has_source(&self, id: &str) -> bool;
    /// Replace a GeoJSON source's data in one call.
    ///
    /// # Errors
    /// Fails if the source is unknown.
    fn set_source_data(&mut self, id: &str, data: &Value) -> Result<(), SurfaceError>;
    /// Add a layer below `before`, or on top when `None`.
    ///
    /// # Errors
    /// Fails on duplicate ids or unknown sources.
    fn add_layer(&mut self, definition: &Value, before: Option<&str>) -> Result<(), SurfaceError>;
    /// # Errors
    /// Fails if the layer is unknown.
    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError>;
    fn has_layer(&self, id: &str) -> bool;
    /// Restack a layer below `before`, or on top when `None`.
    ///
    /// # Errors
    /// Fails if the layer is unknown.
    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), SurfaceError>;
    /// # Errors
    /// Fails if the layer is unknown.
    fn set_paint_property(&mut self, layer: &str, name: &str, value: &Value) -> Result<(), SurfaceError>;
    /// # Errors
    /// Fails if the layer is unknown.
    fn set_filter(&mut self, layer: &str, filter: &Value) -> Result<(), SurfaceError>;
    /// # Errors
    /// Fails if the map has no drag-pan handler.
    fn set_drag_pan(&mut self, enabled: bool) -> Result<(), SurfaceError>;
    /// # Errors
    /// Fails if the map canvas is unavailable.
    fn set_cursor(&mut self, cursor: &str) -> Result<(), SurfaceError>;
    /// # Errors
    /// Fails if the map rejects the bounds.
    fn fit_bounds(&mut self, bounds: Bounds) -> Result<(), SurfaceError>;
}

// =============================================================
// JS map
// =============================================================

/// A MapLibre `Map` instance handed over from JS.
pub struct JsMapSurface {
    map: JsValue,
}

impl JsMapSurface {
    #[must_use]
    pub fn new(map: JsValue) -> Self {
        Self { map }
    }

    fn call_map(&self, method: &str, args: &[JsValue]) -> Result<JsValue, SurfaceError> {
        invoke(&self.map, method, args)
    }

    fn lookup(&self, method: &str, id: &str) -> bool {
        matches!(self.call_map(method, &[JsValue::from_str(id)]), Ok(v) if !v.is_undefined() && !v.is_null())
    }
}

/// Call `target[method](...args)` with `this` bound to `target`.
fn invoke(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, SurfaceError> {
    let f = Reflect::get(target, &JsValue::from_str(method)).map_err(|e| js_error(method, &e))?;
    let f: Function = f.dyn_into().map_err(|_| SurfaceError::MissingMethod(method.to_owned()))?;
    let argv: Array = args.iter().collect();
    f.apply(target, &argv).map_err(|e| js_error(method, &e))
}

fn js_error(method: &str, err: &JsValue) -> SurfaceError {
    let message = err.as_string().unwrap_or_else(|| format!("{err:?}"));
    SurfaceError::Js { method: method.to_owned(), message }
}

fn to_js(method: &str, value: &Value) -> Result<JsValue, SurfaceError> {
    js_sys::JSON::parse(&value.to_string()).map_err(|e| js_error(method, &e))
}

fn before_arg(before: Option<&str>) -> JsValue {
    before.map_or(JsValue::UNDEFINED, JsValue::from_str)
}

impl MapSurface for JsMapSurface {
    fn add_source(&mut self, id: &str, definition: &Value) -> Result<(), SurfaceError> {
        let definition = to_js("addSource", definition)?;
        self.call_map("addSource", &[JsValue::from_str(id), definition]).map(drop)
    }

    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.call_map("removeSource", &[JsValue::from_str(id)]).map(drop)
    }

    fn has_source(&self, id: &str) -> bool {
        self.lookup("getSource", id)
    }

    fn set_source_data(&mut self, id: &str, data: &Value) -> Result<(), SurfaceError> {
        let source = self.call_map("getSource", &[JsValue::from_str(id)])?;
        if source.is_undefined() || source.is_null() {
            return Err(SurfaceError::MissingSource(id.to_owned()));
        }
        let data = to_js("setData", data)?;
        invoke(&source, "setData", &[data]).map(drop)
    }

    fn add_layer(&mut self, definition: &Value, before: Option<&str>) -> Result<(), SurfaceError> {
        let definition = to_js("addLayer", definition)?;
        self.call_map("addLayer", &[definition, before_arg(before)]).map(drop)
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.call_map("removeLayer", &[JsValue::from_str(id)]).map(drop)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.lookup("getLayer", id)
    }

    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), SurfaceError> {
        self.call_map("moveLayer", &[JsValue::from_str(id), before_arg(before)]).map(drop)
    }

    fn set_paint_property(&mut self, layer: &str, name: &str, value: &Value) -> Result<(), SurfaceError> {
        let value = to_js("setPaintProperty", value)?;
        self.call_map("setPaintProperty", &[JsValue::from_str(layer), JsValue::from_str(name), value]).map(drop)
    }

    fn set_filter(&mut self, layer: &str, filter: &Value) -> Result<(), SurfaceError> {
        let filter = to_js("setFilter", filter)?;
        self.call_map("setFilter", &[JsValue::from_str(layer), filter]).map(drop)
    }

    fn set_drag_pan(&mut self, enabled: bool) -> Result<(), SurfaceError> {
        let handler = Reflect::get(&self.map, &JsValue::from_str("dragPan")).map_err(|e| js_error("dragPan", &e))?;
        if handler.is_undefined() {
            return Err(SurfaceError::MissingMethod("dragPan".into()));
        }
        invoke(&handler, if enabled { "enable" } else { "disable" }, &[]).map(drop)
    }

    fn set_cursor(&mut self, cursor: &str) -> Result<(), SurfaceError> {
        let canvas: web_sys::HtmlElement =
            self.call_map("getCanvas", &[])?.dyn_into().map_err(|_| SurfaceError::MissingMethod("getCanvas".into()))?;
        canvas.style().set_property("cursor", cursor).map_err(|e| js_error("style.cursor", &e))
    }

    fn fit_bounds(&mut self, bounds: Bounds) -> Result<(), SurfaceError> {
        let b = to_js("fitBounds", &serde_json::json!([bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y]))?;
        let opts = to_js("fitBounds", &serde_json::json!({ "padding": 0, "animate": false }))?;
        self.call_map("fitBounds", &[b, opts]).map(drop)
    }
}

// =============================================================
// Headless
// =============================================================

/// In-memory map. Layers are kept bottom to top.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    sources: BTreeMap<String, Value>,
    layers: Vec<Value>,
    drag_pan: bool,
    cursor: String,
    fitted: Option<Bounds>,
    failing: HashSet<String>,
    calls: Vec<String>,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self {
            sources: BTreeMap::new(),
            layers: Vec::new(),
            drag_pan: true,
            cursor: String::new(),
            fitted: None,
            failing: HashSet::new(),
            calls: Vec::new(),
        }
    }
}

impl HeadlessSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call to `method` fail.
    pub fn fail_on(&mut self, method: &str) {
        self.failing.insert(method.to_owned());
    }

    /// Layer ids, bottom to top.
    #[must_use]
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().filter_map(|l| l["id"].as_str()).collect()
    }

    #[must_use]
    pub fn layer(&self, id: &str) -> Option<&Value> {
        self.layers.iter().find(|l| l["id"] == id)
    }

    #[must_use]
    pub fn source(&self, id: &str) -> Option<&Value> {
        self.sources.get(id)
    }

    /// The `data` of a GeoJSON source.
    #[must_use]
    pub fn source_data(&self, id: &str) -> Option<&Value> {
        self.sources.get(id).map(|s| &s["data"])
    }

    #[must_use]
    pub fn drag_pan(&self) -> bool {
        self.drag_pan
    }

    #[must_use]
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    #[must_use]
    pub fn fitted(&self) -> Option<Bounds> {
        self.fitted
    }

    /// Method names of every call, successful or not, in order.
    #[must_use]
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn record(&mut self, method: &str) -> Result<(), SurfaceError> {
        self.calls.push(method.to_owned());
        if self.failing.contains(method) {
            return Err(SurfaceError::Unavailable(method.to_owned()));
        }
        Ok(())
    }

    fn layer_index(&self, id: &str) -> Result<usize, SurfaceError> {
        self.layers.iter().position(|l| l["id"] == id).ok_or_else(|| SurfaceError::MissingLayer(id.to_owned()))
    }

    fn insert_at(&self, before: Option<&str>) -> Result<usize, SurfaceError> {
        match before {
            Some(b) => self.layer_index(b),
            None => Ok(self.layers.len()),
        }
    }
}

impl MapSurface for HeadlessSurface {
    fn add_source(&mut self, id: &str, definition: &Value) -> Result<(), SurfaceError> {
        self.record("addSource")?;
        if self.sources.contains_key(id) {
            return Err(SurfaceError::Duplicate(id.to_owned()));
        }
        self.sources.insert(id.to_owned(), definition.clone());
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.record("removeSource")?;
        if self.layers.iter().any(|l| l["source"] == id) {
            return Err(SurfaceError::InUse(id.to_owned()));
        }
        self.sources.remove(id).map(drop).ok_or_else(|| SurfaceError::MissingSource(id.to_owned()))
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn set_source_data(&mut self, id: &str, data: &Value) -> Result<(), SurfaceError> {
        self.record("setData")?;
        let source = self.sources.get_mut(id).ok_or_else(|| SurfaceError::MissingSource(id.to_owned()))?;
        source["data"] = data.clone();
        Ok(())
    }

    fn add_layer(&mut self, definition: &Value, before: Option<&str>) -> Result<(), SurfaceError> {
        self.record("addLayer")?;
        let id = definition["id"].as_str().unwrap_or_default();
        if self.has_layer(id) {
            return Err(SurfaceError::Duplicate(id.to_owned()));
        }
        if let Some(src) = definition["source"].as_str() {
            if !self.sources.contains_key(src) {
                return Err(SurfaceError::MissingSource(src.to_owned()));
            }
        }
        let at = self.insert_at(before)?;
        self.layers.insert(at, definition.clone());
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.record("removeLayer")?;
        let i = self.layer_index(id)?;
        self.layers.remove(i);
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l["id"] == id)
    }

    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), SurfaceError> {
        self.record("moveLayer")?;
        let i = self.layer_index(id)?;
        let layer = self.layers.remove(i);
        match self.insert_at(before) {
            Ok(at) => {
                self.layers.insert(at, layer);
                Ok(())
            }
            Err(e) => {
                self.layers.insert(i, layer);
                Err(e)
            }
        }
    }

    fn set_paint_property(&mut self, layer: &str, name: &str, value: &Value) -> Result<(), SurfaceError> {
        self.record("setPaintProperty")?;
        let i = self.layer_index(layer)?;
        self.layers[i]["paint"][name] = value.clone();
        Ok(())
    }

    fn set_filter(&mut self, layer: &str, filter: &Value) -> Result<(), SurfaceError> {
        self.record("setFilter")?;
        let i = self.layer_index(layer)?;
        self.layers[i]["filter"] = filter.clone();
        Ok(())
    }

    fn set_drag_pan(&mut self, enabled: bool) -> Result<(), SurfaceError> {
        self.record("dragPan")?;
        self.drag_pan = enabled;
        Ok(())
    }

    fn set_cursor(&mut self, cursor: &str) -> Result<(), SurfaceError> {
        self.record("setCursor")?;
        cursor.clone_into(&mut self.cursor);
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: Bounds) -> Result<(), SurfaceError> {
        self.record("fitBounds")?;
        self.fitted = Some(bounds);
        Ok(())
    }
}
