//! Shared numeric and styling constants for the canvas crate.

// ── Geometry ────────────────────────────────────────────────────

/// Determinant magnitude below which two solver lines count as parallel.
pub const SOLVER_DET_EPSILON: f64 = 1e-10;

/// Minimum number of distinct vertices a loaded ring must have.
pub const MIN_RING_VERTICES: usize = 3;

/// Reference polygon whose orientation and aspect drive bulk arrangement.
pub const REFERENCE_POLYGON: [[f64; 2]; 5] = [
    [10.975_172_639_350_573, 45.168_735_419_035_52],
    [9.753_687_796_547_522, 45.118_458_416_030_7],
    [9.829_368_801_142_177, 44.267_151_666_969_13],
    [11.029_076_321_130_045, 44.317_441_291_069_5],
    [10.975_172_639_350_573, 45.168_735_419_035_52],
];

/// Number of polygons per row when arranging checked nodes into view.
pub const ARRANGE_PER_ROW: usize = 5;

// ── Colours ─────────────────────────────────────────────────────

/// Multiplier applied to an inherited ancestor colour per depth step.
pub const INHERITED_COLOR_FACTOR: f64 = 0.8;

/// Fill for the selected polygon.
pub const SELECTED_FILL: &str = "#ffff00";

/// Outline for the selected polygon.
pub const SELECTED_OUTLINE: &str = "#000000";

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for vertex handles.
pub const HANDLE_RADIUS_PX: f64 = 11.2;

/// Radius of a hovered vertex handle in pixels.
pub const HANDLE_HOVER_RADIUS_PX: f64 = 13.4;

// ── Map ids ─────────────────────────────────────────────────────

pub const ANNOTATION_SOURCE: &str = "annotations";
pub const FILL_LAYER: &str = "annotations-fill";
pub const OUTLINE_LAYER: &str = "annotations-outline";
pub const LABEL_LAYER: &str = "annotations-labels";
pub const VERTEX_SOURCE: &str = "vertices";
pub const VERTEX_LAYER: &str = "vertices";
pub const VERTEX_HOVER_LAYER: &str = "vertices-hover";
pub const BASEMAP_SOURCE: &str = "factory-tiles";
pub const BASEMAP_LAYER: &str = "factory-tiles-lines";
