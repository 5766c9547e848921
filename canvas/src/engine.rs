use serde::Serialize;

use crate::arrange::{ArrangeError, arrange};
use crate::camera::Viewport;
use crate::consts::REFERENCE_POLYGON;
use crate::convert::{FeatureCollection, StoreFeatureCollection, document_from_store, flat_to_tree, tree_to_flat};
use crate::doc::{AttributeEdit, DocStore, HierarchyDocument, Level, Node, NodeId};
use crate::geom::{Bounds, Point, ensure_closed_ring};
use crate::hit::{HitPart, hit_handle, hit_test};
use crate::input::{Button, DragSession, GestureKind, InputState, Modifiers, UiState};
use crate::render::{BasemapConfig, DrawItem, RenderSync};
use crate::schedule::Coalescer;
use crate::solver::VertexMode;
use crate::surface::MapSurface;
use crate::visibility::Visibility;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

const CURSOR_GRAB: &str = "grab";
const CURSOR_GRABBING: &str = "grabbing";

/// New geometry for one stored feature, as sent to the feature store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryUpdate {
    #[serde(skip)]
    pub node_id: NodeId,
    #[serde(rename = "id")]
    pub remote_id: i64,
    /// Closed ring.
    pub coordinates: Vec<Point>,
    pub x_coord: f64,
    pub y_coord: f64,
}

impl GeometryUpdate {
    /// Build from a node's persisted ring. `None` when the node has no
    /// store id or no geometry.
    #[must_use]
    pub fn from_node(node: &Node) -> Option<Self> {
        let Some(remote_id) = node.remote_id else {
            log::warn!("{}: no store id, not persisting", node.id);
            return None;
        };
        let coordinates = ensure_closed_ring(node.persisted_ring());
        let anchor = coordinates.first().copied()?;
        Some(Self { node_id: node.id.clone(), remote_id, coordinates, x_coord: anchor.x, y_coord: anchor.y })
    }
}

/// Actions returned from input handlers for the host to process.
///
/// Map-facing actions (render, handles, cursor, drag-pan, fit) are consumed by
/// [`Engine`]; the rest reach the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Annotation geometry changed; push new source data.
    RenderNeeded,
    /// The visible set changed; rebuild annotation layers.
    RebuildNeeded,
    /// Call [`EngineCore::on_animation_frame`] on the next animation frame.
    RequestFrame,
    SelectionChanged(Option<NodeId>),
    ShowVertexHandles(NodeId),
    HideVertexHandles,
    HoverVertex(Option<usize>),
    SetDragPan(bool),
    SetCursor(String),
    FitBounds(Bounds),
    /// A drag moved a stored feature.
    GeometryCommitted(GeometryUpdate),
    /// Bring-into-view moved several stored features at once.
    BulkRepositioned(Vec<GeometryUpdate>),
    AttributeEdited { id: NodeId, remote_id: i64, edit: AttributeEdit },
    /// Double-click on a polygon: the host opens its attribute editor.
    EditAttributesRequested { id: NodeId },
}

impl Action {
    /// Whether [`Engine`] applies this action to the map itself.
    #[must_use]
    pub fn is_map_action(&self) -> bool {
        matches!(
            self,
            Self::RenderNeeded
                | Self::RebuildNeeded
                | Self::ShowVertexHandles(_)
                | Self::HideVertexHandles
                | Self::HoverVertex(_)
                | Self::SetDragPan(_)
                | Self::SetCursor(_)
                | Self::FitBounds(_)
        )
    }
}

/// Core engine state: all logic that doesn't depend on the map widget.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
#[derive(Debug, Default)]
pub struct EngineCore {
    pub doc: DocStore,
    pub visibility: Visibility,
    pub ui: UiState,
    pub input: InputState,
    pub viewport: Viewport,
    /// Latest pointer position waiting for the next frame.
    frames: Coalescer<Point>,
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Data inputs ---

    /// Replace the document. Selection, checked-set and any gesture are reset.
    pub fn load_document(&mut self, doc: HierarchyDocument) -> Vec<Action> {
        self.doc = DocStore::from_document(doc);
        self.input = InputState::Idle;
        self.frames.cancel();
        self.visibility.clear();
        self.ui.selected = None;
        self.ui.hovered_vertex = None;
        log::debug!("loaded {} nodes", self.doc.len());
        vec![Action::HideVertexHandles, Action::SelectionChanged(None), Action::RebuildNeeded]
    }

    /// Load the exchange format.
    pub fn load_exchange(&mut self, fc: &FeatureCollection) -> Vec<Action> {
        self.load_document(flat_to_tree(fc))
    }

    /// Load the feature store's `GET /features/geojson` collection.
    pub fn load_store_features(&mut self, fc: &StoreFeatureCollection) -> Vec<Action> {
        self.load_document(document_from_store(fc))
    }

    /// Export the document in the exchange format.
    #[must_use]
    pub fn export(&self) -> FeatureCollection {
        tree_to_flat(&self.doc.to_document())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_vertex_mode(&mut self, mode: VertexMode) {
        self.ui.vertex_mode = mode;
    }

    // --- Visibility ---

    /// Switch the display level. `globina` is refused.
    pub fn set_display_level(&mut self, level: Level) -> Vec<Action> {
        if !self.visibility.set_display_level(level) {
            return Vec::new();
        }
        vec![Action::RebuildNeeded]
    }

    /// Toggle one tree checkbox, cascading to descendants.
    pub fn set_checked(&mut self, id: &str, checked: bool) -> Vec<Action> {
        if self.doc.get(id).is_none() {
            return Vec::new();
        }
        self.visibility.set_checked(&self.doc, id, checked);
        vec![Action::RebuildNeeded]
    }

    /// Check every `polje` matching `term`.
    pub fn check_visible(&mut self, term: &str) -> Vec<Action> {
        self.visibility.check_visible(&self.doc, term);
        vec![Action::RebuildNeeded]
    }

    /// Uncheck every node matching `term`; all of them when blank.
    pub fn uncheck_visible(&mut self, term: &str) -> Vec<Action> {
        self.visibility.uncheck_visible(&self.doc, term);
        vec![Action::RebuildNeeded]
    }

    // --- Selection ---

    /// Move the selection cursor, e.g. from the tree view.
    pub fn select(&mut self, id: Option<&str>) -> Vec<Action> {
        let id = id.filter(|id| self.doc.get(id).is_some());
        if self.ui.selected.as_deref() == id {
            return Vec::new();
        }
        self.ui.selected = id.map(str::to_owned);
        self.ui.hovered_vertex = None;
        let handles = match &self.ui.selected {
            Some(id) => Action::ShowVertexHandles(id.clone()),
            None => Action::HideVertexHandles,
        };
        vec![Action::SelectionChanged(self.ui.selected.clone()), handles]
    }

    // --- Attributes ---

    /// Apply an attribute edit locally and hand it to the host for persisting.
    pub fn set_attribute(&mut self, id: &str, edit: AttributeEdit) -> Vec<Action> {
        if !self.doc.apply_attribute(id, &edit) {
            return Vec::new();
        }
        let mut actions = vec![Action::RenderNeeded];
        match self.doc.get(id).and_then(|n| n.remote_id) {
            Some(remote_id) => actions.push(Action::AttributeEdited { id: id.to_owned(), remote_id, edit }),
            None => log::warn!("{id}: no store id, {} edit kept locally", edit.field()),
        }
        actions
    }

    // --- Bulk arrange ---

    /// Lay the checked nodes at the display level out in rows across the
    /// viewport, then zoom to it.
    ///
    /// # Errors
    /// Fails when nothing at the display level is checked or the viewport is
    /// empty.
    pub fn bring_checked_into_view(&mut self) -> Result<Vec<Action>, ArrangeError> {
        let level = self.visibility.display_level();
        let ids: Vec<NodeId> = self
            .doc
            .iter()
            .filter(|n| n.level == level && self.visibility.is_checked(&n.id))
            .map(|n| n.id.clone())
            .collect();
        let reference: Vec<Point> = REFERENCE_POLYGON.iter().map(|[x, y]| Point::new(*x, *y)).collect();
        let placements = arrange(&ids, &self.viewport, &reference)?;

        let mut updates = Vec::with_capacity(placements.len());
        for placement in placements {
            let has_gl = self.doc.get(&placement.node_id).is_some_and(|n| n.shape_gl.is_some());
            let shape_gl = has_gl.then(|| placement.ring.clone());
            self.doc.commit_geometry(&placement.node_id, placement.ring, shape_gl);
            if let Some(update) = self.doc.get(&placement.node_id).and_then(GeometryUpdate::from_node) {
                updates.push(update);
            }
        }

        let mut actions = vec![Action::RenderNeeded, Action::FitBounds(self.viewport.world_bounds())];
        if let Some(sel) = self.ui.selected.as_ref().filter(|s| ids.contains(*s)) {
            actions.push(Action::ShowVertexHandles(sel.clone()));
        }
        if !updates.is_empty() {
            actions.push(Action::BulkRepositioned(updates));
        }
        Ok(actions)
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        // A pointer-up we never saw.
        let mut actions = self.end_gesture();

        let world = self.viewport.screen_to_world(screen_pt);
        let visible = self.visibility.compute_visible(&self.doc);
        let hit = hit_test(world, &visible, &self.viewport, self.ui.selected.as_deref());
        let Some(hit) = hit else {
            actions.extend(self.select(None));
            return actions;
        };
        let Some(node) = self.doc.get(&hit.node_id) else {
            return actions;
        };

        match hit.part {
            HitPart::Vertex(index) => {
                let kind = GestureKind::Vertex { index, mode: self.ui.vertex_mode };
                self.input = InputState::DraggingVertex(DragSession::begin(node, kind, world));
            }
            HitPart::Body => {
                self.input = InputState::DraggingBody(DragSession::begin(node, GestureKind::Position, world));
                if self.ui.selected.as_deref() != Some(hit.node_id.as_str()) {
                    self.ui.selected = Some(hit.node_id.clone());
                    actions.push(Action::SelectionChanged(self.ui.selected.clone()));
                }
                self.ui.hovered_vertex = None;
                actions.push(Action::HideVertexHandles);
            }
        }
        actions.push(Action::SetDragPan(false));
        actions.extend(self.set_cursor(CURSOR_GRABBING));
        actions
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.viewport.screen_to_world(screen_pt);
        if !self.input.is_idle() {
            if self.frames.schedule(world) {
                return vec![Action::RequestFrame];
            }
            return Vec::new();
        }
        self.hover(world)
    }

    /// Apply the pointer position parked since the last frame.
    pub fn on_animation_frame(&mut self) -> Vec<Action> {
        let Some(world) = self.frames.take() else {
            return Vec::new();
        };
        let Some(session) = self.input.session_mut() else {
            return Vec::new();
        };
        session.apply(world);
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_up(&mut self, _screen_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        self.end_gesture()
    }

    /// The pointer left the map. Ends any gesture as a pointer-up would.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        let mut actions = self.end_gesture();
        if self.ui.hovered_vertex.take().is_some() {
            actions.push(Action::HoverVertex(None));
        }
        actions.extend(self.set_cursor(""));
        actions
    }

    pub fn on_double_click(&mut self, screen_pt: Point) -> Vec<Action> {
        let world = self.viewport.screen_to_world(screen_pt);
        let visible = self.visibility.compute_visible(&self.doc);
        match hit_test(world, &visible, &self.viewport, None) {
            Some(hit) => vec![Action::EditAttributesRequested { id: hit.node_id }],
            None => Vec::new(),
        }
    }

    // --- Queries ---

    /// The currently selected node, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.ui.selected.as_deref()
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.doc.get(id)
    }

    /// What the map should draw now, in draw order. The node being dragged
    /// shows its live ring.
    #[must_use]
    pub fn visible_items(&self) -> Vec<DrawItem<'_>> {
        self.visibility
            .compute_visible(&self.doc)
            .into_iter()
            .map(|node| DrawItem { node, ring: self.ring_for(node) })
            .collect()
    }

    /// Ring to draw handles on for `id`.
    #[must_use]
    pub fn handle_ring(&self, id: &str) -> Option<Vec<Point>> {
        self.doc.get(id).map(|node| self.ring_for(node))
    }

    fn ring_for(&self, node: &Node) -> Vec<Point> {
        let selected = self.ui.selected.as_deref() == Some(node.id.as_str());
        match self.input.session().filter(|s| s.node_id == node.id) {
            Some(s) => match &s.live_shape_gl {
                Some(gl) if selected && node.edited => gl.clone(),
                _ => s.live_polygon.clone(),
            },
            None => node.render_ring(selected),
        }
    }

    // --- Internals ---

    /// Finish the active gesture: drop any parked update, commit the live
    /// rings once, and persist if the pointer moved the geometry.
    fn end_gesture(&mut self) -> Vec<Action> {
        self.frames.cancel();
        let (session, was_vertex) = match std::mem::take(&mut self.input) {
            InputState::Idle => return Vec::new(),
            InputState::DraggingBody(s) => (s, false),
            InputState::DraggingVertex(s) => (s, true),
        };
        let DragSession { node_id, start_polygon, start_shape_gl, live_polygon, live_shape_gl, moved, .. } = session;
        // Pointer wandered off and came back: nothing to persist.
        let changed = moved && (live_polygon != start_polygon || live_shape_gl != start_shape_gl);
        let mut actions = vec![Action::SetDragPan(true)];
        actions.extend(self.set_cursor(CURSOR_GRAB));

        if !self.doc.commit_geometry(&node_id, live_polygon, live_shape_gl) {
            log::warn!("{node_id}: node vanished during drag");
            return actions;
        }
        actions.push(Action::RenderNeeded);
        // A body press without movement is a click: handles come back.
        if was_vertex || !moved {
            actions.push(Action::ShowVertexHandles(node_id.clone()));
        }
        if changed {
            if let Some(update) = self.doc.get(&node_id).and_then(GeometryUpdate::from_node) {
                actions.push(Action::GeometryCommitted(update));
            }
        }
        actions
    }

    /// Idle pointer movement: handle hover and cursor affordance.
    fn hover(&mut self, world: Point) -> Vec<Action> {
        let visible = self.visibility.compute_visible(&self.doc);
        let handle = self
            .ui
            .selected
            .as_deref()
            .and_then(|id| visible.iter().find(|n| n.id == id))
            .and_then(|node| hit_handle(world, node, &self.viewport));
        let over_body = handle.is_some() || hit_test(world, &visible, &self.viewport, None).is_some();

        let mut actions = Vec::new();
        if handle != self.ui.hovered_vertex {
            self.ui.hovered_vertex = handle;
            actions.push(Action::HoverVertex(handle));
        }
        actions.extend(self.set_cursor(if over_body { CURSOR_GRAB } else { "" }));
        actions
    }

    fn set_cursor(&mut self, cursor: &str) -> Option<Action> {
        if self.ui.cursor == cursor {
            return None;
        }
        cursor.clone_into(&mut self.ui.cursor);
        Some(Action::SetCursor(cursor.to_owned()))
    }
}

/// The full engine. Wraps `EngineCore` and owns the map it draws on.
///
/// Every handler returns only the actions the host must act on; map-facing
/// actions are applied here through [`RenderSync`].
pub struct Engine<S: MapSurface> {
    pub core: EngineCore,
    render: RenderSync,
    surface: S,
}

impl<S: MapSurface> Engine<S> {
    /// Create a new engine bound to the given map.
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self { core: EngineCore::new(), render: RenderSync::new(), surface }
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Install the vector-tile basemap below the annotations.
    pub fn install_basemap(&mut self, config: &BasemapConfig) {
        self.render.install_basemap(&mut self.surface, config);
    }

    // --- Delegated inputs ---

    pub fn load_document(&mut self, doc: HierarchyDocument) -> Vec<Action> {
        let actions = self.core.load_document(doc);
        self.dispatch(actions)
    }

    pub fn load_exchange(&mut self, fc: &FeatureCollection) -> Vec<Action> {
        let actions = self.core.load_exchange(fc);
        self.dispatch(actions)
    }

    pub fn load_store_features(&mut self, fc: &StoreFeatureCollection) -> Vec<Action> {
        let actions = self.core.load_store_features(fc);
        self.dispatch(actions)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.core.set_viewport(viewport);
    }

    pub fn set_vertex_mode(&mut self, mode: VertexMode) {
        self.core.set_vertex_mode(mode);
    }

    pub fn set_display_level(&mut self, level: Level) -> Vec<Action> {
        let actions = self.core.set_display_level(level);
        self.dispatch(actions)
    }

    pub fn set_checked(&mut self, id: &str, checked: bool) -> Vec<Action> {
        let actions = self.core.set_checked(id, checked);
        self.dispatch(actions)
    }

    pub fn check_visible(&mut self, term: &str) -> Vec<Action> {
        let actions = self.core.check_visible(term);
        self.dispatch(actions)
    }

    pub fn uncheck_visible(&mut self, term: &str) -> Vec<Action> {
        let actions = self.core.uncheck_visible(term);
        self.dispatch(actions)
    }

    pub fn select(&mut self, id: Option<&str>) -> Vec<Action> {
        let actions = self.core.select(id);
        self.dispatch(actions)
    }

    pub fn set_attribute(&mut self, id: &str, edit: AttributeEdit) -> Vec<Action> {
        let actions = self.core.set_attribute(id, edit);
        self.dispatch(actions)
    }

    /// # Errors
    /// See [`EngineCore::bring_checked_into_view`].
    pub fn bring_checked_into_view(&mut self) -> Result<Vec<Action>, ArrangeError> {
        let actions = self.core.bring_checked_into_view()?;
        Ok(self.dispatch(actions))
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        let actions = self.core.on_pointer_down(screen_pt, button, modifiers);
        self.dispatch(actions)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        let actions = self.core.on_pointer_move(screen_pt, modifiers);
        self.dispatch(actions)
    }

    pub fn on_animation_frame(&mut self) -> Vec<Action> {
        let actions = self.core.on_animation_frame();
        self.dispatch(actions)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        let actions = self.core.on_pointer_up(screen_pt, button, modifiers);
        self.dispatch(actions)
    }

    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        let actions = self.core.on_pointer_leave();
        self.dispatch(actions)
    }

    pub fn on_double_click(&mut self, screen_pt: Point) -> Vec<Action> {
        let actions = self.core.on_double_click(screen_pt);
        self.dispatch(actions)
    }

    // --- Render ---

    /// Apply map-facing actions and return the rest.
    fn dispatch(&mut self, actions: Vec<Action>) -> Vec<Action> {
        let mut host = Vec::new();
        for action in actions {
            match action {
                Action::RenderNeeded => {
                    let items = self.core.visible_items();
                    self.render.refresh_source(&mut self.surface, &items, self.core.selection());
                }
                Action::RebuildNeeded => {
                    let items = self.core.visible_items();
                    self.render.rebuild_layers(&mut self.surface, &items, self.core.selection());
                }
                Action::ShowVertexHandles(id) => match self.core.handle_ring(&id) {
                    Some(ring) => self.render.show_vertex_handles(&mut self.surface, &id, &ring),
                    None => self.render.hide_vertex_handles(&mut self.surface),
                },
                Action::HideVertexHandles => self.render.hide_vertex_handles(&mut self.surface),
                Action::HoverVertex(index) => self.render.set_hover(&mut self.surface, index),
                Action::SetDragPan(enabled) => {
                    if let Err(e) = self.surface.set_drag_pan(enabled) {
                        log::warn!("drag-pan: {e}");
                    }
                }
                Action::SetCursor(cursor) => {
                    if let Err(e) = self.surface.set_cursor(&cursor) {
                        log::warn!("cursor: {e}");
                    }
                }
                Action::FitBounds(bounds) => {
                    if let Err(e) = self.surface.fit_bounds(bounds) {
                        log::warn!("fit bounds: {e}");
                    }
                }
                Action::SelectionChanged(selected) => {
                    self.render.set_selected(&mut self.surface, selected.as_deref());
                    host.push(Action::SelectionChanged(selected));
                }
                other => host.push(other),
            }
        }
        host
    }
}
