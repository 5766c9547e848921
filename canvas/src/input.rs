//! Input model: modifier keys, mouse buttons, and the gesture state machine.
//!
//! `InputState` is the active gesture between pointer-down and pointer-up.
//! Drag variants own a [`DragSession`]: the rings captured at gesture start
//! plus the working rings the frame updates write into. The document store is
//! not touched until the gesture ends.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::doc::{Node, NodeId};
use crate::geom::{Point, ensure_closed_ring};
use crate::solver::{VertexMode, apply_body_drag, apply_vertex_drag};

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    Middle,
    Secondary,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Selection cursor. Independent of the checked-set.
    pub selected: Option<NodeId>,
    /// Handle under the pointer on the selected node.
    pub hovered_vertex: Option<usize>,
    pub vertex_mode: VertexMode,
    /// CSS cursor last requested from the host.
    pub cursor: String,
}

/// Which kind of drag a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    /// Whole-polygon move.
    Position,
    /// Single-vertex reshape.
    Vertex { index: usize, mode: VertexMode },
}

/// Buffers for one drag gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub node_id: NodeId,
    pub kind: GestureKind,
    /// World position of the pointer at gesture start.
    pub reference: Point,
    pub start_polygon: Vec<Point>,
    pub start_shape_gl: Option<Vec<Point>>,
    pub live_polygon: Vec<Point>,
    pub live_shape_gl: Option<Vec<Point>>,
    /// A non-zero delta has been applied.
    pub moved: bool,
}

impl DragSession {
    /// Capture `node`'s rings. Both snapshots are closed.
    #[must_use]
    pub fn begin(node: &Node, kind: GestureKind, reference: Point) -> Self {
        let start_polygon = ensure_closed_ring(&node.polygon);
        let start_shape_gl = node.shape_gl.as_deref().map(ensure_closed_ring);
        Self {
            node_id: node.id.clone(),
            kind,
            reference,
            live_polygon: start_polygon.clone(),
            live_shape_gl: start_shape_gl.clone(),
            start_polygon,
            start_shape_gl,
            moved: false,
        }
    }

    /// Recompute the live rings for the pointer at `world`. Each snapshot is
    /// edited independently from its start ring.
    pub fn apply(&mut self, world: Point) {
        let delta = world - self.reference;
        if delta.x != 0.0 || delta.y != 0.0 {
            self.moved = true;
        }
        let kind = self.kind;
        let edit = |ring: &[Point]| match kind {
            GestureKind::Position => apply_body_drag(ring, delta),
            GestureKind::Vertex { index, mode } => apply_vertex_drag(ring, index, delta, mode),
        };
        self.live_polygon = edit(&self.start_polygon);
        self.live_shape_gl = self.start_shape_gl.as_deref().map(edit);
    }

    /// Whether this is a vertex gesture.
    #[must_use]
    pub fn is_vertex(&self) -> bool {
        matches!(self.kind, GestureKind::Vertex { .. })
    }
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is moving a whole polygon.
    DraggingBody(DragSession),
    /// The user is dragging one vertex of the selected polygon.
    DraggingVertex(DragSession),
}

impl InputState {
    #[must_use]
    pub fn session(&self) -> Option<&DragSession> {
        match self {
            Self::Idle => None,
            Self::DraggingBody(s) | Self::DraggingVertex(s) => Some(s),
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut DragSession> {
        match self {
            Self::Idle => None,
            Self::DraggingBody(s) | Self::DraggingVertex(s) => Some(s),
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
