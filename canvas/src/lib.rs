//! Edit-and-sync engine for factory floor-plan geometry.
//!
//! This crate is compiled to WebAssembly and runs in the browser next to a
//! MapLibre map. It owns the hierarchy of zone polygons (`polje`, `subzone`,
//! `vrsta`, `globina`), decides which of them are drawn, turns raw pointer
//! events into body and vertex drags, and keeps the map's sources and layers
//! in step. The host layer is responsible only for wiring DOM events to the
//! engine and persisting the resulting [`engine::Action`]s to the feature
//! store.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Hierarchy nodes, levels and the in-memory document store |
//! | [`convert`] | Exchange and feature-store GeoJSON formats |
//! | [`visibility`] | Display level and the cascading checked-set |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`solver`] | Body translation and rectangle-preserving vertex drags |
//! | [`schedule`] | Single-slot animation-frame coalescer |
//! | [`hit`] | Hit-testing against polygons and vertex handles |
//! | [`arrange`] | Grid layout for bring-checked-into-view |
//! | [`render`] | Map source/layer synchronisation |
//! | [`surface`] | The map seam: JS binding and headless implementation |
//! | [`camera`] | Viewport projection between screen and world |
//! | [`affine`] | Affine transform, orientation and aspect analysis |
//! | [`geom`] | Points, rings and bounds |
//! | [`consts`] | Shared numeric constants and map ids |

pub mod affine;
pub mod arrange;
pub mod camera;
pub mod consts;
pub mod convert;
pub mod doc;
pub mod engine;
pub mod geom;
pub mod hit;
pub mod input;
pub mod render;
pub mod schedule;
pub mod solver;
pub mod surface;
pub mod visibility;
