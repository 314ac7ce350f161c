//! Browser scene editor for 2D game scenes.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! editing model of a scene document: static images, sprite animations and
//! folders laid out on a fixed-size canvas. It turns raw pointer and keyboard
//! input into document edits, keeps undo/redo history, previews sprite
//! animations, and draws the result. The host page only wires DOM events to
//! [`web::EditorApp`], renders the treeview and properties panel from the
//! JSON view models it hands out, and reacts to [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`web`] | `#[wasm_bindgen]` surface, asset fetching, frame loop |
//! | [`doc`] | Scene document model and its JSON format |
//! | [`history`] | Snapshot-based undo/redo |
//! | [`selection`] | Ordered multi-selection |
//! | [`camera`] | Zoom and screen/scene coordinate conversion |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing, resize handles and resize math |
//! | [`images`] | Image cache and pixel-alpha sampling |
//! | [`animator`] | Sprite frame catalogs and sequence playback |
//! | [`tree`] | Treeview rows, drop zones and hierarchy moves |
//! | [`properties`] | Properties panel view model and field edits |
//! | [`render`] | Canvas 2D drawing |
//! | [`storage`] | Client for the file-storage endpoint |
//! | [`config`] | Host-supplied configuration |
//! | [`error`] | Error types |
//! | [`consts`] | Shared numeric constants (zoom limits, thresholds, etc.) |

pub mod animator;
pub mod camera;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod error;
pub mod history;
pub mod hit;
pub mod images;
pub mod input;
pub mod properties;
pub mod render;
pub mod selection;
pub mod storage;
pub mod tree;
pub mod web;
