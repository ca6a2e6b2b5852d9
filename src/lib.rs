//! Interactive 3D product viewer for the browser and the desktop.
//!
//! A catalog of products is resolved into a pool of renderables up front,
//! each either loaded from a glTF/OBJ asset or generated as a primitive
//! shape. The viewer then shows one product at a time under a trackball
//! camera and switches between them on request. Everything except the
//! renderer and the front ends is plain data and runs headless.

pub mod app;
pub mod assets;
pub mod camera;
pub mod catalog;
pub mod config;
pub mod display;
pub mod error;
pub mod geometry;
pub mod input;
pub mod panel;
pub mod pool;
pub mod render;
pub mod scene;
pub mod session;
pub mod ui;
pub mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use catalog::{AssetKind, Catalog, ProductDescriptor, ShapeKind};
pub use config::ViewerConfig;
pub use error::{AssetError, CatalogError, StartupError};
pub use pool::{build_pool, EntryOrigin, ProductPool};
pub use session::{start_session, ViewerSession};
pub use ui::{ViewerUi, STARTUP_FAILURE_MESSAGE};
