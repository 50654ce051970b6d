//! MAI Core - Maya ASCII scene import.
//!
//! This crate provides:
//!
//! - **`.ma` import**: segmentation, classification, mesh reconstruction,
//!   node builders and connection replay (`ma`)
//! - **Host abstraction**: the `SceneBackend` trait every import drives
//! - **In-memory host**: `MemoryScene` with polygon `Mesh` storage
//! - **Configuration**: `ImportConfig` deny-lists and flags
//!
//! # Example
//!
//! ```ignore
//! use mai_core::{import_file, ImportConfig, MemoryScene};
//!
//! let mut scene = MemoryScene::with_defaults();
//! let report = import_file("scene.ma", &mut scene, &ImportConfig::default())?;
//! println!("Created {} meshes, {} diagnostics",
//!     report.transaction.meshes.len(),
//!     report.diagnostics.len());
//! ```

pub mod backend;
pub mod config;
pub mod ma;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use backend::{BackendError, BackendResult, FaceRange, MeshDescription, SceneBackend};
pub use config::{ConfigError, ImportConfig};
pub use ma::{
    import_file, import_from_string, Diagnostic, DiagnosticKind, ImportCommand, ImportError, ImportReport, ImportResult,
    ImportState, ImportTransaction,
};
pub use mesh::Mesh;
pub use scene::MemoryScene;
