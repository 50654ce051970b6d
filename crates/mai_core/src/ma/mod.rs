//! Maya ASCII (`.ma`) import.
//!
//! This module reads `.ma` scene text and replays it into a
//! [`SceneBackend`](crate::backend::SceneBackend):
//!
//! 1. The document is segmented into node blocks and `connectAttr`
//!    statements.
//! 2. Blocks are classified by category (mesh, transform, shader pair,
//!    skin deformer, other).
//! 3. Builders create nodes under collision-free names, reconstructing
//!    polygon meshes from their compact edge/face encoding.
//! 4. Connections are replayed through the session's name map.
//!
//! Everything created is recorded in an [`ImportTransaction`] so the import
//! can be undone as one unit.
//!
//! ## Supported
//!
//! - Polygon meshes: vertices, edges with smoothing, faces with holes,
//!   multiple UV sets, per-vertex normals, color sets, vertex tweaks
//! - Shader / shading group pairs and per-face material membership
//! - Skin cluster weights, blend shape aliases
//! - Generic nodes with attribute replay
//!
//! ## Not Supported
//!
//! - References, namespaces beyond the root prefix
//! - NURBS, subdivision surfaces, animation curves evaluation
//!
//! # Example
//!
//! ```ignore
//! use mai_core::ma::{import_file, ImportCommand};
//! use mai_core::{ImportConfig, MemoryScene};
//!
//! let mut scene = MemoryScene::with_defaults();
//! let mut command = ImportCommand::new("scene.ma", ImportConfig::default());
//! let report = command.execute(&mut scene)?;
//! println!("Created {} meshes", report.transaction.meshes.len());
//! command.undo(&mut scene)?;
//! ```

mod builders;
mod classify;
mod connect;
mod diagnostic;
mod faces;
mod geometry;
mod names;
mod parser;
mod session;
mod types;

pub use classify::ReferenceError;
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
pub use names::{uniquify, NameResolver, RenameConflict};
pub use parser::{
    command_of, flag_value, parse_floats, parse_set_attr, segment, tokenize, unquote, ParseError, ParseResult,
};
pub use session::{
    import_file, import_from_string, ImportCommand, ImportError, ImportReport, ImportResult, ImportSession,
    ImportState, ImportTransaction,
};
pub use types::{dag_leaf, plug_node, AttrPath, ConnectionStatement, Document, NodeBlock, SetAttr};
