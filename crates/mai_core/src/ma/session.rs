//! Import orchestration and undo bookkeeping.
//!
//! An [`ImportSession`] runs the whole pipeline against one backend and
//! records everything it creates in an [`ImportTransaction`]. The
//! [`ImportCommand`] handle keeps committed transactions around so an import
//! can be undone and redone as a single unit.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::classify::{classify, ReferenceError};
use super::diagnostic::{Diagnostic, Diagnostics};
use super::geometry::{MaterialMap, PendingTweak};
use super::names::NameResolver;
use super::parser::{segment, ParseError};
use super::types::ConnectionStatement;
use crate::backend::{BackendError, SceneBackend};
use crate::config::ImportConfig;

/// Errors that can occur during an import.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] ParseError),

    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Everything one import created or connected, in creation order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportTransaction {
    /// Mesh shape names
    pub meshes: Vec<String>,

    /// Transform DAG paths
    pub transforms: Vec<String>,
    pub shading_groups: Vec<String>,
    pub shaders: Vec<String>,

    /// Generic nodes and skin deformers
    pub others: Vec<String>,

    /// Connections established by replay
    pub connections: Vec<ConnectionStatement>,
}

impl ImportTransaction {
    pub fn is_empty(&self) -> bool {
        self.node_count() == 0 && self.connections.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.meshes.len() + self.transforms.len() + self.shading_groups.len() + self.shaders.len() + self.others.len()
    }

    /// Every node name or path the import produced.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.meshes
            .iter()
            .chain(&self.transforms)
            .chain(&self.shading_groups)
            .chain(&self.shaders)
            .chain(&self.others)
            .map(String::as_str)
    }

    /// Reverse the import: sever connections, then delete meshes, other
    /// nodes, transforms (newest first), shading groups and shaders.
    ///
    /// Entities that no longer exist are skipped. Returns the number of
    /// nodes deleted.
    pub fn undo(&self, backend: &mut dyn SceneBackend) -> usize {
        for connection in self.connections.iter().rev() {
            if backend.is_connected(&connection.source, &connection.target) {
                if let Err(e) = backend.disconnect(&connection.source, &connection.target) {
                    log::debug!("Undo: {}", e);
                }
            }
        }

        let order = self
            .meshes
            .iter()
            .chain(&self.others)
            .chain(self.transforms.iter().rev())
            .chain(&self.shading_groups)
            .chain(&self.shaders);

        let mut deleted = 0;
        for name in order {
            if !backend.exists(name) {
                continue;
            }
            match backend.delete(name) {
                Ok(()) => deleted += 1,
                Err(e) => log::debug!("Undo: {}", e),
            }
        }

        log::info!("Undo removed {} nodes and {} connections", deleted, self.connections.len());
        deleted
    }
}

/// Outcome of one import: the transaction plus what went wrong on the way.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub transaction: ImportTransaction,
    pub diagnostics: Vec<Diagnostic>,
}

/// A mesh created by this session, kept for connection replay and tweaks.
#[derive(Clone, Debug)]
pub(super) struct BuiltMesh {
    pub original: String,
    pub name: String,
    pub materials: MaterialMap,
    pub tweaks: Vec<PendingTweak>,
}

/// A skin deformer and its flattened weight list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinRecord {
    pub deformer: String,

    /// Repeating `count (influence weight)×count` records, one per vertex
    pub weights: Vec<String>,
}

/// One import run against one backend.
pub struct ImportSession<'a> {
    pub(super) backend: &'a mut dyn SceneBackend,
    pub(super) config: &'a ImportConfig,
    pub(super) names: NameResolver,
    pub(super) diagnostics: Diagnostics,
    pub(super) transaction: ImportTransaction,
    pub(super) meshes: Vec<BuiltMesh>,
    pub(super) skins: Vec<SkinRecord>,
    pub(super) blend_shapes: Vec<String>,
}

impl<'a> ImportSession<'a> {
    pub fn new(backend: &'a mut dyn SceneBackend, config: &'a ImportConfig) -> Self {
        Self {
            backend,
            config,
            names: NameResolver::new(),
            diagnostics: Diagnostics::new(),
            transaction: ImportTransaction::default(),
            meshes: Vec::new(),
            skins: Vec::new(),
            blend_shapes: Vec::new(),
        }
    }

    /// Run the full pipeline on document text.
    ///
    /// History is suppressed for the duration and re-enabled on every path.
    /// Node-level failures become diagnostics; only an unresolvable material
    /// reference fails the import.
    pub fn run(&mut self, content: &str) -> ImportResult<()> {
        self.backend.set_history_enabled(false);
        let result = self.run_stages(content);
        self.backend.set_history_enabled(true);
        result
    }

    fn run_stages(&mut self, content: &str) -> ImportResult<()> {
        let document = segment(content);
        let classification = classify(&document, self.config)?;
        let shader_names = classification.shader_names();

        let shaders = self.reuse_existing_shaders(&classification.shaders);
        self.create_transforms(&classification.transforms);
        self.create_other_nodes(&classification.others, &shader_names);
        self.create_meshes(&classification.meshes);
        self.create_shaders(&shaders)?;
        self.create_skins(&classification.skins);
        self.connect(&document.connections);
        self.apply_tweaks();
        self.apply_skin_weights();
        self.register_blend_shapes();

        log::info!(
            "Imported {} meshes, {} transforms, {} shaders, {} other nodes, {} connections ({} diagnostics)",
            self.transaction.meshes.len(),
            self.transaction.transforms.len(),
            self.transaction.shaders.len(),
            self.transaction.others.len(),
            self.transaction.connections.len(),
            self.diagnostics.len()
        );

        Ok(())
    }

    pub fn names(&self) -> &NameResolver {
        &self.names
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn transaction(&self) -> &ImportTransaction {
        &self.transaction
    }

    /// Close the session, handing over whatever was created.
    pub fn finish(self) -> ImportReport {
        ImportReport {
            transaction: self.transaction,
            diagnostics: self.diagnostics.into_vec(),
        }
    }
}

/// Import document text into `backend`.
pub fn import_from_string(content: &str, backend: &mut dyn SceneBackend, config: &ImportConfig) -> ImportResult<ImportReport> {
    let mut session = ImportSession::new(backend, config);
    session.run(content)?;
    Ok(session.finish())
}

/// Import a `.ma` file into `backend`.
///
/// # Example
///
/// ```ignore
/// use mai_core::{import_file, ImportConfig, MemoryScene};
///
/// let mut scene = MemoryScene::with_defaults();
/// let report = import_file("scene.ma", &mut scene, &ImportConfig::default())?;
/// println!("Created {} meshes", report.transaction.meshes.len());
/// ```
pub fn import_file<P: AsRef<Path>>(path: P, backend: &mut dyn SceneBackend, config: &ImportConfig) -> ImportResult<ImportReport> {
    let path = path.as_ref();
    log::info!("Importing {}", path.display());
    let content = std::fs::read_to_string(path)?;
    import_from_string(&content, backend, config)
}

/// Lifecycle of an [`ImportCommand`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ImportState {
    Idle,
    Importing,
    Committed,
}

#[derive(Clone, Debug)]
enum ImportSource {
    File(PathBuf),
    Text { name: String, content: String },
}

impl ImportSource {
    fn read(&self) -> ImportResult<String> {
        match self {
            ImportSource::File(path) => Ok(std::fs::read_to_string(path)?),
            ImportSource::Text { content, .. } => Ok(content.clone()),
        }
    }
}

/// Undoable import of one source.
///
/// Each `execute` or `redo` commits one transaction; `undo` reverses the
/// most recent one. Redo re-runs the full import.
#[derive(Debug)]
pub struct ImportCommand {
    source: ImportSource,
    config: ImportConfig,
    state: ImportState,
    committed: Vec<ImportReport>,
    undone: usize,
}

impl ImportCommand {
    pub fn new(path: impl Into<PathBuf>, config: ImportConfig) -> Self {
        Self::with_source(ImportSource::File(path.into()), config)
    }

    /// Command over in-memory document text.
    pub fn from_text(name: impl Into<String>, content: impl Into<String>, config: ImportConfig) -> Self {
        Self::with_source(
            ImportSource::Text {
                name: name.into(),
                content: content.into(),
            },
            config,
        )
    }

    fn with_source(source: ImportSource, config: ImportConfig) -> Self {
        Self {
            source,
            config,
            state: ImportState::Idle,
            committed: Vec::new(),
            undone: 0,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    /// Display name of the source.
    pub fn source_name(&self) -> String {
        match &self.source {
            ImportSource::File(path) => path.display().to_string(),
            ImportSource::Text { name, .. } => name.clone(),
        }
    }

    /// Most recently committed import.
    pub fn last_report(&self) -> Option<&ImportReport> {
        self.committed.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.committed.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.undone > 0
    }

    pub fn execute(&mut self, backend: &mut dyn SceneBackend) -> ImportResult<ImportReport> {
        if self.state == ImportState::Importing {
            return Err(ImportError::InvalidState("import already in progress".to_string()));
        }
        let content = self.source.read()?;
        self.undone = 0;
        self.import(backend, &content)
    }

    pub fn undo(&mut self, backend: &mut dyn SceneBackend) -> ImportResult<ImportReport> {
        let report = self
            .committed
            .pop()
            .ok_or_else(|| ImportError::InvalidState("nothing to undo".to_string()))?;
        report.transaction.undo(backend);
        self.undone += 1;
        self.state = if self.committed.is_empty() {
            ImportState::Idle
        } else {
            ImportState::Committed
        };
        Ok(report)
    }

    pub fn redo(&mut self, backend: &mut dyn SceneBackend) -> ImportResult<ImportReport> {
        if self.undone == 0 {
            return Err(ImportError::InvalidState("nothing to redo".to_string()));
        }
        let content = self.source.read()?;
        self.undone -= 1;
        self.import(backend, &content)
    }

    /// Run one session. A partially failed import still commits whatever it
    /// created so undo can remove it.
    fn import(&mut self, backend: &mut dyn SceneBackend, content: &str) -> ImportResult<ImportReport> {
        self.state = ImportState::Importing;
        log::info!("Importing {}", self.source_name());

        let mut session = ImportSession::new(backend, &self.config);
        let result = session.run(content);
        let report = session.finish();

        if result.is_ok() || !report.transaction.is_empty() {
            self.committed.push(report.clone());
        }
        self.state = if self.committed.is_empty() {
            ImportState::Idle
        } else {
            ImportState::Committed
        };

        result.map(|_| report)
    }
}
