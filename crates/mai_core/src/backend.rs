//! Host scene interface.
//!
//! The import engine never touches a scene directly. Every creation, attribute
//! write and connection goes through [`SceneBackend`], so the same pipeline can
//! drive a real DCC host or the in-memory [`MemoryScene`](crate::scene::MemoryScene).

use mai_math::{Color, Vec2, Vec3};
use serde::Serialize;
use thiserror::Error;

/// Errors reported by a scene backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("Not connected: {0} -> {1}")]
    NotConnected(String, String),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Everything a host needs to create a polygon mesh.
///
/// Faces are described through edges: each face lists its real edge ids and
/// whether each edge is walked backwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshDescription {
    pub positions: Vec<Vec3>,

    /// Vertex pairs, one per edge
    pub edges: Vec<[u32; 2]>,

    /// Number of edges in each face loop
    pub face_counts: Vec<u32>,

    /// Real edge ids for all faces, concatenated
    pub face_edges: Vec<u32>,

    /// Flip flag per entry of `face_edges`
    pub face_flips: Vec<bool>,
}

impl MeshDescription {
    pub fn face_count(&self) -> usize {
        self.face_counts.len()
    }

    /// Resolve every face into its vertex loop.
    ///
    /// The loop vertex of an edge is its first vertex, or its second when the
    /// edge is flipped.
    pub fn face_loops(&self) -> BackendResult<Vec<Vec<u32>>> {
        let total: usize = self.face_counts.iter().map(|&c| c as usize).sum();
        if total != self.face_edges.len() || total != self.face_flips.len() {
            return Err(BackendError::InvalidTopology(format!(
                "face counts sum to {} but {} edge ids and {} flips were given",
                total,
                self.face_edges.len(),
                self.face_flips.len()
            )));
        }

        let mut loops = Vec::with_capacity(self.face_counts.len());
        let mut offset = 0;
        for &count in &self.face_counts {
            let count = count as usize;
            let mut face = Vec::with_capacity(count);
            for i in offset..offset + count {
                let edge_id = self.face_edges[i] as usize;
                let edge = self.edges.get(edge_id).ok_or_else(|| {
                    BackendError::InvalidTopology(format!(
                        "edge {} out of range ({} edges)",
                        edge_id,
                        self.edges.len()
                    ))
                })?;
                face.push(if self.face_flips[i] { edge[1] } else { edge[0] });
            }
            offset += count;
            loops.push(face);
        }

        Ok(loops)
    }
}

/// Inclusive face index range, as written in component lists (`f[2:5]`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FaceRange {
    pub start: usize,
    pub end: usize,
}

impl FaceRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Parse a face component (`f[3]`, `f[0:7]`, quotes allowed).
    ///
    /// Returns `None` for non-face components and wildcards.
    pub fn parse(component: &str) -> Option<Self> {
        let component = component.trim().trim_matches('"');
        let inner = component.strip_prefix("f[")?.strip_suffix(']')?;
        match inner.split_once(':') {
            Some((a, b)) => Some(Self::new(a.trim().parse().ok()?, b.trim().parse().ok()?)),
            None => {
                let index = inner.trim().parse().ok()?;
                Some(Self::new(index, index))
            }
        }
    }

    pub fn contains(&self, face: usize) -> bool {
        face >= self.start && face <= self.end
    }

    pub fn faces(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Host scene operations required by the importer.
///
/// Node arguments accept plain names; DAG paths (`|group1|pCube1`) are
/// accepted wherever a host can resolve them.
pub trait SceneBackend {
    /// Create a node and return the name it was actually given.
    fn create_node(&mut self, node_type: &str, name: &str, parent: Option<&str>) -> BackendResult<String>;

    /// Apply a raw `setAttr`/`addAttr` statement.
    fn set_attr(&mut self, statement: &str) -> BackendResult<()>;

    fn exists(&self, name: &str) -> bool;

    fn node_type(&self, name: &str) -> Option<String>;

    /// Full DAG path of a node (`|parent|child`).
    fn full_path(&self, name: &str) -> Option<String>;

    fn is_connected(&self, source: &str, target: &str) -> bool;

    fn connect(&mut self, source: &str, target: &str) -> BackendResult<()>;

    fn disconnect(&mut self, source: &str, target: &str) -> BackendResult<()>;

    fn delete(&mut self, name: &str) -> BackendResult<()>;

    /// Toggle undo/construction history recording.
    fn set_history_enabled(&mut self, enabled: bool);

    // Meshes

    fn create_mesh(&mut self, name: &str, parent: Option<&str>, description: &MeshDescription) -> BackendResult<String>;

    fn add_hole(&mut self, mesh: &str, face: usize, vertices: &[u32]) -> BackendResult<()>;

    /// Create a UV set and return its name.
    fn create_uv_set(&mut self, mesh: &str, name: &str) -> BackendResult<String>;

    fn set_uvs(&mut self, mesh: &str, uv_set: &str, uvs: &[Vec2]) -> BackendResult<()>;

    /// Assign UV ids per face-vertex; `counts` has one entry per face.
    fn assign_uvs(&mut self, mesh: &str, uv_set: &str, counts: &[u32], uv_ids: &[u32]) -> BackendResult<()>;

    fn set_vertex_normals(&mut self, mesh: &str, normals: &[Vec3], vertices: &[u32]) -> BackendResult<()>;

    /// One smoothing flag per edge.
    fn set_edge_smoothing(&mut self, mesh: &str, smooth: &[bool]) -> BackendResult<()>;

    fn cleanup_edge_smoothing(&mut self, mesh: &str) -> BackendResult<()>;

    fn update_surface(&mut self, mesh: &str) -> BackendResult<()>;

    fn current_color_set(&self, mesh: &str) -> Option<String>;

    fn set_current_color_set(&mut self, mesh: &str, name: &str) -> BackendResult<()>;

    /// Clear the colors of the current color set.
    fn clear_colors(&mut self, mesh: &str) -> BackendResult<()>;

    /// Set colors on the current color set; the three slices run in parallel.
    fn set_face_vertex_colors(&mut self, mesh: &str, colors: &[Color], faces: &[usize], vertices: &[u32]) -> BackendResult<()>;

    // Shading

    fn create_shader(&mut self, node_type: &str, name: &str) -> BackendResult<String>;

    /// Create an empty, renderable shading group.
    fn create_shading_group(&mut self, name: &str) -> BackendResult<String>;

    /// Add faces of `mesh` to `group`. An empty range list adds the whole mesh.
    fn add_set_members(&mut self, group: &str, mesh: &str, faces: &[FaceRange]) -> BackendResult<()>;

    // Skinning

    /// Meshes deformed by a skin deformer.
    fn skin_bound_meshes(&self, deformer: &str) -> Vec<String>;

    fn set_skin_weight(&mut self, deformer: &str, vertex: usize, influence: usize, weight: f32) -> BackendResult<()>;

    // Blend shapes

    fn set_alias(&mut self, node: &str, alias: &str, plug: &str) -> BackendResult<()>;

    /// Logical indices of the manager's connected visibility outputs.
    fn used_visibility_slots(&self, manager: &str) -> Vec<usize>;

    fn directory_child_indices(&self, manager: &str) -> Vec<usize>;

    fn set_directory_child_indices(&mut self, manager: &str, indices: &[usize]) -> BackendResult<()>;
}
