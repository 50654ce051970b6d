//! Polygon mesh storage for the in-memory scene.
//!
//! Meshes hold general polygons (faces of any size, with holes) plus the
//! per-face-vertex data an import attaches to them: UV sets, vertex normals
//! and color sets.

use mai_math::{Bounds, Color, Vec2, Vec3};

use crate::backend::{BackendError, BackendResult, MeshDescription};

/// A named UV set and its per-face-vertex assignment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UvSet {
    pub name: String,
    pub uvs: Vec<Vec2>,

    /// UVs assigned per face (hole vertices included)
    pub counts: Vec<u32>,

    /// UV ids, face-vertex order
    pub ids: Vec<u32>,
}

/// One face-vertex color binding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceVertexColor {
    pub face: usize,
    pub vertex: u32,
    pub color: Color,
}

/// A named color set.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorSet {
    pub name: String,

    /// 3 for RGB, 4 for RGBA
    pub channels: usize,
    pub colors: Vec<FaceVertexColor>,
}

impl ColorSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: 4,
            colors: Vec::new(),
        }
    }
}

/// A polygon mesh.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub edges: Vec<[u32; 2]>,

    /// Per-edge smoothing flag
    pub smooth: Vec<bool>,

    /// Vertex loop of each face
    pub faces: Vec<Vec<u32>>,

    /// Hole loops with the face they cut
    pub holes: Vec<(usize, Vec<u32>)>,

    /// Per-vertex normals (computed when not set explicitly)
    pub normals: Option<Vec<Vec3>>,
    pub uv_sets: Vec<UvSet>,
    pub color_sets: Vec<ColorSet>,
    pub current_color_set: Option<String>,
    pub bounds: Bounds,
}

impl Mesh {
    /// Build a mesh from a backend description.
    ///
    /// Every edge endpoint must name an existing vertex.
    pub fn from_description(description: &MeshDescription) -> BackendResult<Self> {
        let vertex_count = description.positions.len() as u32;
        if let Some(edge) = description
            .edges
            .iter()
            .find(|e| e[0] >= vertex_count || e[1] >= vertex_count)
        {
            return Err(BackendError::InvalidTopology(format!(
                "edge {:?} references a vertex past {}",
                edge, vertex_count
            )));
        }

        let faces = description.face_loops()?;
        Ok(Self {
            positions: description.positions.clone(),
            edges: description.edges.clone(),
            smooth: vec![true; description.edges.len()],
            faces,
            bounds: Bounds::from_points(&description.positions),
            uv_sets: vec![UvSet {
                name: "map1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of face-vertices of `face`, hole loops included.
    pub fn face_vertex_count(&self, face: usize) -> usize {
        let outer = self.faces.get(face).map_or(0, Vec::len);
        let holes: usize = self
            .holes
            .iter()
            .filter(|(f, _)| *f == face)
            .map(|(_, h)| h.len())
            .sum();
        outer + holes
    }

    /// Cut a hole into `face`.
    pub fn add_hole(&mut self, face: usize, vertices: &[u32]) -> BackendResult<()> {
        if face >= self.faces.len() {
            return Err(BackendError::InvalidTopology(format!(
                "hole for face {} of {}",
                face,
                self.faces.len()
            )));
        }
        self.check_vertices(vertices)?;
        self.holes.push((face, vertices.to_vec()));
        Ok(())
    }

    pub fn uv_set(&self, name: &str) -> Option<&UvSet> {
        self.uv_sets.iter().find(|s| s.name == name)
    }

    fn uv_set_mut(&mut self, name: &str) -> BackendResult<&mut UvSet> {
        self.uv_sets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| BackendError::NodeNotFound(format!("uv set {}", name)))
    }

    /// Add a UV set; a taken name gets a numeric suffix.
    pub fn create_uv_set(&mut self, name: &str) -> String {
        let mut chosen = name.to_string();
        let mut n = 1;
        while self.uv_set(&chosen).is_some() {
            chosen = format!("{}{}", name, n);
            n += 1;
        }
        self.uv_sets.push(UvSet {
            name: chosen.clone(),
            ..Default::default()
        });
        chosen
    }

    pub fn set_uvs(&mut self, set: &str, uvs: &[Vec2]) -> BackendResult<()> {
        self.uv_set_mut(set)?.uvs = uvs.to_vec();
        Ok(())
    }

    /// Assign UV ids per face-vertex. Counts must cover every face, holes
    /// included; a face may carry no UVs at all.
    pub fn assign_uvs(&mut self, set: &str, counts: &[u32], ids: &[u32]) -> BackendResult<()> {
        if counts.len() != self.faces.len() {
            return Err(BackendError::InvalidTopology(format!(
                "{} uv counts for {} faces",
                counts.len(),
                self.faces.len()
            )));
        }
        for (face, &count) in counts.iter().enumerate() {
            let expected = self.face_vertex_count(face);
            if count != 0 && count as usize != expected {
                return Err(BackendError::InvalidTopology(format!(
                    "face {} has {} vertices but {} uvs",
                    face, expected, count
                )));
            }
        }
        let total: u32 = counts.iter().sum();
        if total as usize != ids.len() {
            return Err(BackendError::InvalidTopology(format!(
                "uv counts sum to {} but {} ids were given",
                total,
                ids.len()
            )));
        }

        let uv_set = self.uv_set_mut(set)?;
        if let Some(&bad) = ids.iter().find(|&&id| id as usize >= uv_set.uvs.len()) {
            return Err(BackendError::InvalidTopology(format!(
                "uv id {} out of range ({} uvs)",
                bad,
                uv_set.uvs.len()
            )));
        }
        uv_set.counts = counts.to_vec();
        uv_set.ids = ids.to_vec();
        Ok(())
    }

    /// Set explicit normals on the listed vertices.
    pub fn set_vertex_normals(&mut self, normals: &[Vec3], vertices: &[u32]) -> BackendResult<()> {
        if normals.len() != vertices.len() {
            return Err(BackendError::InvalidTopology(format!(
                "{} normals for {} vertices",
                normals.len(),
                vertices.len()
            )));
        }
        self.check_vertices(vertices)?;

        let mut current = self.normals.take().unwrap_or_else(|| self.face_normal_average());
        current.resize(self.positions.len(), Vec3::Y);
        for (normal, &vertex) in normals.iter().zip(vertices) {
            current[vertex as usize] = normal.normalize_or_zero();
        }
        self.normals = Some(current);
        Ok(())
    }

    pub fn set_edge_smoothing(&mut self, smooth: &[bool]) -> BackendResult<()> {
        if smooth.len() != self.edges.len() {
            return Err(BackendError::InvalidTopology(format!(
                "{} smoothing flags for {} edges",
                smooth.len(),
                self.edges.len()
            )));
        }
        self.smooth = smooth.to_vec();
        Ok(())
    }

    pub fn color_set(&self, name: &str) -> Option<&ColorSet> {
        self.color_sets.iter().find(|s| s.name == name)
    }

    /// Get or create the color set called `name`.
    pub fn color_set_mut(&mut self, name: &str) -> &mut ColorSet {
        let index = match self.color_sets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.color_sets.push(ColorSet::new(name));
                self.color_sets.len() - 1
            }
        };
        &mut self.color_sets[index]
    }

    fn current_color_set_mut(&mut self) -> BackendResult<&mut ColorSet> {
        let name = self
            .current_color_set
            .clone()
            .ok_or_else(|| BackendError::InvalidStatement("no current color set".to_string()))?;
        Ok(self.color_set_mut(&name))
    }

    pub fn clear_colors(&mut self) -> BackendResult<()> {
        self.current_color_set_mut()?.colors.clear();
        Ok(())
    }

    /// Bind colors to face-vertices of the current color set.
    pub fn set_face_vertex_colors(&mut self, colors: &[Color], faces: &[usize], vertices: &[u32]) -> BackendResult<()> {
        if colors.len() != faces.len() || colors.len() != vertices.len() {
            return Err(BackendError::InvalidTopology(format!(
                "{} colors for {} faces and {} vertices",
                colors.len(),
                faces.len(),
                vertices.len()
            )));
        }
        if let Some(&face) = faces.iter().find(|&&f| f >= self.faces.len()) {
            return Err(BackendError::InvalidTopology(format!("color on missing face {}", face)));
        }
        self.check_vertices(vertices)?;

        let set = self.current_color_set_mut()?;
        set.colors.extend(
            colors
                .iter()
                .zip(faces.iter().zip(vertices))
                .map(|(&color, (&face, &vertex))| FaceVertexColor { face, vertex, color }),
        );
        Ok(())
    }

    /// Move one vertex by `offset`.
    pub fn offset_vertex(&mut self, vertex: usize, offset: Vec3) -> BackendResult<()> {
        let position = self
            .positions
            .get_mut(vertex)
            .ok_or_else(|| BackendError::InvalidTopology(format!("tweak on missing vertex {}", vertex)))?;
        *position += offset;
        Ok(())
    }

    fn check_vertices(&self, vertices: &[u32]) -> BackendResult<()> {
        match vertices.iter().find(|&&v| v as usize >= self.positions.len()) {
            Some(v) => Err(BackendError::InvalidTopology(format!(
                "vertex {} out of range ({} vertices)",
                v,
                self.positions.len()
            ))),
            None => Ok(()),
        }
    }

    /// Normal of a polygon by Newell's method. Degenerate faces give zero.
    pub fn face_normal(&self, face: usize) -> Vec3 {
        let Some(vertices) = self.faces.get(face) else {
            return Vec3::ZERO;
        };
        let mut normal = Vec3::ZERO;
        for (i, &a) in vertices.iter().enumerate() {
            let b = vertices[(i + 1) % vertices.len()];
            let (Some(p), Some(q)) = (self.positions.get(a as usize), self.positions.get(b as usize)) else {
                continue;
            };
            normal += p.cross(*q);
        }
        normal.normalize_or_zero()
    }

    fn face_normal_average(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for (face, vertices) in self.faces.iter().enumerate() {
            let face_normal = self.face_normal(face);
            for &v in vertices {
                if let Some(n) = normals.get_mut(v as usize) {
                    *n += face_normal;
                }
            }
        }

        for normal in &mut normals {
            let len = normal.length();
            if len > 0.0 {
                *normal /= len;
            } else {
                *normal = Vec3::Y;
            }
        }
        normals
    }

    /// Compute smooth vertex normals by averaging face normals, replacing
    /// any explicit normals.
    pub fn compute_normals(&mut self) {
        self.normals = Some(self.face_normal_average());
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Ensure the mesh has one normal per vertex, computing them if necessary.
    pub fn ensure_normals(&mut self) {
        let len = self.normals.as_ref().map(Vec::len);
        if len != Some(self.positions.len()) {
            if let Some(len) = len {
                log::debug!(
                    "Normals array length ({}) doesn't match vertex count ({}), computing smooth normals",
                    len,
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    /// Refresh derived data after edits.
    pub fn update_bounds(&mut self) {
        self.bounds = Bounds::from_points(&self.positions);
    }

    pub fn center(&self) -> Vec3 {
        self.bounds.center()
    }

    pub fn size(&self) -> f32 {
        self.bounds.size()
    }
}
