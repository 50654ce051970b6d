//! In-memory scene host.
//!
//! [`MemoryScene`] implements [`SceneBackend`] with plain data structures:
//! a node table with DAG parents, a connection list, polygon meshes,
//! shading group memberships and skin weights. It is the backend the CLI
//! and the test suite import into.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use mai_math::{Color, Vec2, Vec3};

use crate::backend::{BackendError, BackendResult, FaceRange, MeshDescription, SceneBackend};
use crate::ma::{
    command_of, dag_leaf, parse_floats, parse_set_attr, plug_node, tokenize, unquote, uniquify, AttrPath, SetAttr,
};
use crate::mesh::Mesh;

const TWEAKS: &[&str] = &["pt", "pnts"];
const COLOR_SET: &[&str] = &["clst", "colorSet"];
const COLOR_NAME: &[&str] = &["clsn", "colorName"];
const COLOR_REPRESENTATION: &[&str] = &["rprt", "representation"];
const CURRENT_COLOR_SET: &[&str] = &["ccls", "currentColorSet"];
const OUTPUT_GEOMETRY: &[&str] = &["og", "outputGeometry"];
const BLEND_SHAPE_VISIBILITY: &[&str] = &["obsv", "outBlendShapeVisibility"];

/// Faces of one mesh that belong to a shading group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Membership {
    Whole,
    Faces(BTreeSet<usize>),
}

impl Membership {
    pub fn contains(&self, face: usize) -> bool {
        match self {
            Membership::Whole => true,
            Membership::Faces(faces) => faces.contains(&face),
        }
    }
}

/// Type-specific payload of a node.
#[derive(Clone, Debug)]
pub enum NodeData {
    Generic,
    Mesh(Mesh),

    /// Members by mesh name
    ShadingGroup(BTreeMap<String, Membership>),

    /// Weights by (vertex, influence)
    SkinCluster(BTreeMap<(usize, usize), f32>),

    /// Blend shape directory child indices
    ShapeManager(Vec<usize>),
}

/// One scene node.
#[derive(Clone, Debug)]
pub struct Node {
    pub node_type: String,
    pub parent: Option<String>,

    /// Last value set per attribute path (`t`, `clst[0].clsn`)
    pub attrs: BTreeMap<String, Vec<String>>,

    /// Long names of attributes added with `addAttr`
    pub dynamic_attrs: Vec<String>,

    /// Alias -> plug
    pub aliases: BTreeMap<String, String>,
    pub data: NodeData,
}

impl Node {
    fn new(node_type: &str, parent: Option<String>) -> Self {
        let data = match node_type {
            "mesh" => NodeData::Mesh(Mesh::default()),
            "shadingEngine" => NodeData::ShadingGroup(BTreeMap::new()),
            "skinCluster" => NodeData::SkinCluster(BTreeMap::new()),
            "shapeEditorManager" => NodeData::ShapeManager(Vec::new()),
            _ => NodeData::Generic,
        };
        Self {
            node_type: node_type.to_string(),
            parent,
            attrs: BTreeMap::new(),
            dynamic_attrs: Vec::new(),
            aliases: BTreeMap::new(),
            data,
        }
    }

    /// Attribute value tokens, unquoted.
    pub fn attr(&self, path: &str) -> Option<Vec<&str>> {
        self.attrs
            .get(path)
            .map(|values| values.iter().map(|v| unquote(v)).collect())
    }
}

/// Strip a DAG path or root namespace down to the node name.
fn leaf(name: &str) -> &str {
    let name = dag_leaf(name);
    name.strip_prefix(':').unwrap_or(name)
}

/// Short attribute names the host expands, so either spelling names the
/// same plug.
const LONG_NAMES: &[(&str, &str)] = &[
    ("oc", "outColor"),
    ("ss", "surfaceShader"),
    ("msg", "message"),
    ("dsm", "dagSetMembers"),
    ("pa", "partition"),
    ("st", "sets"),
    ("gn", "groupNodes"),
    ("iog", "instObjGroups"),
    ("obsv", "outBlendShapeVisibility"),
];

fn long_name(name: &str) -> &str {
    LONG_NAMES
        .iter()
        .find(|(short, _)| *short == name)
        .map_or(name, |(_, long)| *long)
}

/// Plug with the root namespace and DAG prefix of its node dropped and
/// short attribute names expanded.
fn normalize_plug(plug: &str) -> String {
    let Some((node, attr)) = plug.split_once('.') else {
        return leaf(plug).to_string();
    };
    let attr: Vec<String> = attr
        .split('.')
        .map(|segment| match segment.split_once('[') {
            Some((name, index)) => format!("{}[{}", long_name(name), index),
            None => long_name(segment).to_string(),
        })
        .collect();
    format!("{}.{}", leaf(node), attr.join("."))
}

/// A scene held entirely in memory.
#[derive(Clone, Debug)]
pub struct MemoryScene {
    nodes: HashMap<String, Node>,

    /// Node names in creation order
    order: Vec<String>,
    connections: Vec<(String, String)>,
    history_enabled: bool,
    last_created: Option<String>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    /// An empty scene.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            connections: Vec::new(),
            history_enabled: true,
            last_created: None,
        }
    }

    /// A scene holding the nodes every new host scene starts with.
    pub fn with_defaults() -> Self {
        let mut scene = Self::new();
        for (node_type, name) in [
            ("lambert", "lambert1"),
            ("shadingEngine", "initialShadingGroup"),
            ("partition", "renderPartition"),
            ("defaultShaderList", "defaultShaderList1"),
            ("shapeEditorManager", "shapeEditorManager"),
            ("time", "time1"),
        ] {
            scene.insert(node_type, name.to_string(), None);
        }
        scene
            .connections
            .push(("lambert1.outColor".to_string(), "initialShadingGroup.surfaceShader".to_string()));
        scene.last_created = None;
        scene
    }

    fn insert(&mut self, node_type: &str, name: String, parent: Option<String>) -> String {
        self.nodes.insert(name.clone(), Node::new(node_type, parent));
        self.order.push(name.clone());
        self.last_created = Some(name.clone());
        name
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(leaf(name))
    }

    fn node_mut(&mut self, name: &str) -> BackendResult<&mut Node> {
        self.nodes
            .get_mut(leaf(name))
            .ok_or_else(|| BackendError::NodeNotFound(name.to_string()))
    }

    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        match &self.node(name)?.data {
            NodeData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    fn mesh_mut(&mut self, name: &str) -> BackendResult<&mut Mesh> {
        match &mut self.node_mut(name)?.data {
            NodeData::Mesh(mesh) => Ok(mesh),
            _ => Err(BackendError::InvalidStatement(format!("{} is not a mesh", name))),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node names in creation order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Every (source, target) connection.
    pub fn connections(&self) -> &[(String, String)] {
        &self.connections
    }

    pub fn history_enabled(&self) -> bool {
        self.history_enabled
    }

    pub fn children(&self, name: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|child| {
                self.nodes
                    .get(child.as_str())
                    .and_then(|n| n.parent.as_deref())
                    == Some(leaf(name))
            })
            .map(String::as_str)
            .collect()
    }

    /// Shading group holding `face` of `mesh`.
    pub fn face_shading_group(&self, mesh: &str, face: usize) -> Option<&str> {
        self.order.iter().map(String::as_str).find(|group| {
            matches!(
                self.nodes.get(*group).map(|n| &n.data),
                Some(NodeData::ShadingGroup(members))
                    if members.get(leaf(mesh)).is_some_and(|m| m.contains(face))
            )
        })
    }

    pub fn skin_weight(&self, deformer: &str, vertex: usize, influence: usize) -> Option<f32> {
        match &self.node(deformer)?.data {
            NodeData::SkinCluster(weights) => weights.get(&(vertex, influence)).copied(),
            _ => None,
        }
    }

    /// Sources driving `target`.
    pub fn sources(&self, target: &str) -> Vec<&str> {
        let target = normalize_plug(target);
        self.connections
            .iter()
            .filter(|(_, t)| *t == target)
            .map(|(s, _)| s.as_str())
            .collect()
    }

    fn apply_set_attr(&mut self, statement: &str) -> BackendResult<()> {
        let attr = parse_set_attr(statement).map_err(|e| BackendError::InvalidStatement(e.to_string()))?;
        let path = attr.attr_path();
        if path.node.is_empty() {
            return Err(BackendError::InvalidStatement(format!(
                "setAttr without a node: {}",
                attr.path
            )));
        }

        let key = attr
            .path
            .split_once('.')
            .map(|(_, a)| a.to_string())
            .unwrap_or_default();
        let node = self.node_mut(&path.node)?;
        if matches!(node.data, NodeData::Mesh(_)) {
            apply_mesh_attr(node, &path, &attr)?;
        }
        if !attr.is_count_only() {
            node.attrs.insert(key, attr.values);
        }
        Ok(())
    }

    fn apply_add_attr(&mut self, statement: &str) -> BackendResult<()> {
        let tokens = tokenize(statement);
        let long = crate::ma::flag_value(&tokens, &["-ln", "-longName"])
            .or_else(|| crate::ma::flag_value(&tokens, &["-sn", "-shortName"]))
            .map(unquote)
            .ok_or_else(|| BackendError::InvalidStatement(format!("addAttr without a name: {}", statement)))?
            .to_string();

        let target = tokens
            .last()
            .map(|t| unquote(t))
            .filter(|t| self.nodes.contains_key(*t))
            .map(str::to_string)
            .or_else(|| self.last_created.clone())
            .ok_or_else(|| BackendError::InvalidStatement(format!("addAttr without a node: {}", statement)))?;

        let node = self.node_mut(&target)?;
        if !node.dynamic_attrs.contains(&long) {
            node.dynamic_attrs.push(long);
        }
        Ok(())
    }

    /// Shading groups lose the faces `group` takes over.
    fn move_members(&mut self, group: &str, mesh: &str, faces: &BTreeSet<usize>, face_count: usize) {
        for (name, node) in self.nodes.iter_mut() {
            if name == group {
                continue;
            }
            let NodeData::ShadingGroup(members) = &mut node.data else {
                continue;
            };
            let Some(membership) = members.get_mut(mesh) else {
                continue;
            };
            let remaining: BTreeSet<usize> = match membership {
                Membership::Whole => (0..face_count).filter(|f| !faces.contains(f)).collect(),
                Membership::Faces(current) => current.difference(faces).copied().collect(),
            };
            if remaining.is_empty() {
                members.remove(mesh);
            } else {
                *membership = Membership::Faces(remaining);
            }
        }
    }
}

/// Mesh-specific side effects of `setAttr`: vertex tweaks and color sets.
fn apply_mesh_attr(node: &mut Node, path: &AttrPath, attr: &SetAttr) -> BackendResult<()> {
    let NodeData::Mesh(mesh) = &mut node.data else {
        return Ok(());
    };
    let Some(first) = path.segment(0) else {
        return Ok(());
    };

    if first.is(TWEAKS) && !attr.values.is_empty() {
        let start = first.index_start().unwrap_or(0);
        let values = parse_floats(&attr.values).map_err(|e| BackendError::InvalidStatement(e.to_string()))?;
        match path.segment(1) {
            None => {
                for (i, offset) in values.chunks_exact(3).enumerate() {
                    mesh.offset_vertex(start + i, Vec3::new(offset[0], offset[1], offset[2]))?;
                }
            }
            Some(axis) => {
                let offset = values.first().copied().unwrap_or(0.0);
                let offset = match axis.name.as_str() {
                    "px" | "pntx" => Vec3::X * offset,
                    "py" | "pnty" => Vec3::Y * offset,
                    "pz" | "pntz" => Vec3::Z * offset,
                    _ => Vec3::ZERO,
                };
                mesh.offset_vertex(start, offset)?;
            }
        }
        mesh.update_bounds();
    } else if path.matches(&[COLOR_SET, COLOR_NAME]) {
        if let Some(name) = attr.values.first() {
            let name = unquote(name).to_string();
            mesh.color_set_mut(&name);
            if mesh.current_color_set.is_none() {
                mesh.current_color_set = Some(name);
            }
        }
    } else if path.matches(&[COLOR_SET, COLOR_REPRESENTATION]) {
        let key = format!("{}[{}].clsn", first.name, first.index.as_deref().unwrap_or("0"));
        let name = node
            .attrs
            .get(&key)
            .or_else(|| node.attrs.get(&key.replace(".clsn", ".colorName")))
            .and_then(|v| v.first())
            .map(|v| unquote(v).to_string());
        let channels = attr.values.first().and_then(|v| v.parse::<usize>().ok());
        if let (Some(name), Some(channels)) = (name, channels) {
            mesh.color_set_mut(&name).channels = channels;
        }
    } else if path.matches(&[CURRENT_COLOR_SET]) {
        if let Some(name) = attr.values.first() {
            mesh.current_color_set = Some(unquote(name).to_string());
        }
    }
    Ok(())
}

impl SceneBackend for MemoryScene {
    fn create_node(&mut self, node_type: &str, name: &str, parent: Option<&str>) -> BackendResult<String> {
        let parent = match parent {
            Some(parent) => {
                let parent = leaf(parent);
                if !self.nodes.contains_key(parent) {
                    return Err(BackendError::NodeNotFound(parent.to_string()));
                }
                Some(parent.to_string())
            }
            None => None,
        };

        let requested = if name.is_empty() {
            format!("{}1", node_type)
        } else {
            leaf(name).to_string()
        };
        let chosen = uniquify(&requested, |n| self.nodes.contains_key(n));
        Ok(self.insert(node_type, chosen, parent))
    }

    fn set_attr(&mut self, statement: &str) -> BackendResult<()> {
        match command_of(statement) {
            "setAttr" => self.apply_set_attr(statement),
            "addAttr" => self.apply_add_attr(statement),
            other => Err(BackendError::Unsupported(other.to_string())),
        }
    }

    fn exists(&self, name: &str) -> bool {
        self.nodes.contains_key(leaf(name))
    }

    fn node_type(&self, name: &str) -> Option<String> {
        self.node(name).map(|n| n.node_type.clone())
    }

    fn full_path(&self, name: &str) -> Option<String> {
        let mut current = leaf(name);
        let mut node = self.nodes.get(current)?;
        let mut path = format!("|{}", current);
        while let Some(parent) = node.parent.as_deref() {
            current = parent;
            node = self.nodes.get(current)?;
            path = format!("|{}{}", current, path);
        }
        Some(path)
    }

    fn is_connected(&self, source: &str, target: &str) -> bool {
        let (source, target) = (normalize_plug(source), normalize_plug(target));
        self.connections.iter().any(|(s, t)| *s == source && *t == target)
    }

    fn connect(&mut self, source: &str, target: &str) -> BackendResult<()> {
        for plug in [source, target] {
            let node = plug_node(plug);
            if !self.exists(node) {
                return Err(BackendError::NodeNotFound(node.to_string()));
            }
        }
        if self.is_connected(source, target) {
            return Err(BackendError::AlreadyExists(format!("{} -> {}", source, target)));
        }
        self.connections.push((normalize_plug(source), normalize_plug(target)));
        Ok(())
    }

    fn disconnect(&mut self, source: &str, target: &str) -> BackendResult<()> {
        let (source, target) = (normalize_plug(source), normalize_plug(target));
        let before = self.connections.len();
        self.connections.retain(|(s, t)| !(*s == source && *t == target));
        if self.connections.len() == before {
            return Err(BackendError::NotConnected(source, target));
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> BackendResult<()> {
        let name = leaf(name).to_string();
        if !self.nodes.contains_key(&name) {
            return Err(BackendError::NodeNotFound(name));
        }

        let mut doomed = vec![name];
        let mut i = 0;
        while i < doomed.len() {
            let children: Vec<String> = self.children(&doomed[i]).into_iter().map(str::to_string).collect();
            doomed.extend(children);
            i += 1;
        }

        for name in &doomed {
            self.nodes.remove(name);
            log::debug!("Deleted {}", name);
        }
        self.order.retain(|n| !doomed.contains(n));
        self.connections
            .retain(|(s, t)| !doomed.iter().any(|d| plug_node(s) == d || plug_node(t) == d));
        for node in self.nodes.values_mut() {
            if let NodeData::ShadingGroup(members) = &mut node.data {
                members.retain(|mesh, _| !doomed.contains(mesh));
            }
        }
        if self.last_created.as_ref().is_some_and(|n| doomed.contains(n)) {
            self.last_created = None;
        }
        Ok(())
    }

    fn set_history_enabled(&mut self, enabled: bool) {
        log::debug!("History {}", if enabled { "on" } else { "off" });
        self.history_enabled = enabled;
    }

    fn create_mesh(&mut self, name: &str, parent: Option<&str>, description: &MeshDescription) -> BackendResult<String> {
        let mesh = Mesh::from_description(description)?;
        let created = self.create_node("mesh", name, parent)?;
        self.node_mut(&created)?.data = NodeData::Mesh(mesh);
        Ok(created)
    }

    fn add_hole(&mut self, mesh: &str, face: usize, vertices: &[u32]) -> BackendResult<()> {
        self.mesh_mut(mesh)?.add_hole(face, vertices)
    }

    fn create_uv_set(&mut self, mesh: &str, name: &str) -> BackendResult<String> {
        Ok(self.mesh_mut(mesh)?.create_uv_set(name))
    }

    fn set_uvs(&mut self, mesh: &str, uv_set: &str, uvs: &[Vec2]) -> BackendResult<()> {
        self.mesh_mut(mesh)?.set_uvs(uv_set, uvs)
    }

    fn assign_uvs(&mut self, mesh: &str, uv_set: &str, counts: &[u32], uv_ids: &[u32]) -> BackendResult<()> {
        self.mesh_mut(mesh)?.assign_uvs(uv_set, counts, uv_ids)
    }

    fn set_vertex_normals(&mut self, mesh: &str, normals: &[Vec3], vertices: &[u32]) -> BackendResult<()> {
        self.mesh_mut(mesh)?.set_vertex_normals(normals, vertices)
    }

    fn set_edge_smoothing(&mut self, mesh: &str, smooth: &[bool]) -> BackendResult<()> {
        self.mesh_mut(mesh)?.set_edge_smoothing(smooth)
    }

    fn cleanup_edge_smoothing(&mut self, mesh: &str) -> BackendResult<()> {
        // Smoothing flags carry no derived state here
        self.mesh_mut(mesh).map(|_| ())
    }

    fn update_surface(&mut self, mesh: &str) -> BackendResult<()> {
        let mesh = self.mesh_mut(mesh)?;
        mesh.update_bounds();
        mesh.ensure_normals();
        Ok(())
    }

    fn current_color_set(&self, mesh: &str) -> Option<String> {
        self.mesh(mesh)?.current_color_set.clone()
    }

    fn set_current_color_set(&mut self, mesh: &str, name: &str) -> BackendResult<()> {
        let mesh = self.mesh_mut(mesh)?;
        if mesh.color_set(name).is_none() {
            return Err(BackendError::NodeNotFound(format!("color set {}", name)));
        }
        mesh.current_color_set = Some(name.to_string());
        Ok(())
    }

    fn clear_colors(&mut self, mesh: &str) -> BackendResult<()> {
        self.mesh_mut(mesh)?.clear_colors()
    }

    fn set_face_vertex_colors(&mut self, mesh: &str, colors: &[Color], faces: &[usize], vertices: &[u32]) -> BackendResult<()> {
        self.mesh_mut(mesh)?.set_face_vertex_colors(colors, faces, vertices)
    }

    fn create_shader(&mut self, node_type: &str, name: &str) -> BackendResult<String> {
        self.create_node(node_type, name, None)
    }

    fn create_shading_group(&mut self, name: &str) -> BackendResult<String> {
        self.create_node("shadingEngine", name, None)
    }

    fn add_set_members(&mut self, group: &str, mesh: &str, faces: &[FaceRange]) -> BackendResult<()> {
        let mesh = leaf(mesh).to_string();
        let face_count = self
            .mesh(&mesh)
            .ok_or_else(|| BackendError::NodeNotFound(mesh.clone()))?
            .face_count();
        if !matches!(self.node_mut(group)?.data, NodeData::ShadingGroup(_)) {
            return Err(BackendError::InvalidStatement(format!("{} is not a shading group", group)));
        }

        let taken: BTreeSet<usize> = if faces.is_empty() {
            (0..face_count).collect()
        } else {
            faces
                .iter()
                .flat_map(FaceRange::faces)
                .filter(|&f| f < face_count)
                .collect()
        };
        let group = leaf(group).to_string();
        self.move_members(&group, &mesh, &taken, face_count);

        if let NodeData::ShadingGroup(members) = &mut self.node_mut(&group)?.data {
            let membership = match members.remove(&mesh) {
                _ if faces.is_empty() => Membership::Whole,
                Some(Membership::Whole) => Membership::Whole,
                Some(Membership::Faces(mut current)) => {
                    current.extend(taken);
                    Membership::Faces(current)
                }
                None => Membership::Faces(taken),
            };
            members.insert(mesh, membership);
        }
        Ok(())
    }

    fn skin_bound_meshes(&self, deformer: &str) -> Vec<String> {
        let deformer = leaf(deformer);
        self.connections
            .iter()
            .filter(|(s, _)| plug_node(s) == deformer && AttrPath::parse(s).starts_with(OUTPUT_GEOMETRY))
            .map(|(_, t)| plug_node(t))
            .filter(|t| self.mesh(t).is_some())
            .map(str::to_string)
            .collect()
    }

    fn set_skin_weight(&mut self, deformer: &str, vertex: usize, influence: usize, weight: f32) -> BackendResult<()> {
        match &mut self.node_mut(deformer)?.data {
            NodeData::SkinCluster(weights) => {
                weights.insert((vertex, influence), weight);
                Ok(())
            }
            _ => Err(BackendError::InvalidStatement(format!("{} is not a skin cluster", deformer))),
        }
    }

    fn set_alias(&mut self, node: &str, alias: &str, plug: &str) -> BackendResult<()> {
        self.node_mut(node)?
            .aliases
            .insert(alias.to_string(), plug.to_string());
        Ok(())
    }

    fn used_visibility_slots(&self, manager: &str) -> Vec<usize> {
        let manager = leaf(manager);
        self.connections
            .iter()
            .filter(|(s, _)| plug_node(s) == manager)
            .filter_map(|(s, _)| {
                let path = AttrPath::parse(s);
                let first = path.segment(0)?;
                if first.is(BLEND_SHAPE_VISIBILITY) {
                    first.index_value()
                } else {
                    None
                }
            })
            .collect()
    }

    fn directory_child_indices(&self, manager: &str) -> Vec<usize> {
        match self.node(manager).map(|n| &n.data) {
            Some(NodeData::ShapeManager(indices)) => indices.clone(),
            _ => Vec::new(),
        }
    }

    fn set_directory_child_indices(&mut self, manager: &str, indices: &[usize]) -> BackendResult<()> {
        match &mut self.node_mut(manager)?.data {
            NodeData::ShapeManager(current) => {
                *current = indices.to_vec();
                Ok(())
            }
            _ => Err(BackendError::InvalidStatement(format!("{} is not a shape manager", manager))),
        }
    }
}
