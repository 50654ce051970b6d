//! Category builders.
//!
//! Each builder turns classified node blocks into backend calls. Nodes are
//! always requested under a collision-free name and the resulting rename is
//! recorded before any later statement can refer to it.

use super::classify::{is_existing_pair, MeshEntry, ShaderPair, SKIN_CLUSTER};
use super::diagnostic::DiagnosticKind;
use super::geometry::{MeshGeometry, DEFAULT_UV_SET};
use super::names::{bind_self_reference, uniquify};
use super::parser::{command_of, flag_value, parse_set_attr, tokenize, truncate, unquote, ParseError, ParseResult};
use super::session::{BuiltMesh, ImportError, ImportResult, ImportSession, SkinRecord};
use super::types::NodeBlock;
use crate::backend::BackendResult;

/// Node type of blend shape deformers.
pub const BLEND_SHAPE: &str = "blendShape";

const WEIGHT_LIST: &[&str] = &["wl", "weightList"];
const WEIGHTS: &[&str] = &["w", "weights"];
const ALIAS_LIST: &[&str] = &["aal", "attributeAliasList"];

/// Whether a block statement is replayed onto its node.
pub fn is_replayable(statement: &str) -> bool {
    matches!(command_of(statement), "setAttr" | "addAttr")
}

/// Point a block statement at `node`. `addAttr` takes the node as its
/// trailing object argument.
pub fn bind_statement(statement: &str, node: &str) -> String {
    if command_of(statement) == "addAttr" {
        format!("{} \"{}\"", statement, node)
    } else {
        bind_self_reference(statement, node)
    }
}

/// The `aal`/`attributeAliasList` attribute is created by the host itself.
fn is_reserved_alias_attr(statement: &str) -> bool {
    let tokens = tokenize(statement);
    let short = flag_value(&tokens, &["-sn", "-shortName"]).map(unquote);
    let long = flag_value(&tokens, &["-ln", "-longName"]).map(unquote);
    short == Some("aal") && long == Some("attributeAliasList")
}

/// Parse an `attributeAlias` payload (`{"smile","weight[0]",...}`) into
/// (alias, plug) pairs.
pub fn parse_alias_list(values: &[String]) -> Vec<(String, String)> {
    let joined = values.concat();
    let inner = joined.trim().trim_start_matches('{').trim_end_matches('}');
    let items: Vec<&str> = inner
        .split(',')
        .map(|item| unquote(item.trim()))
        .filter(|item| !item.is_empty())
        .collect();

    items
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect()
}

impl ImportSession<'_> {
    /// Collision-free name for `original` in the current scene.
    pub(super) fn reserve_name(&self, original: &str) -> String {
        let backend = &*self.backend;
        uniquify(original, |name| backend.exists(name))
    }

    /// Record what `original` was created as.
    pub(super) fn record_name(&mut self, original: &str, created: &str) {
        if original.is_empty() {
            return;
        }
        if let Err(conflict) = self.names.register_rename(original, created) {
            self.diagnostics.push(DiagnosticKind::Skipped, original, conflict.to_string());
        }
    }

    /// Resolve a `-p` value (name or DAG path) to the instantiated parent.
    pub(super) fn resolve_parent(&self, parent: &str) -> String {
        let leaf = parent.rsplit('|').next().unwrap_or(parent);
        self.names.resolve(leaf).to_string()
    }

    /// Log a failed backend call as a diagnostic. Returns whether it succeeded.
    pub(super) fn check(&mut self, subject: &str, result: BackendResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.diagnostics.push(DiagnosticKind::Backend, subject, e.to_string());
                false
            }
        }
    }

    /// Create the node a block describes under a collision-free name.
    fn create_from_block(&mut self, block: &NodeBlock) -> Option<String> {
        let original = block.name();
        let requested = self.reserve_name(&original);
        let parent = block.parent().map(|p| self.resolve_parent(&p));

        match self.backend.create_node(block.node_type(), &requested, parent.as_deref()) {
            Ok(created) => {
                self.record_name(&original, &created);
                log::debug!("Created {} {}", block.node_type(), created);
                Some(created)
            }
            Err(e) => {
                self.diagnostics.push(DiagnosticKind::Backend, original, e.to_string());
                None
            }
        }
    }

    /// Replay one statement onto `node`, references to renamed nodes
    /// retargeted first.
    fn replay_statement(&mut self, node: &str, statement: &str) {
        let bound = bind_statement(&self.names.retarget(statement), node);
        if let Err(e) = self.backend.set_attr(&bound) {
            self.diagnostics
                .push(DiagnosticKind::Backend, node, format!("{}: {}", truncate(statement), e));
        }
    }

    /// Replay every replayable statement onto `node`.
    pub(super) fn replay(&mut self, node: &str, statements: &[String]) {
        for statement in statements.iter().filter(|s| is_replayable(s)) {
            self.replay_statement(node, statement);
        }
    }

    pub(super) fn create_transforms(&mut self, blocks: &[&NodeBlock]) {
        for block in blocks {
            let Some(created) = self.create_from_block(block) else {
                continue;
            };
            let path = self.backend.full_path(&created).unwrap_or_else(|| created.clone());
            self.transaction.transforms.push(path);
            self.replay(&created, block.body());
        }
    }

    pub(super) fn create_other_nodes(&mut self, blocks: &[&NodeBlock], shader_names: &[String]) {
        for block in blocks {
            let name = block.name();
            let node_type = block.node_type();

            if shader_names.contains(&name) {
                continue;
            }
            if node_type == SKIN_CLUSTER || self.config.is_generic_exception(node_type) {
                log::debug!("Generic builder leaves {} ({}) alone", name, node_type);
                continue;
            }
            if self.config.is_no_duplicate_type(node_type) && self.backend.exists(&name) {
                log::debug!("Keeping existing {} {}", node_type, name);
                continue;
            }

            let Some(created) = self.create_from_block(block) else {
                continue;
            };
            self.transaction.others.push(created.clone());
            if node_type == BLEND_SHAPE {
                self.blend_shapes.push(created.clone());
            }

            for statement in block.body() {
                match command_of(statement) {
                    "addAttr" if is_reserved_alias_attr(statement) => continue,
                    "setAttr" if node_type == BLEND_SHAPE && self.register_aliases(&created, statement) => continue,
                    _ if is_replayable(statement) => self.replay_statement(&created, statement),
                    _ => {}
                }
            }
        }
    }

    /// Register blend shape weight aliases. Returns false when `statement`
    /// is not an alias list.
    fn register_aliases(&mut self, node: &str, statement: &str) -> bool {
        let Ok(attr) = parse_set_attr(statement) else {
            return false;
        };
        if !attr.attr_path().matches(&[ALIAS_LIST]) || attr.value_type.as_deref() != Some("attributeAlias") {
            return false;
        }

        for (alias, plug) in parse_alias_list(&attr.values) {
            let plug = format!("{}.{}", node, plug);
            let result = self.backend.set_alias(node, &alias, &plug);
            self.check(node, result);
        }
        true
    }

    pub(super) fn create_meshes(&mut self, meshes: &[MeshEntry<'_>]) {
        for entry in meshes {
            match self.build_mesh(entry) {
                Ok(Some(built)) => self.meshes.push(built),
                Ok(None) => {}
                Err(e) => self.diagnostics.push(DiagnosticKind::Format, entry.block.name(), e.to_string()),
            }
        }
    }

    /// Parse, validate and construct one mesh.
    ///
    /// Format errors abort before anything is created. Once the mesh exists,
    /// later failures are diagnostics on a partially dressed mesh.
    fn build_mesh(&mut self, entry: &MeshEntry<'_>) -> ParseResult<Option<BuiltMesh>> {
        let geometry = MeshGeometry::parse(entry.block)?;
        let description = geometry.description()?;
        let loops = geometry.face_loops()?;
        let holes = geometry.hole_loops()?;

        let requested = self.reserve_name(&geometry.name);
        let parent = entry.parent().map(|p| self.resolve_parent(&p));
        let mesh = match self.backend.create_mesh(&requested, parent.as_deref(), &description) {
            Ok(mesh) => mesh,
            Err(e) => {
                self.diagnostics.push(DiagnosticKind::Backend, &geometry.name, e.to_string());
                return Ok(None);
            }
        };
        self.record_name(&geometry.name, &mesh);
        self.transaction.meshes.push(mesh.clone());

        for (face, vertices) in &holes {
            let result = self.backend.add_hole(&mesh, *face, vertices);
            self.check(&mesh, result);
        }

        self.apply_uv_sets(&mesh, &geometry);
        self.apply_normals(&mesh, &geometry, &loops, &holes);

        let smooth: Vec<bool> = geometry.edges.iter().map(|e| e.smooth).collect();
        let result = self.backend.set_edge_smoothing(&mesh, &smooth);
        if self.check(&mesh, result) {
            let result = self.backend.cleanup_edge_smoothing(&mesh);
            self.check(&mesh, result);
        }
        let result = self.backend.update_surface(&mesh);
        self.check(&mesh, result);

        self.replay(&mesh, &geometry.other);
        self.apply_color_sets(&mesh, &geometry, &loops);

        log::info!(
            "Built mesh {}: {} vertices, {} faces, {} holes",
            mesh,
            geometry.vertices.len(),
            loops.len(),
            holes.len()
        );

        Ok(Some(BuiltMesh {
            original: geometry.name,
            name: mesh,
            materials: geometry.materials,
            tweaks: geometry.tweaks,
        }))
    }

    fn apply_uv_sets(&mut self, mesh: &str, geometry: &MeshGeometry) {
        for (&index, set) in &geometry.uv_sets {
            let Some(name) = set.name.as_deref() else {
                self.diagnostics
                    .push(DiagnosticKind::Skipped, mesh, format!("uv set {} has points but no name", index));
                continue;
            };

            let set_name = if name == DEFAULT_UV_SET {
                name.to_string()
            } else {
                match self.backend.create_uv_set(mesh, name) {
                    Ok(created) => created,
                    Err(e) => {
                        self.diagnostics.push(DiagnosticKind::Backend, mesh, e.to_string());
                        continue;
                    }
                }
            };

            if set.points.is_empty() {
                log::info!("{}: uv set {} has no points and is left without uvs", mesh, set_name);
                continue;
            }
            let result = self.backend.set_uvs(mesh, &set_name, &set.points);
            if !self.check(mesh, result) {
                continue;
            }

            let (counts, ids) = geometry.uv_assignment(index);
            if ids.is_empty() {
                continue;
            }
            if let Err(e) = self.backend.assign_uvs(mesh, &set_name, &counts, &ids) {
                self.diagnostics.push(
                    DiagnosticKind::Skipped,
                    mesh,
                    format!("unable to assign uvs of {}: {}", set_name, e),
                );
            }
        }
    }

    fn apply_normals(&mut self, mesh: &str, geometry: &MeshGeometry, loops: &[Vec<u32>], holes: &[(usize, Vec<u32>)]) {
        let Some(assignment) = geometry.normal_assignment(loops, holes) else {
            return;
        };
        if let Some((normals, corners)) = assignment.mismatch {
            self.diagnostics.push(
                DiagnosticKind::Format,
                mesh,
                format!(
                    "{} normals for {} face-vertices; unmatched normals dropped",
                    normals, corners
                ),
            );
        }
        let result = self
            .backend
            .set_vertex_normals(mesh, &assignment.normals, &assignment.vertices);
        self.check(mesh, result);
    }

    fn apply_color_sets(&mut self, mesh: &str, geometry: &MeshGeometry, loops: &[Vec<u32>]) {
        if geometry.color_sets.is_empty() {
            return;
        }
        let previous = self.backend.current_color_set(mesh);

        for &index in geometry.color_sets.keys() {
            let assignment = match geometry.color_assignment(index, loops) {
                Ok(Some(assignment)) => assignment,
                Ok(None) => continue,
                Err(e) => {
                    self.diagnostics.push(DiagnosticKind::Format, mesh, e.to_string());
                    continue;
                }
            };

            let result = self.backend.set_current_color_set(mesh, &assignment.name);
            if !self.check(mesh, result) {
                continue;
            }
            let result = self.backend.clear_colors(mesh);
            self.check(mesh, result);
            if !assignment.colors.is_empty() {
                let result = self.backend.set_face_vertex_colors(
                    mesh,
                    &assignment.colors,
                    &assignment.faces,
                    &assignment.vertices,
                );
                self.check(mesh, result);
            }
            let result = self.backend.update_surface(mesh);
            self.check(mesh, result);
        }

        if let Some(previous) = previous {
            if let Err(e) = self.backend.set_current_color_set(mesh, &previous) {
                log::debug!("{}: could not restore color set {}: {}", mesh, previous, e);
            }
        }
    }

    /// Drop pairs that already exist in the scene, mapping their names to
    /// themselves.
    pub(super) fn reuse_existing_shaders<'b>(&mut self, pairs: &[ShaderPair<'b>]) -> Vec<ShaderPair<'b>> {
        if !self.config.reuse_existing_shaders {
            return pairs.to_vec();
        }

        let mut remaining = Vec::with_capacity(pairs.len());
        for pair in pairs {
            if is_existing_pair(pair, &*self.backend) {
                let group = pair.group.name();
                let shader = pair.shader.name();
                log::info!("Reusing existing shader {} ({})", shader, group);
                self.record_name(&group, &group);
                self.record_name(&shader, &shader);
            } else {
                remaining.push(*pair);
            }
        }
        remaining
    }

    pub(super) fn create_shaders(&mut self, pairs: &[ShaderPair<'_>]) -> ImportResult<()> {
        for pair in pairs {
            let group_original = pair.group.name();
            let shader_original = pair.shader.name();
            if shader_original.is_empty() {
                return Err(ImportError::Reference(
                    super::classify::ReferenceError::UnnamedShader(group_original),
                ));
            }

            let requested = self.reserve_name(&shader_original);
            let shader = match self.backend.create_shader(pair.shader.node_type(), &requested) {
                Ok(shader) => shader,
                Err(e) => {
                    self.diagnostics.push(DiagnosticKind::Backend, shader_original, e.to_string());
                    continue;
                }
            };
            self.record_name(&shader_original, &shader);
            self.transaction.shaders.push(shader.clone());

            let requested = self.reserve_name(&group_original);
            let group = match self.backend.create_shading_group(&requested) {
                Ok(group) => group,
                Err(e) => {
                    self.diagnostics.push(DiagnosticKind::Backend, group_original, e.to_string());
                    continue;
                }
            };
            self.record_name(&group_original, &group);
            self.transaction.shading_groups.push(group.clone());

            let result = self.backend.connect(
                &format!("{}.outColor", shader),
                &format!("{}.surfaceShader", group),
            );
            self.check(&group, result);

            self.replay(&shader, pair.shader.body());
        }
        Ok(())
    }

    pub(super) fn create_skins(&mut self, blocks: &[&NodeBlock]) {
        for block in blocks {
            let Some(deformer) = self.create_from_block(block) else {
                continue;
            };
            self.transaction.others.push(deformer.clone());

            let mut weights = Vec::new();
            for statement in block.body() {
                if command_of(statement) == "setAttr" {
                    if let Ok(attr) = parse_set_attr(statement) {
                        let path = attr.attr_path();
                        let compressed = path.matches(&[WEIGHT_LIST, WEIGHTS])
                            && path.segment(1).is_some_and(|s| s.index.is_none());
                        if compressed {
                            weights.extend(attr.values);
                            continue;
                        }
                    }
                }
                if is_replayable(statement) {
                    self.replay_statement(&deformer, statement);
                }
            }

            log::debug!("{}: {} weight tokens", deformer, weights.len());
            self.skins.push(SkinRecord { deformer, weights });
        }
    }

    /// Commit skin weights once the deformed meshes exist.
    pub(super) fn apply_skin_weights(&mut self) {
        let skins = std::mem::take(&mut self.skins);
        for skin in &skins {
            let meshes = self.backend.skin_bound_meshes(&skin.deformer);
            if meshes.is_empty() {
                log::info!("{} has no bound geometry; weights skipped", skin.deformer);
                continue;
            }

            match self.walk_weights(skin) {
                Ok(vertices) => log::debug!(
                    "{}: weighted {} vertices on {}",
                    skin.deformer,
                    vertices,
                    meshes.join(", ")
                ),
                Err(ImportError::Format(e)) => {
                    self.diagnostics.push(DiagnosticKind::Format, &skin.deformer, e.to_string())
                }
                Err(e) => self.diagnostics.push(DiagnosticKind::Backend, &skin.deformer, e.to_string()),
            }
        }
        self.skins = skins;
    }

    /// Walk `count (influence weight)×count` records vertex by vertex.
    fn walk_weights(&mut self, skin: &SkinRecord) -> ImportResult<usize> {
        let truncated = |vertex: usize| {
            ParseError::format(
                skin.deformer.clone(),
                format!("truncated weight record at vertex {}", vertex),
            )
        };

        let mut tokens = skin.weights.iter();
        let mut vertex = 0;
        while let Some(count) = tokens.next() {
            let count: usize = count
                .parse()
                .map_err(|_| ParseError::InvalidNumber(count.clone()))?;
            for _ in 0..count {
                let influence = tokens.next().ok_or_else(|| truncated(vertex))?;
                let weight = tokens.next().ok_or_else(|| truncated(vertex))?;
                let influence: usize = influence
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(influence.clone()))?;
                let weight: f32 = weight
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(weight.clone()))?;
                self.backend
                    .set_skin_weight(&skin.deformer, vertex, influence, weight)?;
            }
            vertex += 1;
        }
        Ok(vertex)
    }

    /// Apply deferred vertex tweaks to their meshes.
    pub(super) fn apply_tweaks(&mut self) {
        for mesh in &self.meshes {
            for tweak in &mesh.tweaks {
                let statement = bind_self_reference(&tweak.statement, &mesh.name);
                if let Err(e) = self.backend.set_attr(&statement) {
                    self.diagnostics.push(DiagnosticKind::Backend, &mesh.name, e.to_string());
                }
            }
        }
    }

    /// Hook new blend shapes up to the shape manager's next free slots.
    pub(super) fn register_blend_shapes(&mut self) {
        if self.blend_shapes.is_empty() {
            return;
        }
        let manager = self.config.shape_manager.clone();
        if !self.backend.exists(&manager) {
            log::info!("No {} in scene; {} blend shapes not registered", manager, self.blend_shapes.len());
            return;
        }

        let mut used = self.backend.used_visibility_slots(&manager);
        let mut directory = self.backend.directory_child_indices(&manager);
        let mut index = 0;
        for blend_shape in std::mem::take(&mut self.blend_shapes) {
            while used.contains(&index) {
                index += 1;
            }
            used.push(index);
            directory.push(index);

            let source = format!("{}.outBlendShapeVisibility[{}]", manager, index);
            let target = format!("{}.targetDirectory[0].directoryParentVisibility", blend_shape);
            match self.backend.connect(&source, &target) {
                Ok(()) => self
                    .transaction
                    .connections
                    .push(super::types::ConnectionStatement::new(source, target)),
                Err(e) => self.diagnostics.push(DiagnosticKind::Backend, &blend_shape, e.to_string()),
            }
            self.blend_shapes.push(blend_shape);
        }

        let result = self.backend.set_directory_child_indices(&manager, &directory);
        self.check(&manager, result);
    }
}
