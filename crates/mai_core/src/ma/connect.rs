//! Connection replay.
//!
//! Material memberships of freshly built meshes become set-membership calls
//! with the face ranges parsed from the mesh block. Every other `connectAttr`
//! is retargeted through the name map and established unless a skip rule
//! applies.

use super::diagnostic::DiagnosticKind;
use super::session::ImportSession;
use super::types::{plug_attr, plug_node, AttrPath, ConnectionStatement};
use crate::backend::FaceRange;

const INST_OBJ_GROUPS: &[&str] = &["iog", "instObjGroups"];
const OBJECT_GROUPS: &[&str] = &["og", "objectGroups"];

/// Material group slot addressed by a membership plug attribute.
///
/// `iog.og[k]` selects slot `k`; a bare `iog` or `iog[0]` is the whole mesh
/// (`Some(None)`). Anything else is not a membership plug.
pub fn membership_slot(attr: &str) -> Option<Option<usize>> {
    let path = AttrPath::parse(&format!(".{}", attr));
    if path.matches(&[INST_OBJ_GROUPS]) {
        return Some(None);
    }
    if path.matches(&[INST_OBJ_GROUPS, OBJECT_GROUPS]) {
        return path.segment(1).and_then(|s| s.index_value()).map(Some);
    }
    None
}

impl ImportSession<'_> {
    /// Replay the document's connections in order.
    pub(super) fn connect(&mut self, connections: &[ConnectionStatement]) {
        for connection in connections {
            if self.connect_membership(connection) {
                continue;
            }
            self.connect_plugs(connection);
        }
    }

    /// Handle a shading group membership of a mesh built by this import.
    /// Returns false when `connection` is not such a membership.
    fn connect_membership(&mut self, connection: &ConnectionStatement) -> bool {
        let source = connection.source_node();
        let Some(mesh) = self.meshes.iter().position(|m| m.original == source) else {
            return false;
        };
        let Some(slot) = membership_slot(connection.source_attr()) else {
            return false;
        };

        let group = self.names.resolve(connection.target_node()).to_string();
        let mesh_name = self.meshes[mesh].name.clone();
        if !self.backend.exists(&group) {
            self.diagnostics
                .push(DiagnosticKind::MissingNode, &group, format!("membership of {}", mesh_name));
            return true;
        }

        let ranges: Vec<FaceRange> = match slot {
            None => Vec::new(),
            Some(k) => match self.meshes[mesh].materials.get(&k) {
                Some(ranges) => ranges.clone(),
                None => {
                    log::warn!("{}: no face list for material slot {}, assigning whole mesh", mesh_name, k);
                    Vec::new()
                }
            },
        };

        if let Err(e) = self.backend.add_set_members(&group, &mesh_name, &ranges) {
            self.diagnostics.push(DiagnosticKind::Backend, &group, e.to_string());
        } else {
            log::debug!("{} -> {} ({} ranges)", mesh_name, group, ranges.len());
        }
        true
    }

    fn connect_plugs(&mut self, connection: &ConnectionStatement) {
        let original_source = connection.source.as_str();
        let source_node = connection.source_node();

        if self.config.connection_denylist.iter().any(|n| n == source_node) {
            log::debug!("Skipping denylisted connection {}", connection);
            return;
        }
        if self
            .config
            .skipped_source_prefixes
            .iter()
            .any(|p| original_source.starts_with(p.as_str()))
        {
            log::debug!("Skipping default node connection {}", connection);
            return;
        }
        let managed = |plug: &str| {
            let attr = plug_attr(plug);
            self.config
                .skipped_attributes
                .iter()
                .any(|skipped| attr.split('.').any(|part| part.split('[').next() == Some(skipped.as_str())))
        };
        if managed(&connection.source) || managed(&connection.target) {
            log::debug!("Skipping managed connection {}", connection);
            return;
        }

        let source = self.resolve_plug(&connection.source);
        let target = self.resolve_plug(&connection.target);
        for node in [plug_node(&source), plug_node(&target)] {
            if !self.backend.exists(node) {
                self.diagnostics
                    .push(DiagnosticKind::MissingNode, node, format!("{} -> {}", source, target));
                return;
            }
        }

        if self.backend.is_connected(&source, &target) {
            self.diagnostics
                .push(DiagnosticKind::AlreadyConnected, &target, format!("already driven by {}", source));
            return;
        }

        match self.backend.connect(&source, &target) {
            Ok(()) => self.transaction.connections.push(ConnectionStatement {
                source,
                target,
                flags: connection.flags.clone(),
            }),
            Err(e) => self.diagnostics.push(DiagnosticKind::Backend, &target, e.to_string()),
        }
    }

    /// Plug path with the root namespace dropped and nodes renamed.
    fn resolve_plug(&self, plug: &str) -> String {
        let bare = plug.strip_prefix(':').unwrap_or(plug);
        self.names.retarget_path(bare)
    }
}
