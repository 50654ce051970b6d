//! Node block routing.
//!
//! Every block is assigned to exactly one builder. Shading groups are paired
//! with the shader driving their `surfaceShader` plug before anything is
//! created, so a broken material reference stops the import up front.

use thiserror::Error;

use super::types::{plug_attr, AttrPath, Document, NodeBlock};
use crate::backend::SceneBackend;
use crate::config::ImportConfig;

/// Node type of shading groups.
pub const SHADING_ENGINE: &str = "shadingEngine";

/// Node type of skin deformers.
pub const SKIN_CLUSTER: &str = "skinCluster";

const SURFACE_SHADER: &[&str] = &["ss", "surfaceShader"];

/// A material reference that cannot be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Shading group '{0}' has no surface shader connection")]
    MissingShader(String),

    #[error("Shader '{shader}' of shading group '{group}' is not defined in the document")]
    UndefinedShader { group: String, shader: String },

    #[error("Shading group '{0}' is driven by an unnamed shader")]
    UnnamedShader(String),
}

/// A mesh block and the transform it is parented under.
#[derive(Clone, Copy, Debug)]
pub struct MeshEntry<'a> {
    pub block: &'a NodeBlock,
}

impl<'a> MeshEntry<'a> {
    pub fn parent(&self) -> Option<String> {
        self.block.parent()
    }
}

/// A shading group and the shader driving it.
#[derive(Clone, Copy, Debug)]
pub struct ShaderPair<'a> {
    pub group: &'a NodeBlock,
    pub shader: &'a NodeBlock,
}

/// Blocks routed to their builders, in document order.
#[derive(Clone, Debug, Default)]
pub struct Classification<'a> {
    pub meshes: Vec<MeshEntry<'a>>,
    pub shaders: Vec<ShaderPair<'a>>,
    pub skins: Vec<&'a NodeBlock>,
    pub transforms: Vec<&'a NodeBlock>,
    pub others: Vec<&'a NodeBlock>,
    pub excluded: usize,
}

impl<'a> Classification<'a> {
    /// Original names of every shader and shading group in a pair.
    pub fn shader_names(&self) -> Vec<String> {
        self.shaders
            .iter()
            .flat_map(|p| [p.group.name(), p.shader.name()])
            .collect()
    }
}

/// Route every block of `document` (placeholder excluded).
pub fn classify<'a>(document: &'a Document, config: &ImportConfig) -> Result<Classification<'a>, ReferenceError> {
    let mut result = Classification::default();

    for block in document.blocks.iter().skip(1) {
        let name = block.name();
        let node_type = block.node_type();
        if config.is_ignored_name(&name) || config.is_ignored_type(node_type) {
            log::debug!("Excluding {} ({})", name, node_type);
            result.excluded += 1;
            continue;
        }

        match node_type {
            SKIN_CLUSTER => result.skins.push(block),
            "transform" => result.transforms.push(block),
            "mesh" => result.meshes.push(MeshEntry { block }),
            SHADING_ENGINE => {
                let shader = find_shader(document, &name)?;
                result.shaders.push(ShaderPair { group: block, shader });
            }
            _ => result.others.push(block),
        }
    }

    log::info!(
        "Classified {} meshes, {} transforms, {} shader pairs, {} skins, {} other nodes ({} excluded)",
        result.meshes.len(),
        result.transforms.len(),
        result.shaders.len(),
        result.skins.len(),
        result.others.len(),
        result.excluded
    );

    Ok(result)
}

/// Find the shader block connected to `group.surfaceShader`.
fn find_shader<'a>(document: &'a Document, group: &str) -> Result<&'a NodeBlock, ReferenceError> {
    let connection = document
        .connections
        .iter()
        .find(|c| {
            c.target_node() == group && AttrPath::parse(&format!(".{}", plug_attr(&c.target))).matches(&[SURFACE_SHADER])
        })
        .ok_or_else(|| ReferenceError::MissingShader(group.to_string()))?;

    let shader = connection.source_node();
    if shader.is_empty() {
        return Err(ReferenceError::UnnamedShader(group.to_string()));
    }

    document
        .find_block(shader)
        .ok_or_else(|| ReferenceError::UndefinedShader {
            group: group.to_string(),
            shader: shader.to_string(),
        })
}

/// Whether both halves of a pair already exist in the scene with matching types.
pub fn is_existing_pair(pair: &ShaderPair<'_>, backend: &dyn SceneBackend) -> bool {
    let group = pair.group.name();
    let shader = pair.shader.name();
    backend.node_type(&group).as_deref() == Some(SHADING_ENGINE)
        && backend.node_type(&shader).as_deref() == Some(pair.shader.node_type())
}
