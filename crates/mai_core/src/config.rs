//! Import configuration.
//!
//! Deny-lists and switches that shape one import. The defaults skip the
//! cameras, UI nodes and render plumbing every scene file carries.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options for one import session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Node names never created
    pub ignored_names: Vec<String>,

    /// Node types never created
    pub ignored_types: Vec<String>,

    /// Types skipped when a node of the same name already exists
    pub no_duplicate_types: Vec<String>,

    /// Extra types the generic builder leaves alone
    pub generic_exceptions: Vec<String>,

    /// Source nodes whose connections are never replayed
    pub connection_denylist: Vec<String>,

    /// Source plug prefixes whose connections are never replayed
    pub skipped_source_prefixes: Vec<String>,

    /// Attributes the host manages itself
    pub skipped_attributes: Vec<String>,

    /// Reuse shader pairs already present in the scene
    pub reuse_existing_shaders: bool,

    /// Node that tracks blend shapes for the shape editor
    pub shape_manager: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            ignored_names: strings(&[
                "persp",
                "top",
                "side",
                "front",
                "uiConfigurationScriptNode",
                "layerManager",
                "renderLayerManager",
                "defaultRenderLayer",
                "shapeEditorManager",
                "lightLinker1",
            ]),
            ignored_types: strings(&[
                "camera",
                "script",
                "shapeEditorManager",
                "nodeGraphEditorInfo",
                "displayLayer",
                "displayLayerManager",
                "defaultResolution",
                "hardwareRenderingGlobals",
                "renderGlobalsList1",
                "poseInterpolatorManager",
                "renderLayerManager",
                "renderLayer",
                "aiOptions",
                "aiAOVDriver",
                "aiAOVFilter",
                "aiImagerDenoiserOidn",
                "lightLinker",
            ]),
            no_duplicate_types: strings(&["file", "shadingEngine", "place2dTexture", "place3dTexture"]),
            generic_exceptions: Vec::new(),
            connection_denylist: strings(&["defaultRenderLayer", "shapeEditorManager"]),
            skipped_source_prefixes: strings(&[":default"]),
            skipped_attributes: strings(&["midLayerParent"]),
            reuse_existing_shaders: true,
            shape_manager: "shapeEditorManager".to_string(),
        }
    }
}

impl ImportConfig {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_ignored_name(&self, name: &str) -> bool {
        self.ignored_names.iter().any(|n| n == name)
    }

    pub fn is_ignored_type(&self, node_type: &str) -> bool {
        self.ignored_types.iter().any(|t| t == node_type)
    }

    pub fn is_no_duplicate_type(&self, node_type: &str) -> bool {
        self.no_duplicate_types.iter().any(|t| t == node_type)
    }

    pub fn is_generic_exception(&self, node_type: &str) -> bool {
        self.generic_exceptions.iter().any(|t| t == node_type)
    }
}
