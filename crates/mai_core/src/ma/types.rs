//! Maya ASCII types for intermediate representation.
//!
//! These types represent the segmented document before any node is handed
//! to a scene backend.

use serde::Serialize;

use super::parser::{flag_value, tokenize, unquote};

/// Node-creation command that opens every node block.
pub const CREATE_NODE: &str = "createNode";

/// Connection command collected by the segmenter.
pub const CONNECT_ATTR: &str = "connectAttr";

/// A segmented document: node blocks plus connection statements.
#[derive(Clone, Debug, Default)]
pub struct Document {
    /// Node blocks in document order. Index 0 is the placeholder block
    /// holding everything before the first `createNode`.
    pub blocks: Vec<NodeBlock>,

    /// `connectAttr` statements in document order
    pub connections: Vec<ConnectionStatement>,
}

impl Document {
    /// Find a node block by its original name (placeholder excluded).
    pub fn find_block(&self, name: &str) -> Option<&NodeBlock> {
        self.blocks.iter().skip(1).find(|b| b.name() == name)
    }

    /// Number of real node blocks (placeholder excluded).
    pub fn node_count(&self) -> usize {
        self.blocks.len().saturating_sub(1)
    }
}

/// One node's header statement plus its following statements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeBlock {
    /// Statements without their terminating `;`. The first is the header.
    pub statements: Vec<String>,
}

impl NodeBlock {
    pub fn new(statements: Vec<String>) -> Self {
        Self { statements }
    }

    /// Header statement (`createNode <type> -n "<name>" ...`), or "".
    pub fn header(&self) -> &str {
        self.statements.first().map(String::as_str).unwrap_or("")
    }

    /// Statements after the header.
    pub fn body(&self) -> &[String] {
        self.statements.get(1..).unwrap_or(&[])
    }

    /// Node type: first token after the creation keyword.
    pub fn node_type(&self) -> &str {
        let header = self.header();
        let rest = header.strip_prefix(CREATE_NODE).unwrap_or(header);
        rest.split_whitespace().next().unwrap_or("")
    }

    /// Value of the `-n`/`-name` flag, or "" when not specified.
    pub fn name(&self) -> String {
        let tokens = tokenize(self.header());
        flag_value(&tokens, &["-n", "-name"])
            .map(|v| unquote(v).to_string())
            .unwrap_or_default()
    }

    /// Value of the `-p`/`-parent` flag.
    pub fn parent(&self) -> Option<String> {
        let tokens = tokenize(self.header());
        flag_value(&tokens, &["-p", "-parent"])
            .map(|v| unquote(v).to_string())
            .filter(|v| !v.is_empty())
    }
}

/// A `connectAttr <source> <target> [flags]` statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionStatement {
    /// Source plug, unquoted (`node.attr`)
    pub source: String,

    /// Destination plug, unquoted (`node.attr`)
    pub target: String,

    /// Trailing flags such as `-na`
    pub flags: Vec<String>,
}

impl ConnectionStatement {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            flags: Vec::new(),
        }
    }

    /// Node part of the source plug (DAG leaf, root namespace stripped).
    pub fn source_node(&self) -> &str {
        plug_node(&self.source)
    }

    /// Attribute part of the source plug.
    pub fn source_attr(&self) -> &str {
        plug_attr(&self.source)
    }

    /// Node part of the target plug (DAG leaf, root namespace stripped).
    pub fn target_node(&self) -> &str {
        plug_node(&self.target)
    }

    /// Attribute part of the target plug.
    pub fn target_attr(&self) -> &str {
        plug_attr(&self.target)
    }

    /// Render back to statement text (without `;`).
    pub fn to_statement(&self) -> String {
        let mut text = format!("{} \"{}\" \"{}\"", CONNECT_ATTR, self.source, self.target);
        for flag in &self.flags {
            text.push(' ');
            text.push_str(flag);
        }
        text
    }
}

impl std::fmt::Display for ConnectionStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.source, self.target)
    }
}

/// Last element of a DAG path (`|group1|pCube1` → `pCube1`).
pub fn dag_leaf(name: &str) -> &str {
    name.rsplit('|').next().unwrap_or(name)
}

/// Node part of a plug path (`node.attr` → `node`), root namespace stripped.
///
/// DAG paths reduce to their leaf (`|pPlane1|pPlaneShape1.iog` → `pPlaneShape1`).
pub fn plug_node(plug: &str) -> &str {
    let node = dag_leaf(plug.split('.').next().unwrap_or(""));
    node.strip_prefix(':').unwrap_or(node)
}

/// Attribute part of a plug path (`node.a.b` → `a.b`).
pub fn plug_attr(plug: &str) -> &str {
    plug.split_once('.').map(|(_, attr)| attr).unwrap_or("")
}

/// A parsed `setAttr` statement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetAttr {
    /// Attribute path without quotes, e.g. `.vt[0:7]` or `pCube1.t`
    pub path: String,

    /// `-s`/`-size` flag value
    pub size: Option<usize>,

    /// `-type`/`-typ` flag value, unquoted
    pub value_type: Option<String>,

    /// Value tokens in order (quotes preserved)
    pub values: Vec<String>,
}

impl SetAttr {
    /// Parsed form of `path`.
    pub fn attr_path(&self) -> AttrPath {
        AttrPath::parse(&self.path)
    }

    /// True for count-only statements such as `setAttr -s 2 ".iog[0].og";`.
    pub fn is_count_only(&self) -> bool {
        self.values.is_empty() && self.size.is_some()
    }
}

/// An attribute path split into its node and dotted segments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttrPath {
    /// Node name before the first `.`; empty for self references (`.vt`)
    pub node: String,

    /// Dotted segments after the node
    pub segments: Vec<AttrSegment>,
}

/// One `name[index]` segment of an attribute path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttrSegment {
    pub name: String,

    /// Raw bracket contents (`3`, `0:7`), if any
    pub index: Option<String>,
}

impl AttrSegment {
    /// Whether this segment's name matches any of the given aliases.
    pub fn is(&self, aliases: &[&str]) -> bool {
        aliases.contains(&self.name.as_str())
    }

    /// Single numeric index (`[3]`).
    pub fn index_value(&self) -> Option<usize> {
        self.index.as_deref()?.trim().parse().ok()
    }

    /// First element of the index or range (`[3]` → 3, `[0:7]` → 0).
    pub fn index_start(&self) -> Option<usize> {
        let index = self.index.as_deref()?;
        index.split(':').next()?.trim().parse().ok()
    }
}

impl AttrPath {
    pub fn parse(path: &str) -> Self {
        let path = unquote(path);
        let path = path.strip_prefix(':').unwrap_or(path);
        let mut parts = path.split('.');
        let node = parts.next().unwrap_or("").to_string();
        let segments = parts
            .filter(|p| !p.is_empty())
            .map(|part| match part.find('[') {
                Some(open) => {
                    let close = part.rfind(']').unwrap_or(part.len());
                    AttrSegment {
                        name: part[..open].to_string(),
                        index: Some(part[open + 1..close.max(open + 1)].to_string()),
                    }
                }
                None => AttrSegment {
                    name: part.to_string(),
                    index: None,
                },
            })
            .collect();

        Self { node, segments }
    }

    /// Segment at position `i`.
    pub fn segment(&self, i: usize) -> Option<&AttrSegment> {
        self.segments.get(i)
    }

    /// Whether the segment names match `pattern`, each position accepting
    /// any of its aliases. The path must have exactly as many segments.
    pub fn matches(&self, pattern: &[&[&str]]) -> bool {
        self.segments.len() == pattern.len()
            && self
                .segments
                .iter()
                .zip(pattern)
                .all(|(seg, aliases)| seg.is(aliases))
    }

    /// Whether the first segment matches any alias.
    pub fn starts_with(&self, aliases: &[&str]) -> bool {
        self.segments.first().is_some_and(|s| s.is(aliases))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str) -> NodeBlock {
        NodeBlock::new(vec![text.to_string()])
    }

    #[test]
    fn test_block_header_fields() {
        let b = block(r#"createNode mesh -n "pCubeShape1" -p "pCube1""#);
        assert_eq!(b.node_type(), "mesh");
        assert_eq!(b.name(), "pCubeShape1");
        assert_eq!(b.parent().as_deref(), Some("pCube1"));
    }

    #[test]
    fn test_block_long_flags() {
        let b = block(r#"createNode transform -shared -name "group1" -parent "world""#);
        assert_eq!(b.node_type(), "transform");
        assert_eq!(b.name(), "group1");
        assert_eq!(b.parent().as_deref(), Some("world"));
    }

    #[test]
    fn test_empty_block_is_unspecified() {
        let b = NodeBlock::default();
        assert_eq!(b.node_type(), "");
        assert_eq!(b.name(), "");
        assert_eq!(b.parent(), None);
        assert!(b.body().is_empty());
    }

    #[test]
    fn test_attr_path_segments() {
        let path = AttrPath::parse("\".uvst[0].uvsp[0:13]\"");
        assert_eq!(path.node, "");
        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.segments[0].name, "uvst");
        assert_eq!(path.segments[0].index_value(), Some(0));
        assert_eq!(path.segments[1].index.as_deref(), Some("0:13"));
        assert_eq!(path.segments[1].index_start(), Some(0));
        assert!(path.matches(&[&["uvst", "uvSet"], &["uvsp", "uvSetPoints"]]));
    }

    #[test]
    fn test_attr_path_with_node() {
        let path = AttrPath::parse(":defaultRenderGlobals.ren");
        assert_eq!(path.node, "defaultRenderGlobals");
        assert!(path.starts_with(&["ren"]));
    }

    #[test]
    fn test_connection_parts() {
        let c = ConnectionStatement::new("pCubeShape1.iog.og[0]", ":initialShadingGroup.dsm");
        assert_eq!(c.source_node(), "pCubeShape1");
        assert_eq!(c.source_attr(), "iog.og[0]");
        assert_eq!(c.target_node(), "initialShadingGroup");
        assert_eq!(c.target_attr(), "dsm");

        let c = ConnectionStatement::new("|pCube1|pCubeShape1.iog.og[1]", "|:group1|:blinn1SG.dsm");
        assert_eq!(c.source_node(), "pCubeShape1");
        assert_eq!(c.source_attr(), "iog.og[1]");
        assert_eq!(c.target_node(), "blinn1SG");
    }
}
