//! Original-name → instantiated-name bookkeeping.
//!
//! Every node is created under a collision-free name. The resolver remembers
//! what each document name became so later statements can be rewritten to
//! point at the live nodes.

use std::collections::HashMap;

use thiserror::Error;

use super::parser::tokenize;
use super::types::dag_leaf;

/// A rename that conflicts with an earlier one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{original}' already resolved to '{existing}', refusing '{requested}'")]
pub struct RenameConflict {
    pub original: String,
    pub existing: String,
    pub requested: String,
}

/// Session-scoped name map.
#[derive(Clone, Debug, Default)]
pub struct NameResolver {
    names: HashMap<String, String>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved name for `name`, or `name` itself when unmapped.
    ///
    /// A leading root namespace (`:node`) is ignored and DAG paths resolve
    /// through their leaf.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        let leaf = dag_leaf(name);
        let bare = leaf.strip_prefix(':').unwrap_or(leaf);
        self.names.get(bare).map(String::as_str).unwrap_or(bare)
    }

    /// Whether a mapping (identity included) exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Record that `original` was instantiated as `chosen`.
    ///
    /// Re-registering the same pair is a no-op; mapping an already resolved
    /// name to a different value is refused and the first mapping kept.
    pub fn register_rename(&mut self, original: &str, chosen: &str) -> Result<(), RenameConflict> {
        match self.names.get(original) {
            Some(existing) if existing != chosen => Err(RenameConflict {
                original: original.to_string(),
                existing: existing.clone(),
                requested: chosen.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                if original != chosen {
                    log::debug!("Renamed {} -> {}", original, chosen);
                }
                self.names.insert(original.to_string(), chosen.to_string());
                Ok(())
            }
        }
    }

    /// Rewrite every dotted-path token in `text` through the map.
    ///
    /// Quoted and bare tokens are rewritten component-wise; whitespace and
    /// any token without a mapped component is left untouched.
    pub fn retarget(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut token = String::new();
        let mut in_quote = false;
        let mut escaped = false;

        for c in text.chars() {
            if in_quote {
                token.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_quote = false;
                }
                continue;
            }
            if c.is_whitespace() {
                if !token.is_empty() {
                    out.push_str(&self.retarget_token(&token));
                    token.clear();
                }
                out.push(c);
                continue;
            }
            if c == '"' {
                in_quote = true;
            }
            token.push(c);
        }
        if !token.is_empty() {
            out.push_str(&self.retarget_token(&token));
        }

        out
    }

    fn retarget_token(&self, token: &str) -> String {
        let quoted = token.len() >= 2 && token.starts_with('"') && token.ends_with('"');
        let inner = if quoted { &token[1..token.len() - 1] } else { token };
        let rewritten = self.retarget_path(inner);
        if quoted {
            format!("\"{}\"", rewritten)
        } else {
            rewritten
        }
    }

    /// Rewrite each `.`-separated component of a path, and each element of
    /// a `|`-separated DAG path within it.
    pub fn retarget_path(&self, path: &str) -> String {
        path.split('.')
            .map(|component| {
                component
                    .split('|')
                    .map(|element| self.retarget_element(element))
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    fn retarget_element(&self, element: &str) -> String {
        let (prefix, bare) = match element.strip_prefix(':') {
            Some(bare) => (":", bare),
            None => ("", element),
        };
        match self.names.get(bare) {
            Some(mapped) if mapped != bare => format!("{}{}", prefix, mapped),
            _ => element.to_string(),
        }
    }

    /// Number of recorded mappings.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Collision-free variant of `name`.
///
/// When `exists(name)` is true, trailing digits are stripped and the
/// smallest positive integer producing an unused name is appended.
pub fn uniquify(name: &str, exists: impl Fn(&str) -> bool) -> String {
    if !exists(name) {
        return name.to_string();
    }

    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let mut n = 1usize;
    loop {
        let candidate = format!("{}{}", base, n);
        if !exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Point a block statement's self-referencing attribute path (`".attr"`) at
/// `node`. Only the first such token is rewritten; string values are left
/// alone.
pub fn bind_self_reference(statement: &str, node: &str) -> String {
    let Some(token) = tokenize(statement).into_iter().find(|t| t.starts_with("\".")) else {
        return statement.to_string();
    };
    let offset = token.as_ptr() as usize - statement.as_ptr() as usize;

    let mut bound = String::with_capacity(statement.len() + node.len());
    bound.push_str(&statement[..offset + 1]);
    bound.push_str(node);
    bound.push_str(&statement[offset + 1..]);
    bound
}
