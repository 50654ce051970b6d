//! Maya ASCII (`.ma`) text parser.
//!
//! The document is a flat list of `;`-terminated statements. This module
//! splits it into statements, groups them into node blocks, and collects
//! connection statements. Attribute payloads are parsed lazily by the
//! builders through [`parse_set_attr`].
//!
//! # Supported Syntax
//!
//! - `createNode <type> -n "<name>" [-p "<parent>"] [-s]`
//! - `setAttr [-s N] [-ch N] "<path>" [-type "<type>"] <values>`
//! - `connectAttr "<src>" "<dst>" [-na]`
//! - `//` line comments, double-quoted strings with `\"` escapes

use thiserror::Error;

use super::types::*;

/// Errors that can occur while reading statement payloads.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Format error in {node}: {message}")]
    Format { node: String, message: String },

    #[error("Invalid number format: {0}")]
    InvalidNumber(String),

    #[error("Missing value: {0}")]
    MissingValue(String),
}

impl ParseError {
    pub fn format(node: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::Format {
            node: node.into(),
            message: message.into(),
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Remove the `&lf;`/`&cr;` entity tokens some exporters leave in the text.
pub fn normalize(content: &str) -> String {
    content.replace("&lf;", "").replace("&cr;", "")
}

/// Split document text into trimmed statements without their `;`.
///
/// Semicolons inside double-quoted strings do not terminate a statement, and
/// `//` comments at the start of a line are dropped.
pub fn split_statements(content: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaped = false;
    let mut line_start = true;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if !in_quote && line_start {
            if c.is_whitespace() && c != '\n' {
                current.push(c);
                continue;
            }
            if c == '/' && chars.peek() == Some(&'/') {
                // Skip to end of line
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
                current.push('\n');
                continue;
            }
        }
        line_start = c == '\n';

        if in_quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quote = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_quote = true;
                current.push(c);
            }
            ';' => {
                let statement = current.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }

    statements
}

/// Split a statement into whitespace-separated tokens.
///
/// Quoted strings stay in one token with their quotes, so
/// `{"smile","weight[0]"}` and `"a b"` are single tokens.
pub fn tokenize(statement: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quote = false;
    let mut escaped = false;

    for (i, c) in statement.char_indices() {
        if in_quote {
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
            if let Some(s) = start.take() {
                tokens.push(&statement[s..i]);
            }
            continue;
        }
        if start.is_none() {
            start = Some(i);
        }
        if c == '"' {
            in_quote = true;
        }
    }

    if let Some(s) = start {
        tokens.push(&statement[s..]);
    }

    tokens
}

/// Strip one pair of surrounding double quotes.
pub fn unquote(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

/// First word of a statement.
pub fn command_of(statement: &str) -> &str {
    statement.split_whitespace().next().unwrap_or("")
}

/// Value following the first occurrence of any of `flags`.
pub fn flag_value<'a>(tokens: &[&'a str], flags: &[&str]) -> Option<&'a str> {
    tokens
        .iter()
        .position(|t| flags.contains(t))
        .and_then(|i| tokens.get(i + 1))
        .copied()
}

/// Whether a token is a command flag (`-s`, `-type`) rather than a negative number.
fn is_flag(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// `setAttr` flags that take one argument.
const SET_ATTR_VALUE_FLAGS: &[&str] = &[
    "-s", "-size", "-ch", "-capacityHint", "-type", "-typ", "-k", "-keyable", "-l", "-lock",
    "-cb", "-channelBox", "-ca", "-caching",
];

/// Parse a `setAttr` statement into its path, flags and values.
pub fn parse_set_attr(statement: &str) -> ParseResult<SetAttr> {
    let tokens = tokenize(statement);
    if tokens.first() != Some(&"setAttr") {
        return Err(ParseError::MissingValue(format!(
            "not a setAttr statement: {}",
            truncate(statement)
        )));
    }

    let mut attr = SetAttr::default();
    let mut path: Option<String> = None;
    let mut i = 1;

    while i < tokens.len() {
        let token = tokens[i];
        if is_flag(token) && (path.is_none() || attr.values.is_empty()) {
            if SET_ATTR_VALUE_FLAGS.contains(&token) {
                let value = tokens
                    .get(i + 1)
                    .ok_or_else(|| ParseError::MissingValue(format!("{} in {}", token, truncate(statement))))?;
                match token {
                    "-s" | "-size" => {
                        attr.size = Some(
                            value
                                .parse()
                                .map_err(|_| ParseError::InvalidNumber(value.to_string()))?,
                        );
                    }
                    "-type" | "-typ" => attr.value_type = Some(unquote(value).to_string()),
                    _ => {}
                }
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        if path.is_none() {
            path = Some(unquote(token).to_string());
        } else {
            attr.values.push(token.to_string());
        }
        i += 1;
    }

    attr.path = path.ok_or_else(|| ParseError::MissingValue(format!("attribute path in {}", truncate(statement))))?;
    Ok(attr)
}

/// Parse a `connectAttr` statement. Returns `None` for any other command.
pub fn parse_connection(statement: &str) -> Option<ConnectionStatement> {
    let tokens = tokenize(statement);
    if tokens.first() != Some(&CONNECT_ATTR) {
        return None;
    }

    let mut plugs = Vec::new();
    let mut flags = Vec::new();
    for token in &tokens[1..] {
        if is_flag(token) {
            flags.push(token.to_string());
        } else {
            plugs.push(unquote(token).to_string());
        }
    }

    if plugs.len() < 2 {
        log::warn!("Ignoring malformed connection: {}", truncate(statement));
        return None;
    }

    Some(ConnectionStatement {
        source: plugs[0].clone(),
        target: plugs[1].clone(),
        flags,
    })
}

/// Segment a document into node blocks and connection statements.
///
/// Both lists come from the same statement stream: connection statements are
/// also left in whichever node block they follow.
pub fn segment(content: &str) -> Document {
    let content = normalize(content);
    let statements = split_statements(&content);

    let mut blocks = vec![NodeBlock::default()];
    let mut connections = Vec::new();

    for statement in statements {
        let command = command_of(&statement);
        if command == CONNECT_ATTR {
            if let Some(connection) = parse_connection(&statement) {
                connections.push(connection);
            }
        }
        if command == CREATE_NODE {
            blocks.push(NodeBlock::new(vec![statement]));
        } else if let Some(block) = blocks.last_mut() {
            block.statements.push(statement);
        }
    }

    log::debug!(
        "Segmented document into {} nodes and {} connections",
        blocks.len() - 1,
        connections.len()
    );

    Document { blocks, connections }
}

/// Parse a run of float tokens.
pub fn parse_floats(tokens: &[String]) -> ParseResult<Vec<f32>> {
    tokens
        .iter()
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| ParseError::InvalidNumber(t.clone()))
        })
        .collect()
}

/// Parse a run of integer tokens.
pub fn parse_ints(tokens: &[String]) -> ParseResult<Vec<i64>> {
    tokens
        .iter()
        .map(|t| {
            t.parse::<i64>()
                .map_err(|_| ParseError::InvalidNumber(t.clone()))
        })
        .collect()
}

/// Shorten a statement for log and error messages.
pub fn truncate(statement: &str) -> String {
    const MAX: usize = 80;
    let flat: String = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let cut: String = flat.chars().take(MAX).collect();
        format!("{}...", cut)
    }
}
