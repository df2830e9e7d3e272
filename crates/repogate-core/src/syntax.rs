//! Grammar registry for the advisory syntax check.
//!
//! A file's language is detected from its extension. Python goes through
//! `rustpython-parser`, the brace languages through tree-sitter grammars, and
//! JSON/TOML through their serde deserializers. Every parser reports the first
//! problem as a 1-based line and column.

use rustpython_parser::{ast, Parse};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;
use tree_sitter::{Language, Node, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxLanguage {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Json,
    Toml,
}

impl SyntaxLanguage {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, extension) = filename.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "py" | "pyw" | "pyi" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::JavaScript),
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "go" => Some(Self::Go),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::Rust => "Rust",
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::Tsx => "TSX",
            Self::Go => "Go",
            Self::Json => "JSON",
            Self::Toml => "TOML",
        }
    }

    /// Parse `source`, returning the first syntax problem found.
    pub fn check(self, source: &str) -> Result<(), SyntaxIssue> {
        match self {
            Self::Python => check_python(source),
            Self::Rust => check_tree_sitter(self, tree_sitter_rust::LANGUAGE.into(), source),
            Self::JavaScript => {
                check_tree_sitter(self, tree_sitter_javascript::LANGUAGE.into(), source)
            }
            Self::TypeScript => check_tree_sitter(
                self,
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                source,
            ),
            Self::Tsx => {
                check_tree_sitter(self, tree_sitter_typescript::LANGUAGE_TSX.into(), source)
            }
            Self::Go => check_tree_sitter(self, tree_sitter_go::LANGUAGE.into(), source),
            Self::Json => check_json(source),
            Self::Toml => check_toml(source),
        }
    }
}

impl fmt::Display for SyntaxLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Location and description of a parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Which files the syntax check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntaxPolicy {
    /// Parse files with a registered extension, skip everything else.
    #[default]
    Recognized,
    /// Parse every file; unregistered extensions are parsed as Python.
    Always,
    /// Never run the syntax check.
    Off,
}

impl SyntaxPolicy {
    pub fn language_for(self, filename: &str) -> Option<SyntaxLanguage> {
        match self {
            Self::Recognized => SyntaxLanguage::from_filename(filename),
            Self::Always => {
                Some(SyntaxLanguage::from_filename(filename).unwrap_or(SyntaxLanguage::Python))
            }
            Self::Off => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recognized => "recognized",
            Self::Always => "always",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for SyntaxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown syntax policy '{0}' (expected recognized, always or off)")]
pub struct UnknownSyntaxPolicy(String);

impl FromStr for SyntaxPolicy {
    type Err = UnknownSyntaxPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recognized" => Ok(Self::Recognized),
            "always" => Ok(Self::Always),
            "off" => Ok(Self::Off),
            _ => Err(UnknownSyntaxPolicy(s.to_owned())),
        }
    }
}

fn check_python(source: &str) -> Result<(), SyntaxIssue> {
    match ast::Suite::parse(source, "<update>") {
        Ok(_) => Ok(()),
        Err(err) => {
            let offset = u32::from(err.offset) as usize;
            let (line, column) = line_column(source, offset);
            Err(SyntaxIssue {
                line,
                column,
                message: err.error.to_string(),
            })
        }
    }
}

fn check_tree_sitter(
    language: SyntaxLanguage,
    grammar: Language,
    source: &str,
) -> Result<(), SyntaxIssue> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&grammar) {
        warn!("{language} grammar unavailable, skipping syntax check: {e}");
        return Ok(());
    }
    let Some(tree) = parser.parse(source, None) else {
        warn!("{language} parser gave up, skipping syntax check");
        return Ok(());
    };

    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    let node = first_error(root).unwrap_or(root);
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing '{}'", node.kind())
    } else {
        match node.utf8_text(source.as_bytes()) {
            Ok(text) if !text.trim().is_empty() => {
                let snippet: String = text
                    .trim()
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .chars()
                    .take(24)
                    .collect();
                format!("unexpected '{snippet}'")
            }
            _ => "unexpected end of input".to_owned(),
        }
    };

    Err(SyntaxIssue {
        line: position.row + 1,
        column: char_column(source, position.row, position.column) + 1,
        message,
    })
}

/// Depth-first search for the earliest ERROR or MISSING node.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

fn check_json(source: &str) -> Result<(), SyntaxIssue> {
    serde_json::from_str::<serde_json::Value>(source)
        .map(|_| ())
        .map_err(|e| SyntaxIssue {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })
}

fn check_toml(source: &str) -> Result<(), SyntaxIssue> {
    source.parse::<toml::Table>().map(|_| ()).map_err(|e| {
        let (line, column) = e
            .span()
            .map_or((1, 1), |span| line_column(source, span.start));
        SyntaxIssue {
            line,
            column,
            message: e.message().to_owned(),
        }
    })
}

/// 1-based line and character column of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut end = offset.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

/// Character count of the first `byte_column` bytes of row `row`.
fn char_column(source: &str, row: usize, byte_column: usize) -> usize {
    let Some(line) = source.split('\n').nth(row) else {
        return byte_column;
    };
    let mut end = byte_column.min(line.len());
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    line[..end].chars().count()
}
