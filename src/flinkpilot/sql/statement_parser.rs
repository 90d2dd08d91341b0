//! Line-oriented SQL statement splitter
//!
//! Turns a job script into the ordered list of statements submitted to the
//! SQL gateway. Rules, applied to each trimmed line:
//!
//! - blank lines are dropped
//! - a line starting with `/*` opens a block comment; every line up to and
//!   including the next line ending with `*/` is dropped. A line that both
//!   starts with `/*` and ends with `*/` is a complete comment on its own.
//! - lines starting with `--` are dropped
//! - any other line is appended to the current statement, space-joined
//! - a line ending with `;` closes the statement; the `;` is removed
//!
//! Text left over at end of input becomes a final statement even without a
//! terminator.
//!
//! # Limitations
//!
//! The splitter does not track string literals. A `;` at the end of a line
//! inside a quoted literal closes the statement early, and a quoted line
//! starting with `--` or `/*` is treated as a comment. Scripts must keep
//! such literals off line ends and line starts.

use crate::flinkpilot::error::{PilotError, PilotResult};
use std::fmt;
use std::path::Path;

/// Source name used for statements parsed from an in-memory string
pub const INLINE_SOURCE: &str = "<inline>";

/// One submittable statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement text without the terminator
    pub text: String,
    /// File name (or [`INLINE_SOURCE`]) the statement came from
    pub source: String,
    /// 0-based position within the source
    pub index: usize,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        StatementKind::classify(&self.text)
    }

    /// First `max_chars` characters, for log lines
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            self.text.clone()
        } else {
            let head: String = self.text.chars().take(max_chars).collect();
            format!("{}...", head)
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}: {}", self.source, self.index + 1, self.preview(80))
    }
}

/// Coarse statement classification
///
/// Matching is by keyword containment anywhere in the statement, with
/// table/catalog creation taking precedence over insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    CreateCatalog,
    Insert,
    Other,
}

impl StatementKind {
    pub fn classify(sql: &str) -> Self {
        let normalized = sql
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        if normalized.contains("CREATE TABLE") {
            Self::CreateTable
        } else if normalized.contains("CREATE CATALOG") {
            Self::CreateCatalog
        } else if normalized.contains("INSERT INTO") {
            Self::Insert
        } else {
            Self::Other
        }
    }

    pub fn is_ddl(&self) -> bool {
        matches!(self, Self::CreateTable | Self::CreateCatalog)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CreateTable => "CREATE TABLE",
            Self::CreateCatalog => "CREATE CATALOG",
            Self::Insert => "INSERT",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Statement splitter
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementParser;

impl StatementParser {
    pub fn new() -> Self {
        Self
    }

    /// Split an in-memory script
    pub fn parse(&self, text: &str) -> Vec<Statement> {
        self.parse_from(text, INLINE_SOURCE)
    }

    /// Split a script, tagging each statement with `source`
    pub fn parse_from(&self, text: &str, source: &str) -> Vec<Statement> {
        let mut statements = Vec::new();
        let mut buffer = String::new();
        let mut in_block_comment = false;

        for raw_line in text.lines() {
            let line = raw_line.trim();

            if line.is_empty() {
                continue;
            }

            if in_block_comment {
                if line.ends_with("*/") {
                    in_block_comment = false;
                }
                continue;
            }

            if line.starts_with("/*") {
                // "/*/" both starts and ends a marker but closes nothing
                let self_closing = line.len() >= 4 && line.ends_with("*/");
                in_block_comment = !self_closing;
                continue;
            }

            if line.starts_with("--") {
                continue;
            }

            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(line);

            if line.ends_with(';') {
                Self::emit(&mut statements, &buffer, source);
                buffer.clear();
            }
        }

        Self::emit(&mut statements, &buffer, source);
        statements
    }

    /// Read and split a script file; statements are tagged with the file name
    pub fn parse_file(&self, path: &Path) -> PilotResult<Vec<Statement>> {
        let text = std::fs::read_to_string(path).map_err(|e| PilotError::io(e, path))?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.parse_from(&text, &source))
    }

    fn emit(statements: &mut Vec<Statement>, buffer: &str, source: &str) {
        let mut text = buffer.trim();
        if let Some(stripped) = text.strip_suffix(';') {
            text = stripped.trim_end();
        }
        if text.is_empty() {
            return;
        }
        statements.push(Statement {
            text: text.to_string(),
            source: source.to_string(),
            index: statements.len(),
        });
    }
}
