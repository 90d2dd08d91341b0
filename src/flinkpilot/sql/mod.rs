//! SQL script handling
//!
//! Scripts are split into statements on the client; the cluster only ever
//! sees one statement per request.

pub mod statement_parser;

pub use statement_parser::{Statement, StatementKind, StatementParser};
