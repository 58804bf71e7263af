//! Runs an operator supplied SQL file one statement at a time.
//!
//! A statement that fails is logged and skipped; the rest of the file still
//! runs. Only a missing or unreadable file stops the run before it starts.

use common::{ScriptReport, UnitFailure};
use sea_orm::{ConnectionTrait, FromQueryResult, JsonValue, Statement};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::error::{PipelineError, Result};

/// Number of statement characters quoted in log lines.
const PREVIEW_CHARS: usize = 80;

/// Leading keywords of statements that return rows.
const ROW_KEYWORDS: [&str; 6] = ["SELECT", "WITH", "VALUES", "SHOW", "EXPLAIN", "TABLE"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scan {
    Code,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
    Dollar(String),
}

/// Splits `sql` on `;`, ignoring separators inside quotes, comments and
/// dollar-quoted bodies. Fragments holding nothing but whitespace and comments
/// are dropped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut has_code = false;
    let mut state = Scan::Code;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let next = bytes.get(i + 1).copied();
        match &state {
            Scan::Code => match c {
                b';' => {
                    if has_code {
                        statements.push(sql[start..i].trim().to_string());
                    }
                    start = i + 1;
                    has_code = false;
                }
                b'\'' => {
                    state = Scan::SingleQuote;
                    has_code = true;
                }
                b'"' => {
                    state = Scan::DoubleQuote;
                    has_code = true;
                }
                b'-' if next == Some(b'-') => {
                    state = Scan::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = Scan::BlockComment;
                    i += 1;
                }
                b'$' => {
                    has_code = true;
                    if let Some(tag) = dollar_tag(&sql[i..]) {
                        i += tag.len() - 1;
                        state = Scan::Dollar(tag);
                    }
                }
                c if !c.is_ascii_whitespace() => has_code = true,
                _ => {}
            },
            Scan::SingleQuote => {
                if c == b'\'' {
                    if next == Some(b'\'') {
                        i += 1;
                    } else {
                        state = Scan::Code;
                    }
                }
            }
            Scan::DoubleQuote => {
                if c == b'"' {
                    state = Scan::Code;
                }
            }
            Scan::LineComment => {
                if c == b'\n' {
                    state = Scan::Code;
                }
            }
            Scan::BlockComment => {
                if c == b'*' && next == Some(b'/') {
                    state = Scan::Code;
                    i += 1;
                }
            }
            Scan::Dollar(tag) => {
                if bytes[i..].starts_with(tag.as_bytes()) {
                    i += tag.len() - 1;
                    state = Scan::Code;
                }
            }
        }
        i += 1;
    }

    if has_code {
        statements.push(sql[start..].trim().to_string());
    }
    statements
}

/// `$tag$` or `$$` at the start of `rest`, if any.
fn dollar_tag(rest: &str) -> Option<String> {
    let body = rest.strip_prefix('$')?;
    let end = body.find('$')?;
    let tag = &body[..end];
    let valid = tag
        .chars()
        .enumerate()
        .all(|(n, c)| c == '_' || c.is_ascii_alphabetic() || (n > 0 && c.is_ascii_digit()));
    valid.then(|| format!("${tag}$"))
}

/// Whether the statement's first keyword produces a result set.
pub fn returns_rows(statement: &str) -> bool {
    let mut rest = statement.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            break;
        }
    }
    let keyword: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    ROW_KEYWORDS.contains(&keyword.as_str())
}

fn preview(statement: &str) -> String {
    statement.chars().take(PREVIEW_CHARS).collect()
}

/// Reads `path` and runs its statements, writing one JSON line per result row.
#[instrument(skip(conn, out))]
pub async fn run_script<C, W>(conn: &C, path: &Path, out: &mut W) -> Result<ScriptReport>
where
    C: ConnectionTrait,
    W: Write,
{
    let sql = std::fs::read_to_string(path).map_err(|source| PipelineError::ScriptRead {
        path: path.to_path_buf(),
        source,
    })?;
    run_statements(conn, &sql, out).await
}

/// Runs every statement of `sql` in order.
pub async fn run_statements<C, W>(conn: &C, sql: &str, out: &mut W) -> Result<ScriptReport>
where
    C: ConnectionTrait,
    W: Write,
{
    let statements = split_statements(sql);
    info!("Running {} statement(s)", statements.len());

    let mut report = ScriptReport::default();
    for (index, statement) in statements.iter().enumerate() {
        debug!(index, "Executing {}", preview(statement));
        match run_one(conn, statement).await {
            Ok(lines) => {
                for line in lines {
                    writeln!(out, "{}", serde_json::to_string(&line)?)?;
                }
                report.executed += 1;
            }
            Err(e) => {
                warn!("Statement failed, skipping: {} ({})", preview(statement), e);
                report
                    .failed
                    .push(UnitFailure::new(preview(statement), &e));
            }
        }
    }
    Ok(report)
}

async fn run_one<C: ConnectionTrait>(conn: &C, statement: &str) -> Result<Vec<JsonValue>> {
    let backend = conn.get_database_backend();
    if returns_rows(statement) {
        let rows = JsonValue::find_by_statement(Statement::from_string(backend, statement))
            .all(conn)
            .await?;
        Ok(rows)
    } else {
        let result = conn
            .execute(Statement::from_string(backend, statement))
            .await?;
        Ok(vec![json!({ "rows_affected": result.rows_affected() })])
    }
}
