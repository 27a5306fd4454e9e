//! Markdown and CSV export of a roster.
//!
//! Rendering is pure; delivering the file is up to an [`ExportSink`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use rolematch_types::{Roster, StakeholderId};
use thiserror::Error;

use crate::constants::EXPORT_BASENAME;

const UNASSIGNED_MD: &str = "*(Not assigned)*";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Csv => "text/csv",
        }
    }
}

/// A rendered export, ready for a sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub mime_type: &'static str,
    pub contents: String,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Render `roster` in `format`. `generated_at` only affects Markdown.
pub fn export_file<Tz>(roster: &Roster, format: ExportFormat, generated_at: DateTime<Tz>) -> ExportFile
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let contents = match format {
        ExportFormat::Markdown => render_markdown(roster, generated_at),
        ExportFormat::Csv => render_csv(roster),
    };
    ExportFile {
        filename: format!("{EXPORT_BASENAME}.{}", format.extension()),
        mime_type: format.mime_type(),
        contents,
    }
}

fn assignee<'a>(roster: &'a Roster, id: Option<StakeholderId>) -> Option<&'a str> {
    roster.assignee_name(id)
}

/// Pipes would split a table cell.
fn md_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

pub fn render_markdown<Tz>(roster: &Roster, generated_at: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::from("# Phase 1: Entangled Trio Role Assignments\n\n");
    let _ = write!(
        out,
        "*Generated: {}*\n\n---\n\n",
        generated_at.format("%-m/%-d/%Y %-I:%M:%S %p")
    );

    for group in &roster.groups {
        let _ = writeln!(out, "## {}", group.name);
        if let Some(subtitle) = &group.subtitle {
            let _ = writeln!(out, "*{subtitle}*");
        }
        out.push('\n');
        out.push_str("| Role Type | Position | Assigned To |\n");
        out.push_str("|-----------|----------|-------------|\n");
        for role in &group.roles {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                role.role_type,
                md_cell(&role.title),
                assignee(roster, role.assignee).map(md_cell).as_deref().unwrap_or(UNASSIGNED_MD),
            );
        }
        out.push('\n');
    }

    if !roster.extra_roles.is_empty() {
        out.push_str("## Additional Roles\n\n");
        out.push_str("| Role | Assigned To |\n");
        out.push_str("|------|-------------|\n");
        for role in &roster.extra_roles {
            let _ = writeln!(
                out,
                "| {} | {} |",
                md_cell(&role.title),
                assignee(roster, role.assignee).map(md_cell).as_deref().unwrap_or(UNASSIGNED_MD),
            );
        }
    }

    let progress = roster.progress();
    let _ = write!(
        out,
        "\n---\n\n**Progress:** {}/{} roles assigned\n",
        progress.filled, progress.total
    );
    out
}

/// Quote a CSV field, doubling embedded quotes.
fn csv_field(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn csv_row(out: &mut String, fields: [&str; 4]) {
    let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

pub fn render_csv(roster: &Roster) -> String {
    let mut out = String::from("Trio,Role Type,Position,Assigned To\n");
    for group in &roster.groups {
        for role in &group.roles {
            let role_type = role.role_type.to_string();
            csv_row(
                &mut out,
                [
                    &group.name,
                    &role_type,
                    &role.title,
                    assignee(roster, role.assignee).unwrap_or(""),
                ],
            );
        }
    }
    for role in &roster.extra_roles {
        csv_row(
            &mut out,
            [
                "Additional",
                "Critical Friend",
                &role.title,
                assignee(roster, role.assignee).unwrap_or(""),
            ],
        );
    }
    out
}

/// Destination for exports.
pub trait ExportSink {
    fn deliver(&self, file: &ExportFile) -> Result<(), ExportError>;
}

/// Writes exports into a directory under their own filename.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file: &ExportFile) -> PathBuf {
        self.dir.join(&file.filename)
    }
}

impl ExportSink for DirectorySink {
    fn deliver(&self, file: &ExportFile) -> Result<(), ExportError> {
        let path = self.path_for(file);
        std::fs::write(&path, &file.contents).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), mime = file.mime_type, "export written");
        Ok(())
    }
}
