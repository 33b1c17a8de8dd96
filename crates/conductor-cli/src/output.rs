//! Output styles shared by listing commands.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns for humans
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML document
    Yaml,
}

/// Render `value` as JSON or YAML. Returns `None` for [`OutputFormat::Table`],
/// which callers render themselves.
pub fn render_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<Option<String>> {
    match format {
        OutputFormat::Table => Ok(None),
        OutputFormat::Json => Ok(Some(serde_json::to_string_pretty(value)?)),
        OutputFormat::Yaml => Ok(Some(serde_yaml::to_string(value)?.trim_end().to_string())),
    }
}

/// Left-aligned columns separated by two spaces.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: Vec<&str>| {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ");
        line.trim_end().to_string()
    };

    let mut lines = vec![format_row(headers.to_vec())];
    for row in rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_columns_align() {
        let table = render_table(
            &["NAME", "TYPE"],
            &[
                vec!["github-prod".into(), "github".into()],
                vec!["s3".into(), "aws".into()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "NAME         TYPE");
        assert_eq!(lines[1], "github-prod  github");
        assert_eq!(lines[2], "s3           aws");
    }

    #[test]
    fn test_table_format_is_left_to_caller() {
        assert!(render_structured(&vec![1, 2], OutputFormat::Table)
            .unwrap()
            .is_none());
        assert_eq!(
            render_structured(&vec![1, 2], OutputFormat::Yaml).unwrap().unwrap(),
            "- 1\n- 2"
        );
    }
}
