//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::{Context, Result};
use serde::Serialize;

use formulary_core::{Entry, Presentation, Unit};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// An entry together with the unit that holds it
pub struct Located<'a> {
    pub unit: &'a Unit,
    pub entry: &'a Entry,
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print the unit list with entry counts
    pub fn print_units(&self, units: &[Unit]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if units.is_empty() {
                    println!("No units.");
                    return Ok(());
                }
                for (index, unit) in units.iter().enumerate() {
                    println!(
                        "{:>3}. {} | {} ({})",
                        index + 1,
                        unit.id,
                        truncate(&unit.name, 40),
                        unit.entries.len()
                    );
                }
                println!("\n{} unit(s)", units.len());
            }
            OutputFormat::Json => {
                let summary: Vec<_> = units
                    .iter()
                    .map(|u| {
                        serde_json::json!({
                            "id": u.id,
                            "name": u.name,
                            "entries": u.entries.len()
                        })
                    })
                    .collect();
                print_json(&summary)?;
            }
            OutputFormat::Quiet => {
                for unit in units {
                    println!("{}", unit.id);
                }
            }
        }
        Ok(())
    }

    /// Print a list of entries
    pub fn print_entries(&self, entries: &[Located<'_>]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return Ok(());
                }
                for (index, item) in entries.iter().enumerate() {
                    println!(
                        "{:>3}. {} | {:<6} | {} | {}",
                        index + 1,
                        item.entry.id,
                        item.entry.kind.as_str(),
                        truncate(&item.entry.title, 35),
                        truncate(&item.unit.name, 20)
                    );
                }
                println!("\n{} entr{}", entries.len(), plural_y(entries.len()));
            }
            OutputFormat::Json => {
                let list = entries
                    .iter()
                    .map(|item| entry_json(item.unit, item.entry))
                    .collect::<Result<Vec<_>>>()?;
                print_json(&list)?;
            }
            OutputFormat::Quiet => {
                for item in entries {
                    println!("{}", item.entry.id);
                }
            }
        }
        Ok(())
    }

    /// Print a single entry and how it would be displayed
    pub fn print_entry(&self, item: &Located<'_>, presentation: &Presentation) -> Result<()> {
        let entry = item.entry;
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", entry.id);
                println!("Title:    {}", entry.title);
                println!("Type:     {}", entry.kind);
                println!("Unit:     {} ({})", item.unit.name, item.unit.id);
                if let Some(ref graph) = entry.desmos_id {
                    println!("Desmos:   {}", graph);
                }
                if let Some(partner) = entry.linked_with() {
                    println!("Linked:   {}", partner);
                }
                println!("Created:  {}", entry.created_at.format("%Y-%m-%d %H:%M"));
                if !entry.raw.is_empty() {
                    println!();
                    println!("{}", entry.raw);
                }
                if let Some(children) = entry.children() {
                    println!();
                    println!("── Contains ──");
                    for child in children.iter() {
                        println!(
                            "{} | {} | {}",
                            child.kind,
                            child.title,
                            truncate_line(child_content(child), 50)
                        );
                    }
                }
                println!();
                println!("── Display ──");
                print_presentation(presentation, 0);
            }
            OutputFormat::Json => {
                let mut value = entry_json(item.unit, entry)?;
                value["presentation"] = serde_json::to_value(presentation)
                    .context("Failed to serialize presentation")?;
                print_json(&value)?;
            }
            OutputFormat::Quiet => {
                println!("{}", entry.id);
            }
        }
        Ok(())
    }

    /// Report a newly created item
    ///
    /// Quiet mode prints just the id so scripts can capture it.
    pub fn created(&self, id: &str, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "id": id, "message": message})
                );
            }
            OutputFormat::Quiet => println!("{}", id),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

/// Stored entry form plus the owning unit
fn entry_json(unit: &Unit, entry: &Entry) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(entry).context("Failed to serialize entry")?;
    value["unitId"] = serde_json::Value::String(unit.id.clone());
    Ok(value)
}

fn print_presentation(presentation: &Presentation, depth: usize) {
    let indent = "  ".repeat(depth);
    match presentation {
        Presentation::Empty => println!("{}(nothing to display)", indent),
        Presentation::Math { source } => println!("{}{}", indent, source),
        Presentation::Graph { embed_url, .. } => println!("{}{}", indent, embed_url),
        Presentation::Composite { panes } => {
            for (index, pane) in panes.iter().enumerate() {
                println!("{}[{}]", indent, index + 1);
                print_presentation(pane, depth + 1);
            }
        }
    }
}

fn child_content(child: &Entry) -> &str {
    match child.desmos_id.as_deref() {
        Some(graph) if child.raw.is_empty() => graph,
        _ => &child.raw,
    }
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formulary_core::NewEntry;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Counts characters, not bytes
        assert_eq!(truncate("αβγδεζηθικλ", 6), "αβγ...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(
            truncate_line("very long single line here", 10),
            "very lo..."
        );
    }

    #[test]
    fn test_entry_json_includes_unit() {
        let unit = Unit::with_id("u-1", "Algebra");
        let entry = Entry::new("f-1", NewEntry::latex("Quadratic", "x^2"));

        let value = entry_json(&unit, &entry).unwrap();
        assert_eq!(value["unitId"], "u-1");
        assert_eq!(value["type"], "latex");
        assert_eq!(value["raw"], "x^2");
    }

    #[test]
    fn test_child_content() {
        let graph = Entry::new("f-1", NewEntry::desmos("G", "abc"));
        assert_eq!(child_content(&graph), "abc");

        let formula = Entry::new("f-2", NewEntry::latex("F", "x+1"));
        assert_eq!(child_content(&formula), "x+1");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural_y(1), "y");
        assert_eq!(plural_y(3), "ies");
    }
}
