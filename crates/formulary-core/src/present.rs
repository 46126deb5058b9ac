//! Presentation of entries
//!
//! Turns stored entries into what a front end needs to draw them: display
//! math source, a Desmos embed URL, or an ordered set of panes for composite
//! entries. Nothing here touches the store.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{Composition, Entry, EntryKind};

const DESMOS_CALCULATOR_URL: &str = "https://www.desmos.com/calculator";

static DESMOS_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"calculator/([a-zA-Z0-9]+)").expect("valid desmos url regex"));

/// Delimiters that already put LaTeX into math mode
const MATH_DELIMITERS: [&str; 4] = ["\\[", "$$", "\\(", "$"];

/// How an entry should be displayed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Presentation {
    /// Nothing to show
    Empty,
    /// LaTeX ready for a math renderer, delimiters included
    Math { source: String },
    /// Embedded Desmos calculator
    Graph { graph_id: String, embed_url: String },
    /// Several panes side by side, graphs first
    Composite { panes: Vec<Presentation> },
}

impl Presentation {
    /// Combine panes, moving graphs ahead of everything else
    pub fn composite(panes: impl IntoIterator<Item = Presentation>) -> Self {
        let mut panes: Vec<Presentation> = panes.into_iter().collect();
        panes.sort_by_key(|pane| !pane.is_graph());
        Presentation::Composite { panes }
    }

    pub fn is_graph(&self) -> bool {
        matches!(self, Presentation::Graph { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Presentation::Empty)
    }
}

/// Work out how an entry is displayed
pub fn present(entry: &Entry) -> Presentation {
    if let Composition::Group { children } = &entry.composition {
        return Presentation::composite(children.iter().map(present));
    }

    match entry.kind {
        EntryKind::Desmos => {
            let source = entry
                .desmos_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or(entry.raw.as_str());
            graph(source)
        }
        EntryKind::Latex => math(&entry.raw),
        EntryKind::Group => Presentation::Empty,
    }
}

/// Present a legacy linked pair as one composite
pub fn present_linked(entry: &Entry, partner: &Entry) -> Presentation {
    Presentation::composite([present(entry), present(partner)])
}

/// Reduce a Desmos calculator URL to its graph id
///
/// Input that isn't a calculator URL is returned trimmed.
pub fn desmos_graph_id(input: &str) -> String {
    let trimmed = input.trim();
    match DESMOS_URL_RE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(id) => id.as_str().to_string(),
        None => trimmed.to_string(),
    }
}

/// Embeddable calculator URL for a graph id
pub fn embed_url(graph_id: &str) -> String {
    format!("{}/{}?embed", DESMOS_CALCULATOR_URL, graph_id)
}

/// Wrap LaTeX in display delimiters unless it already has some
pub fn display_math(source: &str) -> String {
    let trimmed = source.trim();
    if MATH_DELIMITERS.iter().any(|d| trimmed.starts_with(d)) {
        trimmed.to_string()
    } else {
        format!("\\[ {} \\]", trimmed)
    }
}

fn math(raw: &str) -> Presentation {
    if raw.trim().is_empty() {
        return Presentation::Empty;
    }
    Presentation::Math {
        source: display_math(raw),
    }
}

fn graph(input: &str) -> Presentation {
    let graph_id = desmos_graph_id(input);
    if graph_id.is_empty() {
        return Presentation::Empty;
    }
    Presentation::Graph {
        embed_url: embed_url(&graph_id),
        graph_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEntry;

    #[test]
    fn test_desmos_graph_id() {
        assert_eq!(desmos_graph_id("abc123"), "abc123");
        assert_eq!(desmos_graph_id("  abc123 \n"), "abc123");
        assert_eq!(
            desmos_graph_id("https://www.desmos.com/calculator/x7yz9abc"),
            "x7yz9abc"
        );
        assert_eq!(
            desmos_graph_id("https://www.desmos.com/calculator/x7yz9abc?lang=en"),
            "x7yz9abc"
        );
        assert_eq!(desmos_graph_id(""), "");
    }

    #[test]
    fn test_display_math() {
        assert_eq!(display_math("x^2"), "\\[ x^2 \\]");
        assert_eq!(display_math("  x^2  "), "\\[ x^2 \\]");
        assert_eq!(display_math("\\[x^2\\]"), "\\[x^2\\]");
        assert_eq!(display_math("$$x$$"), "$$x$$");
        assert_eq!(display_math("\\(x\\)"), "\\(x\\)");
        assert_eq!(display_math("$x$"), "$x$");
    }

    #[test]
    fn test_present_latex() {
        let entry = Entry::new("f-1", NewEntry::latex("Area", "\\pi r^2"));
        assert_eq!(
            present(&entry),
            Presentation::Math {
                source: "\\[ \\pi r^2 \\]".to_string()
            }
        );

        let blank = Entry::new("f-2", NewEntry::latex("Blank", "   "));
        assert!(present(&blank).is_empty());
    }

    #[test]
    fn test_present_graph() {
        let entry = Entry::new(
            "f-1",
            NewEntry::desmos("Sine", "https://www.desmos.com/calculator/abc123"),
        );
        assert_eq!(
            present(&entry),
            Presentation::Graph {
                graph_id: "abc123".to_string(),
                embed_url: "https://www.desmos.com/calculator/abc123?embed".to_string(),
            }
        );
    }

    #[test]
    fn test_present_graph_falls_back_to_raw() {
        let mut entry = Entry::new("f-1", NewEntry::latex("Old graph", "def456"));
        entry.kind = EntryKind::Desmos;
        assert!(present(&entry).is_graph());

        entry.raw = String::new();
        assert!(present(&entry).is_empty());
    }

    #[test]
    fn test_present_group_orders_graphs_first() {
        let formula = Entry::new("f-1", NewEntry::latex("F", "x"));
        let graph = Entry::new("f-2", NewEntry::desmos("G", "g1"));
        let group = Entry::group("f-3", &formula, &graph);

        let Presentation::Composite { panes } = present(&group) else {
            panic!("expected composite");
        };
        assert_eq!(panes.len(), 2);
        assert!(panes[0].is_graph());
        assert!(matches!(panes[1], Presentation::Math { .. }));
    }

    #[test]
    fn test_composite_is_stable() {
        let panes = vec![
            Presentation::Math { source: "a".into() },
            Presentation::Empty,
            Presentation::Math { source: "b".into() },
        ];
        assert_eq!(
            Presentation::composite(panes.clone()),
            Presentation::Composite { panes }
        );
    }

    #[test]
    fn test_present_linked() {
        let formula = Entry::new("f-1", NewEntry::latex("F", "x"));
        let graph = Entry::new("f-2", NewEntry::desmos("G", "g1"));

        let Presentation::Composite { panes } = present_linked(&formula, &graph) else {
            panic!("expected composite");
        };
        assert!(panes[0].is_graph());
    }

    #[test]
    fn test_presentation_json_shape() {
        let value = serde_json::to_value(Presentation::Math { source: "x".into() }).unwrap();
        assert_eq!(value["kind"], "math");
        assert_eq!(value["source"], "x");
    }
}
