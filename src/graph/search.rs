//! Label search over a graph's nodes.
//!
//! Matching is case-insensitive in both modes. An empty (or all-whitespace)
//! query matches nothing.

use std::collections::BTreeSet;

use regex::RegexBuilder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::model::Graph;

/// How a query is matched against node labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Substring,
    Regex,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Substring => "substring",
            Self::Regex => "regex",
        }
    }

    /// Parse a mode name; anything unrecognised is a substring search.
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "regex" | "re" => Self::Regex,
            _ => Self::Substring,
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ids of nodes whose label matches `query`, in graph order.
///
/// Only regex mode can fail, on an invalid pattern.
pub fn search(graph: &Graph, query: &str, mode: SearchMode) -> Result<Vec<String>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let hits: Vec<String> = match mode {
        SearchMode::Substring => {
            let needle = query.to_lowercase();
            graph
                .nodes()
                .iter()
                .filter(|n| n.label.to_lowercase().contains(&needle))
                .map(|n| n.id.clone())
                .collect()
        }
        SearchMode::Regex => {
            let re = RegexBuilder::new(query).case_insensitive(true).build()?;
            graph
                .nodes()
                .iter()
                .filter(|n| re.is_match(&n.label))
                .map(|n| n.id.clone())
                .collect()
        }
    };

    tracing::debug!(query, mode = %mode, hits = hits.len(), "label search");
    Ok(hits)
}

/// [`search`] collected into a highlight set.
pub fn search_set(graph: &Graph, query: &str, mode: SearchMode) -> Result<BTreeSet<String>> {
    Ok(search(graph, query, mode)?.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchFlowError;
    use crate::types::{Node, NodeClass, NodeType};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn graph() -> Graph {
        Graph::build(
            ["Retina", "LGN", "V1-simple", "v1-complex", "MT"]
                .iter()
                .map(|l| Node::new(l, "vis", NodeType::Standard, NodeClass::Intermediate)),
            [],
        )
    }

    #[test_case("v1", SearchMode::Substring, &["V1-simple-vis", "v1-complex-vis"] ; "substring ignores case")]
    #[test_case("GN", SearchMode::Substring, &["LGN-vis"] ; "substring inner match")]
    #[test_case("^v1-(simple|complex)$", SearchMode::Regex, &["V1-simple-vis", "v1-complex-vis"] ; "regex ignores case")]
    #[test_case("^m", SearchMode::Regex, &["MT-vis"] ; "regex anchor")]
    #[test_case("cortex", SearchMode::Substring, &[] ; "no match")]
    fn search_cases(query: &str, mode: SearchMode, expected: &[&str]) {
        let hits = search(&graph(), query, mode).unwrap();
        assert_eq!(hits, expected.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "whitespace")]
    fn empty_query_matches_nothing(query: &str) {
        assert!(search(&graph(), query, SearchMode::Substring).unwrap().is_empty());
        assert!(search(&graph(), query, SearchMode::Regex).unwrap().is_empty());
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let err = search(&graph(), "(unclosed", SearchMode::Regex).unwrap_err();
        assert!(matches!(err, ArchFlowError::InvalidPattern(_)));
    }

    #[test_case("regex", SearchMode::Regex ; "regex")]
    #[test_case("RE", SearchMode::Regex ; "short upper")]
    #[test_case("substring", SearchMode::Substring ; "substring")]
    #[test_case("fuzzy", SearchMode::Substring ; "unknown")]
    fn mode_from_str_loose(input: &str, expected: SearchMode) {
        assert_eq!(SearchMode::from_str_loose(input), expected);
    }
}
