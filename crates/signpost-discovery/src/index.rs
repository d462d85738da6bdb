// crates/signpost-discovery/src/index.rs
// ============================================================================
// Module: Tool Index
// Description: Immutable queryable index over a validated catalog document.
// Purpose: Provide name, capability, and text lookups in catalog order.
// Dependencies: signpost-core
// ============================================================================

//! ## Overview
//! [`ToolIndex`] is built once per verified catalog document and never
//! patched incrementally: a new catalog produces a wholly new index, so
//! concurrent readers can never observe a half-updated state. Name lookups
//! are O(1); capability and text filters scan in catalog order so results
//! stay deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;

use signpost_core::CatalogDocument;
use signpost_core::ToolName;
use signpost_core::ToolRecord;

// ============================================================================
// SECTION: Index Entry
// ============================================================================

/// Denormalized view of one tool record.
///
/// # Invariants
/// - `capabilities` collapses duplicates; tag matching is case-sensitive.
/// - `haystack` is the lowercased name + description used for text search.
#[derive(Debug, Clone)]
pub struct ToolIndexEntry {
    /// The underlying tool record.
    pub record: ToolRecord,
    /// Parsed capability tag set.
    pub capabilities: BTreeSet<String>,
    /// Lowercased searchable text.
    haystack: String,
}

impl ToolIndexEntry {
    /// Builds an entry from a record.
    fn new(record: ToolRecord) -> Self {
        let capabilities = record
            .execution()
            .map(|mcp| mcp.capabilities.iter().cloned().collect())
            .unwrap_or_default();
        let haystack =
            format!("{} {}", record.name.as_str(), record.description).to_lowercase();
        Self {
            record,
            capabilities,
            haystack,
        }
    }

    /// Returns true when the record carries at least one worked example.
    #[must_use]
    pub fn has_examples(&self) -> bool {
        self.record.execution().is_some_and(|mcp| !mcp.examples.is_empty())
    }
}

// ============================================================================
// SECTION: Tool Index
// ============================================================================

/// Immutable tool index over one catalog document.
///
/// # Invariants
/// - `by_name` maps every entry's name to its position; names are unique
///   because the document passed validation.
/// - Entry order equals catalog publication order.
#[derive(Debug, Clone, Default)]
pub struct ToolIndex {
    /// Entries in catalog order.
    entries: Vec<ToolIndexEntry>,
    /// Name to position map for O(1) lookups.
    by_name: HashMap<ToolName, usize>,
}

impl ToolIndex {
    /// Builds an index from a validated catalog document.
    #[must_use]
    pub fn build(document: &CatalogDocument) -> Self {
        let entries: Vec<ToolIndexEntry> =
            document.tools.iter().cloned().map(ToolIndexEntry::new).collect();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.record.name.clone(), position))
            .collect();
        Self {
            entries,
            by_name,
        }
    }

    /// Number of indexed tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the index holds no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolIndexEntry> {
        self.entries.iter()
    }

    /// Looks up a tool by exact name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&ToolRecord> {
        self.by_name.get(&ToolName::new(name)).map(|&position| &self.entries[position].record)
    }

    /// Looks up the full index entry by exact name.
    #[must_use]
    pub fn entry_by_name(&self, name: &str) -> Option<&ToolIndexEntry> {
        self.by_name.get(&ToolName::new(name)).map(|&position| &self.entries[position])
    }

    /// Filters tools carrying a capability tag, in catalog order.
    ///
    /// Tag matching is case-sensitive equality.
    #[must_use]
    pub fn find_by_capability(&self, tag: &str) -> Vec<&ToolRecord> {
        self.entries
            .iter()
            .filter(|entry| entry.capabilities.contains(tag))
            .map(|entry| &entry.record)
            .collect()
    }

    /// Filters tools whose name or description contains the query,
    /// case-insensitively, in catalog order.
    #[must_use]
    pub fn find_by_text(&self, query: &str) -> Vec<&ToolRecord> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.haystack.contains(&needle))
            .map(|entry| &entry.record)
            .collect()
    }

    /// Filters tools that publish worked examples, in catalog order.
    #[must_use]
    pub fn find_with_examples(&self) -> Vec<&ToolRecord> {
        self.entries
            .iter()
            .filter(|entry| entry.has_examples())
            .map(|entry| &entry.record)
            .collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
