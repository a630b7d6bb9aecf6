//! The set of metadata fields a caller wants from a query.

use std::collections::HashSet;

use crate::metadata::catalog::{FieldCatalog, FieldDescriptor};

/// Requested field names plus the order results should display in.
///
/// Requests have set semantics: asking for the same field twice changes
/// nothing. The display order records the first time each name was
/// requested, making result iteration deterministic. The all-fields
/// override expands to every field the catalog knows while preserving the
/// explicit set for introspection.
#[derive(Debug, Clone, Default)]
pub struct FieldSelection {
    requested: HashSet<String>,
    order: Vec<String>,
    all_fields: bool,
}

impl FieldSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the requested set, the display order, and the all-fields flag.
    pub fn clear(&mut self) {
        self.requested.clear();
        self.order.clear();
        self.all_fields = false;
    }

    /// Add field names to the selection.
    ///
    /// The first occurrence of each name is appended to the display order;
    /// duplicates are no-ops.
    pub fn request<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if self.requested.insert(name.clone()) {
                self.order.push(name);
            }
        }
    }

    /// Request every field the catalog knows.
    ///
    /// The explicit set is preserved for introspection but ignored when the
    /// effective field list is resolved.
    pub fn request_all(&mut self) {
        self.all_fields = true;
    }

    /// Whether the all-fields override is set.
    pub fn is_all_fields(&self) -> bool {
        self.all_fields
    }

    /// The explicitly requested names (unordered).
    pub fn requested(&self) -> &HashSet<String> {
        &self.requested
    }

    /// First-requested-wins display order. Never contains duplicates and is
    /// never longer than the number of distinct names ever requested.
    pub fn display_order(&self) -> &[String] {
        &self.order
    }

    /// Whether nothing has been requested and the override is unset.
    pub fn is_empty(&self) -> bool {
        !self.all_fields && self.requested.is_empty()
    }

    /// Resolve the effective field list against a catalog.
    ///
    /// Explicit requests come back in display order with unknown names
    /// silently dropped; under the all-fields override the catalog's full
    /// list is returned in catalog order.
    pub fn effective(&self, catalog: &FieldCatalog) -> Vec<&'static FieldDescriptor> {
        if self.all_fields {
            catalog.all_fields().collect()
        } else {
            self.order
                .iter()
                .filter_map(|name| catalog.classify(name))
                .collect()
        }
    }
}
