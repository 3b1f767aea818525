//! Query-scoped filter options: field projection, sort order, paging.
//!
//! [`FieldSelection`] makes the include/exclude duality explicit: a
//! request carries at most one of the two sets, and supplying both raw
//! parameters is a validation error before any query runs. Names are
//! accepted in snake_case and normalized to camelCase attribute names.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::CoreError;
use crate::fields::snake_to_camel;

/// Page size used when `page` is supplied without `perPage`.
pub const DEFAULT_PER_PAGE: i64 = 20;

// ---------------------------------------------------------------------------
// FieldSelection
// ---------------------------------------------------------------------------

/// Resolved projection over a document's top-level fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelection {
    /// No projection: the full document is returned.
    #[default]
    Unset,
    /// Only the named fields are returned.
    Include(BTreeSet<String>),
    /// All fields except the named ones are returned.
    Exclude(BTreeSet<String>),
}

impl FieldSelection {
    /// Resolve raw `include`/`exclude` query parameters.
    ///
    /// Both supplied at once is a [`CoreError::Validation`]. Field names
    /// are comma-separated snake_case and normalized via
    /// [`snake_to_camel`]; a parameter that parses to an empty set (for
    /// example the empty string) resolves to [`FieldSelection::Unset`].
    pub fn from_params(
        include: Option<&str>,
        exclude: Option<&str>,
    ) -> Result<Self, CoreError> {
        if include.is_some() && exclude.is_some() {
            return Err(CoreError::Validation(
                "cannot provide both include and exclude parameters".to_string(),
            ));
        }

        if let Some(raw) = include {
            let set = parse_field_list(raw);
            return Ok(if set.is_empty() {
                FieldSelection::Unset
            } else {
                FieldSelection::Include(set)
            });
        }

        if let Some(raw) = exclude {
            let set = parse_field_list(raw);
            return Ok(if set.is_empty() {
                FieldSelection::Unset
            } else {
                FieldSelection::Exclude(set)
            });
        }

        Ok(FieldSelection::Unset)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, FieldSelection::Unset)
    }

    /// Apply the projection to a serialized document in place.
    ///
    /// Operates on the top-level keys of a JSON object; non-object values
    /// are left untouched.
    pub fn apply(&self, document: &mut Value) {
        let Value::Object(map) = document else {
            return;
        };

        match self {
            FieldSelection::Unset => {}
            FieldSelection::Include(fields) => {
                map.retain(|key, _| fields.contains(key));
            }
            FieldSelection::Exclude(fields) => {
                map.retain(|key, _| !fields.contains(key));
            }
        }
    }
}

fn parse_field_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(snake_to_camel)
        .collect()
}

// ---------------------------------------------------------------------------
// Sort order
// ---------------------------------------------------------------------------

/// List sort direction. Ascending only when the caller explicitly asks
/// for `ASC` (case-insensitive); everything else means descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.eq_ignore_ascii_case("ASC") => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }

    pub fn is_ascending(self) -> bool {
        matches!(self, SortOrder::Ascending)
    }
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

/// Raw list controls as they arrive from the caller.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub suggestion: Option<String>,
    pub sort_order: SortOrder,
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Resolved skip/take window. `page` wins over `limit` when both are
/// supplied; neither means the result set is unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageWindow {
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

impl ListOptions {
    pub fn window(&self) -> PageWindow {
        if let Some(page) = self.page {
            let page = page.max(1);
            let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).max(0);
            return PageWindow {
                skip: Some(per_page * (page - 1)),
                take: Some(per_page),
            };
        }

        if let Some(limit) = self.limit {
            return PageWindow {
                skip: None,
                take: Some(limit.max(0)),
            };
        }

        PageWindow::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn both_include_and_exclude_is_a_validation_error() {
        let result = FieldSelection::from_params(Some("uuid"), Some("launch"));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn include_names_are_normalized() {
        let selection =
            FieldSelection::from_params(Some("value,another_value"), None).unwrap();
        let expected: BTreeSet<String> =
            ["value".to_string(), "anotherValue".to_string()].into();
        assert_eq!(selection, FieldSelection::Include(expected));
    }

    #[test]
    fn exclude_names_are_normalized() {
        let selection =
            FieldSelection::from_params(None, Some("customer_name")).unwrap();
        let expected: BTreeSet<String> = ["customerName".to_string()].into();
        assert_eq!(selection, FieldSelection::Exclude(expected));
    }

    #[test]
    fn empty_lists_resolve_to_unset() {
        assert!(FieldSelection::from_params(Some(""), None).unwrap().is_unset());
        assert!(FieldSelection::from_params(None, Some(" , ")).unwrap().is_unset());
        assert!(FieldSelection::from_params(None, None).unwrap().is_unset());
    }

    #[test]
    fn include_projection_keeps_only_named_fields() {
        let selection = FieldSelection::from_params(Some("uuid,customer_name"), None).unwrap();
        let mut doc = json!({"uuid": "u", "customerName": "c", "projectName": "p"});
        selection.apply(&mut doc);
        assert_eq!(doc, json!({"uuid": "u", "customerName": "c"}));
    }

    #[test]
    fn exclude_projection_drops_named_fields() {
        let selection = FieldSelection::from_params(None, Some("commits,status")).unwrap();
        let mut doc = json!({"uuid": "u", "commits": [], "status": {}, "launch": null});
        selection.apply(&mut doc);
        assert_eq!(doc, json!({"uuid": "u", "launch": null}));
    }

    #[test]
    fn unset_projection_leaves_document_alone() {
        let mut doc = json!({"uuid": "u", "commits": []});
        FieldSelection::Unset.apply(&mut doc);
        assert_eq!(doc, json!({"uuid": "u", "commits": []}));
    }

    #[test]
    fn sort_order_ascending_only_on_explicit_asc() {
        assert_eq!(SortOrder::parse(Some("ASC")), SortOrder::Ascending);
        assert_eq!(SortOrder::parse(Some("asc")), SortOrder::Ascending);
        assert_eq!(SortOrder::parse(Some("DESC")), SortOrder::Descending);
        assert_eq!(SortOrder::parse(Some("sideways")), SortOrder::Descending);
        assert_eq!(SortOrder::parse(None), SortOrder::Descending);
    }

    #[test]
    fn page_wins_over_limit() {
        let options = ListOptions {
            page: Some(3),
            per_page: Some(10),
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(
            options.window(),
            PageWindow { skip: Some(20), take: Some(10) }
        );
    }

    #[test]
    fn page_uses_default_per_page() {
        let options = ListOptions { page: Some(2), ..Default::default() };
        assert_eq!(
            options.window(),
            PageWindow { skip: Some(20), take: Some(20) }
        );
    }

    #[test]
    fn limit_alone_sets_take_without_skip() {
        let options = ListOptions { limit: Some(7), ..Default::default() };
        assert_eq!(options.window(), PageWindow { skip: None, take: Some(7) });
    }

    #[test]
    fn no_paging_is_unrestricted() {
        assert_eq!(ListOptions::default().window(), PageWindow::default());
    }
}
