// src/services/query_state.rs
//
// Two-way mapping between catalog state and the page's query string, so a
// filtered view can be shared and survives back/forward navigation.

use url::form_urlencoded;

use crate::models::catalog::{CatalogType, Facet, Product, SortMode};
use crate::services::catalog_filter::{self, FilterSelection};

pub const TYPE_KEY: &str = "type";
pub const SORT_KEY: &str = "sort";

/// Filter tweaks replace the current history entry instead of pushing one.
pub const HISTORY_MODE: &str = "replace";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub catalog_type: CatalogType,
    pub sort: SortMode,
    pub selection: FilterSelection,
}

impl CatalogQuery {
    /// Parses a raw query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        Self::from_pairs(form_urlencoded::parse(query.trim_start_matches('?').as_bytes()))
    }

    /// Unknown keys and unparseable scalar values are ignored; list values
    /// are split on commas with empty tokens dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = CatalogQuery::default();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                TYPE_KEY => {
                    if let Some(catalog_type) = CatalogType::from_param(value) {
                        query.catalog_type = catalog_type;
                    }
                }
                SORT_KEY => {
                    if let Some(sort) = SortMode::from_param(value) {
                        query.sort = sort;
                    }
                }
                other => {
                    let Some(facet) = Facet::from_key(other) else {
                        continue;
                    };
                    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                        query.selection.insert(facet, token);
                    }
                }
            }
        }

        query
    }

    /// Canonical form: `type`, then facets in declaration order with sorted
    /// comma-joined values, then `sort` unless it is the default. Equal states
    /// always produce the same string.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair(TYPE_KEY, self.catalog_type.as_str());

        for facet in Facet::ALL {
            if let Some(values) = self.selection.selected(facet) {
                let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(",");
                serializer.append_pair(facet.key(), &joined);
            }
        }

        if self.sort != SortMode::default() {
            serializer.append_pair(SORT_KEY, self.sort.as_str());
        }

        serializer.finish()
    }

    pub fn toggled(&self, facet: Facet, value: &str) -> Self {
        let mut next = self.clone();
        next.selection.toggle(facet, value);
        next
    }

    pub fn with_sort(&self, sort: SortMode) -> Self {
        Self {
            sort,
            ..self.clone()
        }
    }

    /// Switching partition drops every facet; the partition and sort stay.
    pub fn switched_to(&self, catalog_type: CatalogType) -> Self {
        Self {
            catalog_type,
            sort: self.sort,
            selection: FilterSelection::new(),
        }
    }

    pub fn reset(&self) -> Self {
        self.switched_to(self.catalog_type)
    }

    /// Keeps only values that occur in `products`, which should be the
    /// active partition. A stale or hand-edited link degrades to fewer
    /// constraints instead of an empty page.
    pub fn sanitize(&mut self, products: &[Product]) {
        let available: Vec<(Facet, Vec<String>)> = self
            .selection
            .active()
            .map(|(facet, _)| (facet, catalog_filter::facet_values(products, facet)))
            .collect();

        self.selection.retain_known(|facet, value| {
            available
                .iter()
                .find(|(f, _)| *f == facet)
                .is_some_and(|(_, values)| values.iter().any(|v| v == value))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_order_independent() {
        let mut first = CatalogQuery::default();
        first.selection.insert(Facet::Environment, "outdoor");
        first.selection.insert(Facet::Environment, "indoor");

        let mut second = CatalogQuery::default();
        second.selection.insert(Facet::Environment, "indoor");
        second.selection.insert(Facet::Environment, "outdoor");

        assert_eq!(first.to_query_string(), second.to_query_string());

        let parsed = CatalogQuery::parse(&first.to_query_string());
        assert_eq!(parsed, first);
        let env = parsed.selection.selected(Facet::Environment).unwrap();
        assert_eq!(env.iter().map(String::as_str).collect::<Vec<_>>(), vec!["indoor", "outdoor"]);
    }

    #[test]
    fn values_are_sorted_and_joined_with_commas() {
        let query = CatalogQuery::parse("pitch=4,1.5&env=outdoor&type=modules");
        assert_eq!(query.to_query_string(), "type=modules&env=outdoor&pitch=1.5%2C4");
    }

    #[test]
    fn malformed_and_unknown_parameters_are_ignored() {
        let query = CatalogQuery::parse("?type=gadgets&sort=random&colour=red&pitch=,,2.5,&env=");
        assert_eq!(query.catalog_type, CatalogType::Modules);
        assert_eq!(query.sort, SortMode::NameAsc);
        assert!(query.selection.selected(Facet::Environment).is_none());
        assert_eq!(query.to_query_string(), "type=modules&pitch=2.5");
    }

    #[test]
    fn empty_set_removes_parameter() {
        let query = CatalogQuery::parse("env=indoor");
        let cleared = query.toggled(Facet::Environment, "indoor");
        assert_eq!(cleared.to_query_string(), "type=modules");
    }

    #[test]
    fn partition_switch_resets_facets_but_keeps_sort() {
        let query = CatalogQuery::parse("type=modules&env=indoor&tech=COB&sort=price_desc");
        let switched = query.switched_to(CatalogType::Displays);
        assert_eq!(switched.to_query_string(), "type=displays&sort=price_desc");
    }

    #[test]
    fn default_sort_is_omitted() {
        let query = CatalogQuery::parse("sort=pitch_asc");
        assert_eq!(query.with_sort(SortMode::NameAsc).to_query_string(), "type=modules");
        assert_eq!(query.to_query_string(), "type=modules&sort=pitch_asc");
    }
}
