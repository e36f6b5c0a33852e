// src/services/catalog_filter.rs
//
// Faceted filtering and sorting over a catalog partition. Pure functions, no
// error states: anything the engine does not understand imposes no constraint.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::catalog::{Facet, Product, SortMode};

/// Selected values per facet. Facets with an empty set are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection(BTreeMap<Facet, BTreeSet<String>>);

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, facet: Facet, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.0.entry(facet).or_default().insert(value);
    }

    pub fn remove(&mut self, facet: Facet, value: &str) {
        if let Some(values) = self.0.get_mut(&facet) {
            values.remove(value);
            if values.is_empty() {
                self.0.remove(&facet);
            }
        }
    }

    /// Adds the value if absent, removes it otherwise. Returns whether it is
    /// selected afterwards.
    pub fn toggle(&mut self, facet: Facet, value: &str) -> bool {
        if self.is_selected(facet, value) {
            self.remove(facet, value);
            false
        } else {
            self.insert(facet, value);
            self.is_selected(facet, value)
        }
    }

    pub fn is_selected(&self, facet: Facet, value: &str) -> bool {
        self.0.get(&facet).is_some_and(|values| values.contains(value))
    }

    pub fn selected(&self, facet: Facet) -> Option<&BTreeSet<String>> {
        self.0.get(&facet)
    }

    /// Facets with at least one selected value, in facet order.
    pub fn active(&self) -> impl Iterator<Item = (Facet, &BTreeSet<String>)> {
        self.0.iter().map(|(facet, values)| (*facet, values))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Per-facet union of two selections.
    #[cfg(test)]
    fn merged(&self, other: &FilterSelection) -> FilterSelection {
        let mut merged = self.clone();
        for (facet, values) in other.active() {
            for value in values {
                merged.insert(facet, value.clone());
            }
        }
        merged
    }

    /// Drops every selected value `is_known` rejects.
    pub fn retain_known(&mut self, mut is_known: impl FnMut(Facet, &str) -> bool) {
        for (facet, values) in self.0.iter_mut() {
            values.retain(|value| is_known(*facet, value));
        }
        self.0.retain(|_, values| !values.is_empty());
    }
}

/// AND across facets, OR within a facet's selected values.
pub fn matches(product: &Product, selection: &FilterSelection) -> bool {
    selection.active().all(|(facet, selected)| {
        product
            .facet_values(facet)
            .iter()
            .any(|value| selected.contains(value))
    })
}

pub fn apply_filters<'a, I>(products: I, selection: &FilterSelection) -> Vec<&'a Product>
where
    I: IntoIterator<Item = &'a Product>,
{
    products
        .into_iter()
        .filter(|product| matches(product, selection))
        .collect()
}

/// Stable sort; equal keys fall back to the product id so the result is the
/// same whatever the input order.
pub fn apply_sort<'a>(mut products: Vec<&'a Product>, mode: SortMode) -> Vec<&'a Product> {
    products.sort_by(|a, b| compare_by(a, b, mode).then_with(|| tie_break(a, b)));
    products
}

fn compare_by(a: &Product, b: &Product, mode: SortMode) -> Ordering {
    match mode {
        SortMode::NameAsc => compare_ru(a.name(), b.name()),
        SortMode::PitchAsc => a.pitch_mm().total_cmp(&b.pitch_mm()),
        // "Price on request" goes last in both directions.
        SortMode::PriceAsc => match (a.price_rub(), b.price_rub()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortMode::PriceDesc => match (a.price_rub(), b.price_rub()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

fn tie_break(a: &Product, b: &Product) -> Ordering {
    a.id()
        .cmp(b.id())
        .then_with(|| a.catalog_type().as_str().cmp(b.catalog_type().as_str()))
}

/// Distinct values observed on `facet`, numeric facets in numeric order.
pub fn facet_values<'a, I>(products: I, facet: Facet) -> Vec<String>
where
    I: IntoIterator<Item = &'a Product>,
{
    let distinct: BTreeSet<String> = products
        .into_iter()
        .flat_map(|product| product.facet_values(facet))
        .collect();

    let mut values: Vec<String> = distinct.into_iter().collect();
    if facet.is_numeric() {
        values.sort_by(|a, b| {
            let x = a.parse::<f64>().unwrap_or(f64::MAX);
            let y = b.parse::<f64>().unwrap_or(f64::MAX);
            x.total_cmp(&y).then_with(|| a.cmp(b))
        });
    }
    values
}

// =============================================================================
//  RUSSIAN COLLATION
// =============================================================================

// Primary ordering classes: separators, digits, Cyrillic, Latin, the rest.
fn char_class(c: char) -> u8 {
    match c {
        c if c.is_whitespace() || c.is_ascii_punctuation() => 0,
        c if c.is_numeric() => 1,
        '\u{0400}'..='\u{04FF}' => 2,
        c if c.is_ascii_alphabetic() => 3,
        _ => 4,
    }
}

fn primary_weight(c: char) -> u32 {
    match c {
        // ё sorts right after е
        'ё' => ('е' as u32) * 2 + 1,
        '\u{0400}'..='\u{04FF}' => (c as u32) * 2,
        _ => c as u32,
    }
}

fn collation_key(s: &str) -> Vec<(u8, u32)> {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| (char_class(c), primary_weight(c)))
        .collect()
}

/// Case-insensitive comparison in Russian alphabetical order. Lowercase wins
/// over uppercase on otherwise equal strings.
pub fn compare_ru(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| {
            let case_a: Vec<bool> = a.chars().map(char::is_uppercase).collect();
            let case_b: Vec<bool> = b.chars().map(char::is_uppercase).collect();
            case_a.cmp(&case_b)
        })
        .then_with(|| a.cmp(b))
}
