// src/services/catalog_service.rs

use std::{collections::HashSet, path::Path, sync::Arc};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    models::catalog::{
        CatalogCollection, CatalogItemView, CatalogType, CatalogView, Facet, FacetValueView,
        FacetView, PartitionView, Product, SortMode, SortOptionView,
    },
    services::{
        catalog_filter::{apply_filters, apply_sort, facet_values},
        query_state::{CatalogQuery, HISTORY_MODE},
    },
};

const EMBEDDED_CATALOG: &str = include_str!("../../data/catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate product id '{id}' in {partition}")]
    DuplicateId { partition: &'static str, id: String },

    #[error("product '{id}' has a non-positive pitch")]
    InvalidPitch { id: String },
}

/// Read-only catalog, loaded once at startup and shared by every request.
#[derive(Clone)]
pub struct CatalogService {
    modules: Arc<Vec<Product>>,
    displays: Arc<Vec<Product>>,
}

impl CatalogService {
    pub fn from_collection(collection: CatalogCollection) -> Result<Self, CatalogError> {
        let modules: Vec<Product> = collection.modules.into_iter().map(Product::Module).collect();
        let displays: Vec<Product> = collection.displays.into_iter().map(Product::Display).collect();

        validate_partition(CatalogType::Modules, &modules)?;
        validate_partition(CatalogType::Displays, &displays)?;

        Ok(Self {
            modules: Arc::new(modules),
            displays: Arc::new(displays),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let collection: CatalogCollection = serde_json::from_str(json)?;
        Self::from_collection(collection)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The catalog shipped with the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn partition(&self, catalog_type: CatalogType) -> &[Product] {
        match catalog_type {
            CatalogType::Modules => &self.modules,
            CatalogType::Displays => &self.displays,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Product> {
        self.modules
            .iter()
            .chain(self.displays.iter())
            .find(|product| product.id() == id)
    }

    /// Builds the catalog page state for a (possibly hand-written) query.
    pub fn view(&self, mut query: CatalogQuery) -> CatalogView {
        let products = self.partition(query.catalog_type);
        query.sanitize(products);

        let filtered = apply_sort(apply_filters(products, &query.selection), query.sort);
        tracing::debug!(
            catalog_type = query.catalog_type.as_str(),
            total = filtered.len(),
            "catalog view built"
        );

        let facets = Facet::ALL
            .into_iter()
            .filter_map(|facet| {
                let values = facet_values(products, facet);
                if values.is_empty() {
                    return None;
                }

                let values = values
                    .into_iter()
                    .map(|value| FacetValueView {
                        label: facet.value_label(&value),
                        selected: query.selection.is_selected(facet, &value),
                        count: products
                            .iter()
                            .filter(|p| p.facet_values(facet).contains(&value))
                            .count(),
                        toggle_query: query.toggled(facet, &value).to_query_string(),
                        value,
                    })
                    .collect();

                Some(FacetView {
                    facet,
                    key: facet.key().to_string(),
                    title: facet.title().to_string(),
                    values,
                })
            })
            .collect();

        let sort_options = SortMode::ALL
            .into_iter()
            .map(|mode| SortOptionView {
                value: mode,
                label: mode.label().to_string(),
                selected: mode == query.sort,
                query: query.with_sort(mode).to_query_string(),
            })
            .collect();

        let partitions = CatalogType::ALL
            .into_iter()
            .map(|catalog_type| PartitionView {
                catalog_type,
                label: catalog_type.label().to_string(),
                selected: catalog_type == query.catalog_type,
                total: self.partition(catalog_type).len(),
                query: query.switched_to(catalog_type).to_query_string(),
            })
            .collect();

        CatalogView {
            catalog_type: query.catalog_type,
            sort: query.sort,
            total: filtered.len(),
            items: filtered.into_iter().map(item_view).collect(),
            facets,
            sort_options,
            partitions,
            query: query.to_query_string(),
            reset_query: query.reset().to_query_string(),
            navigation: HISTORY_MODE.to_string(),
        }
    }
}

fn validate_partition(catalog_type: CatalogType, products: &[Product]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for product in products {
        if !seen.insert(product.id()) {
            return Err(CatalogError::DuplicateId {
                partition: catalog_type.as_str(),
                id: product.id().to_string(),
            });
        }
        if !(product.pitch_mm() > 0.0) {
            return Err(CatalogError::InvalidPitch {
                id: product.id().to_string(),
            });
        }
    }
    Ok(())
}

pub fn item_view(product: &Product) -> CatalogItemView {
    CatalogItemView {
        price_label: format_price(product.price_rub()),
        availability_label: product
            .availability()
            .map(|a| a.label())
            .unwrap_or("Уточняйте")
            .to_string(),
        environment_label: product.environment().label().to_string(),
        tech_label: product.tech_label(),
        product: product.clone(),
    }
}

/// `18900 -> "18 900,00 ₽/шт"` with a non-breaking space as group separator.
pub fn format_price(price: Option<Decimal>) -> String {
    let Some(price) = price else {
        return "Цена по запросу".to_string();
    };

    let fixed = format!("{:.2}", price.round_dp(2));
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('\u{a0}');
        }
        grouped.push(digit);
    }

    format!("{sign}{grouped},{frac_part} ₽/шт")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_loads() {
        let catalog = CatalogService::embedded().unwrap();
        assert!(!catalog.partition(CatalogType::Modules).is_empty());
        assert!(!catalog.partition(CatalogType::Displays).is_empty());
        assert!(catalog.find("display-street-p6").is_some());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"{"modules":[
            {"id":"x","name":"A","environment":"indoor","pitch_mm":2.5},
            {"id":"x","name":"B","environment":"indoor","pitch_mm":4}
        ]}"#;
        assert!(matches!(
            CatalogService::from_json(json),
            Err(CatalogError::DuplicateId { .. })
        ));
    }

    #[test]
    fn same_id_in_both_partitions_is_allowed() {
        let json = r#"{
            "modules":[{"id":"x","name":"A","environment":"indoor","pitch_mm":2.5}],
            "displays":[{"id":"x","name":"B","environment":"outdoor","pitch_mm":6}]
        }"#;
        assert!(CatalogService::from_json(json).is_ok());
    }

    #[test]
    fn non_positive_pitch_is_rejected() {
        let json = r#"{"displays":[{"id":"d","name":"D","environment":"outdoor","pitch_mm":0}]}"#;
        assert!(matches!(
            CatalogService::from_json(json),
            Err(CatalogError::InvalidPitch { .. })
        ));
    }

    #[test]
    fn price_is_formatted_like_the_storefront() {
        assert_eq!(format_price(Some(Decimal::from(18900))), "18\u{a0}900,00 ₽/шт");
        assert_eq!(format_price(Some(Decimal::new(5205, 1))), "520,50 ₽/шт");
        assert_eq!(format_price(Some(Decimal::from(8_900_000))), "8\u{a0}900\u{a0}000,00 ₽/шт");
        assert_eq!(format_price(None), "Цена по запросу");
    }

    #[test]
    fn unknown_selected_values_fail_open() {
        let catalog = CatalogService::embedded().unwrap();
        let all = catalog.view(CatalogQuery::default()).total;
        let view = catalog.view(CatalogQuery::parse("pitch=99"));
        assert_eq!(view.total, all);
        assert_eq!(view.query, "type=modules");
    }

    #[test]
    fn view_exposes_only_partition_facets_and_toggle_links() {
        let catalog = CatalogService::embedded().unwrap();
        let view = catalog.view(CatalogQuery::parse("type=modules&env=indoor"));

        assert!(view.facets.iter().all(|f| f.facet != Facet::PixelType));
        let env = view.facets.iter().find(|f| f.facet == Facet::Environment).unwrap();
        let indoor = env.values.iter().find(|v| v.value == "indoor").unwrap();
        assert!(indoor.selected);
        assert_eq!(indoor.toggle_query, "type=modules");
        assert!(view.items.iter().all(|i| i.product.environment().as_str() == "indoor"));

        let displays = view.partitions.iter().find(|p| p.catalog_type == CatalogType::Displays).unwrap();
        assert_eq!(displays.query, "type=displays");
    }
}
