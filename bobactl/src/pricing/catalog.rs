//! Read-only catalog view used by a single pricing computation.
//!
//! The catalog itself (products, promotions, categories) is owned elsewhere. Pricing only
//! ever sees an immutable [`CatalogSnapshot`] handed out by a [`CatalogSource`], so a cart
//! is priced against one consistent set of products and promotions even if the catalog is
//! edited mid-request.

use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use figment::{
    Figment,
    providers::{Format, Yaml},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A sellable product. Prices are in major currency units (e.g. pounds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: String,
    pub price: Decimal,
}

/// A bundle promotion: every `required_quantity` units of `category`/`size` cost the
/// bundle price listed for that size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    #[serde(default)]
    pub id: String,
    pub category: String,
    pub size: String,
    pub required_quantity: u32,
    /// Bundle price in major units, keyed by size
    #[serde(default)]
    pub prices: BTreeMap<String, Decimal>,
    #[serde(default, alias = "isActive")]
    pub active: bool,
}

/// Immutable view of the catalog for one computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub promotions: Vec<Promotion>,
}

impl CatalogSnapshot {
    pub fn new(products: Vec<Product>, promotions: Vec<Promotion>) -> Self {
        Self { products, promotions }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog from {path}: {message}")]
    Unavailable { path: String, message: String },

    #[error("Catalog is malformed: {0}")]
    Malformed(String),
}

/// Supplies the current catalog snapshot.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError>;
}

/// A fixed catalog, mostly useful for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog(pub CatalogSnapshot);

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        Ok(self.0.clone())
    }
}

/// Catalog backed by a YAML file, re-read for every computation so edits are picked up
/// without a restart.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalog {
    async fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| CatalogError::Unavailable {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        Figment::from(Yaml::string(&contents))
            .extract()
            .map_err(|e| CatalogError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const CATALOG_YAML: &str = r#"
products:
  - id: A
    name: Brown sugar milk tea
    category: tea
    price: 3.50
  - id: B
    category: smoothie
    price: "4.25"
promotions:
  - id: tea-pair
    category: tea
    size: reg
    requiredQuantity: 2
    prices:
      reg: 6.00
    active: true
  - category: smoothie
    size: large
    requiredQuantity: 3
    prices:
      large: 10
"#;

    #[tokio::test]
    async fn test_file_catalog_reads_yaml() {
        let path = std::env::temp_dir().join(format!("bobactl-catalog-{}.yaml", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, CATALOG_YAML).await.unwrap();

        let snapshot = FileCatalog::new(&path).snapshot().await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(snapshot.products.len(), 2);
        assert_eq!(snapshot.products[0].price, Decimal::from_str("3.5").unwrap());
        assert_eq!(snapshot.products[1].name, "");
        assert_eq!(snapshot.products[1].price, Decimal::from_str("4.25").unwrap());

        let pair = &snapshot.promotions[0];
        assert_eq!(pair.required_quantity, 2);
        assert!(pair.active);
        assert_eq!(pair.prices.get("reg"), Some(&Decimal::from(6)));

        // Promotions default to inactive
        assert!(!snapshot.promotions[1].active);
    }

    #[tokio::test]
    async fn test_file_catalog_missing_file() {
        let result = FileCatalog::new("/definitely/not/here.yaml").snapshot().await;
        assert!(matches!(result, Err(CatalogError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_static_catalog_returns_snapshot() {
        let snapshot = CatalogSnapshot::new(
            vec![Product {
                id: "A".to_string(),
                name: "Taro".to_string(),
                category: "tea".to_string(),
                price: Decimal::new(350, 2),
            }],
            vec![],
        );

        let source = StaticCatalog(snapshot.clone());
        assert_eq!(source.snapshot().await.unwrap(), snapshot);
    }
}
