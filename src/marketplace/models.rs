//! Marketplace API payloads and the storefront `Product`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Etsy prices are integer amounts over a divisor (`1850 / 100` = 18.50)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub amount: i64,
    pub divisor: i64,
    pub currency_code: String,
}

impl Price {
    pub fn value(&self) -> f64 {
        if self.divisor == 0 {
            return self.amount as f64;
        }
        self.amount as f64 / self.divisor as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingImage {
    #[serde(default, rename = "url_570xN")]
    pub url_570x_n: Option<String>,
    #[serde(default)]
    pub url_fullxfull: Option<String>,
}

/// An active shop listing; only the fields the storefront reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: String,
    /// Seconds since the epoch
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub num_favorers: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    pub price: Price,
    #[serde(default)]
    pub taxonomy_id: Option<i64>,
    #[serde(default)]
    pub images: Option<Vec<ListingImage>>,
}

/// Paged result envelope used by every collection endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsPage<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    pub shop_id: i64,
    pub shop_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub announcement: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub is_vacation: bool,
    #[serde(default)]
    pub listing_active_count: i64,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// A buyer-taxonomy node together with its breadcrumb from the root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyInfo {
    pub node: TaxonomyNode,
    pub path: Vec<TaxonomyNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingProperty {
    pub property_id: i64,
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

/// The four fixed storefront categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Rings,
    Necklaces,
    Earrings,
    Bracelets,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Rings => "rings",
            Category::Necklaces => "necklaces",
            Category::Earrings => "earrings",
            Category::Bracelets => "bracelets",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storefront product derived from a listing. Never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub image: String,
    pub images: Vec<String>,
    pub category: Category,
    pub description: String,
    pub is_new: bool,
    pub is_bestseller: bool,
    pub in_stock: bool,
    pub quantity: i64,
    #[serde(rename = "etsyUrl")]
    pub marketplace_url: String,
    #[serde(rename = "etsyListingId")]
    pub listing_id: i64,
    pub tags: Vec<String>,
}
