use fluxsync::{LocalId, RemoteId};
use serde::{Deserialize, Serialize};

use super::site_scoped_model;
use super::Site;

/// Where the currency symbol goes relative to the amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyPosition {
    #[default]
    Left,
    Right,
    LeftSpace,
    RightSpace,
}

/// Store-wide WooCommerce settings, one row per site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WcSettings {
    pub local_id: LocalId,
    pub local_site_id: LocalId,
    pub currency_code: String,
    pub currency_position: CurrencyPosition,
    pub currency_thousand_separator: String,
    pub currency_decimal_separator: String,
    pub currency_decimal_number: u32,
}

impl Default for WcSettings {
    fn default() -> Self {
        Self {
            local_id: LocalId::default(),
            local_site_id: LocalId::default(),
            currency_code: String::new(),
            currency_position: CurrencyPosition::Left,
            currency_thousand_separator: ",".to_string(),
            currency_decimal_separator: ".".to_string(),
            currency_decimal_number: 2,
        }
    }
}

impl fluxsync::Model for WcSettings {
    fn local_id(&self) -> LocalId {
        self.local_id
    }

    fn set_local_id(&mut self, id: LocalId) {
        self.local_id = id;
    }

    fn remote_id(&self) -> Option<RemoteId> {
        None
    }

    fn local_site_id(&self) -> LocalId {
        self.local_site_id
    }
}

/// A WooCommerce site as listed by the account-wide sites endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WcSimpleSite {
    pub site_id: i64,
    pub url: String,
    pub name: String,
}

impl WcSimpleSite {
    /// Fill in what is known; the site is necessarily a WooCommerce one
    pub fn to_site(&self) -> Site {
        Site {
            has_woocommerce: true,
            ..Site::new(self.site_id, self.url.clone(), self.name.clone())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductAttribute {
    pub name: String,
    pub options: Vec<String>,
}

impl ProductAttribute {
    /// `Small, Medium, Large`
    pub fn comma_separated_options(&self) -> String {
        self.options.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub local_id: LocalId,
    pub local_site_id: LocalId,
    pub remote_product_id: Option<RemoteId>,
    pub name: String,
    pub sku: String,
    pub status: String,
    pub price: String,
    pub regular_price: String,
    pub sale_price: String,
    pub stock_status: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// Image URLs, featured image first
    pub images: Vec<String>,
    pub attributes: Vec<ProductAttribute>,
}

site_scoped_model!(Product, remote_product_id);

impl Product {
    pub fn first_image_url(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductVariation {
    pub local_id: LocalId,
    pub local_site_id: LocalId,
    pub remote_product_id: Option<RemoteId>,
    pub remote_variation_id: Option<RemoteId>,
    pub sku: String,
    pub status: String,
    pub price: String,
    pub stock_status: String,
}

site_scoped_model!(ProductVariation, remote_variation_id);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductReview {
    pub local_id: LocalId,
    pub local_site_id: LocalId,
    pub remote_review_id: Option<RemoteId>,
    pub remote_product_id: Option<RemoteId>,
    pub reviewer: String,
    pub review: String,
    pub rating: u8,
    /// `approved`, `hold`, `spam`, `trash`
    pub status: String,
    pub verified: bool,
}

site_scoped_model!(ProductReview, remote_review_id);
