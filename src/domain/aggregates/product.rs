//! Product (barang) Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::order::UnknownStatus;
use crate::domain::value_objects::{Rupiah, Slug};

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub price: Rupiah,
    pub stock: u32,
    pub status: ProductStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    #[default]
    #[serde(rename = "Tersedia")]
    Available,
    #[serde(rename = "Habis")]
    SoldOut,
    #[serde(rename = "Disembunyikan")]
    Hidden,
}

impl ProductStatus {
    pub fn label(self) -> &'static str {
        match self { Self::Available => "Tersedia", Self::SoldOut => "Habis", Self::Hidden => "Disembunyikan" }
    }
}

impl FromStr for ProductStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Available, Self::SoldOut, Self::Hidden].into_iter().find(|st| st.label() == s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl Product {
    pub fn create(store_id: Uuid, name: impl Into<String>, description: Option<String>, price: Rupiah, stock: u32) -> Result<Self, ProductError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(ProductError::MissingName); }
        if !price.is_positive() { return Err(ProductError::InvalidPrice); }
        let now = Utc::now();
        let id = Uuid::now_v7();
        // Id suffix: two stores may list the same name.
        let slug = Slug::from_name(&format!("{} {}", name, &id.simple().to_string()[..8]));
        let status = if stock == 0 { ProductStatus::SoldOut } else { ProductStatus::Available };
        Ok(Self { id, store_id, name, slug, description, price, stock, status, is_deleted: false, created_at: now, updated_at: now })
    }

    pub fn is_listed(&self) -> bool { !self.is_deleted && self.status == ProductStatus::Available }

    pub fn update(&mut self, name: Option<String>, description: Option<String>, price: Option<Rupiah>, stock: Option<u32>) -> Result<(), ProductError> {
        if let Some(name) = name {
            let name = name.trim().to_string();
            if name.is_empty() { return Err(ProductError::MissingName); }
            self.name = name;
        }
        if let Some(price) = price {
            if !price.is_positive() { return Err(ProductError::InvalidPrice); }
            self.price = price;
        }
        if description.is_some() { self.description = description; }
        if let Some(stock) = stock { self.set_stock(stock); }
        self.touch();
        Ok(())
    }

    /// Hidden products keep their stock but leave the storefront.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.status = if hidden { ProductStatus::Hidden } else if self.stock == 0 { ProductStatus::SoldOut } else { ProductStatus::Available };
        self.touch();
    }

    pub fn soft_delete(&mut self) { self.is_deleted = true; self.touch(); }

    fn set_stock(&mut self, stock: u32) {
        self.stock = stock;
        if self.status != ProductStatus::Hidden {
            self.status = if stock == 0 { ProductStatus::SoldOut } else { ProductStatus::Available };
        }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingName, InvalidPrice }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Missing name"),
            Self::InvalidPrice => write!(f, "Price must be positive"),
        }
    }
}
