use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Shown wherever a category or product has no picture of its own.
pub const FALLBACK_IMAGE_URL: &str = "https://cdn1.ozone.ru/s3/multimedia-0/6073071648.jpg";

/// Products per page on category listings.
pub const CATEGORY_PAGE_SIZE: i64 = 2;

/// Upper bound on the number of "you may also like" products on a detail page.
pub const RELATED_PRODUCTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    pub slug: String,
    pub parent_id: Option<Uuid>,
}

impl Category {
    pub fn image(&self) -> &str {
        self.image_url.as_deref().unwrap_or(FALLBACK_IMAGE_URL)
    }
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub image_url: Option<String>,
    pub slug: String,
    pub parent_id: Option<Uuid>,
}

/// A root category together with its direct children.
#[derive(Debug, Clone)]
pub struct CategoryTree {
    pub category: Category,
    pub subcategories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub description: String,
    pub category_id: Uuid,
    pub slug: String,
    pub size: f64,
    pub color: String,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub description: String,
    pub category_id: Uuid,
    pub slug: String,
    pub size: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Orderings offered on category pages, keyed by their query-string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    ColorAsc,
    ColorDesc,
    SizeAsc,
    SizeDesc,
    TitleAsc,
    TitleDesc,
}

impl ProductSort {
    pub const ALL: [ProductSort; 8] = [
        ProductSort::PriceAsc,
        ProductSort::PriceDesc,
        ProductSort::ColorAsc,
        ProductSort::ColorDesc,
        ProductSort::SizeAsc,
        ProductSort::SizeDesc,
        ProductSort::TitleAsc,
        ProductSort::TitleDesc,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_param() == value)
    }

    pub fn as_param(self) -> &'static str {
        match self {
            ProductSort::PriceAsc => "price",
            ProductSort::PriceDesc => "-price",
            ProductSort::ColorAsc => "color",
            ProductSort::ColorDesc => "-color",
            ProductSort::SizeAsc => "size",
            ProductSort::SizeDesc => "-size",
            ProductSort::TitleAsc => "title",
            ProductSort::TitleDesc => "-title",
        }
    }

    /// Compares two products under this ordering; ties fall back to title, then id.
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        let primary = match self {
            ProductSort::PriceAsc => a.price.cmp(&b.price),
            ProductSort::PriceDesc => b.price.cmp(&a.price),
            ProductSort::ColorAsc => a.color.cmp(&b.color),
            ProductSort::ColorDesc => b.color.cmp(&a.color),
            ProductSort::SizeAsc => a.size.total_cmp(&b.size),
            ProductSort::SizeDesc => b.size.total_cmp(&a.size),
            ProductSort::TitleAsc => a.title.cmp(&b.title),
            ProductSort::TitleDesc => b.title.cmp(&a.title),
        };
        primary
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Listing request handed to the catalog repository.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub category_ids: Vec<Uuid>,
    pub sort: Option<ProductSort>,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: i64,
}

/// Slugs are lowercase ASCII letters, digits, `-` and `_`.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 150
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}
