//! Template contexts. Everything a page shows is flattened into plain strings
//! and flags here so the templates stay free of logic.

use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use askama::Template;
use bigdecimal::BigDecimal;

use crate::application::catalog_service::{CategoryListing, ProductDetail};
use crate::domain::account::AuthContext;
use crate::domain::cart::{CartInfo, CartLine};
use crate::domain::catalog::{Category, CategoryTree, Product, ProductSort, Review};
use crate::session::{level_class, Flash};

pub fn format_price(amount: &BigDecimal) -> String {
    amount.with_scale(2).to_string()
}

// ── Shared pieces ────────────────────────────────────────────────────────────

pub struct FlashView {
    pub level: &'static str,
    pub message: String,
}

impl From<&FlashMessage> for FlashView {
    fn from(message: &FlashMessage) -> Self {
        Self {
            level: level_class(message.level()),
            message: message.content().to_string(),
        }
    }
}

impl From<Flash> for FlashView {
    fn from(flash: Flash) -> Self {
        Self {
            level: level_class(flash.level()),
            message: flash.message().to_string(),
        }
    }
}

/// Header data every page carries.
pub struct Chrome {
    pub title: String,
    pub username: Option<String>,
    pub flashes: Vec<FlashView>,
}

impl Chrome {
    pub fn new(
        title: impl Into<String>,
        viewer: Option<&AuthContext>,
        flashes: &IncomingFlashMessages,
    ) -> Self {
        Self {
            title: title.into(),
            username: viewer.map(|ctx| ctx.username.clone()),
            flashes: flashes.iter().map(FlashView::from).collect(),
        }
    }
}

pub struct CategoryLink {
    pub title: String,
    pub slug: String,
    pub image: String,
}

impl From<&Category> for CategoryLink {
    fn from(category: &Category) -> Self {
        Self {
            title: category.title.clone(),
            slug: category.slug.clone(),
            image: category.image().to_string(),
        }
    }
}

pub struct ProductCard {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub price: String,
    pub color: String,
    pub size: String,
    pub in_stock: bool,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            slug: product.slug.clone(),
            price: format_price(&product.price),
            color: product.color.clone(),
            size: product.size.to_string(),
            in_stock: product.in_stock(),
        }
    }
}

fn cards(products: &[Product]) -> Vec<ProductCard> {
    products.iter().map(ProductCard::from).collect()
}

// ── Pages ────────────────────────────────────────────────────────────────────

pub struct CategorySection {
    pub category: CategoryLink,
    pub subcategories: Vec<CategoryLink>,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub chrome: Chrome,
    pub sections: Vec<CategorySection>,
}

impl HomePage {
    pub fn new(chrome: Chrome, trees: &[CategoryTree]) -> Self {
        Self {
            chrome,
            sections: trees
                .iter()
                .map(|tree| CategorySection {
                    category: CategoryLink::from(&tree.category),
                    subcategories: tree.subcategories.iter().map(CategoryLink::from).collect(),
                })
                .collect(),
        }
    }
}

pub struct SortOption {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

fn sort_label(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::PriceAsc => "Price: low to high",
        ProductSort::PriceDesc => "Price: high to low",
        ProductSort::ColorAsc => "Color: A-Z",
        ProductSort::ColorDesc => "Color: Z-A",
        ProductSort::SizeAsc => "Size: small first",
        ProductSort::SizeDesc => "Size: large first",
        ProductSort::TitleAsc => "Title: A-Z",
        ProductSort::TitleDesc => "Title: Z-A",
    }
}

fn listing_href(slug: &str, sort: Option<ProductSort>, type_slug: Option<&str>, page: i64) -> String {
    let mut params = Vec::new();
    if let Some(sort) = sort {
        params.push(format!("sort={}", sort.as_param()));
    }
    if let Some(type_slug) = type_slug {
        params.push(format!("type={type_slug}"));
    }
    if page > 1 {
        params.push(format!("page={page}"));
    }
    if params.is_empty() {
        format!("/category/{slug}")
    } else {
        format!("/category/{slug}?{}", params.join("&"))
    }
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryPage {
    pub chrome: Chrome,
    pub category: CategoryLink,
    pub types: Vec<CategoryLink>,
    pub sorts: Vec<SortOption>,
    pub products: Vec<ProductCard>,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub page: i64,
}

impl CategoryPage {
    pub fn new(chrome: Chrome, listing: &CategoryListing) -> Self {
        let slug = listing.category.slug.as_str();
        let type_slug = listing.type_slug.as_deref();
        Self {
            chrome,
            category: CategoryLink::from(&listing.category),
            types: listing.subcategories.iter().map(CategoryLink::from).collect(),
            sorts: ProductSort::ALL
                .into_iter()
                .map(|sort| SortOption {
                    label: sort_label(sort),
                    href: listing_href(slug, Some(sort), type_slug, 1),
                    active: listing.sort == Some(sort),
                })
                .collect(),
            products: cards(&listing.products),
            previous_href: listing
                .has_previous()
                .then(|| listing_href(slug, listing.sort, type_slug, listing.page - 1)),
            next_href: listing
                .has_next()
                .then(|| listing_href(slug, listing.sort, type_slug, listing.page + 1)),
            page: listing.page,
        }
    }
}

pub struct ReviewView {
    pub author: String,
    pub text: String,
    pub created_at: String,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            author: review.author_name.clone(),
            text: review.text.clone(),
            created_at: review.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "product.html")]
pub struct ProductPage {
    pub chrome: Chrome,
    pub product: ProductCard,
    pub description: String,
    pub stock: i32,
    pub cover_image: String,
    pub images: Vec<String>,
    pub reviews: Vec<ReviewView>,
    pub related: Vec<ProductCard>,
    pub is_favourite: bool,
    pub can_review: bool,
}

impl ProductPage {
    pub fn new(chrome: Chrome, detail: &ProductDetail) -> Self {
        let can_review = chrome.username.is_some();
        Self {
            chrome,
            product: ProductCard::from(&detail.product),
            description: detail.product.description.clone(),
            stock: detail.product.quantity,
            cover_image: detail.cover_image().to_string(),
            images: detail.images.iter().map(|i| i.image_url.clone()).collect(),
            reviews: detail.reviews.iter().map(ReviewView::from).collect(),
            related: cards(&detail.related),
            is_favourite: detail.is_favourite,
            can_review,
        }
    }
}

#[derive(Template)]
#[template(path = "login_register.html")]
pub struct LoginRegisterPage {
    pub chrome: Chrome,
}

#[derive(Template)]
#[template(path = "favourites.html")]
pub struct FavouritesPage {
    pub chrome: Chrome,
    pub products: Vec<ProductCard>,
}

impl FavouritesPage {
    pub fn new(chrome: Chrome, products: &[Product]) -> Self {
        Self {
            chrome,
            products: cards(products),
        }
    }
}

pub struct CartRow {
    pub product: ProductCard,
    pub quantity: i32,
    pub total: String,
}

impl From<&CartLine> for CartRow {
    fn from(line: &CartLine) -> Self {
        Self {
            product: ProductCard::from(&line.product),
            quantity: line.line.quantity,
            total: format_price(&line.total_price()),
        }
    }
}

pub struct CartSummary {
    pub rows: Vec<CartRow>,
    pub total_quantity: i64,
    pub total_price: String,
}

impl From<&CartInfo> for CartSummary {
    fn from(info: &CartInfo) -> Self {
        Self {
            rows: info.lines.iter().map(CartRow::from).collect(),
            total_quantity: info.total_quantity,
            total_price: format_price(&info.total_price),
        }
    }
}

impl CartSummary {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Template)]
#[template(path = "cart.html")]
pub struct CartPage {
    pub chrome: Chrome,
    pub cart: CartSummary,
}

#[derive(Template)]
#[template(path = "checkout.html")]
pub struct CheckoutPage {
    pub chrome: Chrome,
    pub cart: CartSummary,
}
