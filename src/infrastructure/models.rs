use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::account::User;
use crate::domain::cart::{Customer, Order, OrderLine};
use crate::domain::catalog::{Category, GalleryImage, Product};
use crate::schema::{
    categories, customers, favourite_products, gallery_images, order_lines, orders, products,
    reviews, shipping_addresses, users,
};

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryRow {
    pub id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    pub slug: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategoryRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub image_url: Option<&'a str>,
    pub slug: &'a str,
    pub parent_id: Option<Uuid>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            title: row.title,
            image_url: row.image_url,
            slug: row.slug,
            parent_id: row.parent_id,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = products)]
#[diesel(belongs_to(CategoryRow, foreign_key = category_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
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

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub price: &'a BigDecimal,
    pub quantity: i32,
    pub description: &'a str,
    pub category_id: Uuid,
    pub slug: &'a str,
    pub size: f64,
    pub color: &'a str,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            price: row.price,
            quantity: row.quantity,
            description: row.description,
            category_id: row.category_id,
            slug: row.slug,
            size: row.size,
            color: row.color,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = gallery_images)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GalleryImageRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
}

impl From<GalleryImageRow> for GalleryImage {
    fn from(row: GalleryImageRow) -> Self {
        GalleryImage {
            id: row.id,
            product_id: row.product_id,
            image_url: row.image_url,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewRow {
    pub id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reviews)]
pub struct NewReviewRow<'a> {
    pub id: Uuid,
    pub text: &'a str,
    pub author_id: Uuid,
    pub product_id: Uuid,
}

// ── Accounts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = favourite_products)]
pub struct NewFavouriteRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
}

// ── Cart ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CustomerRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = customers)]
pub struct NewCustomerRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: &'a str,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub shipping: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            customer_id: row.customer_id,
            created_at: row.created_at,
            shipping: row.shipping,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            added_at: row.added_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shipping_addresses)]
pub struct NewShippingAddressRow<'a> {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub address: &'a str,
    pub city: &'a str,
    pub region: &'a str,
    pub phone: &'a str,
}
