use async_trait::async_trait;
use uuid::Uuid;

use super::account::{NewUser, User};
use super::cart::{CartLine, Customer, Order, OrderLine};
use super::catalog::{
    Category, GalleryImage, NewCategory, NewProduct, Product, ProductPage, ProductQuery, Review,
};
use super::checkout::{CheckoutSessionRequest, ShippingDetails};
use super::errors::DomainError;

pub trait CatalogRepository: Send + Sync + 'static {
    fn root_categories(&self) -> Result<Vec<Category>, DomainError>;
    fn subcategories(&self, parent_id: Uuid) -> Result<Vec<Category>, DomainError>;
    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError>;
    fn products_in(&self, query: &ProductQuery) -> Result<ProductPage, DomainError>;
    fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, DomainError>;
    fn product_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    /// Up to `limit` products other than `exclude`, in random order.
    fn random_products(&self, exclude: Uuid, limit: usize) -> Result<Vec<Product>, DomainError>;
    fn gallery(&self, product_id: Uuid) -> Result<Vec<GalleryImage>, DomainError>;
    /// Reviews of a product, newest first.
    fn reviews(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError>;
    fn add_review(&self, author_id: Uuid, product_id: Uuid, text: &str)
        -> Result<Review, DomainError>;
    fn create_category(&self, category: NewCategory) -> Result<Category, DomainError>;
    fn create_product(&self, product: NewProduct) -> Result<Product, DomainError>;
    fn add_image(&self, product_id: Uuid, image_url: &str) -> Result<GalleryImage, DomainError>;
}

pub trait AccountRepository: Send + Sync + 'static {
    /// Fails with `Conflict` when the username is taken.
    fn create_user(&self, user: NewUser) -> Result<User, DomainError>;
    fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;
}

pub trait FavouriteRepository: Send + Sync + 'static {
    /// Flips membership of the pair; returns `true` if it is now a favourite.
    fn toggle(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError>;
    fn contains(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError>;
    fn products(&self, user_id: Uuid) -> Result<Vec<Product>, DomainError>;
}

/// Operations available inside one cart transaction.
///
/// `lock_*` methods take a row lock that is held until the transaction ends.
pub trait CartStore {
    /// Get-or-create; `name` is only used when the customer is created.
    fn customer_for_user(&mut self, user_id: Uuid, name: &str) -> Result<Customer, DomainError>;
    fn order_for_customer(&mut self, customer_id: Uuid) -> Result<Order, DomainError>;
    fn lock_product(&mut self, product_id: Uuid) -> Result<Option<Product>, DomainError>;
    fn lock_line(
        &mut self,
        order_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<OrderLine>, DomainError>;
    /// Get-or-create of the (order, product) line, returned locked.
    fn create_line(&mut self, order_id: Uuid, product_id: Uuid) -> Result<OrderLine, DomainError>;
    fn set_product_quantity(&mut self, product_id: Uuid, quantity: i32)
        -> Result<(), DomainError>;
    fn set_line_quantity(&mut self, line_id: Uuid, quantity: i32) -> Result<(), DomainError>;
    fn delete_line(&mut self, line_id: Uuid) -> Result<(), DomainError>;
    /// Lines of the order that still reference a product, oldest first.
    fn order_lines(&mut self, order_id: Uuid) -> Result<Vec<CartLine>, DomainError>;
    /// Deletes every line of the order, then the order. Returns the number of lines removed.
    fn delete_order(&mut self, order_id: Uuid) -> Result<usize, DomainError>;
    /// Updates the customer's names and upserts the single address of the order.
    fn record_shipping(
        &mut self,
        customer_id: Uuid,
        order_id: Uuid,
        details: &ShippingDetails,
    ) -> Result<(), DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    /// Runs `work` in one transaction, committing only if it returns `Ok`.
    fn atomically(
        &self,
        work: &mut dyn FnMut(&mut dyn CartStore) -> Result<(), DomainError>,
    ) -> Result<(), DomainError>;
}

impl dyn CartRepository {
    pub fn transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn CartStore) -> Result<T, DomainError>,
    {
        let mut work = Some(work);
        let mut output = None;
        self.atomically(&mut |store: &mut dyn CartStore| -> Result<(), DomainError> {
            let work = work
                .take()
                .ok_or_else(|| DomainError::Internal("transaction body ran twice".to_string()))?;
            output = Some(work(store)?);
            Ok(())
        })?;
        output.ok_or_else(|| DomainError::Internal("transaction produced no value".to_string()))
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Creates a hosted payment session and returns the URL to send the buyer to.
    async fn create_session(&self, request: &CheckoutSessionRequest)
        -> Result<String, DomainError>;
}
