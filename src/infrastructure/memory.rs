//! In-process adapter for every storage port.
//!
//! State lives behind one mutex. Cart transactions run against a working copy
//! that replaces the shared state only when the transaction body succeeds, so
//! a failed body leaves nothing behind. Used by the test suites and for local
//! runs without PostgreSQL.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::domain::account::{NewUser, User};
use crate::domain::cart::{CartLine, Customer, Order, OrderLine};
use crate::domain::catalog::{
    Category, GalleryImage, NewCategory, NewProduct, Product, ProductPage, ProductQuery, Review,
};
use crate::domain::checkout::ShippingDetails;
use crate::domain::errors::DomainError;
use crate::domain::ports::{
    AccountRepository, CartRepository, CartStore, CatalogRepository, FavouriteRepository,
};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredShippingAddress {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub address: String,
    pub city: String,
    pub region: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    categories: Vec<Category>,
    products: Vec<Product>,
    images: Vec<GalleryImage>,
    reviews: Vec<Review>,
    favourites: Vec<(Uuid, Uuid)>,
    customers: Vec<Customer>,
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
    shipping: Vec<StoredShippingAddress>,
}

impl MemoryState {
    fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("in-memory store poisoned".to_string()))
    }

    /// Number of orders currently stored, across all customers.
    pub fn order_count(&self) -> usize {
        self.lock().map(|s| s.orders.len()).unwrap_or_default()
    }

    pub fn shipping_addresses(&self) -> Vec<StoredShippingAddress> {
        self.lock().map(|s| s.shipping.clone()).unwrap_or_default()
    }
}

fn by_title(categories: impl Iterator<Item = Category>) -> Vec<Category> {
    let mut out: Vec<_> = categories.collect();
    out.sort_by(|a, b| a.title.cmp(&b.title));
    out
}

impl CatalogRepository for InMemoryStore {
    fn root_categories(&self) -> Result<Vec<Category>, DomainError> {
        let state = self.lock()?;
        Ok(by_title(
            state.categories.iter().filter(|c| c.parent_id.is_none()).cloned(),
        ))
    }

    fn subcategories(&self, parent_id: Uuid) -> Result<Vec<Category>, DomainError> {
        let state = self.lock()?;
        Ok(by_title(
            state
                .categories
                .iter()
                .filter(|c| c.parent_id == Some(parent_id))
                .cloned(),
        ))
    }

    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        let state = self.lock()?;
        Ok(state.categories.iter().find(|c| c.slug == slug).cloned())
    }

    fn products_in(&self, query: &ProductQuery) -> Result<ProductPage, DomainError> {
        let state = self.lock()?;
        let mut matching: Vec<Product> = state
            .products
            .iter()
            .filter(|p| query.category_ids.contains(&p.category_id))
            .cloned()
            .collect();
        match query.sort {
            Some(sort) => matching.sort_by(|a, b| sort.compare(a, b)),
            None => matching.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id))),
        }
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();
        Ok(ProductPage { items, total })
    }

    fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, DomainError> {
        let state = self.lock()?;
        Ok(state.products.iter().find(|p| p.slug == slug).cloned())
    }

    fn product_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.lock()?.product(id).cloned())
    }

    fn random_products(&self, exclude: Uuid, limit: usize) -> Result<Vec<Product>, DomainError> {
        let state = self.lock()?;
        let mut others: Vec<Product> = state
            .products
            .iter()
            .filter(|p| p.id != exclude)
            .cloned()
            .collect();
        others.shuffle(&mut rand::rng());
        others.truncate(limit);
        Ok(others)
    }

    fn gallery(&self, product_id: Uuid) -> Result<Vec<GalleryImage>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .images
            .iter()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect())
    }

    fn reviews(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .reviews
            .iter()
            .rev()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }

    fn add_review(
        &self,
        author_id: Uuid,
        product_id: Uuid,
        text: &str,
    ) -> Result<Review, DomainError> {
        let mut state = self.lock()?;
        let author_name = state
            .users
            .iter()
            .find(|u| u.id == author_id)
            .map(|u| u.username.clone())
            .ok_or(DomainError::NotFound("User"))?;
        if state.product(product_id).is_none() {
            return Err(DomainError::NotFound("Product"));
        }
        let review = Review {
            id: Uuid::new_v4(),
            text: text.to_string(),
            author_id,
            author_name,
            product_id,
            created_at: Utc::now(),
        };
        state.reviews.push(review.clone());
        Ok(review)
    }

    fn create_category(&self, category: NewCategory) -> Result<Category, DomainError> {
        let mut state = self.lock()?;
        if state.categories.iter().any(|c| c.slug == category.slug) {
            return Err(DomainError::Conflict(format!(
                "category slug '{}' is taken",
                category.slug
            )));
        }
        if let Some(parent_id) = category.parent_id {
            if !state.categories.iter().any(|c| c.id == parent_id) {
                return Err(DomainError::NotFound("Category"));
            }
        }
        let created = Category {
            id: Uuid::new_v4(),
            title: category.title,
            image_url: category.image_url,
            slug: category.slug,
            parent_id: category.parent_id,
        };
        state.categories.push(created.clone());
        Ok(created)
    }

    fn create_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        let mut state = self.lock()?;
        if product.quantity < 0 {
            return Err(DomainError::InvalidInput(
                "product quantity cannot be negative".to_string(),
            ));
        }
        if state.products.iter().any(|p| p.slug == product.slug) {
            return Err(DomainError::Conflict(format!(
                "product slug '{}' is taken",
                product.slug
            )));
        }
        if !state.categories.iter().any(|c| c.id == product.category_id) {
            return Err(DomainError::NotFound("Category"));
        }
        let created = Product {
            id: Uuid::new_v4(),
            title: product.title,
            price: product.price,
            quantity: product.quantity,
            description: product.description,
            category_id: product.category_id,
            slug: product.slug,
            size: product.size,
            color: product.color,
        };
        state.products.push(created.clone());
        Ok(created)
    }

    fn add_image(&self, product_id: Uuid, image_url: &str) -> Result<GalleryImage, DomainError> {
        let mut state = self.lock()?;
        if state.product(product_id).is_none() {
            return Err(DomainError::NotFound("Product"));
        }
        let image = GalleryImage {
            id: Uuid::new_v4(),
            product_id,
            image_url: image_url.to_string(),
        };
        state.images.push(image.clone());
        Ok(image)
    }
}

impl AccountRepository for InMemoryStore {
    fn create_user(&self, user: NewUser) -> Result<User, DomainError> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(DomainError::Conflict(format!(
                "username '{}' is taken",
                user.username
            )));
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        state.users.push(created.clone());
        Ok(created)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }
}

impl FavouriteRepository for InMemoryStore {
    fn toggle(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        let pair = (user_id, product_id);
        if let Some(pos) = state.favourites.iter().position(|f| *f == pair) {
            state.favourites.remove(pos);
            Ok(false)
        } else {
            state.favourites.push(pair);
            Ok(true)
        }
    }

    fn contains(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        let state = self.lock()?;
        Ok(state.favourites.contains(&(user_id, product_id)))
    }

    fn products(&self, user_id: Uuid) -> Result<Vec<Product>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .favourites
            .iter()
            .filter(|(user, _)| *user == user_id)
            .filter_map(|(_, product)| state.product(*product).cloned())
            .collect())
    }
}

impl CartRepository for InMemoryStore {
    fn atomically(
        &self,
        work: &mut dyn FnMut(&mut dyn CartStore) -> Result<(), DomainError>,
    ) -> Result<(), DomainError> {
        let mut shared = self.lock()?;
        let mut working = shared.clone();
        work(&mut MemoryTx {
            state: &mut working,
        })?;
        *shared = working;
        Ok(())
    }
}

struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

impl MemoryTx<'_> {
    fn line_mut(&mut self, line_id: Uuid) -> Result<&mut OrderLine, DomainError> {
        self.state
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or(DomainError::NotFound("Order line"))
    }
}

impl CartStore for MemoryTx<'_> {
    fn customer_for_user(&mut self, user_id: Uuid, name: &str) -> Result<Customer, DomainError> {
        if let Some(customer) = self
            .state
            .customers
            .iter()
            .find(|c| c.user_id == Some(user_id))
        {
            return Ok(customer.clone());
        }
        let customer = Customer {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            name: name.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        };
        self.state.customers.push(customer.clone());
        Ok(customer)
    }

    fn order_for_customer(&mut self, customer_id: Uuid) -> Result<Order, DomainError> {
        if let Some(order) = self
            .state
            .orders
            .iter()
            .find(|o| o.customer_id == Some(customer_id))
        {
            return Ok(order.clone());
        }
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: Some(customer_id),
            created_at: Utc::now(),
            shipping: true,
        };
        self.state.orders.push(order.clone());
        Ok(order)
    }

    fn lock_product(&mut self, product_id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.state.product(product_id).cloned())
    }

    fn lock_line(
        &mut self,
        order_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<OrderLine>, DomainError> {
        Ok(self
            .state
            .lines
            .iter()
            .find(|l| l.order_id == Some(order_id) && l.product_id == Some(product_id))
            .cloned())
    }

    fn create_line(&mut self, order_id: Uuid, product_id: Uuid) -> Result<OrderLine, DomainError> {
        if let Some(line) = self.lock_line(order_id, product_id)? {
            return Ok(line);
        }
        let line = OrderLine {
            id: Uuid::new_v4(),
            order_id: Some(order_id),
            product_id: Some(product_id),
            quantity: 0,
            added_at: Utc::now(),
        };
        self.state.lines.push(line.clone());
        Ok(line)
    }

    fn set_product_quantity(
        &mut self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), DomainError> {
        if quantity < 0 {
            return Err(DomainError::Internal(format!(
                "stock of product {product_id} would become {quantity}"
            )));
        }
        let product = self
            .state
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or(DomainError::NotFound("Product"))?;
        product.quantity = quantity;
        Ok(())
    }

    fn set_line_quantity(&mut self, line_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        self.line_mut(line_id)?.quantity = quantity;
        Ok(())
    }

    fn delete_line(&mut self, line_id: Uuid) -> Result<(), DomainError> {
        self.state.lines.retain(|l| l.id != line_id);
        Ok(())
    }

    fn order_lines(&mut self, order_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        let state = &*self.state;
        Ok(state
            .lines
            .iter()
            .filter(|l| l.order_id == Some(order_id))
            .filter_map(|line| {
                let product = state.product(line.product_id?)?;
                Some(CartLine {
                    line: line.clone(),
                    product: product.clone(),
                })
            })
            .collect())
    }

    fn delete_order(&mut self, order_id: Uuid) -> Result<usize, DomainError> {
        let before = self.state.lines.len();
        self.state.lines.retain(|l| l.order_id != Some(order_id));
        let removed = before - self.state.lines.len();
        self.state.orders.retain(|o| o.id != order_id);
        for address in &mut self.state.shipping {
            if address.order_id == Some(order_id) {
                address.order_id = None;
            }
        }
        Ok(removed)
    }

    fn record_shipping(
        &mut self,
        customer_id: Uuid,
        order_id: Uuid,
        details: &ShippingDetails,
    ) -> Result<(), DomainError> {
        let customer = self
            .state
            .customers
            .iter_mut()
            .find(|c| c.id == customer_id)
            .ok_or(DomainError::NotFound("Customer"))?;
        customer.first_name = details.first_name.trim().to_string();
        customer.last_name = details.last_name.trim().to_string();
        let address = StoredShippingAddress {
            id: Uuid::new_v4(),
            customer_id: Some(customer_id),
            order_id: Some(order_id),
            address: details.address.trim().to_string(),
            city: details.city.trim().to_string(),
            region: details.region.trim().to_string(),
            phone: details.phone.trim().to_string(),
            created_at: Utc::now(),
        };
        match self
            .state
            .shipping
            .iter_mut()
            .find(|s| s.order_id == Some(order_id))
        {
            Some(existing) => {
                *existing = StoredShippingAddress {
                    id: existing.id,
                    ..address
                }
            }
            None => self.state.shipping.push(address),
        }
        Ok(())
    }
}
