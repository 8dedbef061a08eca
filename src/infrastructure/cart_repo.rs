use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{CartLine, Customer, Order, OrderLine};
use crate::domain::catalog::Product;
use crate::domain::checkout::ShippingDetails;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CartStore};
use crate::schema::{customers, order_lines, orders, products, shipping_addresses};

use super::models::{
    CustomerRow, NewCustomerRow, NewOrderLineRow, NewOrderRow, NewShippingAddressRow,
    OrderLineRow, OrderRow, ProductRow,
};

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartRepository for DieselCartRepository {
    fn atomically(
        &self,
        work: &mut dyn FnMut(&mut dyn CartStore) -> Result<(), DomainError>,
    ) -> Result<(), DomainError> {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, DomainError, _>(|conn| work(&mut PgCartStore { conn }))
    }
}

// ── Transaction-scoped store ─────────────────────────────────────────────────

/// Cart operations bound to one open transaction.
///
/// Get-or-create steps insert with `ON CONFLICT DO NOTHING` against the unique
/// indexes and then read the surviving row, so concurrent requests converge on
/// a single customer, order and line.
struct PgCartStore<'a> {
    conn: &'a mut PgConnection,
}

impl CartStore for PgCartStore<'_> {
    fn customer_for_user(&mut self, user_id: Uuid, name: &str) -> Result<Customer, DomainError> {
        diesel::insert_into(customers::table)
            .values(&NewCustomerRow {
                id: Uuid::new_v4(),
                user_id,
                name,
            })
            .on_conflict(customers::user_id)
            .do_nothing()
            .execute(self.conn)?;

        let row = customers::table
            .filter(customers::user_id.eq(user_id))
            .select(CustomerRow::as_select())
            .first(self.conn)?;
        Ok(row.into())
    }

    fn order_for_customer(&mut self, customer_id: Uuid) -> Result<Order, DomainError> {
        diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                id: Uuid::new_v4(),
                customer_id,
            })
            .on_conflict(orders::customer_id)
            .do_nothing()
            .execute(self.conn)?;

        let row = orders::table
            .filter(orders::customer_id.eq(customer_id))
            .select(OrderRow::as_select())
            .first(self.conn)?;
        Ok(row.into())
    }

    fn lock_product(&mut self, product_id: Uuid) -> Result<Option<Product>, DomainError> {
        let row = products::table
            .find(product_id)
            .select(ProductRow::as_select())
            .for_update()
            .first(self.conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn lock_line(
        &mut self,
        order_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<OrderLine>, DomainError> {
        let row = order_lines::table
            .filter(order_lines::order_id.eq(order_id))
            .filter(order_lines::product_id.eq(product_id))
            .select(OrderLineRow::as_select())
            .for_update()
            .first(self.conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn create_line(&mut self, order_id: Uuid, product_id: Uuid) -> Result<OrderLine, DomainError> {
        diesel::insert_into(order_lines::table)
            .values(&NewOrderLineRow {
                id: Uuid::new_v4(),
                order_id,
                product_id,
                quantity: 0,
            })
            .on_conflict((order_lines::order_id, order_lines::product_id))
            .do_nothing()
            .execute(self.conn)?;

        self.lock_line(order_id, product_id)?.ok_or_else(|| {
            DomainError::Internal(format!(
                "order line ({order_id}, {product_id}) vanished after upsert"
            ))
        })
    }

    fn set_product_quantity(
        &mut self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), DomainError> {
        let updated = diesel::update(products::table.find(product_id))
            .set(products::quantity.eq(quantity))
            .execute(self.conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Product"));
        }
        Ok(())
    }

    fn set_line_quantity(&mut self, line_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let updated = diesel::update(order_lines::table.find(line_id))
            .set(order_lines::quantity.eq(quantity))
            .execute(self.conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Order line"));
        }
        Ok(())
    }

    fn delete_line(&mut self, line_id: Uuid) -> Result<(), DomainError> {
        diesel::delete(order_lines::table.find(line_id)).execute(self.conn)?;
        Ok(())
    }

    fn order_lines(&mut self, order_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        let rows = order_lines::table
            .inner_join(products::table)
            .filter(order_lines::order_id.eq(order_id))
            .order((order_lines::added_at.asc(), order_lines::id.asc()))
            .select((OrderLineRow::as_select(), ProductRow::as_select()))
            .load::<(OrderLineRow, ProductRow)>(self.conn)?;

        Ok(rows
            .into_iter()
            .map(|(line, product)| CartLine {
                line: line.into(),
                product: product.into(),
            })
            .collect())
    }

    fn delete_order(&mut self, order_id: Uuid) -> Result<usize, DomainError> {
        // Shipping addresses keep their row; the FK nulls their order reference.
        let removed = diesel::delete(order_lines::table.filter(order_lines::order_id.eq(order_id)))
            .execute(self.conn)?;
        diesel::delete(orders::table.find(order_id)).execute(self.conn)?;
        Ok(removed)
    }

    fn record_shipping(
        &mut self,
        customer_id: Uuid,
        order_id: Uuid,
        details: &ShippingDetails,
    ) -> Result<(), DomainError> {
        let updated = diesel::update(customers::table.find(customer_id))
            .set((
                customers::first_name.eq(details.first_name.trim()),
                customers::last_name.eq(details.last_name.trim()),
            ))
            .execute(self.conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Customer"));
        }

        diesel::insert_into(shipping_addresses::table)
            .values(&NewShippingAddressRow {
                id: Uuid::new_v4(),
                customer_id,
                order_id,
                address: details.address.trim(),
                city: details.city.trim(),
                region: details.region.trim(),
                phone: details.phone.trim(),
            })
            .on_conflict(shipping_addresses::order_id)
            .do_update()
            .set((
                shipping_addresses::customer_id.eq(excluded(shipping_addresses::customer_id)),
                shipping_addresses::address.eq(excluded(shipping_addresses::address)),
                shipping_addresses::city.eq(excluded(shipping_addresses::city)),
                shipping_addresses::region.eq(excluded(shipping_addresses::region)),
                shipping_addresses::phone.eq(excluded(shipping_addresses::phone)),
            ))
            .execute(self.conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use bigdecimal::BigDecimal;
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselCartRepository;
    use crate::application::cart_service::CartService;
    use crate::domain::account::{AuthContext, NewUser};
    use crate::domain::cart::{CartAction, CartOutcome};
    use crate::domain::catalog::{NewCategory, NewProduct, Product};
    use crate::domain::checkout::ShippingDetails;
    use crate::domain::ports::{AccountRepository, CatalogRepository};
    use crate::infrastructure::account_repo::DieselAccountRepository;
    use crate::infrastructure::catalog_repo::DieselCatalogRepository;
    use crate::infrastructure::test_support::setup_db;
    use crate::schema::{order_lines, orders, shipping_addresses};

    struct Seeded {
        ctx: AuthContext,
        product: Product,
    }

    fn seed(pool: &crate::db::DbPool, username: &str, stock: i32) -> Seeded {
        let catalog = DieselCatalogRepository::new(pool.clone());
        let accounts = DieselAccountRepository::new(pool.clone());
        let category = catalog
            .create_category(NewCategory {
                title: format!("Shoes {username}"),
                image_url: None,
                slug: format!("shoes-{username}"),
                parent_id: None,
            })
            .expect("category");
        let product = catalog
            .create_product(NewProduct {
                title: "Loafer".to_string(),
                price: BigDecimal::from_str("10.00").unwrap(),
                quantity: stock,
                description: "Soon...".to_string(),
                category_id: category.id,
                slug: format!("loafer-{username}"),
                size: 42.0,
                color: "brown".to_string(),
            })
            .expect("product");
        let user = accounts
            .create_user(NewUser {
                username: username.to_string(),
                first_name: "Aziz".to_string(),
                last_name: "Karimov".to_string(),
                email: "aziz@example.com".to_string(),
                password_hash: "x".to_string(),
            })
            .expect("user");
        Seeded {
            ctx: AuthContext {
                user_id: user.id,
                username: user.username,
            },
            product,
        }
    }

    fn stock(pool: &crate::db::DbPool, product_id: Uuid) -> i32 {
        DieselCatalogRepository::new(pool.clone())
            .product_by_id(product_id)
            .expect("query")
            .expect("product exists")
            .quantity
    }

    #[tokio::test]
    async fn add_and_remove_move_units_between_stock_and_line() {
        let (_container, pool) = setup_db().await;
        let seeded = seed(&pool, "aziz", 5);
        let cart = CartService::new(Arc::new(DieselCartRepository::new(pool.clone())));

        for _ in 0..3 {
            cart.add_or_remove(&seeded.ctx, seeded.product.id, CartAction::Add)
                .expect("add");
        }
        let info = cart.cart_info(&seeded.ctx).expect("cart");
        assert_eq!(info.lines.len(), 1);
        assert_eq!(info.lines[0].line.quantity, 3);
        assert_eq!(info.total_price, BigDecimal::from_str("30.00").unwrap());
        assert_eq!(stock(&pool, seeded.product.id), 2);

        for _ in 0..3 {
            cart.add_or_remove(&seeded.ctx, seeded.product.id, CartAction::Remove)
                .expect("remove");
        }
        assert!(cart.cart_info(&seeded.ctx).expect("cart").is_empty());
        assert_eq!(stock(&pool, seeded.product.id), 5);
    }

    #[tokio::test]
    async fn add_out_of_stock_leaves_everything_untouched() {
        let (_container, pool) = setup_db().await;
        let seeded = seed(&pool, "aziz", 0);
        let cart = CartService::new(Arc::new(DieselCartRepository::new(pool.clone())));

        let adjustment = cart
            .add_or_remove(&seeded.ctx, seeded.product.id, CartAction::Add)
            .expect("add");

        assert_eq!(adjustment.outcome, CartOutcome::OutOfStock);
        let mut conn = pool.get().expect("conn");
        let lines: i64 = order_lines::table
            .count()
            .get_result(&mut conn)
            .expect("count");
        assert_eq!(lines, 0);
        assert_eq!(stock(&pool, seeded.product.id), 0);
    }

    #[tokio::test]
    async fn repeated_cart_reads_reuse_one_order() {
        let (_container, pool) = setup_db().await;
        let seeded = seed(&pool, "aziz", 1);
        let cart = CartService::new(Arc::new(DieselCartRepository::new(pool.clone())));

        let first = cart.cart_info(&seeded.ctx).expect("cart");
        let second = cart.cart_info(&seeded.ctx).expect("cart");

        assert_eq!(first.order.id, second.order.id);
        let mut conn = pool.get().expect("conn");
        let count: i64 = orders::table.count().get_result(&mut conn).expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn concurrent_adds_reserve_the_last_unit_once() {
        let (_container, pool) = setup_db().await;
        let first = seed(&pool, "aziz", 1);
        let accounts = DieselAccountRepository::new(pool.clone());
        let other = accounts
            .create_user(NewUser {
                username: "malika".to_string(),
                first_name: "Malika".to_string(),
                last_name: "Usmonova".to_string(),
                email: "malika@example.com".to_string(),
                password_hash: "x".to_string(),
            })
            .expect("user");
        let contenders = [
            first.ctx.clone(),
            AuthContext {
                user_id: other.id,
                username: other.username,
            },
        ];
        let cart = CartService::new(Arc::new(DieselCartRepository::new(pool.clone())));

        let handles: Vec<_> = contenders
            .into_iter()
            .map(|ctx| {
                let cart = cart.clone();
                let product_id = first.product.id;
                std::thread::spawn(move || {
                    cart.add_or_remove(&ctx, product_id, CartAction::Add)
                        .expect("add")
                        .outcome
                })
            })
            .collect();
        let outcomes: Vec<CartOutcome> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();

        assert_eq!(
            outcomes.iter().filter(|o| **o == CartOutcome::Added).count(),
            1
        );
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == CartOutcome::OutOfStock)
                .count(),
            1
        );
        assert_eq!(stock(&pool, first.product.id), 0);
    }

    #[tokio::test]
    async fn clear_removes_lines_and_order_but_keeps_the_single_shipping_row() {
        let (_container, pool) = setup_db().await;
        let seeded = seed(&pool, "aziz", 3);
        let cart = CartService::new(Arc::new(DieselCartRepository::new(pool.clone())));
        cart.add_or_remove(&seeded.ctx, seeded.product.id, CartAction::Add)
            .expect("add");
        let details = ShippingDetails {
            first_name: "Aziz".to_string(),
            last_name: "Karimov".to_string(),
            address: "Amir Temur 1".to_string(),
            city: "Tashkent".to_string(),
            region: "Tashkent".to_string(),
            phone: "+998901234567".to_string(),
        };
        let snapshot = cart.cart_info(&seeded.ctx).expect("cart");
        cart.record_shipping(&seeded.ctx, snapshot.order.id, &details)
            .expect("shipping");
        cart.record_shipping(&seeded.ctx, snapshot.order.id, &details)
            .expect("shipping again");

        let removed = cart.clear(&snapshot.order).expect("clear");

        assert_eq!(removed, 1);
        let fresh = cart.cart_info(&seeded.ctx).expect("cart");
        assert!(fresh.is_empty());
        assert_ne!(fresh.order.id, snapshot.order.id);
        let mut conn = pool.get().expect("conn");
        let orphaned: Vec<Option<Uuid>> = shipping_addresses::table
            .select(shipping_addresses::order_id)
            .load(&mut conn)
            .expect("load");
        assert_eq!(orphaned, vec![None]);
        assert_eq!(stock(&pool, seeded.product.id), 2);
    }
}
