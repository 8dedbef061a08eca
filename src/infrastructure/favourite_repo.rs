use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::Product;
use crate::domain::errors::DomainError;
use crate::domain::ports::FavouriteRepository;
use crate::schema::{favourite_products, products};

use super::models::{NewFavouriteRow, ProductRow};

pub struct DieselFavouriteRepository {
    pool: DbPool,
}

impl DieselFavouriteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl FavouriteRepository for DieselFavouriteRepository {
    fn toggle(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let removed = diesel::delete(
                favourite_products::table
                    .filter(favourite_products::user_id.eq(user_id))
                    .filter(favourite_products::product_id.eq(product_id)),
            )
            .execute(conn)?;
            if removed > 0 {
                return Ok(false);
            }

            diesel::insert_into(favourite_products::table)
                .values(&NewFavouriteRow {
                    id: Uuid::new_v4(),
                    user_id,
                    product_id,
                })
                .on_conflict((favourite_products::user_id, favourite_products::product_id))
                .do_nothing()
                .execute(conn)?;
            Ok(true)
        })
    }

    fn contains(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let found: bool = diesel::select(diesel::dsl::exists(
            favourite_products::table
                .filter(favourite_products::user_id.eq(user_id))
                .filter(favourite_products::product_id.eq(product_id)),
        ))
        .get_result(&mut conn)?;
        Ok(found)
    }

    fn products(&self, user_id: Uuid) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = favourite_products::table
            .inner_join(products::table)
            .filter(favourite_products::user_id.eq(user_id))
            .order(products::title.asc())
            .select(ProductRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
