use diesel::dsl::sql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Double;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{
    Category, GalleryImage, NewCategory, NewProduct, Product, ProductPage, ProductQuery,
    ProductSort, Review,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::schema::{categories, gallery_images, products, reviews, users};

use super::insert_error;
use super::models::{
    CategoryRow, GalleryImageRow, NewCategoryRow, NewProductRow, NewReviewRow, ProductRow,
    ReviewRow,
};

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

type BoxedProducts<'a> = products::BoxedQuery<'a, Pg>;

fn apply_sort(query: BoxedProducts<'_>, sort: Option<ProductSort>) -> BoxedProducts<'_> {
    let query = match sort {
        Some(ProductSort::PriceAsc) => query.order(products::price.asc()),
        Some(ProductSort::PriceDesc) => query.order(products::price.desc()),
        Some(ProductSort::ColorAsc) => query.order(products::color.asc()),
        Some(ProductSort::ColorDesc) => query.order(products::color.desc()),
        Some(ProductSort::SizeAsc) => query.order(products::size.asc()),
        Some(ProductSort::SizeDesc) => query.order(products::size.desc()),
        Some(ProductSort::TitleAsc) => query.order(products::title.asc()),
        Some(ProductSort::TitleDesc) => query.order(products::title.desc()),
        None => query.order(products::title.asc()),
    };
    // Stable pagination: ties always resolve by title, then id.
    query.then_order_by((products::title.asc(), products::id.asc()))
}

impl CatalogRepository for DieselCatalogRepository {
    fn root_categories(&self) -> Result<Vec<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = categories::table
            .filter(categories::parent_id.is_null())
            .order(categories::title.asc())
            .select(CategoryRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn subcategories(&self, parent_id: Uuid) -> Result<Vec<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = categories::table
            .filter(categories::parent_id.eq(parent_id))
            .order(categories::title.asc())
            .select(CategoryRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = categories::table
            .filter(categories::slug.eq(slug))
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn products_in(&self, query: &ProductQuery) -> Result<ProductPage, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = products::table
                .filter(products::category_id.eq_any(query.category_ids.clone()))
                .count()
                .get_result(conn)?;

            let listing = products::table
                .filter(products::category_id.eq_any(query.category_ids.clone()))
                .into_boxed();
            let rows = apply_sort(listing, query.sort)
                .limit(query.limit)
                .offset(query.offset)
                .load::<ProductRow>(conn)?;

            Ok(ProductPage {
                items: rows.into_iter().map(Into::into).collect(),
                total,
            })
        })
    }

    fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .filter(products::slug.eq(slug))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn product_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn random_products(&self, exclude: Uuid, limit: usize) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = products::table
            .filter(products::id.ne(exclude))
            .order(sql::<Double>("RANDOM()"))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(ProductRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn gallery(&self, product_id: Uuid) -> Result<Vec<GalleryImage>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = gallery_images::table
            .filter(gallery_images::product_id.eq(product_id))
            .order(gallery_images::image_url.asc())
            .select(GalleryImageRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn reviews(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = reviews::table
            .inner_join(users::table)
            .filter(reviews::product_id.eq(product_id))
            .order((reviews::created_at.desc(), reviews::id.desc()))
            .select((ReviewRow::as_select(), users::username))
            .load::<(ReviewRow, String)>(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|(row, author_name)| Review {
                id: row.id,
                text: row.text,
                author_id: row.author_id,
                author_name,
                product_id: row.product_id,
                created_at: row.created_at,
            })
            .collect())
    }

    fn add_review(
        &self,
        author_id: Uuid,
        product_id: Uuid,
        text: &str,
    ) -> Result<Review, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let author_name: String = users::table
                .find(author_id)
                .select(users::username)
                .first::<String>(conn)
                .optional()?
                .ok_or(DomainError::NotFound("User"))?;

            let row = diesel::insert_into(reviews::table)
                .values(&NewReviewRow {
                    id: Uuid::new_v4(),
                    text,
                    author_id,
                    product_id,
                })
                .returning(ReviewRow::as_returning())
                .get_result(conn)
                .map_err(|e| insert_error(e, || "duplicate review".to_string(), "Product"))?;

            Ok(Review {
                id: row.id,
                text: row.text,
                author_id: row.author_id,
                author_name,
                product_id: row.product_id,
                created_at: row.created_at,
            })
        })
    }

    fn create_category(&self, category: NewCategory) -> Result<Category, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(categories::table)
            .values(&NewCategoryRow {
                id: Uuid::new_v4(),
                title: &category.title,
                image_url: category.image_url.as_deref(),
                slug: &category.slug,
                parent_id: category.parent_id,
            })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| {
                insert_error(
                    e,
                    || format!("category slug '{}' is taken", category.slug),
                    "Category",
                )
            })?;
        Ok(row.into())
    }

    fn create_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        if product.quantity < 0 {
            return Err(DomainError::InvalidInput(
                "product quantity cannot be negative".to_string(),
            ));
        }
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                title: &product.title,
                price: &product.price,
                quantity: product.quantity,
                description: &product.description,
                category_id: product.category_id,
                slug: &product.slug,
                size: product.size,
                color: &product.color,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| {
                insert_error(
                    e,
                    || format!("product slug '{}' is taken", product.slug),
                    "Category",
                )
            })?;
        Ok(row.into())
    }

    fn add_image(&self, product_id: Uuid, image_url: &str) -> Result<GalleryImage, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(gallery_images::table)
            .values(&GalleryImageRow {
                id: Uuid::new_v4(),
                product_id,
                image_url: image_url.to_string(),
            })
            .returning(GalleryImageRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| insert_error(e, || "duplicate image".to_string(), "Product"))?;
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::DieselCatalogRepository;
    use crate::domain::account::NewUser;
    use crate::domain::catalog::{NewCategory, NewProduct, ProductQuery, ProductSort};
    use crate::domain::errors::DomainError;
    use crate::domain::ports::{AccountRepository, CatalogRepository};
    use crate::infrastructure::account_repo::DieselAccountRepository;
    use crate::infrastructure::test_support::setup_db;

    fn category(repo: &DieselCatalogRepository, slug: &str, parent: Option<Uuid>) -> Uuid {
        repo.create_category(NewCategory {
            title: slug.to_uppercase(),
            image_url: None,
            slug: slug.to_string(),
            parent_id: parent,
        })
        .expect("category")
        .id
    }

    fn product(repo: &DieselCatalogRepository, category_id: Uuid, slug: &str, price: &str) {
        repo.create_product(NewProduct {
            title: slug.to_string(),
            price: BigDecimal::from_str(price).unwrap(),
            quantity: 3,
            description: "Soon...".to_string(),
            category_id,
            slug: slug.to_string(),
            size: 1.0,
            color: "black".to_string(),
        })
        .expect("product");
    }

    #[tokio::test]
    async fn categories_split_into_roots_and_children() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);
        let clothes = category(&repo, "clothes", None);
        category(&repo, "shirts", Some(clothes));
        category(&repo, "bags", None);

        let roots: Vec<String> = repo
            .root_categories()
            .expect("roots")
            .into_iter()
            .map(|c| c.slug)
            .collect();
        let children = repo.subcategories(clothes).expect("children");

        assert_eq!(roots, vec!["bags", "clothes"]);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].slug, "shirts");
        assert!(repo.category_by_slug("shoes").expect("query").is_none());
    }

    #[tokio::test]
    async fn products_page_with_sort_and_total() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);
        let shirts = category(&repo, "shirts", None);
        product(&repo, shirts, "linen", "30.00");
        product(&repo, shirts, "cotton", "10.00");
        product(&repo, shirts, "silk", "90.00");

        let page = repo
            .products_in(&ProductQuery {
                category_ids: vec![shirts],
                sort: Some(ProductSort::PriceDesc),
                offset: 0,
                limit: 2,
            })
            .expect("page");

        assert_eq!(page.total, 3);
        let slugs: Vec<&str> = page.items.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["silk", "linen"]);
    }

    #[tokio::test]
    async fn random_products_exclude_the_current_one() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);
        let shirts = category(&repo, "shirts", None);
        for slug in ["a", "b", "c"] {
            product(&repo, shirts, slug, "1.00");
        }
        let current = repo.product_by_slug("a").expect("query").expect("exists");

        let related = repo.random_products(current.id, 4).expect("related");

        assert_eq!(related.len(), 2);
        assert!(related.iter().all(|p| p.id != current.id));
    }

    #[tokio::test]
    async fn reviews_carry_author_name_newest_first() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let accounts = DieselAccountRepository::new(pool);
        let shirts = category(&repo, "shirts", None);
        product(&repo, shirts, "linen", "30.00");
        let linen = repo.product_by_slug("linen").expect("query").expect("exists");
        let author = accounts
            .create_user(NewUser {
                username: "aziz".to_string(),
                first_name: "Aziz".to_string(),
                last_name: "Karimov".to_string(),
                email: "aziz@example.com".to_string(),
                password_hash: "x".to_string(),
            })
            .expect("user");

        repo.add_review(author.id, linen.id, "first").expect("review");
        repo.add_review(author.id, linen.id, "second").expect("review");

        let reviews = repo.reviews(linen.id).expect("reviews");
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].text, "second");
        assert_eq!(reviews[0].author_name, "aziz");
    }

    #[tokio::test]
    async fn duplicate_slug_conflicts_and_missing_parent_is_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool);
        category(&repo, "shirts", None);

        let duplicate = repo.create_category(NewCategory {
            title: "Shirts again".to_string(),
            image_url: None,
            slug: "shirts".to_string(),
            parent_id: None,
        });
        let orphan = repo.create_category(NewCategory {
            title: "Orphan".to_string(),
            image_url: None,
            slug: "orphan".to_string(),
            parent_id: Some(Uuid::new_v4()),
        });

        assert!(matches!(duplicate, Err(DomainError::Conflict(_))));
        assert!(matches!(orphan, Err(DomainError::NotFound("Category"))));
    }
}
