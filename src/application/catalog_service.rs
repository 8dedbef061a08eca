use std::sync::Arc;

use uuid::Uuid;

use crate::domain::account::AuthContext;
use crate::domain::catalog::{
    is_valid_slug, Category, CategoryTree, GalleryImage, Product, ProductQuery, ProductSort,
    Review, CATEGORY_PAGE_SIZE, FALLBACK_IMAGE_URL, RELATED_PRODUCTS,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogRepository, FavouriteRepository};

pub const MAX_REVIEW_LENGTH: usize = 5000;
/// Highest page a category listing serves; larger requests land here.
pub const MAX_CATEGORY_PAGE: i64 = 100_000;

/// Listing options of a category page as read from the query string.
#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    pub sort: Option<ProductSort>,
    /// Slug of a single category to list instead of the main category's children.
    pub type_slug: Option<String>,
    pub page: i64,
}

#[derive(Debug, Clone)]
pub struct CategoryListing {
    pub category: Category,
    pub subcategories: Vec<Category>,
    pub products: Vec<Product>,
    pub sort: Option<ProductSort>,
    pub type_slug: Option<String>,
    pub page: i64,
    pub total: i64,
}

impl CategoryListing {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(CATEGORY_PAGE_SIZE) < self.total
    }
}

#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    pub images: Vec<GalleryImage>,
    pub reviews: Vec<Review>,
    pub related: Vec<Product>,
    pub is_favourite: bool,
}

impl ProductDetail {
    pub fn cover_image(&self) -> &str {
        self.images
            .first()
            .map_or(FALLBACK_IMAGE_URL, |i| i.image_url.as_str())
    }
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    favourites: Arc<dyn FavouriteRepository>,
}

impl CatalogService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        favourites: Arc<dyn FavouriteRepository>,
    ) -> Self {
        Self {
            catalog,
            favourites,
        }
    }

    /// Root categories with their subcategories.
    pub fn home(&self) -> Result<Vec<CategoryTree>, DomainError> {
        self.catalog
            .root_categories()?
            .into_iter()
            .map(|category| {
                let subcategories = self.catalog.subcategories(category.id)?;
                Ok(CategoryTree {
                    category,
                    subcategories,
                })
            })
            .collect()
    }

    pub fn category_page(
        &self,
        slug: &str,
        filter: CategoryFilter,
    ) -> Result<CategoryListing, DomainError> {
        let category = self
            .catalog
            .category_by_slug(slug)?
            .ok_or(DomainError::NotFound("Category"))?;
        let subcategories = self.catalog.subcategories(category.id)?;

        let type_slug = filter.type_slug.filter(|s| !s.is_empty());
        let category_ids = match &type_slug {
            Some(type_slug) if is_valid_slug(type_slug) => self
                .catalog
                .category_by_slug(type_slug)?
                .map(|c| vec![c.id])
                .unwrap_or_default(),
            Some(_) => Vec::new(),
            None => subcategories.iter().map(|c| c.id).collect(),
        };

        let page = filter.page.clamp(1, MAX_CATEGORY_PAGE);
        let listing = self.catalog.products_in(&ProductQuery {
            category_ids,
            sort: filter.sort,
            offset: (page - 1).saturating_mul(CATEGORY_PAGE_SIZE),
            limit: CATEGORY_PAGE_SIZE,
        })?;

        Ok(CategoryListing {
            category,
            subcategories,
            products: listing.items,
            sort: filter.sort,
            type_slug: type_slug.filter(|s| is_valid_slug(s)),
            page,
            total: listing.total,
        })
    }

    pub fn product_detail(
        &self,
        slug: &str,
        viewer: Option<&AuthContext>,
    ) -> Result<ProductDetail, DomainError> {
        let product = self
            .catalog
            .product_by_slug(slug)?
            .ok_or(DomainError::NotFound("Product"))?;
        let is_favourite = match viewer {
            Some(ctx) => self.favourites.contains(ctx.user_id, product.id)?,
            None => false,
        };
        Ok(ProductDetail {
            images: self.catalog.gallery(product.id)?,
            reviews: self.catalog.reviews(product.id)?,
            related: self.catalog.random_products(product.id, RELATED_PRODUCTS)?,
            is_favourite,
            product,
        })
    }

    /// Saves a review and returns it with the product it belongs to.
    pub fn add_review(
        &self,
        ctx: &AuthContext,
        product_id: Uuid,
        text: &str,
    ) -> Result<(Review, Product), DomainError> {
        let product = self
            .catalog
            .product_by_id(product_id)?
            .ok_or(DomainError::NotFound("Product"))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::InvalidInput("review text is required".to_string()));
        }
        if text.chars().count() > MAX_REVIEW_LENGTH {
            return Err(DomainError::InvalidInput(format!(
                "review must be at most {MAX_REVIEW_LENGTH} characters"
            )));
        }
        let review = self.catalog.add_review(ctx.user_id, product.id, text)?;
        log::info!("{} reviewed product {}", ctx.username, product.slug);
        Ok((review, product))
    }

    pub fn product_by_id(&self, product_id: Uuid) -> Result<Product, DomainError> {
        self.catalog
            .product_by_id(product_id)?
            .ok_or(DomainError::NotFound("Product"))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::account::NewUser;
    use crate::domain::catalog::{NewCategory, NewProduct};
    use crate::domain::ports::AccountRepository;
    use crate::infrastructure::memory::InMemoryStore;

    struct Shop {
        store: Arc<InMemoryStore>,
        service: CatalogService,
        clothes: Category,
        shirts: Category,
        shoes: Category,
    }

    fn category(store: &InMemoryStore, slug: &str, parent: Option<&Category>) -> Category {
        store
            .create_category(NewCategory {
                title: slug.to_uppercase(),
                image_url: None,
                slug: slug.to_string(),
                parent_id: parent.map(|c| c.id),
            })
            .expect("create category")
    }

    fn product(store: &InMemoryStore, slug: &str, category: &Category, price: &str, color: &str) -> Product {
        store
            .create_product(NewProduct {
                title: slug.to_string(),
                price: BigDecimal::from_str(price).expect("valid decimal"),
                quantity: 3,
                description: "Soon...".to_string(),
                category_id: category.id,
                slug: slug.to_string(),
                size: 40.0,
                color: color.to_string(),
            })
            .expect("create product")
    }

    fn shop() -> Shop {
        let store = Arc::new(InMemoryStore::new());
        let clothes = category(&store, "clothes", None);
        let shirts = category(&store, "shirts", Some(&clothes));
        let shoes = category(&store, "shoes", Some(&clothes));
        category(&store, "books", None);
        product(&store, "oxford-shirt", &shirts, "25.00", "white");
        product(&store, "flannel-shirt", &shirts, "30.00", "red");
        product(&store, "sneakers", &shoes, "80.00", "black");
        Shop {
            service: CatalogService::new(store.clone(), store.clone()),
            store,
            clothes,
            shirts,
            shoes,
        }
    }

    fn viewer(store: &InMemoryStore) -> AuthContext {
        let user = store
            .create_user(NewUser {
                username: "aziz".to_string(),
                first_name: "Aziz".to_string(),
                last_name: "Karimov".to_string(),
                email: "aziz@example.com".to_string(),
                password_hash: "x".to_string(),
            })
            .expect("create user");
        AuthContext {
            user_id: user.id,
            username: user.username,
        }
    }

    #[test]
    fn home_lists_root_categories_with_children() {
        let shop = shop();

        let trees = shop.service.home().expect("home");

        let titles: Vec<_> = trees.iter().map(|t| t.category.title.as_str()).collect();
        assert_eq!(titles, ["BOOKS", "CLOTHES"]);
        let clothes = &trees[1];
        assert_eq!(clothes.category.id, shop.clothes.id);
        assert_eq!(clothes.subcategories.len(), 2);
    }

    #[test]
    fn category_page_lists_products_of_subcategories_paginated() {
        let shop = shop();

        let first = shop
            .service
            .category_page("clothes", CategoryFilter::default())
            .expect("page");

        assert_eq!(first.total, 3);
        assert_eq!(first.page, 1);
        assert_eq!(first.products.len(), 2);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let second = shop
            .service
            .category_page(
                "clothes",
                CategoryFilter {
                    page: 2,
                    ..CategoryFilter::default()
                },
            )
            .expect("page");
        assert_eq!(second.products.len(), 1);
        assert!(!second.has_next());
        assert!(second.has_previous());
    }

    #[test]
    fn huge_page_numbers_are_clamped() {
        let shop = shop();

        let listing = shop
            .service
            .category_page(
                "clothes",
                CategoryFilter {
                    page: i64::MAX,
                    ..CategoryFilter::default()
                },
            )
            .expect("page");

        assert_eq!(listing.page, MAX_CATEGORY_PAGE);
        assert!(listing.products.is_empty());
        assert!(!listing.has_next());
        assert!(listing.has_previous());
    }

    #[test]
    fn category_page_sorts_by_price_descending() {
        let shop = shop();

        let listing = shop
            .service
            .category_page(
                "clothes",
                CategoryFilter {
                    sort: ProductSort::parse("-price"),
                    ..CategoryFilter::default()
                },
            )
            .expect("page");

        let slugs: Vec<_> = listing.products.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, ["sneakers", "flannel-shirt"]);
    }

    #[test]
    fn type_filter_narrows_to_one_subcategory() {
        let shop = shop();

        let listing = shop
            .service
            .category_page(
                "clothes",
                CategoryFilter {
                    type_slug: Some(shop.shoes.slug.clone()),
                    ..CategoryFilter::default()
                },
            )
            .expect("page");

        assert_eq!(listing.total, 1);
        assert_eq!(listing.products[0].category_id, shop.shoes.id);
        assert_eq!(listing.type_slug.as_deref(), Some("shoes"));
    }

    #[test]
    fn malformed_type_filter_lists_nothing() {
        let shop = shop();

        let listing = shop
            .service
            .category_page(
                "clothes",
                CategoryFilter {
                    type_slug: Some("shoes&x=1".to_string()),
                    ..CategoryFilter::default()
                },
            )
            .expect("page");

        assert_eq!(listing.total, 0);
        assert_eq!(listing.type_slug, None);
    }

    #[test]
    fn unknown_category_is_not_found() {
        let shop = shop();
        let result = shop.service.category_page("nope", CategoryFilter::default());
        assert!(matches!(result, Err(DomainError::NotFound("Category"))));
    }

    #[test]
    fn product_detail_collects_gallery_reviews_and_related() {
        let shop = shop();
        let ctx = viewer(&shop.store);
        let shirt = shop
            .store
            .product_by_slug("oxford-shirt")
            .unwrap()
            .expect("seeded");
        shop.store
            .add_image(shirt.id, "https://img.example/oxford-front.jpg")
            .unwrap();
        shop.service
            .add_review(&ctx, shirt.id, "  Fits well  ")
            .expect("review");

        let detail = shop
            .service
            .product_detail("oxford-shirt", Some(&ctx))
            .expect("detail");

        assert_eq!(detail.cover_image(), "https://img.example/oxford-front.jpg");
        assert_eq!(detail.reviews.len(), 1);
        assert_eq!(detail.reviews[0].text, "Fits well");
        assert_eq!(detail.reviews[0].author_name, "aziz");
        assert_eq!(detail.related.len(), 2);
        assert!(detail.related.iter().all(|p| p.id != shirt.id));
        assert!(!detail.is_favourite);
        assert_eq!(shop.shirts.id, shirt.category_id);
    }

    #[test]
    fn product_without_gallery_uses_fallback_cover() {
        let shop = shop();
        let detail = shop.service.product_detail("sneakers", None).expect("detail");
        assert_eq!(detail.cover_image(), FALLBACK_IMAGE_URL);
    }

    #[test]
    fn blank_review_is_rejected() {
        let shop = shop();
        let ctx = viewer(&shop.store);
        let shirt = shop.store.product_by_slug("oxford-shirt").unwrap().unwrap();

        let result = shop.service.add_review(&ctx, shirt.id, "   ");

        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
        assert!(shop.store.reviews(shirt.id).unwrap().is_empty());
    }

    #[test]
    fn review_for_unknown_product_is_not_found() {
        let shop = shop();
        let ctx = viewer(&shop.store);
        let result = shop.service.add_review(&ctx, Uuid::new_v4(), "great");
        assert!(matches!(result, Err(DomainError::NotFound("Product"))));
    }
}
