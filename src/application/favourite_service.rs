use std::sync::Arc;

use crate::domain::account::AuthContext;
use crate::domain::catalog::Product;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogRepository, FavouriteRepository};

#[derive(Clone)]
pub struct FavouriteService {
    favourites: Arc<dyn FavouriteRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl FavouriteService {
    pub fn new(
        favourites: Arc<dyn FavouriteRepository>,
        catalog: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self {
            favourites,
            catalog,
        }
    }

    /// Flips the product in or out of the viewer's favourites.
    ///
    /// Returns the new membership, or `None` for anonymous viewers, for whom
    /// nothing changes. The product must exist either way.
    pub fn toggle(
        &self,
        viewer: Option<&AuthContext>,
        product_slug: &str,
    ) -> Result<Option<bool>, DomainError> {
        let product = self
            .catalog
            .product_by_slug(product_slug)?
            .ok_or(DomainError::NotFound("Product"))?;
        let Some(ctx) = viewer else {
            return Ok(None);
        };
        let now_favourite = self.favourites.toggle(ctx.user_id, product.id)?;
        log::debug!(
            "{} {} favourite {}",
            ctx.username,
            if now_favourite { "added" } else { "removed" },
            product.slug
        );
        Ok(Some(now_favourite))
    }

    pub fn list(&self, ctx: &AuthContext) -> Result<Vec<Product>, DomainError> {
        self.favourites.products(ctx.user_id)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::*;
    use crate::domain::catalog::{NewCategory, NewProduct};
    use crate::infrastructure::memory::InMemoryStore;

    fn setup() -> (FavouriteService, AuthContext) {
        let store = Arc::new(InMemoryStore::new());
        let category = store
            .create_category(NewCategory {
                title: "Hats".to_string(),
                image_url: None,
                slug: "hats".to_string(),
                parent_id: None,
            })
            .unwrap();
        store
            .create_product(NewProduct {
                title: "Fedora".to_string(),
                price: BigDecimal::from_str("45.00").unwrap(),
                quantity: 1,
                description: "Soon...".to_string(),
                category_id: category.id,
                slug: "fedora".to_string(),
                size: 57.0,
                color: "grey".to_string(),
            })
            .unwrap();
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            username: "aziz".to_string(),
        };
        (FavouriteService::new(store.clone(), store), ctx)
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let (favourites, ctx) = setup();

        assert_eq!(favourites.toggle(Some(&ctx), "fedora").unwrap(), Some(true));
        assert_eq!(favourites.list(&ctx).unwrap().len(), 1);

        assert_eq!(favourites.toggle(Some(&ctx), "fedora").unwrap(), Some(false));
        assert!(favourites.list(&ctx).unwrap().is_empty());
    }

    #[test]
    fn anonymous_toggle_is_a_no_op() {
        let (favourites, ctx) = setup();

        assert_eq!(favourites.toggle(None, "fedora").unwrap(), None);
        assert!(favourites.list(&ctx).unwrap().is_empty());
    }

    #[test]
    fn unknown_product_is_not_found() {
        let (favourites, ctx) = setup();
        let result = favourites.toggle(Some(&ctx), "beret");
        assert!(matches!(result, Err(DomainError::NotFound("Product"))));
    }
}
