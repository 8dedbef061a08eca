use actix_web::{web, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::catalog_service::CategoryFilter;
use crate::domain::account::AuthContext;
use crate::domain::catalog::ProductSort;
use crate::domain::errors::DomainError;
use crate::errors::AppError;
use crate::session::{Flash, Viewer};
use crate::views::{CategoryPage, Chrome, HomePage, ProductPage};
use crate::Services;

use super::{redirect, redirect_with, render};

// ── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CategoryParams {
    pub sort: Option<String>,
    #[serde(rename = "type")]
    pub type_slug: Option<String>,
    pub page: Option<String>,
}

impl CategoryParams {
    /// Unknown sort keys and unparsable pages fall back to the defaults.
    fn into_filter(self) -> CategoryFilter {
        CategoryFilter {
            sort: self.sort.as_deref().and_then(ProductSort::parse),
            type_slug: self.type_slug.filter(|t| !t.is_empty()),
            page: self
                .page
                .and_then(|p| p.parse::<i64>().ok())
                .unwrap_or(1),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewForm {
    /// Review body, 1 to 5000 characters after trimming.
    pub text: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Root categories with their subcategories", content_type = "text/html"),
    ),
    tag = "catalog"
)]
pub async fn home(
    services: web::Data<Services>,
    viewer: Viewer,
    flash: IncomingFlashMessages,
) -> Result<HttpResponse, AppError> {
    let catalog = services.catalog.clone();
    let trees = web::block(move || catalog.home()).await??;

    let page = HomePage::new(Chrome::new("Home", viewer.ctx(), &flash), &trees);
    render(&page)
}

/// GET /category/{slug}
///
/// Lists the products of the category's subcategories, or of the single
/// category named by `type`, two per page.
#[utoipa::path(
    get,
    path = "/category/{slug}",
    params(
        ("slug" = String, Path, description = "Category slug"),
        ("sort" = Option<String>, Query, description = "price, -price, color, -color, size, -size, title or -title"),
        ("type" = Option<String>, Query, description = "Slug of one category to list instead"),
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
    ),
    responses(
        (status = 200, description = "Category page", content_type = "text/html"),
        (status = 404, description = "Unknown category"),
    ),
    tag = "catalog"
)]
pub async fn category(
    services: web::Data<Services>,
    path: web::Path<String>,
    query: web::Query<CategoryParams>,
    viewer: Viewer,
    flash: IncomingFlashMessages,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let filter = query.into_inner().into_filter();
    let catalog = services.catalog.clone();
    let listing = web::block(move || catalog.category_page(&slug, filter)).await??;

    let chrome = Chrome::new(listing.category.title.clone(), viewer.ctx(), &flash);
    render(&CategoryPage::new(chrome, &listing))
}

/// GET /product/{slug}
#[utoipa::path(
    get,
    path = "/product/{slug}",
    params(
        ("slug" = String, Path, description = "Product slug"),
    ),
    responses(
        (status = 200, description = "Product detail with gallery, reviews and related products", content_type = "text/html"),
        (status = 404, description = "Unknown product"),
    ),
    tag = "catalog"
)]
pub async fn product_detail(
    services: web::Data<Services>,
    path: web::Path<String>,
    viewer: Viewer,
    flash: IncomingFlashMessages,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let catalog = services.catalog.clone();
    let owner = viewer.clone();
    let detail = web::block(move || catalog.product_detail(&slug, owner.ctx())).await??;

    let chrome = Chrome::new(detail.product.title.clone(), viewer.ctx(), &flash);
    render(&ProductPage::new(chrome, &detail))
}

/// POST /review/{product_id}
///
/// Saves a review and returns to the product page. A rejected review comes
/// back as a flash message.
#[utoipa::path(
    post,
    path = "/review/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body(content = ReviewForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Back to the product page"),
        (status = 303, description = "Not logged in, sent to the login page"),
        (status = 404, description = "Unknown product"),
    ),
    tag = "catalog"
)]
pub async fn save_review(
    services: web::Data<Services>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
    form: web::Form<ReviewForm>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let text = form.into_inner().text;
    let catalog = services.catalog.clone();

    let outcome = web::block(
        move || -> Result<Result<String, (String, String)>, DomainError> {
            match catalog.add_review(&ctx, product_id, &text) {
                Ok((_, product)) => Ok(Ok(product.slug)),
                Err(DomainError::InvalidInput(reason)) => {
                    let product = catalog.product_by_id(product_id)?;
                    Ok(Err((product.slug, reason)))
                }
                Err(e) => Err(e),
            }
        },
    )
    .await??;

    Ok(match outcome {
        Ok(slug) => redirect(&format!("/product/{slug}")),
        Err((slug, reason)) => {
            log::debug!("review for {slug} rejected: {reason}");
            redirect_with(&format!("/product/{slug}"), Flash::ReviewRejected)
        }
    })
}
