use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::domain::errors::DomainError;

pub const LOGIN_PATH: &str = "/login_registration";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Not logged in")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(_) => AppError::NotFound,
            DomainError::InvalidCredentials => AppError::Unauthorized,
            DomainError::InvalidInput(msg) | DomainError::Conflict(msg) => {
                AppError::BadRequest(msg)
            }
            DomainError::EmptyCart => AppError::BadRequest("cart is empty".to_string()),
            DomainError::Gateway(msg) | DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Internal(format!("template: {e}"))
    }
}

fn error_page(status: u16, title: &str, detail: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{status} {title}</title></head>\
         <body><h1>{status} {title}</h1><p>{detail}</p><p><a href=\"/\">Back to the shop</a></p>\
         </body></html>"
    )
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound => HttpResponse::NotFound()
                .content_type("text/html; charset=utf-8")
                .body(error_page(404, "Not found", "This page does not exist.")),
            AppError::Unauthorized => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, LOGIN_PATH))
                .finish(),
            AppError::BadRequest(_) => HttpResponse::BadRequest()
                .content_type("text/html; charset=utf-8")
                .body(error_page(400, "Bad request", "The request could not be processed.")),
            AppError::Internal(detail) => {
                log::error!("request failed: {detail}");
                HttpResponse::InternalServerError()
                    .content_type("text/html; charset=utf-8")
                    .body(error_page(500, "Server error", "Something went wrong on our side."))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthorized_redirects_to_login() {
        let resp = AppError::Unauthorized.error_response();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            LOGIN_PATH
        );
    }

    #[test]
    fn empty_cart_maps_to_bad_request() {
        let app_err: AppError = DomainError::EmptyCart.into();
        assert!(matches!(app_err, AppError::BadRequest(_)));
    }

    #[test]
    fn not_found_display() {
        assert_eq!(AppError::NotFound.to_string(), "Not found");
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }

    #[test]
    fn domain_not_found_maps_to_app_not_found() {
        let app_err: AppError = DomainError::NotFound("Product").into();
        assert!(matches!(app_err, AppError::NotFound));
    }

    #[test]
    fn domain_internal_and_gateway_map_to_app_internal() {
        let app_err: AppError = DomainError::Internal("oops".to_string()).into();
        assert!(matches!(app_err, AppError::Internal(_)));
        let app_err: AppError = DomainError::Gateway("declined".to_string()).into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }

    #[test]
    fn domain_invalid_input_maps_to_bad_request() {
        let app_err: AppError = DomainError::InvalidInput("bad value".to_string()).into();
        assert!(matches!(app_err, AppError::BadRequest(_)));
    }
}
