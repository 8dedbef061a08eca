//! Stripe Checkout adapter for the payment gateway port.
//!
//! Creates hosted checkout sessions through the form-encoded REST API and
//! hands back the session URL the buyer is redirected to.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use thiserror::Error;

use crate::config::StripeConfig;
use crate::domain::checkout::CheckoutSessionRequest;
use crate::domain::errors::DomainError;
use crate::domain::ports::PaymentGateway;

/// Errors that can occur when talking to Stripe.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body was not what we expected.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<GatewayError> for DomainError {
    fn from(e: GatewayError) -> Self {
        DomainError::Gateway(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    currency: String,
}

impl StripeGateway {
    /// # Errors
    ///
    /// Returns error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.secret_key);
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| GatewayError::Parse(format!("Invalid secret key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
        })
    }

    fn form_fields(&self, request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let mut fields = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];
        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            fields.push((
                format!("{prefix}[price_data][currency]"),
                self.currency.clone(),
            ));
            fields.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            fields.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            fields.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }
        fields
    }

    /// Creates a checkout session and returns its hosted URL.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-2xx answer, or a response
    /// without a session URL.
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);

        let response = self
            .client
            .post(&url)
            .form(&self.form_fields(request))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;
        log::debug!("stripe checkout session {} created", session.id);

        session
            .url
            .ok_or_else(|| GatewayError::Parse(format!("session {} has no url", session.id)))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<String, DomainError> {
        Ok(self.create_checkout_session(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

    use super::*;
    use crate::domain::checkout::LineItem;

    #[derive(Default)]
    struct Captured {
        authorization: Option<String>,
        form: HashMap<String, String>,
    }

    async fn sessions(
        req: HttpRequest,
        form: web::Form<HashMap<String, String>>,
        captured: web::Data<Arc<Mutex<Captured>>>,
    ) -> HttpResponse {
        let mut captured = captured.lock().unwrap();
        captured.authorization = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        captured.form = form.into_inner();
        HttpResponse::Ok().json(serde_json::json!({
            "id": "cs_test_123",
            "url": "https://checkout.stripe.test/c/pay/cs_test_123"
        }))
    }

    async fn rejects() -> HttpResponse {
        HttpResponse::BadRequest().json(serde_json::json!({
            "error": { "message": "Invalid currency: xyz" }
        }))
    }

    /// Serves a stub of the sessions endpoint on an ephemeral port.
    fn stub(ok: bool, captured: Arc<Mutex<Captured>>) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind failed");
        let port = listener.local_addr().expect("addr failed").port();
        let server = HttpServer::new(move || {
            let app = App::new().app_data(web::Data::new(captured.clone()));
            if ok {
                app.route("/v1/checkout/sessions", web::post().to(sessions))
            } else {
                app.route("/v1/checkout/sessions", web::post().to(rejects))
            }
        })
        .workers(1)
        .listen(listener)
        .expect("listen failed")
        .run();
        actix_web::rt::spawn(server);
        format!("http://127.0.0.1:{port}")
    }

    fn gateway(api_base: String) -> StripeGateway {
        StripeGateway::new(&StripeConfig {
            secret_key: "sk_test_abc".to_string(),
            api_base,
            currency: "usd".to_string(),
            timeout_secs: 5,
        })
        .expect("client")
    }

    fn request() -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            line_items: vec![LineItem {
                name: "PRODUCT in TOTEMBO".to_string(),
                unit_amount: 25,
                quantity: 1,
            }],
            success_url: "http://shop.test/payment/success".to_string(),
            cancel_url: "http://shop.test/checkout".to_string(),
        }
    }

    #[actix_web::test]
    async fn posts_form_encoded_session_and_returns_url() {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let base = stub(true, captured.clone());

        let url = gateway(base)
            .create_checkout_session(&request())
            .await
            .expect("session");

        assert_eq!(url, "https://checkout.stripe.test/c/pay/cs_test_123");
        let captured = captured.lock().unwrap();
        assert_eq!(captured.authorization.as_deref(), Some("Bearer sk_test_abc"));
        let form = &captured.form;
        assert_eq!(form["mode"], "payment");
        assert_eq!(form["line_items[0][price_data][currency]"], "usd");
        assert_eq!(
            form["line_items[0][price_data][product_data][name]"],
            "PRODUCT in TOTEMBO"
        );
        assert_eq!(form["line_items[0][price_data][unit_amount]"], "25");
        assert_eq!(form["line_items[0][quantity]"], "1");
        assert_eq!(form["success_url"], "http://shop.test/payment/success");
        assert_eq!(form["cancel_url"], "http://shop.test/checkout");
    }

    #[actix_web::test]
    async fn api_error_carries_status_and_message() {
        let base = stub(false, Arc::new(Mutex::new(Captured::default())));

        let err = gateway(base)
            .create_checkout_session(&request())
            .await
            .expect_err("should fail");

        match err {
            GatewayError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid currency: xyz");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[actix_web::test]
    async fn unreachable_gateway_maps_to_domain_gateway_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .expect("bind failed")
            .local_addr()
            .expect("addr failed")
            .port();

        let result = gateway(format!("http://127.0.0.1:{port}"))
            .create_session(&request())
            .await;

        assert!(matches!(result, Err(DomainError::Gateway(_))));
    }
}
