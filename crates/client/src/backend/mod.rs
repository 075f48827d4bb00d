//! Hosted backend contract and REST client.
//!
//! The backend is a hosted service exposing relational tables (`products`,
//! `stores`, `carts`, `cart_items`, `payments`, `receipts`) over a
//! PostgREST-style HTTP interface, plus phone-OTP auth (see [`auth`]).
//!
//! Consumers depend on the [`CommerceBackend`] trait; [`ApiClient`] is the
//! production implementation. "Not found" is a normal negative result
//! (`Ok(None)` / empty list), never an error.

pub mod auth;
pub mod types;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use kirana_core::{Barcode, CartId, CartStatus, ProductId, StoreId, UserId};

use crate::config::BackendConfig;
use types::{
    CartItemRow, CartRow, CartTotals, NewCartItem, NewPayment, NewReceipt, PaymentRow, Product,
    ReceiptRow, Store,
};

/// Errors from the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport failed (DNS, TLS, timeout, connection reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected row shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A row that must exist is missing (e.g. the cart just created).
    #[error("Not found: {0}")]
    NotFound(String),
}

impl BackendError {
    /// Whether the caller should try the cache before surfacing this.
    ///
    /// Everything except not-found is worth a cache fallback; a missing row
    /// is an authoritative answer, not an outage.
    #[must_use]
    pub const fn is_fallback_worthy(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

/// Typed contract over the backend's relational tables.
///
/// Futures are `Send` so flows holding a backend can be spawned.
pub trait CommerceBackend: Send + Sync {
    /// Products available at a store.
    fn fetch_products(
        &self,
        store_id: StoreId,
    ) -> impl Future<Output = Result<Vec<Product>, BackendError>> + Send;

    /// A single product by id; `None` if it does not exist.
    fn fetch_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, BackendError>> + Send;

    /// A single product by barcode; `None` for an unknown code.
    fn fetch_product_by_barcode(
        &self,
        code: &Barcode,
    ) -> impl Future<Output = Result<Option<Product>, BackendError>> + Send;

    /// Category names, in display order.
    fn fetch_categories(&self)
    -> impl Future<Output = Result<Vec<String>, BackendError>> + Send;

    /// Active stores.
    fn fetch_stores(&self) -> impl Future<Output = Result<Vec<Store>, BackendError>> + Send;

    /// Create a pending cart with zero totals.
    fn create_cart(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> impl Future<Output = Result<CartRow, BackendError>> + Send;

    /// Fetch a cart row (authoritative totals).
    fn fetch_cart(
        &self,
        cart_id: CartId,
    ) -> impl Future<Output = Result<CartRow, BackendError>> + Send;

    /// Overwrite a cart's aggregate totals.
    fn update_cart_totals(
        &self,
        cart_id: CartId,
        totals: &CartTotals,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Transition a cart's status.
    fn update_cart_status(
        &self,
        cart_id: CartId,
        status: CartStatus,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Insert one line item.
    fn insert_cart_item(
        &self,
        item: &NewCartItem,
    ) -> impl Future<Output = Result<CartItemRow, BackendError>> + Send;

    /// All line items persisted for a cart.
    fn list_cart_items(
        &self,
        cart_id: CartId,
    ) -> impl Future<Output = Result<Vec<CartItemRow>, BackendError>> + Send;

    /// Record a payment against a cart.
    fn create_payment(
        &self,
        payment: &NewPayment,
    ) -> impl Future<Output = Result<PaymentRow, BackendError>> + Send;

    /// Create a receipt carrying the QR token.
    fn create_receipt(
        &self,
        receipt: &NewReceipt,
    ) -> impl Future<Output = Result<ReceiptRow, BackendError>> + Send;
}

// =============================================================================
// ApiClient
// =============================================================================

/// REST client for the hosted backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build (e.g. the API key
    /// is not a valid header value).
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();

        let key = config.api_key.expose_secret();
        let mut api_key = HeaderValue::from_str(key)
            .map_err(|e| BackendError::Parse(format!("invalid API key: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| BackendError::Parse(format!("invalid API key: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}/rest/v1/{path_and_query}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::error!(
            status = %status,
            body = %message.chars().take(500).collect::<String>(),
            "backend returned non-success status"
        );
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(message));
        }
        Err(BackendError::Api {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        })
    }

    /// GET a filtered row set.
    async fn get_rows<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
    ) -> Result<Vec<T>, BackendError> {
        let response = self.client.get(self.url(path_and_query)).send().await?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// POST a row and return the representation the backend stored.
    async fn insert_row<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let response = self
            .client
            .post(self.url(table))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let mut rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        rows.pop()
            .ok_or_else(|| BackendError::Parse(format!("empty insert response from {table}")))
    }

    /// PATCH the rows matched by the query.
    async fn patch_rows<B: Serialize + Sync>(
        &self,
        path_and_query: &str,
        body: &B,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .patch(self.url(path_and_query))
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

impl CommerceBackend for ApiClient {
    #[instrument(skip(self), fields(store_id = %store_id))]
    async fn fetch_products(&self, store_id: StoreId) -> Result<Vec<Product>, BackendError> {
        self.get_rows(&format!("products?store_id=eq.{store_id}&select=*"))
            .await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        let mut rows: Vec<Product> = self.get_rows(&format!("products?id=eq.{id}")).await?;
        Ok(rows.pop())
    }

    #[instrument(skip(self), fields(code = %code))]
    async fn fetch_product_by_barcode(
        &self,
        code: &Barcode,
    ) -> Result<Option<Product>, BackendError> {
        let mut rows: Vec<Product> = self
            .get_rows(&format!("products?barcode=eq.{code}"))
            .await?;
        Ok(rows.pop())
    }

    #[instrument(skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<String>, BackendError> {
        #[derive(serde::Deserialize)]
        struct CategoryRow {
            name: String,
        }

        let rows: Vec<CategoryRow> = self
            .get_rows("categories?select=name&order=sort_order")
            .await?;
        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    #[instrument(skip(self))]
    async fn fetch_stores(&self) -> Result<Vec<Store>, BackendError> {
        self.get_rows("stores?is_active=eq.true&order=name").await
    }

    #[instrument(skip(self), fields(user_id = %user_id, store_id = %store_id))]
    async fn create_cart(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<CartRow, BackendError> {
        #[derive(serde::Serialize)]
        struct NewCart {
            user_id: UserId,
            store_id: StoreId,
            status: CartStatus,
            #[serde(flatten)]
            totals: CartTotals,
        }

        self.insert_row(
            "carts",
            &NewCart {
                user_id,
                store_id,
                status: CartStatus::Pending,
                totals: CartTotals::zero(),
            },
        )
        .await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn fetch_cart(&self, cart_id: CartId) -> Result<CartRow, BackendError> {
        let mut rows: Vec<CartRow> = self.get_rows(&format!("carts?id=eq.{cart_id}")).await?;
        rows.pop()
            .ok_or_else(|| BackendError::NotFound(format!("cart {cart_id}")))
    }

    #[instrument(skip(self, totals), fields(cart_id = %cart_id))]
    async fn update_cart_totals(
        &self,
        cart_id: CartId,
        totals: &CartTotals,
    ) -> Result<(), BackendError> {
        self.patch_rows(&format!("carts?id=eq.{cart_id}"), totals)
            .await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, status = ?status))]
    async fn update_cart_status(
        &self,
        cart_id: CartId,
        status: CartStatus,
    ) -> Result<(), BackendError> {
        #[derive(serde::Serialize)]
        struct StatusPatch {
            status: CartStatus,
        }

        self.patch_rows(&format!("carts?id=eq.{cart_id}"), &StatusPatch { status })
            .await
    }

    #[instrument(skip(self, item), fields(cart_id = %item.cart_id, product_id = %item.product_id))]
    async fn insert_cart_item(&self, item: &NewCartItem) -> Result<CartItemRow, BackendError> {
        self.insert_row("cart_items", item).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItemRow>, BackendError> {
        self.get_rows(&format!("cart_items?cart_id=eq.{cart_id}&order=id"))
            .await
    }

    #[instrument(skip(self, payment), fields(cart_id = %payment.cart_id))]
    async fn create_payment(&self, payment: &NewPayment) -> Result<PaymentRow, BackendError> {
        self.insert_row("payments", payment).await
    }

    #[instrument(skip(self, receipt), fields(cart_id = %receipt.cart_id))]
    async fn create_receipt(&self, receipt: &NewReceipt) -> Result<ReceiptRow, BackendError> {
        self.insert_row("receipts", receipt).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn client() -> ApiClient {
        ApiClient::new(&BackendConfig {
            url: "https://api.kirana.test/".to_string(),
            api_key: SecretString::from("k1r4n4-anon-key"),
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = client();
        assert_eq!(
            client.url("products?id=eq.1"),
            "https://api.kirana.test/rest/v1/products?id=eq.1"
        );
    }

    #[test]
    fn test_invalid_api_key_is_rejected() {
        let result = ApiClient::new(&BackendConfig {
            url: "https://api.kirana.test".to_string(),
            api_key: SecretString::from("bad\nkey"),
        });
        assert!(matches!(result, Err(BackendError::Parse(_))));
    }

    #[test]
    fn test_fallback_worthiness() {
        assert!(
            BackendError::Api {
                status: 500,
                message: String::new()
            }
            .is_fallback_worthy()
        );
        assert!(!BackendError::NotFound("cart 1".to_string()).is_fallback_worthy());
    }
}
