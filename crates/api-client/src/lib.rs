use crate::error::ApiError;
use crate::pagination::next_page_url;
use async_trait::async_trait;
use chrono::NaiveDate;
use configuration::ShopifyConfig;
use core_types::{FetchMode, Product};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, LINK};

pub mod error;
pub mod pagination;
pub mod responses;

// --- Public API ---
pub use responses::{ProductsPage, RawProduct};

/// The abstract interface for a product catalog.
/// The tracker only talks to this trait, so the live Shopify client can be swapped
/// for a scripted one in tests.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches every product matching the source's fetch mode for `target_date`.
    async fn fetch_products(&self, target_date: NaiveDate) -> Result<Vec<Product>, ApiError>;
}

/// A catalog client for the Shopify Admin REST API.
#[derive(Clone)]
pub struct ShopifyClient {
    client: reqwest::Client,
    base_url: String,
    fetch_mode: FetchMode,
    page_limit: u32,
}

impl ShopifyClient {
    pub fn new(config: &ShopifyConfig, fetch_mode: FetchMode) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(config.access_token.trim())
            .map_err(|_| ApiError::InvalidConfig("access token is not a valid header value".to_string()))?;
        token.set_sensitive(true);
        headers.insert("X-Shopify-Access-Token", token);

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: format!(
                "https://{}/admin/api/{}",
                config.store.trim().trim_end_matches('/'),
                config.api_version
            ),
            fetch_mode,
            page_limit: config.page_limit,
        })
    }

    /// Points the client at a different API root (a proxy or a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query parameters for the first page. Follow-up pages use the `Link` URL as-is.
    fn initial_query(&self, target_date: NaiveDate) -> Vec<(&'static str, String)> {
        let mut query = vec![("limit", self.page_limit.to_string())];
        if self.fetch_mode.filters_by_date() {
            let (start, end) = created_at_window(target_date);
            query.push(("created_at_min", start));
            query.push(("created_at_max", end));
        }
        if self.fetch_mode.active_only() {
            query.push(("status", "active".to_string()));
        }
        query
    }
}

/// The whole UTC day of `date`, in the form the Admin API expects.
fn created_at_window(date: NaiveDate) -> (String, String) {
    (
        format!("{}T00:00:00Z", date.format("%Y-%m-%d")),
        format!("{}T23:59:59.999999Z", date.format("%Y-%m-%d")),
    )
}

/// Applies the fetch mode's client-side filter to the fetched products.
///
/// Active modes keep products that are active or published, even if the server-side
/// status filter let something else through.
pub fn select_products(mode: FetchMode, products: Vec<Product>) -> Vec<Product> {
    if !mode.active_only() {
        return products;
    }
    let fetched = products.len();
    let active: Vec<Product> = products.into_iter().filter(Product::is_active).collect();
    tracing::info!("Fetched {} active products out of {} total.", active.len(), fetched);
    active
}

#[async_trait]
impl CatalogSource for ShopifyClient {
    async fn fetch_products(&self, target_date: NaiveDate) -> Result<Vec<Product>, ApiError> {
        tracing::info!(mode = %self.fetch_mode, date = %target_date, "Fetching products.");

        let mut url = format!("{}/products.json", self.base_url);
        let mut query = Some(self.initial_query(target_date));
        let mut products = Vec::new();
        let mut pages = 0usize;

        loop {
            let mut request = self.client.get(&url);
            if let Some(params) = query.take() {
                request = request.query(&params);
            }

            let response = request.send().await?;
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                tracing::error!("Unauthorized: invalid or expired Shopify access token.");
                return Err(ApiError::Unauthorized);
            }

            let next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_url);
            let text = response.text().await?;

            if !status.is_success() {
                return Err(ApiError::Http {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let page: ProductsPage =
                serde_json::from_str(&text).map_err(|e| ApiError::Deserialization(e.to_string()))?;
            pages += 1;
            tracing::debug!(page = pages, count = page.products.len(), "Fetched catalog page.");
            products.extend(page.products.into_iter().map(Product::from));

            match next {
                Some(next_url) => url = next_url,
                None => break,
            }
        }

        if !self.fetch_mode.active_only() {
            tracing::info!("Fetched {} total products.", products.len());
        }
        Ok(select_products(self.fetch_mode, products))
    }
}
