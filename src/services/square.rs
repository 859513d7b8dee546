// SPDX-License-Identifier: MIT

//! Square API client: merchant OAuth and catalog lookups.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

const SQUARE_BASE_URL: &str = "https://connect.squareup.com";

/// OAuth scopes requested for the merchant connection.
const OAUTH_SCOPES: &str =
    "MERCHANT_PROFILE_READ,ITEMS_READ,EMPLOYEES_READ,ORDERS_READ,PAYMENTS_READ,TIMECARDS_WRITE";

/// Default number of catalog items returned by a search.
const CATALOG_SEARCH_LIMIT: u32 = 5;

/// Square API client.
///
/// Unlike most vendor clients there are no app-level credentials here: each
/// merchant supplies their own app id/secret, stored on their user record.
#[derive(Clone)]
pub struct SquareService {
    http: reqwest::Client,
    base_url: String,
}

/// Tokens returned by the OAuth code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct SquareTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub merchant_id: String,
}

/// A catalog item with its resolved image URL.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl SquareService {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: SQUARE_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (tests).
    #[doc(hidden)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Build the merchant authorization URL for the OAuth redirect.
    pub fn authorize_url(&self, app_id: &str, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/oauth2/authorize?client_id={}&scope={}&response_type=code&redirect_uri={}&state={}",
            self.base_url,
            urlencoding::encode(app_id),
            OAUTH_SCOPES,
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for merchant tokens.
    pub async fn exchange_code(
        &self,
        app_id: &str,
        app_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<SquareTokens, AppError> {
        let url = format!("{}/oauth2/token", self.base_url);
        let credentials = STANDARD.encode(format!("{}:{}", app_id, app_secret));

        let body = serde_json::json!({
            "grant_type": "authorization_code",
            "code": code,
            "redirect_uri": redirect_uri,
            "client_id": app_id,
            "client_secret": app_secret,
        });

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Basic {}", credentials))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::SquareApi(format!("Token exchange request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Search the merchant catalog by item name, resolving image URLs.
    pub async fn search_catalog_items(
        &self,
        access_token: &str,
        text: &str,
    ) -> Result<Vec<CatalogItem>, AppError> {
        let url = format!("{}/v2/catalog/search-catalog-items", self.base_url);

        let body = serde_json::json!({
            "text_filter": text,
            "limit": CATALOG_SEARCH_LIMIT,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::SquareApi(e.to_string()))?;

        let result: CatalogSearchResponse = self.check_response_json(response).await?;

        let mut items = Vec::new();
        for raw in result.items {
            if raw.r#type != "ITEM" {
                continue;
            }
            let Some(item_data) = raw.item_data else {
                continue;
            };

            // Resolve the first image, tolerating lookup failures: a broken
            // image reference should not hide the item.
            let image = match item_data.image_ids.first() {
                Some(image_id) => match self.get_image_url(access_token, image_id).await {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::warn!(error = %e, item_id = %raw.id, "Failed to resolve catalog image");
                        None
                    }
                },
                None => None,
            };

            items.push(CatalogItem {
                id: raw.id,
                name: item_data.name.unwrap_or_default(),
                description: item_data.description,
                image,
            });
        }

        Ok(items)
    }

    /// Fetch a catalog image object and return its URL.
    async fn get_image_url(
        &self,
        access_token: &str,
        object_id: &str,
    ) -> Result<Option<String>, AppError> {
        let url = format!("{}/v2/catalog/object/{}", self.base_url, object_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::SquareApi(e.to_string()))?;

        let result: CatalogObjectResponse = self.check_response_json(response).await?;

        Ok(result
            .object
            .filter(|o| o.r#type == "IMAGE")
            .and_then(|o| o.image_data)
            .map(|d| d.url))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SquareApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::SquareApi(format!("JSON parse error: {}", e)))
    }
}

impl Default for SquareService {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Wire types (Square REST, snake_case) ────────────────────────

#[derive(Deserialize)]
struct CatalogSearchResponse {
    #[serde(default)]
    items: Vec<CatalogObject>,
}

#[derive(Deserialize)]
struct CatalogObjectResponse {
    object: Option<CatalogObject>,
}

#[derive(Deserialize)]
struct CatalogObject {
    id: String,
    #[serde(rename = "type")]
    r#type: String,
    item_data: Option<ItemData>,
    image_data: Option<ImageData>,
}

#[derive(Deserialize)]
struct ItemData {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    image_ids: Vec<String>,
}

#[derive(Deserialize)]
struct ImageData {
    url: String,
}
