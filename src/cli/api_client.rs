use std::env;

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::cli::error::{CliError, CliResult};

pub const API_URL_ENV: &str = "SVCMAP_API_URL";
pub const API_KEY_ENV: &str = "SVCMAP_API_KEY";
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// API client for the svcmap REST API
pub struct ApiClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// Priority for base URL and key:
    /// 1. Explicit parameter
    /// 2. `SVCMAP_API_URL` / `SVCMAP_API_KEY` environment variables
    /// 3. Default URL http://localhost:3000, no key
    pub fn new(api_url: Option<String>, api_key: Option<String>) -> Self {
        let base_url = api_url
            .or_else(|| env::var(API_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_key = api_key.or_else(|| env::var(API_KEY_ENV).ok());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client: Client::new(),
        }
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create an authenticated GET request builder
    pub fn get(&self, path: &str) -> CliResult<RequestBuilder> {
        let key = self.api_key.as_deref().ok_or(CliError::MissingApiKey)?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.get(&url).bearer_auth(key))
    }

    /// Handle API response with standardized error handling
    ///
    /// Returns the deserialized response body on success,
    /// or a CliError::ApiError carrying the server's message otherwise.
    pub async fn handle_response<T: DeserializeOwned>(response: Response) -> CliResult<T> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| CliError::InvalidResponse {
                    message: e.to_string(),
                })
        } else {
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            Err(CliError::ApiError { status, message })
        }
    }

    /// Send a GET request and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> CliResult<T> {
        let response = self.get(path)?.query(query).send().await?;
        Self::handle_response(response).await
    }
}
