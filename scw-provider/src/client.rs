//! HTTP client for the Scaleway REST API

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use scw_core::provider::{ErrorKind, ProviderError, ProviderResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ScwConfig;

const AUTH_HEADER: &str = "X-Auth-Token";

/// Longest response body included in logs and error messages
const MAX_LOG_BODY_LENGTH: usize = 200;

fn truncate_for_log(body: &str) -> String {
    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();
    if cleaned.len() > MAX_LOG_BODY_LENGTH {
        format!(
            "{}... [truncated, {} bytes total]",
            &cleaned[..MAX_LOG_BODY_LENGTH],
            body.len()
        )
    } else {
        cleaned
    }
}

/// Error payload returned by Scaleway APIs
#[derive(Debug, Default, serde::Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    resource: Option<String>,
    resource_id: Option<String>,
}

impl ApiErrorBody {
    fn describe(&self, status: StatusCode) -> String {
        let mut message = match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => format!("{} ({})", message, kind),
            (None, Some(message)) => message.clone(),
            (Some(kind), None) => kind.clone(),
            (None, None) => status.to_string(),
        };
        if let Some(resource) = &self.resource {
            message.push_str(&format!(": {}", resource));
            if let Some(id) = &self.resource_id {
                message.push_str(&format!(" {}", id));
            }
        }
        message
    }
}

/// Thin JSON client. Every call is one request; waiting is the caller's job.
#[derive(Clone)]
pub struct ScwClient {
    http: Client,
    base_url: String,
    secret_key: Option<String>,
}

impl ScwClient {
    pub fn new(config: &ScwConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("scw-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::with_kind(ErrorKind::Configuration, "failed to build HTTP client")
                    .with_cause(e)
            })?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ProviderResult<T> {
        self.get_with_query(path, &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let request = self.request(Method::GET, path).query(query);
        let body = self.send(request, "GET", path).await?;
        decode(&body, path)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ProviderResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        let body = self.send(request, "POST", path).await?;
        decode(&body, path)
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ProviderResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH, path).json(body);
        let body = self.send(request, "PATCH", path).await?;
        decode(&body, path)
    }

    /// Full replacement of mutable fields, for APIs without PATCH
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ProviderResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, path).json(body);
        let body = self.send(request, "PUT", path).await?;
        decode(&body, path)
    }

    pub async fn delete(&self, path: &str) -> ProviderResult<()> {
        self.delete_with_query(path, &[]).await
    }

    pub async fn delete_with_query(&self, path: &str, query: &[(&str, String)]) -> ProviderResult<()> {
        let request = self.request(Method::DELETE, path).query(query);
        self.send(request, "DELETE", path).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.secret_key {
            Some(secret) => request.header(AUTH_HEADER, secret),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, method: &str, path: &str) -> ProviderResult<String> {
        log::debug!("{} {}", method, path);

        let response = request.send().await.map_err(|e| {
            ProviderError::new(format!("{} {} failed to send", method, path)).with_cause(e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::new(format!("{} {}: failed to read response body", method, path))
                .with_cause(e)
        })?;

        if status.is_success() {
            return Ok(body);
        }

        let error: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let message = format!("{} {}: {}", method, path, error.describe(status));
        if status == StatusCode::NOT_FOUND {
            log::debug!("{} {} returned 404", method, path);
            return Err(ProviderError::not_found(message));
        }

        log::debug!("API error: {} - {}", status, truncate_for_log(&body));
        Err(ProviderError::new(message))
    }
}

fn decode<T: DeserializeOwned>(body: &str, path: &str) -> ProviderResult<T> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| {
        ProviderError::new(format!(
            "failed to parse response of {}: {}",
            path,
            truncate_for_log(body)
        ))
        .with_cause(e)
    })
}
