//! HTTP client for the gallery REST API.
//!
//! Every request carries `Authorization: Bearer <id token>`; the token is
//! handed in per call so that it is always read fresh from the session.

use reqwest::{multipart::Form, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::ServiceError;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json")
            .header("User-Agent", "Curator")
    }

    /// Send a request and turn non-success statuses into `ServiceError::Api`.
    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Response, ServiceError> {
        let response = builder.send().await.map_err(|source| ServiceError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        debug!(path = %path, status = %status.as_u16(), "API response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                path: path.to_string(),
                status,
                body,
            });
        }

        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ServiceError> {
        response.json().await.map_err(|source| ServiceError::Transport {
            path: path.to_string(),
            source,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, ServiceError> {
        let response = self.send(self.request(Method::GET, path, token), path).await?;
        Self::parse(response, path).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let response = self
            .send(self.request(Method::POST, path, token).json(body), path)
            .await?;
        Self::parse(response, path).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let response = self
            .send(self.request(Method::PUT, path, token).json(body), path)
            .await?;
        Self::parse(response, path).await
    }

    /// DELETE; the response body is ignored.
    pub async fn delete(&self, token: &str, path: &str) -> Result<(), ServiceError> {
        self.send(self.request(Method::DELETE, path, token), path)
            .await?;
        Ok(())
    }

    /// POST a multipart form; the response body is ignored.
    pub async fn post_multipart(&self, token: &str, path: &str, form: Form) -> Result<(), ServiceError> {
        self.send(self.request(Method::POST, path, token).multipart(form), path)
            .await?;
        Ok(())
    }
}

/// Escape a resource id for use as a single path segment.
pub(crate) fn segment(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("https://api.example.com/prod/");
        assert_eq!(client.base_url(), "https://api.example.com/prod");
    }

    #[test]
    fn test_segment_escaping() {
        assert_eq!(segment("abc-123"), "abc-123");
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
    }
}
