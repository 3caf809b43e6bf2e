//! HTTP client for endpoints and captured requests

use super::ApiError;
use hookscope_common::{
    constants, CapturedRequest, ClearedRequests, CreateEndpoint, Endpoint, EndpointId,
    ErrorBody, RequestId, RequestsPage, UpdateEndpoint,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client for the server's `/api` routes
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(server_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            base_url: server_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Public URL webhooks for `slug` should be sent to
    pub fn webhook_url(&self, slug: &str) -> String {
        format!("{}{}/{}", self.base_url, constants::HOOK_PREFIX, slug)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, constants::API_PREFIX, path)
    }

    pub async fn list_endpoints(&self) -> Result<Vec<Endpoint>, ApiError> {
        // An empty Go slice is encoded as null
        let endpoints: Option<Vec<Endpoint>> =
            self.fetch(self.client.get(self.url("/endpoints"))).await?;
        Ok(endpoints.unwrap_or_default())
    }

    pub async fn get_endpoint(&self, id: EndpointId) -> Result<Endpoint, ApiError> {
        self.fetch(self.client.get(self.url(&format!("/endpoints/{}", id))))
            .await
    }

    pub async fn create_endpoint(&self, body: &CreateEndpoint) -> Result<Endpoint, ApiError> {
        self.fetch(self.client.post(self.url("/endpoints")).json(body))
            .await
    }

    pub async fn update_endpoint(
        &self,
        id: EndpointId,
        body: &UpdateEndpoint,
    ) -> Result<Endpoint, ApiError> {
        self.fetch(
            self.client
                .put(self.url(&format!("/endpoints/{}", id)))
                .json(body),
        )
        .await
    }

    pub async fn delete_endpoint(&self, id: EndpointId) -> Result<(), ApiError> {
        self.send(
            self.client
                .delete(self.url(&format!("/endpoints/{}", id))),
        )
        .await?;
        Ok(())
    }

    /// One page of an endpoint's requests, newest first
    pub async fn list_requests(
        &self,
        endpoint: EndpointId,
        limit: u32,
        offset: u32,
    ) -> Result<RequestsPage, ApiError> {
        let limit = limit.clamp(1, constants::MAX_PAGE_SIZE);
        tracing::debug!("Listing requests for endpoint {} (limit {}, offset {})", endpoint, limit, offset);

        self.fetch(
            self.client
                .get(self.url(&format!("/endpoints/{}/requests", endpoint)))
                .query(&[("limit", limit), ("offset", offset)]),
        )
        .await
    }

    pub async fn get_request(&self, id: RequestId) -> Result<CapturedRequest, ApiError> {
        self.fetch(self.client.get(self.url(&format!("/requests/{}", id))))
            .await
    }

    /// Delete every captured request of an endpoint, returning how many went
    pub async fn clear_requests(&self, endpoint: EndpointId) -> Result<u64, ApiError> {
        let cleared: ClearedRequests = self
            .fetch(
                self.client
                    .delete(self.url(&format!("/endpoints/{}/requests", endpoint))),
            )
            .await?;
        Ok(cleared.deleted)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        Ok(self.send(request).await?.json().await?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) if !text.trim().is_empty() => text.trim().to_string(),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };

        tracing::debug!("API error {}: {}", status, message);
        Err(ApiError::Server { status, message })
    }
}
