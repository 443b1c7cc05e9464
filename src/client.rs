use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use crate::config::Credentials;
use crate::error::{platform_message, require_non_blank, Error, Result};
use crate::vra::{
    ActionId, BearerToken, CatalogResource, Page, RequestStatus, ResourceAction, ResourceId,
    SnapshotRequest, TokenRequest, TokenResponse,
};

pub const USER_AGENT: &str = concat!("makeSnapshot ", env!("CARGO_PKG_VERSION"));

const TOKENS_PATH: &str = "/identity/api/tokens";
const RESOURCES_PATH: &str = "/catalog-service/api/consumer/resources";
const RESOURCE_PAGE_LIMIT: &str = "5000";

/// Thin wrapper over the vRA catalog and identity REST endpoints.
#[derive(Debug, Clone)]
pub struct VraClient {
    client: Client,
    base_url: String,
}

impl VraClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers)
            .build()?;

        Ok(VraClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip_all, fields(tenant = %credentials.tenant))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<BearerToken> {
        let full_url = format!("{}{}", self.base_url, TOKENS_PATH);
        let request_body = TokenRequest {
            username: credentials.login_name(),
            password: &credentials.password,
            tenant: &credentials.tenant,
        };

        debug!("Requesting bearer token: {}", full_url);
        let response = self
            .client
            .post(full_url)
            .json(&request_body)
            .send()
            .await?;

        let body = expect_status(response, StatusCode::OK).await?;
        let token: TokenResponse = decode("bearer token", &body)?;
        require_non_blank("bearerToken", &token.id)?;

        Ok(BearerToken::new(token.id, token.expires))
    }

    #[instrument(skip_all)]
    pub async fn list_resources(&self, token: &BearerToken) -> Result<Vec<CatalogResource>> {
        let full_url = format!("{}{}", self.base_url, RESOURCES_PATH);

        debug!("Requesting catalog resources: {}", full_url);
        let response = self
            .client
            .get(full_url)
            .header(AUTHORIZATION, token.authorization())
            .query(&[("page", "1"), ("limit", RESOURCE_PAGE_LIMIT)])
            .send()
            .await?;

        let body = expect_status(response, StatusCode::OK).await?;
        let page: Page<CatalogResource> = decode("catalog resources", &body)?;
        trace!("Received {} catalog resources", page.content.len());

        Ok(page.content)
    }

    #[instrument(skip(self, token))]
    pub async fn list_actions(
        &self,
        token: &BearerToken,
        resource: &ResourceId,
    ) -> Result<Vec<ResourceAction>> {
        let full_url = format!("{}{}/{}/actions/", self.base_url, RESOURCES_PATH, resource);

        debug!("Requesting resource actions: {}", full_url);
        let response = self
            .client
            .get(full_url)
            .header(AUTHORIZATION, token.authorization())
            .send()
            .await?;

        let body = expect_status(response, StatusCode::OK).await?;
        let page: Page<ResourceAction> = decode("resource actions", &body)?;
        trace!("Received {} resource actions", page.content.len());

        Ok(page.content)
    }

    /// Posts the snapshot request and returns the URL to poll for its state.
    #[instrument(skip(self, token, request))]
    pub async fn submit_snapshot_request(
        &self,
        token: &BearerToken,
        resource: &ResourceId,
        action: &ActionId,
        request: &SnapshotRequest,
    ) -> Result<String> {
        let full_url = format!(
            "{}{}/{}/actions/{}/requests/",
            self.base_url, RESOURCES_PATH, resource, action
        );

        debug!("Submitting snapshot request: {}", full_url);
        let response = self
            .client
            .post(full_url)
            .header(AUTHORIZATION, token.authorization())
            .json(request)
            .send()
            .await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_default();

        expect_status(response, StatusCode::CREATED).await?;
        require_non_blank("Resource Action Request URL", &location)?;

        Ok(self.resolve(location.trim()))
    }

    #[instrument(skip(self, token))]
    pub async fn request_state(&self, token: &BearerToken, status_url: &str) -> Result<String> {
        let response = self
            .client
            .get(status_url)
            .header(AUTHORIZATION, token.authorization())
            .send()
            .await?;

        let body = expect_status(response, StatusCode::OK).await?;
        let status: RequestStatus = decode("request status", &body)?;

        Ok(status.state_name)
    }

    fn resolve(&self, location: &str) -> String {
        if location.starts_with('/') {
            format!("{}{}", self.base_url, location)
        } else {
            location.to_string()
        }
    }
}

async fn expect_status(response: Response, expected: StatusCode) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;

    if status != expected {
        return Err(Error::UnexpectedStatus {
            status,
            message: platform_message(status, &body),
        });
    }

    Ok(body)
}

fn decode<T: DeserializeOwned>(what: &'static str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| Error::Decode { what, source })
}
