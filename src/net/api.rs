use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected status {status} from {path}")]
    Status { path: String, status: u16 },
    #[error("invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid header {0}")]
    Header(String),
}

/// JSON-over-HTTP calls to the marketplace API. Paths are origin-relative.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<Value, ApiError>;

    async fn post_json(
        &self,
        path: &str,
        body: Value,
        headers: Vec<(String, String)>,
    ) -> Result<Value, ApiError>;
}

/// [`ApiClient`] backed by reqwest, resolving paths against a base URL.
#[derive(Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApiClient {
    pub fn new(base_url: Url, user_agent: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn read_json(path: &str, response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.base_url.join(path)?;
        tracing::debug!(target: "api", %url, "GET");
        let response = self.client.get(url).send().await?;
        Self::read_json(path, response).await
    }

    async fn post_json(
        &self,
        path: &str,
        body: Value,
        headers: Vec<(String, String)>,
    ) -> Result<Value, ApiError> {
        let url = self.base_url.join(path)?;
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::Header(name.clone()))?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|_| ApiError::Header(name.clone()))?;
            header_map.insert(header_name, header_value);
        }

        tracing::debug!(target: "api", %url, "POST");
        let response = self
            .client
            .post(url)
            .headers(header_map)
            .json(&body)
            .send()
            .await?;
        Self::read_json(path, response).await
    }
}
