use super::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::Method;

/// A fully resolved outbound request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and hands back status + body. No retries, no auth logic.
///
/// Futures are not required to be `Send`: the browser fetch backend of
/// reqwest is single-threaded.
#[async_trait(?Send)]
pub trait Transport: Send + Sync {
    async fn send(&self, req: HttpRequest) -> ApiResult<HttpResponse>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransport;

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn send(&self, req: HttpRequest) -> ApiResult<HttpResponse> {
        let client = reqwest::Client::new();
        let mut builder = client
            .request(req.method, &req.url)
            .header("Content-Type", "application/json");

        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = req.bearer {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let res = builder.send().await.map_err(ApiError::network)?;
        let status = res.status().as_u16();
        let body = res.text().await.map_err(ApiError::network)?;
        Ok(HttpResponse { status, body })
    }
}
