pub(crate) mod transport;

pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

use crate::models::{Cake, CakeForm, CakePage, CakeSort, Role, TokenPair};
use crate::storage::CredentialStore;
use leptos::callback::{Callable, Callback};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shown when a failed request carries no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Kesalahan tidak diketahui. Silakan coba lagi nanti.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    Network,
    Http(u16),
    Parse,
    Storage,
}

#[derive(Clone, Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    /// `message` field of the error body, when the server sent one.
    pub server_message: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            server_message: None,
        }
    }

    pub fn network(e: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorKind::Network, e.to_string())
    }

    pub fn parse(e: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorKind::Parse, e.to_string())
    }

    pub fn storage(e: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorKind::Storage, e.to_string())
    }

    pub fn unauthorized() -> Self {
        Self::new(ApiErrorKind::Unauthorized, "Unauthorized")
    }

    /// Builds the error for a non-2xx response.
    pub fn from_response(res: &HttpResponse) -> Self {
        let server_message = serde_json::from_str::<serde_json::Value>(&res.body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .filter(|m| !m.trim().is_empty());

        let kind = if res.status == 401 {
            ApiErrorKind::Unauthorized
        } else {
            ApiErrorKind::Http(res.status)
        };
        let message = server_message
            .clone()
            .unwrap_or_else(|| format!("Request failed ({})", res.status));

        Self {
            kind,
            message,
            server_message,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// Text for a transient notification.
    pub fn user_message(&self) -> String {
        self.server_message
            .clone()
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    pub api_url: String,
    pub api_version: String,
}

impl EnvConfig {
    const DEFAULT_API_URL: &'static str = "http://localhost:8080";
    const DEFAULT_API_VERSION: &'static str = "v1";

    pub fn new() -> Self {
        let (api_url, api_version) = Self::lookup();
        Self {
            api_url: api_url.unwrap_or_else(|| Self::DEFAULT_API_URL.to_string()),
            api_version: api_version.unwrap_or_else(|| Self::DEFAULT_API_VERSION.to_string()),
        }
    }

    // We support BOTH `window.ENV.API_URL` and `window.ENV.api_url`.
    #[cfg(target_arch = "wasm32")]
    fn lookup() -> (Option<String>, Option<String>) {
        let Some(env) = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object())
        else {
            return (None, None);
        };

        let get = |keys: [&str; 2]| {
            keys.iter().find_map(|key| {
                js_sys::Reflect::get(&env, &(*key).into())
                    .ok()
                    .and_then(|v| v.as_string())
            })
        };

        (get(["API_URL", "api_url"]), get(["API_VERSION", "api_version"]))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn lookup() -> (Option<String>, Option<String>) {
        (
            std::env::var("API_URL").ok(),
            std::env::var("API_VERSION").ok(),
        )
    }

    /// `{api_url}/{api_version}`; every request path is appended to this.
    pub fn base_url(&self) -> String {
        let url = self.api_url.trim_end_matches('/');
        let version = self.api_version.trim_matches('/');
        if version.is_empty() {
            url.to_string()
        } else {
            format!("{url}/{version}")
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Query of `GET /cakes`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetCakesQuery {
    pub page: u32,
    pub limit: u32,
    pub name_filter: String,
    pub sort: CakeSort,
}

impl GetCakesQuery {
    fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("nameFilter".to_string(), self.name_filter.clone()),
            ("sort".to_string(), self.sort.to_string()),
        ]
    }
}

/// Request before credentials are attached.
#[derive(Clone, Debug)]
struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    /// Set once a 401 on this request has triggered a refresh.
    retried: bool,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    fn json(mut self, body: &impl Serialize) -> ApiResult<Self> {
        self.body = Some(serde_json::to_value(body).map_err(ApiError::parse)?);
        Ok(self)
    }

    fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

fn cake_path(id: &str) -> String {
    format!("/cakes/{}", urlencoding::encode(id))
}

/// HTTP client for the storefront API.
///
/// Authenticated calls attach `Authorization: Bearer <access>` when an access
/// token is stored. A 401 triggers one refresh-and-retry per request; if the
/// refresh fails the credentials are cleared, `on_session_expired` fires and
/// the original 401 is returned.
#[derive(Clone)]
pub struct ApiClient {
    config: EnvConfig,
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    on_session_expired: Option<Callback<()>>,
}

impl ApiClient {
    pub fn new(config: EnvConfig, credentials: CredentialStore) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport), credentials)
    }

    pub fn with_transport(
        config: EnvConfig,
        transport: Arc<dyn Transport>,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            config,
            transport,
            credentials,
            on_session_expired: None,
        }
    }

    /// Hook run after a failed refresh has cleared the session.
    pub fn on_session_expired(mut self, callback: Callback<()>) -> Self {
        self.on_session_expired = Some(callback);
        self
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.session().is_authenticated()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    fn decode<T: serde::de::DeserializeOwned>(res: &HttpResponse) -> ApiResult<T> {
        if !res.is_success() {
            return Err(ApiError::from_response(res));
        }
        serde_json::from_str(&res.body).map_err(ApiError::parse)
    }

    fn expect_success(res: &HttpResponse) -> ApiResult<()> {
        if res.is_success() {
            Ok(())
        } else {
            Err(ApiError::from_response(res))
        }
    }

    async fn send_raw(&self, req: &ApiRequest, bearer: Option<String>) -> ApiResult<HttpResponse> {
        self.transport
            .send(HttpRequest {
                method: req.method.clone(),
                url: self.url(&req.path),
                query: req.query.clone(),
                bearer,
                body: req.body.clone(),
            })
            .await
    }

    /// Sends `req` with the stored access token, refreshing once on 401.
    async fn execute(&self, mut req: ApiRequest) -> ApiResult<HttpResponse> {
        loop {
            let res = self
                .send_raw(&req, self.credentials.access_token())
                .await?;

            if res.status != 401 || req.retried {
                return Ok(res);
            }

            req.retried = true;
            log::info!("{} {} returned 401, refreshing session", req.method, req.path);

            if let Err(e) = self.refresh().await {
                log::warn!("session refresh failed: {e}");
                self.expire_session();
                return Ok(res);
            }
        }
    }

    fn expire_session(&self) {
        // clear() already logged; the session is gone either way.
        let _ = self.credentials.clear();
        if let Some(callback) = &self.on_session_expired {
            callback.run(());
        }
    }

    /// `POST /auths/login`. Stores the returned pair and returns the new role.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Option<Role>> {
        let req = ApiRequest::new(Method::POST, "/auths/login").json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;

        let res = self.send_raw(&req, None).await?;
        let pair: TokenPair = Self::decode(&res)?;
        let role = self.credentials.save(&pair.access_token, &pair.refresh_token)?;
        log::info!("logged in as {:?}", role);
        Ok(role)
    }

    /// `POST /auths/refresh` with the refresh token as bearer.
    pub async fn refresh(&self) -> ApiResult<Option<Role>> {
        let token = self
            .credentials
            .refresh_token()
            .ok_or_else(ApiError::unauthorized)?;

        let req = ApiRequest::new(Method::POST, "/auths/refresh");
        let res = self.send_raw(&req, Some(token)).await?;
        let pair: TokenPair = Self::decode(&res)?;
        let role = self.credentials.save(&pair.access_token, &pair.refresh_token)?;
        log::info!("session refreshed");
        Ok(role)
    }

    pub fn logout(&self) -> ApiResult<()> {
        self.credentials.clear()
    }

    pub async fn get_cakes(&self, query: &GetCakesQuery) -> ApiResult<CakePage> {
        let req = ApiRequest::new(Method::GET, "/cakes").query(query.to_pairs());
        let res = self.execute(req).await?;
        Self::decode(&res)
    }

    pub async fn get_cake(&self, id: &str) -> ApiResult<Cake> {
        let res = self
            .execute(ApiRequest::new(Method::GET, cake_path(id)))
            .await?;
        Self::decode(&res)
    }

    pub async fn create_cake(&self, form: &CakeForm) -> ApiResult<Cake> {
        let req = ApiRequest::new(Method::POST, "/cakes").json(form)?;
        let res = self.execute(req).await?;
        Self::decode(&res)
    }

    pub async fn edit_cake(&self, id: &str, form: &CakeForm) -> ApiResult<Cake> {
        let req = ApiRequest::new(Method::PUT, cake_path(id)).json(form)?;
        let res = self.execute(req).await?;
        Self::decode(&res)
    }

    pub async fn delete_cake(&self, id: &str) -> ApiResult<()> {
        let res = self
            .execute(ApiRequest::new(Method::DELETE, cake_path(id)))
            .await?;
        Self::expect_success(&res)
    }
}
