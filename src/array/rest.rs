//! FlashBlade REST API client
//!
//! Implements [`ArrayClient`] over the array's management REST API.
//!
//! # API Endpoints
//!
//! - `POST /api/login` - Exchange an API token for a session token
//! - `GET /api/api_version` - Supported API versions
//! - `GET /api/<v>/arrays/space` - Array-wide space accounting
//! - `GET|POST|PATCH|DELETE /api/<v>/file-systems` - Filesystems
//! - `GET|POST|PATCH|DELETE /api/<v>/file-system-snapshots` - Snapshots
//!
//! Calls are never retried; a failed call surfaces as an [`ApiFault`].

use crate::config::DriverSettings;
use crate::domain::array::{
    ApiFault, ApiVersions, ArraySpace, FileSystem, FileSystemExport, FileSystemSnapshot,
    ItemList, SnapshotSuffix,
};
use crate::domain::ports::{ApiResult, ArrayClient};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::USER_AGENT;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Session header returned by login and sent on every later call
const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Header carrying the API token on login
const API_TOKEN_HEADER: &str = "api-token";

/// Newest API version this client speaks
const MAX_API_VERSION: (u32, u32) = (1, 8);

/// First API version that accepts a custom user agent
const USER_AGENT_API: &str = "1.5";

/// Driver identification sent as user agent
pub const USER_AGENT_BASE: &str = "OpenStack Manila";
pub const DRIVER_CLASS: &str = "FlashBladeShareDriver";

// =============================================================================
// Session State
// =============================================================================

#[derive(Debug, Default)]
struct Session {
    auth_token: Option<String>,
    api_version: Option<String>,
    user_agent: Option<String>,
}

/// REST client for one FlashBlade array
pub struct RestArrayClient {
    client: Client,
    base_url: String,
    session: Mutex<Session>,
}

impl RestArrayClient {
    /// Build a client for the management address in `settings`
    pub fn new(settings: &DriverSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url(&settings.management_address),
            session: Mutex::new(Session::default()),
        })
    }

    /// User agent announced to arrays that accept one
    pub fn user_agent() -> String {
        format!(
            "{} {}/{} ({}-{})",
            USER_AGENT_BASE,
            DRIVER_CLASS,
            crate::driver::capacity::DRIVER_VERSION,
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    fn url(&self, resource: &str) -> String {
        let session = self.session.lock();
        let version = session.api_version.as_deref().unwrap_or("1.0");
        format!("{}/api/{}/{}", self.base_url, version, resource)
    }

    /// Attach session headers
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let session = self.session.lock();
        let mut request = request;
        if let Some(token) = &session.auth_token {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }
        if let Some(agent) = &session.user_agent {
            request = request.header(USER_AGENT, agent);
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiFault::new(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| format!("HTTP {}", status));
        Err(ApiFault::with_status(status.as_u16(), body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiFault::new(format!("invalid response body: {}", e)))
    }

    /// List endpoints answer 404 when nothing matches
    async fn send_list<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ApiResult<ItemList<T>> {
        match self.send_json(request).await {
            Err(fault) if fault.status == Some(StatusCode::NOT_FOUND.as_u16()) => {
                Ok(ItemList::default())
            }
            other => other,
        }
    }

    async fn send_empty(&self, request: RequestBuilder) -> ApiResult<()> {
        self.send(request).await.map(|_| ())
    }
}

/// `https://<address>` unless the address already names a scheme
fn base_url(management_address: &str) -> String {
    if management_address.contains("://") {
        management_address.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", management_address)
    }
}

/// Pick the newest advertised version this client can speak
fn negotiate_version(versions: &ApiVersions) -> Option<String> {
    versions
        .versions
        .iter()
        .filter_map(|v| parse_version(v).map(|parsed| (parsed, v)))
        .filter(|(parsed, _)| *parsed <= MAX_API_VERSION)
        .max_by_key(|(parsed, _)| *parsed)
        .map(|(_, v)| v.clone())
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

// =============================================================================
// ArrayClient
// =============================================================================

#[async_trait]
impl ArrayClient for RestArrayClient {
    async fn login(&self, api_token: &str) -> ApiResult<()> {
        let response = self
            .send(
                self.client
                    .post(format!("{}/api/login", self.base_url))
                    .header(API_TOKEN_HEADER, api_token),
            )
            .await?;

        let auth_token = response
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ApiFault::new("login response carried no session token"))?;
        self.session.lock().auth_token = Some(auth_token);

        let versions = self.list_api_versions().await?;
        let version = negotiate_version(&versions)
            .ok_or_else(|| ApiFault::new("array supports no compatible API version"))?;

        let mut session = self.session.lock();
        if versions.supports(USER_AGENT_API) {
            session.user_agent = Some(Self::user_agent());
        }
        info!("Logged into array {} using API {}", self.base_url, version);
        session.api_version = Some(version);

        Ok(())
    }

    async fn list_api_versions(&self) -> ApiResult<ApiVersions> {
        self.send_json(self.client.get(format!("{}/api/api_version", self.base_url)))
            .await
    }

    async fn list_arrays_space(&self) -> ApiResult<ItemList<ArraySpace>> {
        self.send_json(self.client.get(self.url("arrays/space"))).await
    }

    async fn list_file_systems(&self, names: &[String]) -> ApiResult<ItemList<FileSystem>> {
        self.send_list(
            self.client
                .get(self.url("file-systems"))
                .query(&[("names", names.join(","))]),
        )
        .await
    }

    async fn create_file_systems(&self, file_system: &FileSystem) -> ApiResult<ItemList<FileSystem>> {
        debug!("POST file-systems {:?}", file_system.name);
        self.send_json(self.client.post(self.url("file-systems")).json(file_system))
            .await
    }

    async fn update_file_systems(&self, name: &str, attributes: &FileSystem) -> ApiResult<()> {
        debug!("PATCH file-systems {}", name);
        self.send_empty(
            self.client
                .patch(self.url("file-systems"))
                .query(&[("name", name)])
                .json(attributes),
        )
        .await
    }

    async fn delete_file_systems(&self, name: &str) -> ApiResult<()> {
        debug!("DELETE file-systems {}", name);
        self.send_empty(
            self.client
                .delete(self.url("file-systems"))
                .query(&[("name", name)]),
        )
        .await
    }

    /// Filesystems are exported under their own name once a protocol is
    /// enabled, so this only confirms the filesystem exists.
    async fn add_file_system_export(
        &self,
        name: &str,
        permissions: &[String],
    ) -> ApiResult<FileSystemExport> {
        let listed = self.list_file_systems(&[name.to_string()]).await?;
        if listed.items.is_empty() {
            return Err(ApiFault::with_status(
                400,
                format!("file system '{}' does not exist", name),
            ));
        }

        Ok(FileSystemExport {
            name: name.to_string(),
            export_path: name.to_string(),
            permissions: permissions.to_vec(),
        })
    }

    async fn list_file_system_snapshots(
        &self,
        filter: &str,
    ) -> ApiResult<ItemList<FileSystemSnapshot>> {
        self.send_list(
            self.client
                .get(self.url("file-system-snapshots"))
                .query(&[("filter", filter)]),
        )
        .await
    }

    async fn create_file_system_snapshots(
        &self,
        sources: &[String],
        suffix: &SnapshotSuffix,
    ) -> ApiResult<ItemList<FileSystemSnapshot>> {
        debug!("POST file-system-snapshots {:?} suffix {}", sources, suffix.suffix);
        self.send_json(
            self.client
                .post(self.url("file-system-snapshots"))
                .query(&[("sources", sources.join(","))])
                .json(suffix),
        )
        .await
    }

    async fn update_file_system_snapshots(
        &self,
        name: &str,
        attributes: &FileSystemSnapshot,
    ) -> ApiResult<()> {
        debug!("PATCH file-system-snapshots {}", name);
        self.send_empty(
            self.client
                .patch(self.url("file-system-snapshots"))
                .query(&[("name", name)])
                .json(attributes),
        )
        .await
    }

    async fn delete_file_system_snapshots(&self, name: &str) -> ApiResult<()> {
        debug!("DELETE file-system-snapshots {}", name);
        self.send_empty(
            self.client
                .delete(self.url("file-system-snapshots"))
                .query(&[("name", name)]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;

    fn versions(list: &[&str]) -> ApiVersions {
        ApiVersions {
            versions: list.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_negotiate_version() {
        assert_eq!(
            negotiate_version(&versions(&["1.0", "1.10", "1.2", "1.8", "2.0"])),
            Some("1.8".to_string())
        );
        assert_eq!(
            negotiate_version(&versions(&["1.0", "1.5", "bogus"])),
            Some("1.5".to_string())
        );
        assert_eq!(negotiate_version(&versions(&["2.1"])), None);
    }

    #[test]
    fn test_user_agent() {
        let agent = RestArrayClient::user_agent();
        assert!(agent.starts_with("OpenStack Manila FlashBladeShareDriver/10.0 ("));
    }

    #[test]
    fn test_urls() {
        let settings = DriverConfig {
            flashblade_mgmt_vip: Some("fb.example".into()),
            flashblade_data_vip: Some("10.2.0.10".into()),
            flashblade_api: Some("T-1".into()),
            ..Default::default()
        }
        .settings()
        .unwrap();

        let client = RestArrayClient::new(&settings).unwrap();
        assert_eq!(client.url("file-systems"), "https://fb.example/api/1.0/file-systems");

        client.session.lock().api_version = Some("1.8".into());
        assert_eq!(client.url("arrays/space"), "https://fb.example/api/1.8/arrays/space");

        assert_eq!(base_url("http://127.0.0.1:8443/"), "http://127.0.0.1:8443");
    }

    // =========================================================================
    // HTTP exchanges
    // =========================================================================

    fn client_for(server: &mockito::Server) -> RestArrayClient {
        let settings = DriverConfig {
            flashblade_mgmt_vip: Some(server.url()),
            flashblade_data_vip: Some("10.2.0.10".into()),
            flashblade_api: Some("T-1".into()),
            ..Default::default()
        }
        .settings()
        .unwrap();
        RestArrayClient::new(&settings).unwrap()
    }

    async fn mock_login(
        server: &mut mockito::Server,
        versions: &str,
    ) -> (mockito::Mock, mockito::Mock) {
        let login = server
            .mock("POST", "/api/login")
            .match_header("api-token", "T-1")
            .with_status(200)
            .with_header("x-auth-token", "session-1")
            .create_async()
            .await;
        let api_version = server
            .mock("GET", "/api/api_version")
            .match_header("x-auth-token", "session-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"versions": {}}}"#, versions))
            .create_async()
            .await;
        (login, api_version)
    }

    #[tokio::test]
    async fn test_login_uses_session_token_and_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let (login, api_version) =
            mock_login(&mut server, r#"["1.0", "1.5", "1.8", "2.0"]"#).await;
        let list = server
            .mock("GET", "/api/1.8/file-systems")
            .match_header("x-auth-token", "session-1")
            .match_header(
                "user-agent",
                mockito::Matcher::Regex("^OpenStack Manila FlashBladeShareDriver/10.0 ".into()),
            )
            .match_query(mockito::Matcher::UrlEncoded(
                "names".into(),
                "share-a-manila".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": [{"name": "share-a-manila", "provisioned": 1073741824}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client.login("T-1").await.unwrap();
        let listed = client
            .list_file_systems(&["share-a-manila".to_string()])
            .await
            .unwrap();

        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].provisioned, Some(1 << 30));
        login.assert_async().await;
        api_version.assert_async().await;
        list.assert_async().await;
    }

    #[tokio::test]
    async fn test_user_agent_requires_api_1_5() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_login(&mut server, r#"["1.0", "1.4"]"#).await;

        let client = client_for(&server);
        client.login("T-1").await.unwrap();

        let session = client.session.lock();
        assert_eq!(session.api_version.as_deref(), Some("1.4"));
        assert!(session.user_agent.is_none());
        assert_eq!(session.auth_token.as_deref(), Some("session-1"));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/api/login")
            .with_status(401)
            .with_body("invalid api token")
            .create_async()
            .await;

        let client = client_for(&server);
        let fault = client.login("T-1").await.unwrap_err();
        assert_eq!(fault.status, Some(401));
        assert!(client.session.lock().auth_token.is_none());
    }

    #[tokio::test]
    async fn test_list_not_found_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let file_systems = server
            .mock("GET", "/api/1.0/file-systems")
            .match_query(mockito::Matcher::UrlEncoded("names".into(), "ghost".into()))
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;
        let snapshots = server
            .mock("GET", "/api/1.0/file-system-snapshots")
            .match_query(mockito::Matcher::UrlEncoded(
                "filter".into(),
                "source='share-a-manila' and suffix='s1'".into(),
            ))
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let listed = client.list_file_systems(&["ghost".to_string()]).await.unwrap();
        assert!(listed.items.is_empty());
        let listed = client
            .list_file_system_snapshots("source='share-a-manila' and suffix='s1'")
            .await
            .unwrap();
        assert!(listed.items.is_empty());

        file_systems.assert_async().await;
        snapshots.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_becomes_fault() {
        let mut server = mockito::Server::new_async().await;
        let _patch = server
            .mock("PATCH", "/api/1.0/file-systems")
            .match_query(mockito::Matcher::UrlEncoded("name".into(), "share-a-manila".into()))
            .with_status(500)
            .with_body("array busy")
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/api/1.0/file-systems")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("array busy")
            .create_async()
            .await;

        let client = client_for(&server);
        let fault = client
            .update_file_systems("share-a-manila", &FileSystem::default())
            .await
            .unwrap_err();
        assert_eq!(fault.status, Some(500));
        assert_eq!(fault.message, "array busy");

        // Only 404 is read as an empty list
        let fault = client.list_file_systems(&["x".to_string()]).await.unwrap_err();
        assert_eq!(fault.status, Some(500));
    }

    #[tokio::test]
    async fn test_create_snapshot_request() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/api/1.0/file-system-snapshots")
            .match_query(mockito::Matcher::UrlEncoded(
                "sources".into(),
                "share-a-manila".into(),
            ))
            .match_body(mockito::Matcher::Json(serde_json::json!({"suffix": "snap-1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items": [{"name": "share-a-manila,snap-1", "source": "share-a-manila", "suffix": "snap-1"}]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let created = client
            .create_file_system_snapshots(
                &["share-a-manila".to_string()],
                &SnapshotSuffix::new("snap-1"),
            )
            .await
            .unwrap();

        assert_eq!(created.items[0].name.as_deref(), Some("share-a-manila,snap-1"));
        create.assert_async().await;
    }
}
