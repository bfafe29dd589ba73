// API client module: a small blocking HTTP client for the Dropbox v1 style
// REST API. Every call is synchronous; transfers are orchestrated in
// `transfer`, interactive flows in `ui`.

use crate::config::Config;
use crate::error::{classify, ApiError, ApiResult, ErrorKind};
use crate::metadata::Metadata;
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Read;

const AUTHORIZE_URL: &str = "https://www.dropbox.com/1/oauth2/authorize";
const METADATA_FILE_LIMIT: &str = "10000";
const SEARCH_FILE_LIMIT: &str = "1000";

/// Blocking API client holding the reqwest client, the two service base
/// URLs and an optional bearer token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    api_url: String,
    content_url: String,
    token: Option<String>,
}

/// Response of the OAuth2 token exchange.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub uid: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Account {
    pub display_name: String,
    pub uid: u64,
    pub locale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Server state of an in-progress chunked upload.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkedUpload {
    pub upload_id: String,
    pub offset: u64,
    pub expires: String,
}

/// Outcome of a metadata request that may be answered from cache.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataResponse {
    Fresh(Metadata),
    NotModified,
}

/// Body of a file download. The `x-dropbox-metadata` header, when the
/// server sends one, is parsed into `metadata`.
pub struct Download {
    pub metadata: Option<Metadata>,
    response: Response,
}

impl Download {
    /// Size announced by the server, from the metadata header or
    /// `Content-Length`.
    pub fn expected_len(&self) -> Option<u64> {
        self.metadata
            .as_ref()
            .map(|m| m.bytes)
            .or_else(|| self.response.content_length())
    }
}

impl Read for Download {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.response.read(buf)
    }
}

/// Browser URL where the user grants access to the app `app_key`.
pub fn authorize_url(app_key: &str) -> ApiResult<String> {
    let mut url = Url::parse(AUTHORIZE_URL)
        .map_err(|e| ApiError::transport(format!("invalid authorize URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", app_key);
    Ok(url.into())
}

/// Build `base/<prefix...>/<remote path segments>`, percent-encoding each
/// segment. The root path keeps a trailing slash.
pub fn endpoint(base: &str, prefix: &[&str], remote: &str) -> ApiResult<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| ApiError::transport(format!("invalid service URL {}: {}", base, e)))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ApiError::transport(format!("service URL {} cannot hold a path", base)))?;
        segments.pop_if_empty().extend(prefix);
        let mut parts = remote.split('/').filter(|s| !s.is_empty()).peekable();
        if parts.peek().is_none() {
            segments.push("");
        } else {
            segments.extend(parts);
        }
    }
    Ok(url)
}

impl ApiClient {
    pub fn new(api_url: &str, content_url: &str) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("dbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(ApiClient {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            content_url: content_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Client for the endpoints and token found in `config` (environment
    /// overrides applied, see `Config::api_url`).
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        let mut api = ApiClient::new(&config.api_url(), &config.content_url())?;
        if config.has_token() {
            api.set_token(&config.access_token);
        }
        Ok(api)
    }

    /// Store a bearer token for subsequent authenticated requests.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Authorization header map; empty when no token is set.
    fn auth_headers(&self) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(t) = &self.token {
            let val = HeaderValue::from_str(&format!("Bearer {}", t)).map_err(|_| {
                ApiError::new(
                    ErrorKind::Unauthorized,
                    "access token contains characters not allowed in a header",
                )
            })?;
            headers.insert(AUTHORIZATION, val);
        }
        Ok(headers)
    }

    fn request(&self, method: Method, url: Url) -> ApiResult<RequestBuilder> {
        log::debug!("{} {}", method, url);
        Ok(self.client.request(method, url).headers(self.auth_headers()?))
    }

    /// Send and turn any non-success status into a classified error.
    fn send(&self, req: RequestBuilder, target: &str) -> ApiResult<Response> {
        let res = req.send()?;
        if res.status().is_success() {
            return Ok(res);
        }
        Err(failure(res, target))
    }

    fn fileop(&self, op: &str, form: &[(&str, &str)], target: &str) -> ApiResult<Metadata> {
        let url = endpoint(&self.api_url, &["1", "fileops", op], "")?;
        let url = strip_trailing_slash(url);
        let req = self.request(Method::POST, url)?.form(form);
        let res = self.send(req, target)?;
        parse_json(res, target)
    }

    /// Fetch metadata for `path`, listing folder contents. When
    /// `cached_hash` is given the server may answer 304.
    pub fn metadata(&self, path: &str, cached_hash: Option<&str>) -> ApiResult<MetadataResponse> {
        let url = endpoint(&self.api_url, &["1", "metadata", "auto"], path)?;
        let mut req = self.request(Method::GET, url)?.query(&[
            ("file_limit", METADATA_FILE_LIMIT),
            ("list", "true"),
            ("include_deleted", "false"),
        ]);
        if let Some(hash) = cached_hash {
            req = req.query(&[("hash", hash)]);
        }
        let res = req.send()?;
        match res.status() {
            StatusCode::NOT_MODIFIED => Ok(MetadataResponse::NotModified),
            s if s.is_success() => parse_json(res, path).map(MetadataResponse::Fresh),
            _ => Err(failure(res, path)),
        }
    }

    pub fn copy(&self, from_path: &str, to_path: &str) -> ApiResult<Metadata> {
        self.fileop(
            "copy",
            &[("root", "auto"), ("from_path", from_path), ("to_path", to_path)],
            to_path,
        )
    }

    pub fn move_entry(&self, from_path: &str, to_path: &str) -> ApiResult<Metadata> {
        self.fileop(
            "move",
            &[("root", "auto"), ("from_path", from_path), ("to_path", to_path)],
            to_path,
        )
    }

    pub fn create_folder(&self, path: &str) -> ApiResult<Metadata> {
        self.fileop("create_folder", &[("root", "auto"), ("path", path)], path)
    }

    pub fn delete(&self, path: &str) -> ApiResult<Metadata> {
        self.fileop("delete", &[("root", "auto"), ("path", path)], path)
    }

    /// Entries below `folder_path` whose names contain `query`.
    pub fn search(&self, folder_path: &str, query: &str) -> ApiResult<Vec<Metadata>> {
        let url = endpoint(&self.api_url, &["1", "search", "auto"], folder_path)?;
        let req = self.request(Method::GET, url)?.query(&[
            ("query", query),
            ("file_limit", SEARCH_FILE_LIMIT),
            ("include_deleted", "false"),
        ]);
        let res = self.send(req, folder_path)?;
        parse_json(res, folder_path)
    }

    pub fn account(&self) -> ApiResult<Account> {
        let url = strip_trailing_slash(endpoint(&self.api_url, &["1", "account", "info"], "")?);
        let res = self.send(self.request(Method::GET, url)?, "account")?;
        parse_json(res, "account")
    }

    /// Exchange an authorization code for an access token.
    pub fn exchange_code(&self, app_key: &str, app_secret: &str, code: &str) -> ApiResult<Token> {
        let url = strip_trailing_slash(endpoint(&self.api_url, &["1", "oauth2", "token"], "")?);
        log::debug!("POST {}", url);
        let res = self
            .client
            .post(url)
            .form(&[
                ("code", code),
                ("grant_type", "authorization_code"),
                ("client_id", app_key),
                ("client_secret", app_secret),
            ])
            .send()?;
        if res.status() == StatusCode::BAD_REQUEST {
            return Err(ApiError::new(
                ErrorKind::Unauthorized,
                "authorization code or app credentials rejected",
            ));
        }
        if !res.status().is_success() {
            return Err(failure(res, "token exchange"));
        }
        parse_json(res, "token exchange")
    }

    /// Start downloading `remote_path`; the body is read through the
    /// returned `Download`.
    pub fn download(&self, remote_path: &str) -> ApiResult<Download> {
        let url = endpoint(&self.content_url, &["1", "files", "auto"], remote_path)?;
        let response = self.send(self.request(Method::GET, url)?, remote_path)?;
        let metadata = response
            .headers()
            .get("x-dropbox-metadata")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| match Metadata::from_json(v) {
                Ok(m) => Some(m),
                Err(e) => {
                    log::warn!("ignoring malformed metadata header for {}: {}", remote_path, e);
                    None
                }
            });
        Ok(Download { metadata, response })
    }

    /// Upload `len` bytes from `body` in one request, overwriting
    /// `remote_path`.
    pub fn upload_direct<R>(&self, remote_path: &str, body: R, len: u64) -> ApiResult<Metadata>
    where
        R: Read + Send + 'static,
    {
        let url = endpoint(&self.content_url, &["1", "files_put", "auto"], remote_path)?;
        let req = self
            .request(Method::PUT, url)?
            .query(&[("overwrite", "true"), ("autorename", "true")])
            .body(Body::sized(body, len));
        let res = self.send(req, remote_path)?;
        parse_json(res, remote_path)
    }

    /// Send one chunk of a chunked upload. The first chunk has no
    /// `upload_id`; the server assigns one.
    pub fn upload_chunk(
        &self,
        upload_id: Option<&str>,
        offset: u64,
        chunk: Vec<u8>,
    ) -> ApiResult<ChunkedUpload> {
        let url = strip_trailing_slash(endpoint(&self.content_url, &["1", "chunked_upload"], "")?);
        let offset = offset.to_string();
        let mut req = self
            .request(Method::PUT, url)?
            .query(&[("offset", offset.as_str())]);
        if let Some(id) = upload_id {
            req = req.query(&[("upload_id", id)]);
        }
        let res = self.send(req.body(chunk), "chunked upload")?;
        parse_json(res, "chunked upload")
    }

    /// Finish a chunked upload, storing it at `remote_path`.
    pub fn commit_chunked_upload(&self, remote_path: &str, upload_id: &str) -> ApiResult<Metadata> {
        let url = endpoint(
            &self.content_url,
            &["1", "commit_chunked_upload", "auto"],
            remote_path,
        )?;
        let req = self.request(Method::POST, url)?.form(&[
            ("upload_id", upload_id),
            ("overwrite", "true"),
            ("autorename", "true"),
        ]);
        let res = self.send(req, remote_path)?;
        parse_json(res, remote_path)
    }
}

fn strip_trailing_slash(mut url: Url) -> Url {
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
    }
    url
}

fn failure(res: Response, target: &str) -> ApiError {
    let status = res.status();
    let body = res.text().unwrap_or_default();
    classify(status, target, &body)
}

fn parse_json<T: DeserializeOwned>(res: Response, target: &str) -> ApiResult<T> {
    let body = res.text()?;
    serde_json::from_str(&body)
        .map_err(|e| ApiError::transport(format!("malformed response for {}: {}", target, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_each_segment() {
        let url = endpoint(
            "https://api.example.com",
            &["1", "metadata", "auto"],
            "/My Photos/한글 #1.jpg",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/1/metadata/auto/My%20Photos/%ED%95%9C%EA%B8%80%20%231.jpg"
        );
    }

    #[test]
    fn endpoint_root_keeps_trailing_slash() {
        let url = endpoint("http://127.0.0.1:8080/", &["1", "metadata", "auto"], "/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/1/metadata/auto/");
    }

    #[test]
    fn authorize_url_carries_client_id() {
        assert_eq!(
            authorize_url("abc 123").unwrap(),
            "https://www.dropbox.com/1/oauth2/authorize?response_type=code&client_id=abc+123"
        );
    }

    #[test]
    fn token_sets_bearer_header() {
        let mut api = ApiClient::new("http://localhost", "http://localhost").unwrap();
        assert!(api.auth_headers().unwrap().is_empty());
        api.set_token("secret");
        assert!(api.has_token());
        assert_eq!(api.auth_headers().unwrap()[AUTHORIZATION], "Bearer secret");
    }

    #[test]
    fn invalid_token_is_unauthorized() {
        let mut api = ApiClient::new("http://localhost", "http://localhost").unwrap();
        api.set_token("bad\ntoken");
        assert_eq!(api.auth_headers().unwrap_err().kind, ErrorKind::Unauthorized);
    }
}
