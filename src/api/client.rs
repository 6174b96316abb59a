use log::debug;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Fixed message shown whenever the backend cannot be reached at all, no
/// matter what the underlying transport error was.
pub const UNREACHABLE: &str = "cannot connect to the backend server";

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {text}")]
    Status { status: u16, text: String },

    /// The request itself failed (refused connection, DNS, timeout).
    #[error("{}", UNREACHABLE)]
    Connect(#[source] reqwest::Error),

    /// The backend answered 2xx but the body was not the expected JSON.
    #[error("failed to decode backend response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// HTTP client for the SwiftApply backend. Normalizes the base URL once,
/// stamps the default headers on every request, and maps failures into
/// [`ApiError`]. A 2xx body is returned verbatim: a `success: false`
/// payload is NOT an error at this layer, callers check the flag.
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: normalize_base(base_url),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base, endpoint)
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        debug!("GET {}", self.url(endpoint));
        self.execute(self.http.get(self.url(endpoint)).headers(default_headers()))
            .await
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", self.url(endpoint));
        self.execute(
            self.http
                .post(self.url(endpoint))
                .headers(default_headers())
                .json(body),
        )
        .await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("PUT {}", self.url(endpoint));
        self.execute(
            self.http
                .put(self.url(endpoint))
                .headers(default_headers())
                .json(body),
        )
        .await
    }

    pub async fn patch<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("PATCH {}", self.url(endpoint));
        self.execute(
            self.http
                .patch(self.url(endpoint))
                .headers(default_headers())
                .json(body),
        )
        .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        debug!("DELETE {}", self.url(endpoint));
        self.execute(self.http.delete(self.url(endpoint)).headers(default_headers()))
            .await
    }

    /// Raw download, used by the CSV export.
    pub async fn get_bytes(&self, endpoint: &str) -> Result<Vec<u8>, ApiError> {
        debug!("GET {} (raw)", self.url(endpoint));
        let response = self
            .http
            .get(self.url(endpoint))
            .headers(default_headers())
            .send()
            .await
            .map_err(ApiError::Connect)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(ApiError::Decode)
    }

    /// Multipart upload, used by the CSV import. The multipart encoder owns
    /// the content type, so only the tunnel header is stamped here.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        debug!("POST {} (multipart)", self.url(endpoint));
        self.execute(
            self.http
                .post(self.url(endpoint))
                .header(tunnel_header(), HeaderValue::from_static("true"))
                .multipart(form),
        )
        .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(ApiError::Connect)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        response.json::<T>().await.map_err(ApiError::Decode)
    }
}

/// The base URL always ends in a single `/api` segment, whatever the
/// configured value looks like.
fn normalize_base(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.ends_with("/api") {
        trimmed.to_string()
    } else {
        format!("{}/api", trimmed)
    }
}

fn status_error(status: StatusCode) -> ApiError {
    ApiError::Status {
        status: status.as_u16(),
        text: status.canonical_reason().unwrap_or("Unknown Error").to_string(),
    }
}

fn tunnel_header() -> HeaderName {
    // Keeps the ngrok tunnel from answering with its interstitial page.
    HeaderName::from_static("ngrok-skip-browser-warning")
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(tunnel_header(), HeaderValue::from_static("true"));
    headers
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Answers exactly one request with a canned HTTP/1.1 response.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[test]
    fn base_url_always_ends_in_api() {
        assert_eq!(normalize_base("http://x"), "http://x/api");
        assert_eq!(normalize_base("http://x/"), "http://x/api");
        assert_eq!(normalize_base("http://x/api"), "http://x/api");
        assert_eq!(normalize_base("http://x/api/"), "http://x/api");
    }

    #[tokio::test]
    async fn server_error_surfaces_status_code() {
        let base = serve_once("500 Internal Server Error", "{}").await;
        let client = ApiClient::new(&base);

        let err = client.get::<Value>("/jobs/statistics").await.unwrap_err();

        assert!(matches!(err, ApiError::Status { status: 500, .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn unreachable_backend_maps_to_fixed_message() {
        // Bind then drop, so the port is known to refuse connections.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(&format!("http://{}", addr));
        let err = client.get::<Value>("/jobs/statistics").await.unwrap_err();

        assert!(matches!(err, ApiError::Connect(_)));
        assert_eq!(err.to_string(), UNREACHABLE);
    }

    #[tokio::test]
    async fn success_false_payload_is_returned_not_thrown() {
        let base = serve_once("200 OK", r#"{"success":false,"error":"x"}"#).await;
        let client = ApiClient::new(&base);

        let value: Value = client.get("/auto-apply/start").await.unwrap();

        assert_eq!(value["success"], Value::Bool(false));
        assert_eq!(value["error"], "x");
    }
}
