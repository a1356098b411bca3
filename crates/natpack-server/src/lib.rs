//! Reference HTTP mirror for natpack bundle artifacts.
//!
//! Serves files below a data directory read-only: `GET` and `HEAD` on
//! `/{relative/path}` return the file with its Content-Length, so a data
//! directory laid out like a Maven repository works as a mirror for the
//! default URL template. `/health` answers with a small JSON body.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};

/// File-backed artifact mirror.
pub struct Mirror {
    data_dir: PathBuf,
    auth_token: Option<String>,
}

impl Mirror {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            auth_token: None,
        }
    }

    /// Require `Authorization: Bearer <token>` on artifact requests.
    #[must_use]
    pub fn with_auth_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Store `data` at `rel_path` below the data directory.
    pub fn publish(&self, rel_path: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        let path = resolve_artifact_path(&self.data_dir, rel_path).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid artifact path: {rel_path}"),
            )
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(path)
    }

    fn authorized(&self, req: &tiny_http::Request) -> bool {
        let Some(ref token) = self.auth_token else {
            return true;
        };
        let expected = format!("Bearer {token}");
        req.headers()
            .iter()
            .any(|h| h.field.equiv("Authorization") && h.value.as_str() == expected)
    }
}

/// Map a request path onto a file below `data_dir`.
///
/// Only plain path segments are accepted: `..`, `.`, empty segments,
/// backslashes and NUL bytes all reject the request. A query string is
/// ignored.
pub fn resolve_artifact_path(data_dir: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let rel = path.trim_start_matches('/');
    if rel.is_empty() || rel.contains(['\\', '\0']) {
        return None;
    }
    let mut resolved = data_dir.to_path_buf();
    for segment in rel.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return None;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => resolved.push(segment),
            _ => return None,
        }
    }
    Some(resolved)
}

fn respond_err(req: tiny_http::Request, code: u16, msg: &str) {
    let _ = req.respond(Response::from_string(msg).with_status_code(StatusCode(code)));
}

fn respond_json(req: tiny_http::Request, json: impl Into<Vec<u8>>) {
    let header = Header::from_bytes("Content-Type", "application/json").expect("valid header");
    let _ = req.respond(Response::from_data(json.into()).with_header(header));
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jar" | "zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn handle_artifact(mirror: &Mirror, req: tiny_http::Request, url: &str) {
    let Some(path) = resolve_artifact_path(&mirror.data_dir, url) else {
        warn!("rejected path {url}");
        respond_err(req, 400, "invalid path");
        return;
    };
    if !mirror.authorized(&req) {
        respond_err(req, 401, "unauthorized");
        return;
    }
    if !path.is_file() {
        respond_err(req, 404, "not found");
        return;
    }
    match fs::File::open(&path) {
        Ok(file) => {
            let header = Header::from_bytes("Content-Type", content_type_for(&path))
                .expect("valid header");
            info!("{} {url}", req.method());
            // tiny_http takes the Content-Length from the file metadata and
            // omits the body for HEAD.
            let _ = req.respond(Response::from_file(file).with_header(header));
        }
        Err(e) => {
            warn!("open {}: {e}", path.display());
            respond_err(req, 500, "read error");
        }
    }
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(mirror: &Mirror, req: tiny_http::Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    match method {
        Method::Get if url == "/health" => {
            respond_json(req, serde_json::json!({ "status": "ok" }).to_string());
        }
        Method::Get | Method::Head => handle_artifact(mirror, req, &url),
        _ => respond_err(req, 405, "method not allowed"),
    }
}

/// Start the server loop, blocking the current thread.
pub fn run_server(
    mirror: &Arc<Mirror>,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let server = Server::http(addr)?;
    for request in server.incoming_requests() {
        handle_request(mirror, request);
    }
    Ok(())
}

/// A test helper that starts a natpack-server on a random port in a background thread.
///
/// The server listens on `127.0.0.1:{port}` and serves files from `data_dir`.
/// Dropping the `TestServer` unblocks the accept loop.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    pub mirror: Arc<Mirror>,
    server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server. Binds to `127.0.0.1:0` (random port).
    pub fn start(data_dir: PathBuf) -> Self {
        Self::start_with(Mirror::new(data_dir))
    }

    pub fn start_with(mirror: Mirror) -> Self {
        fs::create_dir_all(mirror.data_dir()).expect("failed to create test data dir");
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let mirror = Arc::new(mirror);
        let srv = Arc::clone(&server);
        let served = Arc::clone(&mirror);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&served, request);
            }
        });

        Self {
            url,
            port,
            mirror,
            server,
            _handle: handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_maven_style_path() {
        let path = resolve_artifact_path(
            Path::new("/srv/mirror"),
            "/jcef-natives-linux-amd64/r1/jcef-natives-linux-amd64-r1.jar",
        )
        .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/srv/mirror/jcef-natives-linux-amd64/r1/jcef-natives-linux-amd64-r1.jar")
        );
    }

    #[test]
    fn query_string_is_ignored() {
        let path = resolve_artifact_path(Path::new("/d"), "/a/b.jar?x=1").unwrap();
        assert_eq!(path, PathBuf::from("/d/a/b.jar"));
    }

    #[test]
    fn traversal_is_rejected() {
        let base = Path::new("/d");
        assert!(resolve_artifact_path(base, "/../etc/passwd").is_none());
        assert!(resolve_artifact_path(base, "/a/../../b").is_none());
        assert!(resolve_artifact_path(base, "/a/./b").is_none());
        assert!(resolve_artifact_path(base, "/a//b").is_none());
        assert!(resolve_artifact_path(base, "/a\\..\\b").is_none());
        assert!(resolve_artifact_path(base, "/").is_none());
    }

    #[test]
    fn publish_writes_below_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = Mirror::new(dir.path().to_path_buf());
        let path = mirror.publish("x/y/z.jar", b"zip").unwrap();
        assert_eq!(path, dir.path().join("x/y/z.jar"));
        assert_eq!(fs::read(path).unwrap(), b"zip");
        assert!(mirror.publish("../escape.jar", b"no").is_err());
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("a.jar")), "application/zip");
        assert_eq!(content_type_for(Path::new("a.tar.gz")), "application/gzip");
        assert_eq!(
            content_type_for(Path::new("a.bin")),
            "application/octet-stream"
        );
    }
}
