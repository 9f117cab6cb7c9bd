//! # HTTP access to a directory.
//!
//! ```text
//! GET    /a/b.tgz   → file bytes (application/octet-stream), 404 if absent
//! GET    /a/b*      → names under root starting with "a/b", sorted, one per line
//! PUT    /a/b.tgz   → create parent dirs, write body, 201
//! DELETE /a/b.tgz   → remove, 200 (also when already absent)
//! other             → 405
//! ```
//!
//! Names in listings are relative to the storage root and use `/`. A listing
//! descends into every matching directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tokio::fs;
use tracing::debug;

use crate::storage::error::StorageError;

struct Backend {
    root: PathBuf,
}

/// Router serving the directory at `root`.
pub fn router(root: impl Into<PathBuf>) -> Router {
    let backend = Arc::new(Backend { root: root.into() });
    Router::new().fallback(handle).with_state(backend)
}

async fn handle(
    State(backend): State<Arc<Backend>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Response, StorageError> {
    let path = relative(uri.path())?;
    debug!(%method, path, "storage request");

    match method {
        Method::GET => match path.strip_suffix('*') {
            Some(prefix) => backend.list(prefix).await,
            None => backend.get(path).await,
        },
        Method::PUT => backend.put(path, body).await,
        Method::DELETE => backend.delete(path).await,
        other => Err(StorageError::MethodNotAllowed {
            method: other.to_string(),
        }),
    }
}

/// Strips the leading `/` and rejects paths leaving the root.
fn relative(path: &str) -> Result<&str, StorageError> {
    let rel = path.trim_start_matches('/');
    if rel.split('/').any(|seg| seg == ".." || seg.contains('\\')) {
        return Err(StorageError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(rel)
}

fn octet_stream(data: impl Into<axum::body::Body>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data.into(),
    )
        .into_response()
}

fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

impl Backend {
    fn file(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    async fn get(&self, rel: &str) -> Result<Response, StorageError> {
        let data = fs::read(self.file(rel))
            .await
            .map_err(|source| StorageError::NotFound {
                path: rel.to_string(),
                source,
            })?;
        Ok(octet_stream(data))
    }

    async fn list(&self, rel: &str) -> Result<Response, StorageError> {
        let not_found = |source| StorageError::NotFound {
            path: rel.to_string(),
            source,
        };
        let (dir, prefix) = rel.rsplit_once('/').unwrap_or(("", rel));

        let mut names = Vec::new();
        let mut pending = Vec::new();
        let mut entries = fs::read_dir(self.file(dir)).await.map_err(not_found)?;
        while let Some(entry) = entries.next_entry().await.map_err(not_found)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(prefix) {
                continue;
            }
            let name = join_rel(dir, &name);
            if entry.file_type().await.map_err(not_found)?.is_dir() {
                pending.push(name);
            } else {
                names.push(name);
            }
        }
        while let Some(sub) = pending.pop() {
            collect_files(&self.root, sub, &mut names, &mut pending)
                .await
                .map_err(not_found)?;
        }

        names.sort();
        Ok(octet_stream(names.join("\n")))
    }

    async fn put(&self, rel: &str, body: Bytes) -> Result<Response, StorageError> {
        let file = self.file(rel);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&file, &body).await?;
        Ok(StatusCode::CREATED.into_response())
    }

    async fn delete(&self, rel: &str) -> Result<Response, StorageError> {
        match fs::remove_file(self.file(rel)).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(StatusCode::OK.into_response())
    }
}

async fn collect_files(
    root: &Path,
    dir: String,
    names: &mut Vec<String>,
    pending: &mut Vec<String>,
) -> std::io::Result<()> {
    let mut entries = fs::read_dir(root.join(&dir)).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = join_rel(&dir, &entry.file_name().to_string_lossy());
        if entry.file_type().await?.is_dir() {
            pending.push(name);
        } else {
            names.push(name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(app: &Router, method: &str, uri: &str, body: &'static str) -> (StatusCode, String) {
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn put_get_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(dir.path());

        let (status, _) = call(&app, "PUT", "/tools/juju-1.0.tgz", "payload").await;
        assert_eq!(status, StatusCode::CREATED);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/tools/juju-1.0.tgz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );

        let (status, body) = call(&app, "GET", "/tools/juju-1.0.tgz", "").await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "payload"));

        let (status, _) = call(&app, "DELETE", "/tools/juju-1.0.tgz", "").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "DELETE", "/tools/juju-1.0.tgz", "").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, "GET", "/tools/juju-1.0.tgz", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_matches_prefix_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(dir.path());
        for path in [
            "/tools/juju-1.0.tgz",
            "/tools/juju-2.0.tgz",
            "/tools/other.tgz",
            "/tools/juju-dev/a",
            "/tools/juju-dev/nested/b",
            "/state",
        ] {
            let (status, _) = call(&app, "PUT", path, "x").await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = call(&app, "GET", "/tools/juju*", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            "tools/juju-1.0.tgz\ntools/juju-2.0.tgz\ntools/juju-dev/a\ntools/juju-dev/nested/b"
        );

        let (_, body) = call(&app, "GET", "/*", "").await;
        assert_eq!(body.lines().count(), 6);

        let (status, _) = call(&app, "GET", "/missing/*", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejects_escapes_and_other_methods() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(dir.path());

        let (status, _) = call(&app, "GET", "/../etc/passwd", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "POST", "/tools/x", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "method POST is not supported");
    }
}
