//! HTML pages and static assets.
//! Pages come from the configured public directory; the copies compiled into the
//! binary are used when a file is absent there.

use std::path::{Component, Path};

use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse, Response};
use tracing::debug;

use crate::error::{AppError, AppResult};

const LOGIN_HTML: &str = include_str!("../../public/login.html");
const DASHBOARD_HTML: &str = include_str!("../../public/dashboard.html");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Dashboard,
}

impl Page {
    fn file_name(&self) -> &'static str {
        match self {
            Page::Login => "login.html",
            Page::Dashboard => "dashboard.html",
        }
    }

    fn embedded(&self) -> &'static str {
        match self {
            Page::Login => LOGIN_HTML,
            Page::Dashboard => DASHBOARD_HTML,
        }
    }
}

pub async fn render_page(public_dir: &Path, page: Page) -> AppResult<Html<String>> {
    let path = public_dir.join(page.file_name());
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => Ok(Html(body)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(target: "http", path = %path.display(), "page missing on disk, serving built-in copy");
            Ok(Html(page.embedded().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Only plain relative paths are served; anything with `..`, a root or a prefix is refused.
pub fn is_safe_relative(rel: &str) -> bool {
    let p = Path::new(rel);
    !rel.is_empty() && p.components().all(|c| matches!(c, Component::Normal(_)))
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

pub async fn serve_asset(public_dir: &Path, rel: &str) -> AppResult<Response> {
    if !is_safe_relative(rel) {
        return Err(AppError::not_found("asset_not_found", "Not found"));
    }
    let path = public_dir.join(rel);
    if !tokio::fs::metadata(&path).await?.is_file() {
        return Err(AppError::not_found("asset_not_found", "Not found"));
    }
    let bytes = tokio::fs::read(&path).await?;
    Ok(([(CONTENT_TYPE, content_type_for(&path))], bytes).into_response())
}
