//! HTML pages and embedded static assets

use axum::{
    extract::Path,
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
};

use crate::auth::CurrentUser;
use crate::error::AppError;

const LOGIN_PAGE: &str = include_str!("../../templates/login.html");
const SIGNUP_PAGE: &str = include_str!("../../templates/signup.html");
const DASHBOARD_PAGE: &str = include_str!("../../templates/index.html");

const ASSETS: &[(&str, &str, &str)] = &[
    (
        "js/auth.js",
        "text/javascript; charset=utf-8",
        include_str!("../../assets/js/auth.js"),
    ),
    (
        "js/dashboard.js",
        "text/javascript; charset=utf-8",
        include_str!("../../assets/js/dashboard.js"),
    ),
    (
        "css/style.css",
        "text/css; charset=utf-8",
        include_str!("../../assets/css/style.css"),
    ),
];

pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

pub async fn signup_page() -> Html<&'static str> {
    Html(SIGNUP_PAGE)
}

/// Landing page; redirects to `/login` without a session
pub async fn dashboard(user: CurrentUser) -> Html<String> {
    Html(DASHBOARD_PAGE.replace("{{user}}", &escape_html(&user.session.username)))
}

/// `/assets/{*path}`
pub async fn asset(Path(path): Path<String>) -> Result<Response, AppError> {
    let (_, content_type, body) = ASSETS
        .iter()
        .find(|(name, _, _)| *name == path)
        .ok_or(AppError::NotFound)?;

    Ok((
        [(CONTENT_TYPE, *content_type), (CACHE_CONTROL, "public, max-age=3600")],
        *body,
    )
        .into_response())
}

/// Escape text for HTML element and attribute content
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
