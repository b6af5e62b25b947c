//! Response helpers shared by the endpoint handlers.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::error::OidcError;

/// Converts an `OidcError` to a JSON error response.
pub fn error_response(err: &OidcError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.to_error_response())).into_response()
}

/// Adds `Cache-Control: no-store` and `Pragma: no-cache`, required on
/// responses that carry tokens (RFC 6749 section 5.1).
pub fn no_store(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

/// Builds a `WWW-Authenticate` challenge for `scheme`.
pub fn www_authenticate(scheme: &str, err: &OidcError) -> Option<HeaderValue> {
    let value = format!(
        "{scheme} realm=\"sso\", error=\"{}\", error_description=\"{}\"",
        err.error_code(),
        err.to_string().replace('"', "'")
    );
    HeaderValue::from_str(&value).ok()
}

/// Simple HTML escaping.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Shows an error page when the browser cannot be sent back to the client.
pub fn error_page(error: &OidcError) -> Response {
    let html = format!(
        r"<!DOCTYPE html>
<html>
<head><title>Authorization Error</title></head>
<body>
<h1>Authorization Error</h1>
<p><strong>Error:</strong> {}</p>
<p><strong>Description:</strong> {}</p>
</body>
</html>",
        html_escape(error.error_code()),
        html_escape(&error.to_string())
    );
    let status = if matches!(error, OidcError::ServerError) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Html(html)).into_response()
}

/// Builds an HTML page that auto-submits `params` to `action`.
pub fn form_post_page(action: &str, params: &[(String, String)]) -> Response {
    let fields = params
        .iter()
        .map(|(k, v)| {
            format!(
                r#"<input type="hidden" name="{}" value="{}" />"#,
                html_escape(k),
                html_escape(v)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Submitting...</title></head>
<body onload="document.forms[0].submit()">
<form method="post" action="{}">
{fields}
<noscript><button type="submit">Continue</button></noscript>
</form>
</body>
</html>"#,
        html_escape(action)
    );
    no_store((StatusCode::OK, Html(html)).into_response())
}
