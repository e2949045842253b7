// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Security headers middleware.
//!
//! JSON endpoints get a deny-everything CSP and are never cached. Pages get
//! a CSP that lets the bundle load its own assets, show review photos from
//! any HTTPS host and talk to the identity provider.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::page_guard::is_page_path;

const API_CSP: &str = "default-src 'none'; frame-ancestors 'none'";

const PERMISSIONS_POLICY: &str = "accelerometer=(), camera=(), geolocation=(), gyroscope=(), magnetometer=(), microphone=(), payment=(), usb=()";

/// Header values computed once at startup.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    page_csp: HeaderValue,
}

impl SecurityHeaders {
    pub fn from_config(config: &Config) -> Self {
        let csp = page_csp(config.identity_url.as_deref());
        let page_csp = HeaderValue::from_str(&csp).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid page CSP, using same-origin policy");
            HeaderValue::from_static(
                "default-src 'self'; img-src 'self' https: data:; frame-ancestors 'none'",
            )
        });
        Self { page_csp }
    }
}

/// CSP for the page bundle. `connect-src` admits the identity provider's
/// origin when one is configured.
pub fn page_csp(identity_url: Option<&str>) -> String {
    let mut connect_src = "'self'".to_string();
    if let Some(origin) = identity_url
        .and_then(|url| reqwest::Url::parse(url).ok())
        .map(|url| url.origin())
        .filter(|origin| origin.is_tuple())
    {
        connect_src.push(' ');
        connect_src.push_str(&origin.ascii_serialization());
    }

    format!(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; \
         img-src 'self' https: data:; connect-src {connect_src}; form-action 'self'; \
         base-uri 'self'; frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
pub async fn add_security_headers(
    State(policy): State<Arc<SecurityHeaders>>,
    req: Request,
    next: Next,
) -> Response {
    let page = is_page_path(req.uri().path());
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static(PERMISSIONS_POLICY),
    );

    if page {
        headers.insert("Content-Security-Policy", policy.page_csp.clone());
    } else {
        headers.insert("Content-Security-Policy", HeaderValue::from_static(API_CSP));
        // Session endpoints carry tokens.
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}
