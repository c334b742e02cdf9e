use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use url::form_urlencoded;

use crate::auth::{VerifierState, resolve_session};

/// RouteRules
///
/// The static route tables the gate decides against. Built once and handed to
/// `RequestGate::new`; nothing in the gate reads global state.
#[derive(Debug, Clone)]
pub struct RouteRules {
    /// Pages that require a session.
    pub protected_prefixes: Vec<String>,
    /// Sign-in pages a signed-in user is bounced away from.
    pub auth_prefixes: Vec<String>,
    /// Paths under this prefix do their own authentication.
    pub api_prefix: String,
    /// Redirect target for anonymous visitors of protected pages.
    pub login_path: String,
    /// Redirect target for signed-in visitors of auth pages.
    pub app_entry: String,
    /// Matched against the path without its leading `/`.
    pub excluded_prefixes: Vec<String>,
    pub excluded_extensions: Vec<String>,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/app".to_string()],
            auth_prefixes: vec!["/auth/login".to_string(), "/auth/signup".to_string()],
            api_prefix: "/api/".to_string(),
            login_path: "/auth/login".to_string(),
            app_entry: "/app".to_string(),
            excluded_prefixes: ["_next/static", "_next/image", "favicon.ico", "images"]
                .map(String::from)
                .to_vec(),
            excluded_extensions: [".png", ".jpg", ".svg"].map(String::from).to_vec(),
        }
    }
}

/// Result of classifying a page path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteClass {
    pub is_protected: bool,
    pub is_auth_route: bool,
}

impl RouteRules {
    /// classify
    ///
    /// Literal, case-sensitive prefix matching against both tables.
    pub fn classify(&self, path: &str) -> RouteClass {
        RouteClass {
            is_protected: starts_with_any(path, &self.protected_prefixes),
            is_auth_route: starts_with_any(path, &self.auth_prefixes),
        }
    }

    pub fn is_api(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
    }

    /// Static assets and images the gate never touches.
    pub fn is_excluded(&self, path: &str) -> bool {
        let relative = path.strip_prefix('/').unwrap_or(path);

        starts_with_any(relative, &self.excluded_prefixes)
            || self
                .excluded_extensions
                .iter()
                .any(|extension| relative.ends_with(extension.as_str()))
    }

    /// Login URL that sends the user back to `path` once signed in.
    pub fn login_redirect(&self, path: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("callbackUrl", path)
            .finish();
        format!("{}?{}", self.login_path, query)
    }
}

fn starts_with_any(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

/// What the gate does with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Matcher exclusion: untouched, no headers.
    Excluded,
    /// API route: no session check, only the MIME-sniffing header.
    Api,
    /// Page route allowed through, baseline headers attached.
    Pass,
    /// Page route answered with a temporary redirect to this location.
    Redirect(String),
}

/// RequestGate
///
/// Decides, before page rendering, whether a request passes or is redirected, and
/// stamps the security headers on the response.
pub struct RequestGate {
    rules: RouteRules,
    verifier: VerifierState,
    production: bool,
}

/// GateState
///
/// The shared handle the gate middleware runs with.
pub type GateState = Arc<RequestGate>;

impl RequestGate {
    /// `production` enables the Strict-Transport-Security header.
    pub fn new(rules: RouteRules, verifier: VerifierState, production: bool) -> Self {
        Self {
            rules,
            verifier,
            production,
        }
    }

    /// decide
    ///
    /// The session is only resolved for page routes. A verifier error counts as no
    /// session: protected pages redirect to login, auth pages stay reachable.
    pub async fn decide(&self, path: &str, headers: &HeaderMap) -> Disposition {
        if self.rules.is_excluded(path) {
            return Disposition::Excluded;
        }
        if self.rules.is_api(path) {
            return Disposition::Api;
        }

        let session = resolve_session(self.verifier.as_ref(), headers).await;
        let class = self.rules.classify(path);

        match (session.is_some(), class) {
            (false, RouteClass { is_protected: true, .. }) => {
                tracing::debug!(path, "redirecting anonymous request to login");
                Disposition::Redirect(self.rules.login_redirect(path))
            }
            (true, RouteClass { is_auth_route: true, .. }) => {
                tracing::debug!(path, "redirecting signed-in request to app entry");
                Disposition::Redirect(self.rules.app_entry.clone())
            }
            _ => Disposition::Pass,
        }
    }

    /// Attaches the header set `disposition` calls for.
    pub fn apply_headers(&self, disposition: &Disposition, headers: &mut HeaderMap) {
        match disposition {
            Disposition::Excluded => {}
            Disposition::Api => {
                headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
            }
            Disposition::Pass | Disposition::Redirect(_) => {
                headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
                headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
                headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
                headers.insert(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                );

                if self.production {
                    headers.insert(
                        header::STRICT_TRANSPORT_SECURITY,
                        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                    );
                }
            }
        }
    }
}

/// request_gate
///
/// Axum middleware wrapping the whole router. Redirects short-circuit the inner
/// service; every other disposition runs it.
pub async fn request_gate(State(gate): State<GateState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let disposition = gate.decide(&path, request.headers()).await;

    let mut response = match &disposition {
        Disposition::Redirect(location) => Redirect::temporary(location).into_response(),
        _ => next.run(request).await,
    };

    gate.apply_headers(&disposition, response.headers_mut());
    response
}
