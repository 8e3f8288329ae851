use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use slawatch_core::AppError;
use subtle::ConstantTimeEq;

use crate::constants::ADMIN_SECRET_HEADER;
use crate::error::HttpAppError;

#[derive(Clone)]
pub struct AdminAuthState {
    /// `None` disables the check; only allowed outside production
    pub admin_secret: Option<String>,
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Reads are open. Anything that can change state needs the admin secret.
fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

pub async fn admin_auth_middleware(
    State(auth_state): State<Arc<AdminAuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = auth_state.admin_secret.as_deref() else {
        return next.run(request).await;
    };
    if is_read_only(request.method()) {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(ADMIN_SECRET_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(secret) if secure_compare(secret, expected) => next.run(request).await,
        Some(_) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected request with invalid admin secret"
            );
            HttpAppError(AppError::Unauthorized("Invalid admin secret".to_string()))
                .into_response()
        }
        None => HttpAppError(AppError::Unauthorized(format!(
            "Missing {} header",
            ADMIN_SECRET_HEADER
        )))
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_compare_requires_exact_match() {
        assert!(secure_compare("s3cret-value", "s3cret-value"));
        assert!(!secure_compare("s3cret-value", "s3cret-valuf"));
        assert!(!secure_compare("short", "s3cret-value"));
    }

    #[test]
    fn only_reads_skip_the_secret() {
        assert!(is_read_only(&Method::GET));
        assert!(is_read_only(&Method::OPTIONS));
        assert!(!is_read_only(&Method::POST));
        assert!(!is_read_only(&Method::PUT));
        assert!(!is_read_only(&Method::DELETE));
    }
}
