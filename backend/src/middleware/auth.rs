//! Authentication middleware
//!
//! Bearer token authentication and demo-farm resolution

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::AuthConfig;
use crate::error::{ErrorDetail, ErrorResponse};

/// Header the dashboard sends to switch a signed-in user to the demo farm
pub const FORCE_DEMO_HEADER: &str = "x-force-demo";

/// Authenticated user information extracted from the bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub is_demo_view: bool,
}

/// Farm whose data the user is looking at: the demo farm for demo views and
/// the demo account, otherwise `farm_{uid}`
pub fn resolve_farm_id(user: &AuthUser, auth: &AuthConfig) -> String {
    if user.is_demo_view || user.email.eq_ignore_ascii_case(&auth.demo_email) {
        auth.demo_farm_id.clone()
    } else {
        format!("farm_{}", user.uid)
    }
}

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let token = match bearer_token(request.headers()) {
        Some(token) => token,
        None => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    // Secret comes from the environment so the middleware needs no state
    let secret = std::env::var("TFA__AUTH__SECRET")
        .unwrap_or_else(|_| "development-secret-key".to_string());

    let claims = match decode_jwt(token, &secret) {
        Ok(claims) => claims,
        Err(msg) => {
            return unauthorized_response(&msg);
        }
    };

    let is_demo_view = is_demo_requested(request.headers());
    if is_demo_view {
        tracing::debug!("Demo view requested by {}", claims.email);
    }

    let auth_user = AuthUser {
        uid: claims.sub,
        email: claims.email,
        is_demo_view,
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn is_demo_requested(headers: &HeaderMap) -> bool {
    headers
        .get(FORCE_DEMO_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Token claims
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: String,
    exp: i64,
}

/// Decode and validate an HS256 token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_as: "অনুমতি নাই".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_as: "প্ৰথমে লগ ইন কৰক".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}
