//! # Authentication Middleware
//!
//! Bearer-token middleware supplying caller identity to every endpoint.
//! Token issuance is out of scope — the deployment hands out tokens in the
//! format below; this layer only validates and parses them.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{subject_id}:{secret}   — requester / provider / ops
//! Bearer {secret}                        — legacy format (treated as ops)
//! ```
//!
//! The secret is compared in constant time. Every authenticated request
//! gets a [`CallerIdentity`] injected into the request extensions; handlers
//! extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use yatra_core::{ProviderId, RequesterId};

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── Role ────────────────────────────────────────────────────────────────────

/// Caller roles. Requesters and providers are peers with disjoint
/// surfaces; ops sees everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Creates trips, cancels them, polls tracking.
    Requester,
    /// Receives offers, accepts/rejects, reports position.
    Provider,
    /// Operational/administrative access to everything.
    Ops,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requester => "requester",
            Self::Provider => "provider",
            Self::Ops => "ops",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, available to all route handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's role.
    pub role: Role,
    /// The caller's subject id: the requester or provider UUID. `None`
    /// for ops (they operate across subjects).
    pub subject: Option<Uuid>,
}

impl CallerIdentity {
    /// Whether the caller has operational access.
    pub fn is_ops(&self) -> bool {
        self.role == Role::Ops
    }

    /// The caller as a requester.
    ///
    /// # Errors
    ///
    /// `403 Forbidden` unless the caller is a requester with a bound
    /// subject id.
    pub fn requester_id(&self) -> Result<RequesterId, AppError> {
        match (self.role, self.subject) {
            (Role::Requester, Some(id)) => Ok(RequesterId::from_uuid(id)),
            _ => Err(AppError::Forbidden(format!(
                "requester role required, caller has '{}'",
                self.role.as_str()
            ))),
        }
    }

    /// The caller as a provider.
    ///
    /// # Errors
    ///
    /// `403 Forbidden` unless the caller is a provider with a bound
    /// subject id.
    pub fn provider_id(&self) -> Result<ProviderId, AppError> {
        match (self.role, self.subject) {
            (Role::Provider, Some(id)) => Ok(ProviderId::from_uuid(id)),
            _ => Err(AppError::Forbidden(format!(
                "provider role required, caller has '{}'",
                self.role.as_str()
            ))),
        }
    }
}

/// Extracts the identity the auth middleware injected into extensions.
/// Returns 401 if no identity is present (middleware didn't run).
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AuthConfig {
    /// The shared bearer secret. `None` disables authentication
    /// (development mode: every request runs as ops).
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
///
/// When lengths differ, a dummy comparison keeps timing constant
/// regardless of where the mismatch is.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token in format `{role}:{subject_id}:{secret}` or
/// `{secret}` (legacy, treated as ops).
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.len() {
        // Legacy format: just the secret.
        1 => {
            if constant_time_token_eq(provided, expected_secret) {
                Ok(CallerIdentity {
                    role: Role::Ops,
                    subject: None,
                })
            } else {
                Err("invalid bearer token".into())
            }
        }
        // Full format: role:subject_id:secret (subject may be empty for ops).
        3 => {
            let role_str = parts[0];
            let subject_str = parts[1];
            let secret = parts[2];

            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }

            let role = match role_str {
                "requester" => Role::Requester,
                "provider" => Role::Provider,
                "ops" => Role::Ops,
                other => return Err(format!("unknown role: {other}")),
            };

            let subject = if subject_str.is_empty() {
                None
            } else {
                Some(
                    subject_str
                        .parse::<Uuid>()
                        .map_err(|e| format!("invalid subject id: {e}"))?,
                )
            };

            // Requesters and providers act as a specific subject.
            if matches!(role, Role::Requester | Role::Provider) && subject.is_none() {
                return Err(format!("role '{role_str}' requires a subject id"));
            }

            Ok(CallerIdentity { role, subject })
        }
        _ => Err("invalid token format — expected {role}:{subject_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and inject [`CallerIdentity`] for downstream
/// handlers. When `AuthConfig.token` is `None`, all requests run as ops
/// (auth disabled / development mode).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(header_value) if header_value.starts_with("Bearer ") => {
                    let provided = &header_value[7..];
                    match parse_bearer_token(provided, expected) {
                        Ok(identity) => {
                            request.extensions_mut().insert(identity);
                            next.run(request).await
                        }
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            unauthorized_response(&msg)
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            // Auth disabled — run as ops.
            request.extensions_mut().insert(CallerIdentity {
                role: Role::Ops,
                subject: None,
            });
            next.run(request).await
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
