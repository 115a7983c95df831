//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps errors from the entitlement, payroll and store crates to HTTP
//! status codes with a JSON body `{error: {code, message, details?}}`.
//! Internal error details never reach the client.
//!
//! Feature denials and limit refusals are not domain errors; the gated
//! routes turn them into [`AppError::FeatureNotAvailable`] and
//! [`AppError::LimitExceeded`], which carry structured details.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use caboard_core::ValidationError;
use caboard_entitlements::{ActionCheck, EntitlementError, FeatureDenial};
use caboard_payroll::PayrollError;
use caboard_state::SubscriptionError;
use caboard_store::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "LIMIT_EXCEEDED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Structured context for denials and refusals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller's plan does not include the feature (403).
    #[error("feature {} is not available on the current plan", .0.feature)]
    FeatureNotAvailable(FeatureDenial),

    /// The creation would exceed a plan limit (403).
    #[error("plan limit reached for {}", .0.dimension)]
    LimitExceeded(ActionCheck),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::FeatureNotAvailable(_) => (StatusCode::FORBIDDEN, "FEATURE_NOT_AVAILABLE"),
            Self::LimitExceeded(_) => (StatusCode::FORBIDDEN, "LIMIT_EXCEEDED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::FeatureNotAvailable(denial) => Some(serde_json::json!({
                "feature": denial.feature,
                "reason": denial.reason,
                "required_tiers": denial.required_tiers,
                "current_tier": denial.current_tier,
                "upgrade_url": denial.upgrade_url,
            })),
            Self::LimitExceeded(check) => Some(serde_json::json!({
                "dimension": check.dimension,
                "current": check.current,
                "limit": check.limit,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EntitlementError> for AppError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::OrganizationNotFound(_) => Self::NotFound(err.to_string()),
            EntitlementError::Validation(e) => e.into(),
            EntitlementError::Configuration(_) | EntitlementError::Directory(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<PayrollError> for AppError {
    fn from(err: PayrollError) -> Self {
        match err {
            PayrollError::MandateNotFound(_) => Self::NotFound(err.to_string()),
            PayrollError::Validation(e) => e.into(),
            PayrollError::Source(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        Self::Conflict(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Conflict(_) => Self::Conflict(err.to_string()),
            StoreError::Validation(e) => e.into(),
            StoreError::Subscription(e) => e.into(),
            StoreError::LimitExceeded(check) => Self::LimitExceeded(check),
            StoreError::Configuration(_)
            | StoreError::Persistence(_)
            | StoreError::Snapshot(_) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caboard_core::{Feature, LimitDimension, OrganizationId, PlanTier};
    use caboard_entitlements::{DenialReason, DirectoryError};
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT"),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code), "{err}");
        }
    }

    #[tokio::test]
    async fn feature_denial_carries_upgrade_details() {
        let denial = FeatureDenial {
            feature: Feature::Payroll,
            reason: DenialReason::InsufficientPlan,
            required_tiers: vec![PlanTier::Premium, PlanTier::SuperAdmin, PlanTier::Illimite],
            current_tier: Some(PlanTier::Free),
            upgrade_url: Some("https://billing.example/upgrade".into()),
        };
        let (status, body) = response_parts(AppError::FeatureNotAvailable(denial)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error.code, "FEATURE_NOT_AVAILABLE");
        let details = body.error.details.unwrap();
        assert_eq!(details["feature"], "payroll");
        assert_eq!(details["reason"], "insufficient_plan");
        assert_eq!(details["current_tier"], "FREE");
        assert_eq!(details["required_tiers"][0], "PREMIUM");
        assert_eq!(details["upgrade_url"], "https://billing.example/upgrade");
    }

    #[tokio::test]
    async fn limit_refusal_carries_dimension_current_and_limit() {
        let check = ActionCheck {
            dimension: LimitDimension::Users,
            current: 5,
            increment: 1,
            limit: Some(5),
            allowed: false,
        };
        let (status, body) = response_parts(AppError::LimitExceeded(check)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error.code, "LIMIT_EXCEEDED");
        let details = body.error.details.unwrap();
        assert_eq!(details["dimension"], "users");
        assert_eq!(details["current"], 5);
        assert_eq!(details["limit"], 5);
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak() {
        let err: AppError = EntitlementError::Directory(DirectoryError("pool exhausted".into())).into();
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let missing: AppError = EntitlementError::OrganizationNotFound(OrganizationId::new()).into();
        assert!(matches!(missing, AppError::NotFound(_)));

        let misconfigured: AppError = EntitlementError::Configuration("no FREE plan".into()).into();
        assert!(matches!(misconfigured, AppError::Internal(_)));

        let zero: AppError = EntitlementError::Validation(ValidationError::ZeroIncrement {
            dimension: "users".into(),
        })
        .into();
        assert!(matches!(zero, AppError::Validation(_)));

        let duplicate: AppError = StoreError::Conflict("day value exists".into()).into();
        assert!(matches!(duplicate, AppError::Conflict(_)));

        let persistence: AppError = StoreError::Persistence("connection reset".into()).into();
        assert!(matches!(persistence, AppError::Internal(_)));
    }
}
