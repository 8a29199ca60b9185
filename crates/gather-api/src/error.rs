use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use gather_governance::GovernanceError;

/// Translates governance failures into the control surface's status
/// codes. Store trouble is logged server-side and reported generically;
/// everything else carries its human-readable reason.
pub struct ApiError(pub GovernanceError);

impl From<GovernanceError> for ApiError {
    fn from(err: GovernanceError) -> Self {
        Self(err)
    }
}

pub(crate) fn status_for(err: &GovernanceError) -> StatusCode {
    match err {
        GovernanceError::NotFound => StatusCode::NOT_FOUND,
        GovernanceError::Unauthorized(_) => StatusCode::FORBIDDEN,
        GovernanceError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
        GovernanceError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);

        let message = if let GovernanceError::StoreUnavailable(source) = &self.0 {
            error!("store failure: {:#}", source);
            "storage temporarily unavailable, retry the request".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Shorthand for request-shape rejections (empty names, oversized
/// bodies) that map to the same 400 as governance rule violations.
pub(crate) fn invalid(reason: &'static str) -> ApiError {
    ApiError(GovernanceError::InvalidOperation(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn taxonomy_maps_to_conventional_status_codes() {
        assert_eq!(
            status_for(&GovernanceError::NotFound),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&GovernanceError::Unauthorized("nope")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&GovernanceError::InvalidOperation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GovernanceError::StoreUnavailable(anyhow!("down"))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
