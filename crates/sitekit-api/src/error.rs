//! DomainError to HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use sitekit_core::error::DomainError;

use crate::response::ApiResponse;

/// Wrapper so handlers can use `?` on service results.
#[derive(Debug)]
pub struct ApiFailure(pub DomainError);

impl From<DomainError> for ApiFailure {
    fn from(error: DomainError) -> Self {
        Self(error)
    }
}

fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::Validation(_)
        | DomainError::SelfParent
        | DomainError::CircularReference { .. }
        | DomainError::ReservedRoute(_)
        | DomainError::InvalidSlugFormat(_)
        | DomainError::ChildrenExist { .. } => StatusCode::BAD_REQUEST,
        DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
        DomainError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        DomainError::NotFound { .. } | DomainError::SlugNotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::SlugConflict { .. } | DomainError::ConcurrencyConflict => {
            StatusCode::CONFLICT
        }
        DomainError::Database(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let error = self.0;
        let status = status_for(&error);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", error);
        } else {
            tracing::warn!("Request rejected: {}", error);
        }

        let suggested_slug = match &error {
            DomainError::SlugConflict { suggested, .. } => Some(suggested.clone()),
            _ => None,
        };
        let body = Json(ApiResponse::<()>::error_with_suggestion(
            error.code(),
            &error.to_string(),
            suggested_slug,
        ));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitekit_core::domain::EntityKind;
    use uuid::Uuid;

    fn status_of(error: DomainError) -> StatusCode {
        ApiFailure(error).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(DomainError::SelfParent), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(DomainError::CircularReference {
                entity_id: Uuid::new_v4(),
                parent_id: Uuid::new_v4(),
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::ChildrenExist { kind: EntityKind::Page, count: 1 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(DomainError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(DomainError::PermissionDenied("pages:manage".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(DomainError::NotFound { kind: EntityKind::Menu, id: Uuid::new_v4() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::SlugConflict {
                slug: "about".to_string(),
                suggested: "about-2".to_string(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(DomainError::ConcurrencyConflict), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DomainError::Database("down".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
