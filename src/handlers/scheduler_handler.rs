use actix_web::{post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    app_state::AppState, auth::AuthenticatedUser, errors::AppError,
    models::dto::response::CloseDueResponse,
};

#[derive(Debug, Deserialize)]
pub struct CloseDueParams {
    /// Reference time; defaults to the server clock.
    pub now: Option<DateTime<Utc>>,
}

/// Trigger for the external scheduler. Admin token required.
#[post("/internal/assignments/close-due")]
pub async fn close_due_assignments(
    state: web::Data<AppState>,
    web::Query(params): web::Query<CloseDueParams>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let actor = auth.0.actor();
    let now = params.now.unwrap_or_else(Utc::now);

    let closed_assignment_ids = state.assignment_service.close_due(&actor, now).await?;
    Ok(HttpResponse::Ok().json(CloseDueResponse {
        closed_assignment_ids,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::domain::UserRole, test_utils::memory_state};
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_close_due_requires_admin() {
        let (state, _roster) = memory_state().await;
        let jwt = state.jwt_service.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .app_data(web::Data::from(jwt.clone()))
                .service(close_due_assignments),
        )
        .await;

        let anonymous = test::TestRequest::post()
            .uri("/internal/assignments/close-due")
            .to_request();
        let resp = test::call_service(&app, anonymous).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let teacher_token = jwt
            .create_token("teacher-1", UserRole::Teacher)
            .expect("token");
        let as_teacher = test::TestRequest::post()
            .uri("/internal/assignments/close-due")
            .insert_header(("Authorization", format!("Bearer {}", teacher_token)))
            .to_request();
        let resp = test::call_service(&app, as_teacher).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let admin_token = jwt.create_token("admin-1", UserRole::Admin).expect("token");
        let as_admin = test::TestRequest::post()
            .uri("/internal/assignments/close-due")
            .insert_header(("Authorization", format!("Bearer {}", admin_token)))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, as_admin).await;
        assert_eq!(body["closed_assignment_ids"], serde_json::json!([]));
    }
}
