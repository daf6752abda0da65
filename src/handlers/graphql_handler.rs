use actix_web::{get, post, web, HttpRequest, HttpResponse};
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::{
    auth::{bearer_claims, JwtService},
    errors::AppError,
    graphql::Schema,
    middleware::get_request_id,
};

/// Executes a GraphQL request. Valid bearer claims are attached to the
/// request data; resolvers reject anonymous callers themselves.
#[post("/graphql")]
pub async fn graphql(
    schema: web::Data<Schema>,
    jwt_service: web::Data<JwtService>,
    http_request: HttpRequest,
    request: GraphQLRequest,
) -> Result<GraphQLResponse, AppError> {
    let mut request = request.into_inner();
    if let Some(claims) = bearer_claims(&http_request, &jwt_service)? {
        log::debug!(
            "[{}] GraphQL request from '{}' ({:?})",
            get_request_id(&http_request).unwrap_or_default(),
            claims.sub,
            claims.role
        );
        request = request.data(claims);
    }
    Ok(schema.execute(request).await.into())
}

#[get("/graphiql")]
pub async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint("/graphql").finish())
}
