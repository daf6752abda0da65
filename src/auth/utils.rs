use async_graphql::Context;

use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
    models::domain::Actor,
};

pub fn extract_claims_from_context(ctx: &Context<'_>) -> AppResult<Claims> {
    ctx.data::<Claims>()
        .cloned()
        .map_err(|_| AppError::Unauthorized("Authentication required".to_string()))
}

pub fn extract_actor_from_context(ctx: &Context<'_>) -> AppResult<Actor> {
    extract_claims_from_context(ctx).map(|claims| claims.actor())
}
