use async_graphql::{Context, ErrorExtensions};

use crate::{
    app_state::AppState,
    auth::extract_actor_from_context,
    errors::AppResult,
    models::domain::Actor,
};

/// Converts service results into GraphQL results that carry the error code
/// extension instead of the raw message.
pub trait GraphQLResultExt<T> {
    fn graphql(self) -> async_graphql::Result<T>;
}

impl<T> GraphQLResultExt<T> for AppResult<T> {
    fn graphql(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.extend())
    }
}

/// Shared state plus the authenticated caller, which every resolver needs.
pub fn state_and_actor<'a>(ctx: &Context<'a>) -> async_graphql::Result<(&'a AppState, Actor)> {
    let state = ctx.data::<AppState>()?;
    let actor = extract_actor_from_context(ctx).graphql()?;
    Ok((state, actor))
}
