use async_graphql::{Context, Object, ID};

use crate::{
    graphql::helpers::{state_and_actor, GraphQLResultExt},
    models::dto::response::{AssignmentView, PaginatedAssignments, SubmissionView},
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Answer keys are hidden from learners until they hand in their own work.
    async fn assignment(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        state
            .assignment_service
            .get_assignment(&actor, &id)
            .await
            .graphql()
    }

    async fn classroom_assignments(
        &self,
        ctx: &Context<'_>,
        classroom_id: ID,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> async_graphql::Result<PaginatedAssignments> {
        let (state, actor) = state_and_actor(ctx)?;
        state
            .assignment_service
            .list_for_classroom(&actor, &classroom_id, offset, limit)
            .await
            .graphql()
    }

    async fn submission(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<SubmissionView> {
        let (state, actor) = state_and_actor(ctx)?;
        let submission = state
            .submission_service
            .get_submission(&actor, &id)
            .await
            .graphql()?;
        Ok(submission.into())
    }

    async fn assignment_submissions(
        &self,
        ctx: &Context<'_>,
        assignment_id: ID,
    ) -> async_graphql::Result<Vec<SubmissionView>> {
        let (state, actor) = state_and_actor(ctx)?;
        let submissions = state
            .submission_service
            .list_for_assignment(&actor, &assignment_id)
            .await
            .graphql()?;
        Ok(submissions.into_iter().map(SubmissionView::from).collect())
    }

    async fn student_submissions(
        &self,
        ctx: &Context<'_>,
        student_id: ID,
    ) -> async_graphql::Result<Vec<SubmissionView>> {
        let (state, actor) = state_and_actor(ctx)?;
        let submissions = state
            .submission_service
            .list_for_student(&actor, &student_id)
            .await
            .graphql()?;
        Ok(submissions.into_iter().map(SubmissionView::from).collect())
    }
}
