use async_graphql::{Context, Object, ID};

use crate::{
    graphql::helpers::{state_and_actor, GraphQLResultExt},
    models::dto::{
        request::{
            CreateAssignmentInput, CreateQuestionInput, FinalizeGradeInput, GradeQuestionInput,
            ReopenSubmissionInput, ReorderQuestionsInput, SaveAnswerInput, UpdateAssignmentInput,
            UpdateQuestionInput,
        },
        response::{AssignmentView, DeleteResponse, SubmissionView},
    },
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_assignment(
        &self,
        ctx: &Context<'_>,
        input: CreateAssignmentInput,
    ) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        let assignment = state
            .assignment_service
            .create_assignment(&actor, input)
            .await
            .graphql()?;
        Ok(AssignmentView::full(assignment))
    }

    async fn update_assignment(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdateAssignmentInput,
    ) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        let assignment = state
            .assignment_service
            .update_assignment(&actor, &id, input)
            .await
            .graphql()?;
        Ok(AssignmentView::full(assignment))
    }

    async fn delete_assignment(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<DeleteResponse> {
        let (state, actor) = state_and_actor(ctx)?;
        state
            .assignment_service
            .delete_assignment(&actor, &id)
            .await
            .graphql()?;
        Ok(DeleteResponse {
            message: format!("Assignment '{}' deleted", id.as_str()),
        })
    }

    async fn publish_assignment(
        &self,
        ctx: &Context<'_>,
        id: ID,
        expected_version: Option<i64>,
    ) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        let assignment = state
            .assignment_service
            .publish(&actor, &id, expected_version)
            .await
            .graphql()?;
        Ok(AssignmentView::full(assignment))
    }

    async fn unpublish_assignment(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        let assignment = state
            .assignment_service
            .unpublish(&actor, &id)
            .await
            .graphql()?;
        Ok(AssignmentView::full(assignment))
    }

    async fn close_assignment(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        let assignment = state
            .assignment_service
            .close(&actor, &id)
            .await
            .graphql()?;
        Ok(AssignmentView::full(assignment))
    }

    async fn create_question(
        &self,
        ctx: &Context<'_>,
        assignment_id: ID,
        input: CreateQuestionInput,
    ) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        let assignment = state
            .question_bank_service
            .create_question(&actor, &assignment_id, input)
            .await
            .graphql()?;
        Ok(AssignmentView::full(assignment))
    }

    async fn update_question(
        &self,
        ctx: &Context<'_>,
        assignment_id: ID,
        question_id: ID,
        input: UpdateQuestionInput,
    ) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        let assignment = state
            .question_bank_service
            .update_question(&actor, &assignment_id, &question_id, input)
            .await
            .graphql()?;
        Ok(AssignmentView::full(assignment))
    }

    async fn delete_question(
        &self,
        ctx: &Context<'_>,
        assignment_id: ID,
        question_id: ID,
    ) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        let assignment = state
            .question_bank_service
            .delete_question(&actor, &assignment_id, &question_id)
            .await
            .graphql()?;
        Ok(AssignmentView::full(assignment))
    }

    async fn reorder_questions(
        &self,
        ctx: &Context<'_>,
        input: ReorderQuestionsInput,
    ) -> async_graphql::Result<AssignmentView> {
        let (state, actor) = state_and_actor(ctx)?;
        let assignment = state
            .question_bank_service
            .reorder_questions(&actor, input)
            .await
            .graphql()?;
        Ok(AssignmentView::full(assignment))
    }

    async fn start_or_fetch_submission(
        &self,
        ctx: &Context<'_>,
        assignment_id: ID,
    ) -> async_graphql::Result<SubmissionView> {
        let (state, actor) = state_and_actor(ctx)?;
        let submission = state
            .submission_service
            .start_or_fetch(&actor, &assignment_id)
            .await
            .graphql()?;
        Ok(submission.into())
    }

    async fn save_answer(
        &self,
        ctx: &Context<'_>,
        input: SaveAnswerInput,
    ) -> async_graphql::Result<SubmissionView> {
        let (state, actor) = state_and_actor(ctx)?;
        let submission = state
            .submission_service
            .save_answer(
                &actor,
                &input.submission_id,
                &input.question_id,
                input.answer.into(),
            )
            .await
            .graphql()?;
        Ok(submission.into())
    }

    async fn submit_submission(
        &self,
        ctx: &Context<'_>,
        submission_id: ID,
    ) -> async_graphql::Result<SubmissionView> {
        let (state, actor) = state_and_actor(ctx)?;
        let submission = state
            .submission_service
            .submit(&actor, &submission_id)
            .await
            .graphql()?;
        Ok(submission.into())
    }

    async fn grade_question(
        &self,
        ctx: &Context<'_>,
        input: GradeQuestionInput,
    ) -> async_graphql::Result<SubmissionView> {
        let (state, actor) = state_and_actor(ctx)?;
        let submission = state
            .grading_service
            .grade_question(&actor, input)
            .await
            .graphql()?;
        Ok(submission.into())
    }

    async fn finalize_grade(
        &self,
        ctx: &Context<'_>,
        input: FinalizeGradeInput,
    ) -> async_graphql::Result<SubmissionView> {
        let (state, actor) = state_and_actor(ctx)?;
        let submission = state
            .grading_service
            .finalize_grade(&actor, input)
            .await
            .graphql()?;
        Ok(submission.into())
    }

    async fn reopen_submission(
        &self,
        ctx: &Context<'_>,
        input: ReopenSubmissionInput,
    ) -> async_graphql::Result<SubmissionView> {
        let (state, actor) = state_and_actor(ctx)?;
        let submission = state
            .grading_service
            .reopen(&actor, input)
            .await
            .graphql()?;
        Ok(submission.into())
    }
}
