// src/graphql/question.rs

use async_graphql::{ComplexObject, Context, Object, Result, ResultExt};

use crate::{
    graphql::context::{is_staff, pool, require_staff},
    models::question::{
        CreateQuestionInput, OptionView, Question, QuestionFilter, UpdateQuestionInput,
    },
    services::questions,
};

/// Answer keys and explanations resolve to null for learners.
#[ComplexObject]
impl Question {
    async fn options(&self, ctx: &Context<'_>) -> Vec<OptionView> {
        let reveal = is_staff(ctx);
        self.options
            .iter()
            .map(|option| OptionView::from_option(option, reveal))
            .collect()
    }

    async fn correct_answer(&self, ctx: &Context<'_>) -> Option<String> {
        is_staff(ctx).then(|| self.correct_answer.clone())
    }

    async fn explanation(&self, ctx: &Context<'_>) -> Option<String> {
        if is_staff(ctx) {
            self.explanation.clone()
        } else {
            None
        }
    }
}

#[derive(Default)]
pub struct QuestionQuery;

#[Object]
impl QuestionQuery {
    /// A single bank question. Staff only.
    async fn question(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Question>> {
        require_staff(ctx).extend()?;
        questions::find(pool(ctx).extend()?, id).await.extend()
    }

    /// Browse the question bank. Staff only.
    async fn questions(
        &self,
        ctx: &Context<'_>,
        filter: Option<QuestionFilter>,
        #[graphql(desc = "Page size (default 50, max 200)")] limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Question>> {
        require_staff(ctx).extend()?;
        let (limit, offset) = questions::page_bounds(limit, offset);
        let filter = filter.unwrap_or_default();
        questions::list(pool(ctx).extend()?, &filter, limit, offset)
            .await
            .extend()
    }
}

#[derive(Default)]
pub struct QuestionMutation;

#[Object]
impl QuestionMutation {
    async fn create_question(
        &self,
        ctx: &Context<'_>,
        input: CreateQuestionInput,
    ) -> Result<Question> {
        require_staff(ctx).extend()?;
        questions::create(pool(ctx).extend()?, input).await.extend()
    }

    /// Merges the patch into the stored question and re-validates it.
    async fn update_question(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: UpdateQuestionInput,
    ) -> Result<Question> {
        require_staff(ctx).extend()?;
        questions::update(pool(ctx).extend()?, id, input).await.extend()
    }

    async fn delete_question(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        require_staff(ctx).extend()?;
        questions::delete(pool(ctx).extend()?, id).await.extend()?;
        Ok(true)
    }
}
