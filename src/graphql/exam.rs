// src/graphql/exam.rs

use async_graphql::{ComplexObject, Context, Object, Result, ResultExt};

use crate::{
    error::AppError,
    graphql::context::{is_staff, pool, require_staff},
    models::{
        catalog::Course,
        exam::{CourseExam, CreateExamInput, Exam, ExamDraft, ExamQuestion, UpdateExamInput},
        question::Question,
    },
    services::{catalog, exams, questions},
};

#[ComplexObject]
impl Exam {
    /// Questions in position order.
    async fn questions(&self, ctx: &Context<'_>) -> Result<Vec<ExamQuestion>> {
        exams::questions(pool(ctx).extend()?, self.id).await.extend()
    }

    /// Sum of marks over the assigned questions; may differ from `totalMarks`.
    async fn assigned_marks(&self, ctx: &Context<'_>) -> Result<i64> {
        exams::assigned_marks(pool(ctx).extend()?, self.id)
            .await
            .extend()
    }

    async fn courses(&self, ctx: &Context<'_>) -> Result<Vec<CourseExam>> {
        exams::links_for_exam(pool(ctx).extend()?, self.id)
            .await
            .extend()
    }
}

#[ComplexObject]
impl ExamQuestion {
    async fn question(&self, ctx: &Context<'_>) -> Result<Question> {
        questions::find(pool(ctx).extend()?, self.question_id)
            .await
            .extend()?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
            .extend()
    }
}

#[ComplexObject]
impl CourseExam {
    async fn exam(&self, ctx: &Context<'_>) -> Result<Option<Exam>> {
        exams::find(pool(ctx).extend()?, self.exam_id, is_staff(ctx))
            .await
            .extend()
    }

    async fn course(&self, ctx: &Context<'_>) -> Result<Option<Course>> {
        catalog::find_course(pool(ctx).extend()?, self.course_id, is_staff(ctx))
            .await
            .extend()
    }
}

#[derive(Default)]
pub struct ExamQuery;

#[Object]
impl ExamQuery {
    /// An exam with its ordered questions. Unpublished exams are null for learners.
    async fn exam(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Exam>> {
        exams::find(pool(ctx).extend()?, id, is_staff(ctx))
            .await
            .extend()
    }

    async fn exams(&self, ctx: &Context<'_>) -> Result<Vec<Exam>> {
        exams::list(pool(ctx).extend()?, is_staff(ctx))
            .await
            .extend()
    }
}

/// Exam assembly. Every mutation here requires a mentor or admin.
#[derive(Default)]
pub struct ExamMutation;

#[Object]
impl ExamMutation {
    /// Creates an unpublished exam.
    async fn create_exam(&self, ctx: &Context<'_>, input: CreateExamInput) -> Result<Exam> {
        require_staff(ctx).extend()?;
        exams::create(pool(ctx).extend()?, ExamDraft::from(input))
            .await
            .extend()
    }

    async fn update_exam(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: UpdateExamInput,
    ) -> Result<Exam> {
        require_staff(ctx).extend()?;
        exams::update(pool(ctx).extend()?, id, input).await.extend()
    }

    async fn set_exam_published(
        &self,
        ctx: &Context<'_>,
        id: i64,
        published: bool,
    ) -> Result<Exam> {
        require_staff(ctx).extend()?;
        exams::set_published(pool(ctx).extend()?, id, published)
            .await
            .extend()
    }

    async fn delete_exam(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        require_staff(ctx).extend()?;
        exams::delete(pool(ctx).extend()?, id).await.extend()?;
        Ok(true)
    }

    /// Appends the question at the end of the exam.
    async fn add_question_to_exam(
        &self,
        ctx: &Context<'_>,
        exam_id: i64,
        question_id: i64,
        marks: i32,
    ) -> Result<ExamQuestion> {
        require_staff(ctx).extend()?;
        exams::add_question(pool(ctx).extend()?, exam_id, question_id, marks)
            .await
            .extend()
    }

    async fn update_exam_question_marks(
        &self,
        ctx: &Context<'_>,
        exam_id: i64,
        question_id: i64,
        marks: i32,
    ) -> Result<ExamQuestion> {
        require_staff(ctx).extend()?;
        exams::update_question_marks(pool(ctx).extend()?, exam_id, question_id, marks)
            .await
            .extend()
    }

    async fn remove_question_from_exam(
        &self,
        ctx: &Context<'_>,
        exam_id: i64,
        question_id: i64,
    ) -> Result<bool> {
        require_staff(ctx).extend()?;
        exams::remove_question(pool(ctx).extend()?, exam_id, question_id)
            .await
            .extend()?;
        Ok(true)
    }

    /// `question_ids` lists every question of the exam in the new order.
    async fn reorder_exam_questions(
        &self,
        ctx: &Context<'_>,
        exam_id: i64,
        question_ids: Vec<i64>,
    ) -> Result<Vec<ExamQuestion>> {
        require_staff(ctx).extend()?;
        exams::reorder_questions(pool(ctx).extend()?, exam_id, &question_ids)
            .await
            .extend()
    }

    /// Links the exam to a course; linking again updates order and flag.
    async fn link_exam_to_course(
        &self,
        ctx: &Context<'_>,
        exam_id: i64,
        course_id: i64,
        #[graphql(default = 0)] display_order: i32,
        #[graphql(default = false)] is_required: bool,
    ) -> Result<CourseExam> {
        require_staff(ctx).extend()?;
        exams::link_course(pool(ctx).extend()?, exam_id, course_id, display_order, is_required)
            .await
            .extend()
    }

    async fn unlink_exam_from_course(
        &self,
        ctx: &Context<'_>,
        exam_id: i64,
        course_id: i64,
    ) -> Result<bool> {
        require_staff(ctx).extend()?;
        exams::unlink_course(pool(ctx).extend()?, exam_id, course_id)
            .await
            .extend()?;
        Ok(true)
    }
}
