// src/graphql/catalog.rs

use async_graphql::{ComplexObject, Context, Object, Result, ResultExt};

use crate::{
    graphql::context::{is_staff, pool, require_staff},
    models::{
        catalog::{
            Chapter, ChapterDraft, Course, CourseDraft, CreateChapterInput, CreateCourseInput,
            CreateLessonInput, CreateNoteInput, CreateTopicInput, Lesson, LessonDraft, NamedDraft,
            Note, NoteDraft, Subject, SubjectInput, Topic, UpdateChapterInput, UpdateCourseInput,
            UpdateLessonInput, UpdateNamedInput, UpdateNoteInput,
        },
        exam::CourseExam,
    },
    services::{catalog, exams},
};

#[ComplexObject]
impl Course {
    /// Chapters in display order.
    async fn chapters(&self, ctx: &Context<'_>) -> Result<Vec<Chapter>> {
        catalog::chapters_for_course(pool(ctx).extend()?, self.id, is_staff(ctx))
            .await
            .extend()
    }

    /// Linked exams ordered by display order.
    async fn exams(&self, ctx: &Context<'_>) -> Result<Vec<CourseExam>> {
        exams::links_for_course(pool(ctx).extend()?, self.id, is_staff(ctx))
            .await
            .extend()
    }
}

#[ComplexObject]
impl Chapter {
    async fn lessons(&self, ctx: &Context<'_>) -> Result<Vec<Lesson>> {
        catalog::lessons_for_chapter(pool(ctx).extend()?, self.id, is_staff(ctx))
            .await
            .extend()
    }
}

#[ComplexObject]
impl Subject {
    async fn topics(&self, ctx: &Context<'_>) -> Result<Vec<Topic>> {
        catalog::topics_for_subject(pool(ctx).extend()?, self.id)
            .await
            .extend()
    }
}

#[derive(Default)]
pub struct CatalogQuery;

#[Object]
impl CatalogQuery {
    /// Published courses; staff also see drafts.
    async fn courses(&self, ctx: &Context<'_>) -> Result<Vec<Course>> {
        catalog::list_courses(pool(ctx).extend()?, is_staff(ctx))
            .await
            .extend()
    }

    async fn course(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Course>> {
        catalog::find_course(pool(ctx).extend()?, id, is_staff(ctx))
            .await
            .extend()
    }

    async fn course_by_slug(&self, ctx: &Context<'_>, slug: String) -> Result<Option<Course>> {
        catalog::find_course_by_slug(pool(ctx).extend()?, &slug, is_staff(ctx))
            .await
            .extend()
    }

    async fn chapter(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Chapter>> {
        let chapter = catalog::find_chapter(pool(ctx).extend()?, id).await.extend()?;
        Ok(chapter.filter(|c| c.is_published || is_staff(ctx)))
    }

    async fn lesson(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Lesson>> {
        let lesson = catalog::find_lesson(pool(ctx).extend()?, id).await.extend()?;
        Ok(lesson.filter(|l| l.is_published || is_staff(ctx)))
    }

    async fn subjects(&self, ctx: &Context<'_>) -> Result<Vec<Subject>> {
        catalog::list_subjects(pool(ctx).extend()?).await.extend()
    }

    async fn subject(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Subject>> {
        catalog::find_subject(pool(ctx).extend()?, id).await.extend()
    }

    async fn topic(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Topic>> {
        catalog::find_topic(pool(ctx).extend()?, id).await.extend()
    }

    /// Study notes, optionally narrowed to a subject or a course.
    async fn notes(
        &self,
        ctx: &Context<'_>,
        subject_id: Option<i64>,
        course_id: Option<i64>,
    ) -> Result<Vec<Note>> {
        catalog::list_notes(pool(ctx).extend()?, subject_id, course_id, is_staff(ctx))
            .await
            .extend()
    }

    async fn note(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Note>> {
        let note = catalog::find_note(pool(ctx).extend()?, id).await.extend()?;
        Ok(note.filter(|n| n.is_published || is_staff(ctx)))
    }
}

/// Content management. Every mutation here requires a mentor or admin.
#[derive(Default)]
pub struct CatalogMutation;

#[Object]
impl CatalogMutation {
    // Subjects and topics

    async fn create_subject(&self, ctx: &Context<'_>, input: SubjectInput) -> Result<Subject> {
        require_staff(ctx).extend()?;
        catalog::create_subject(pool(ctx).extend()?, NamedDraft::from(input))
            .await
            .extend()
    }

    async fn update_subject(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: UpdateNamedInput,
    ) -> Result<Subject> {
        require_staff(ctx).extend()?;
        catalog::update_subject(pool(ctx).extend()?, id, input)
            .await
            .extend()
    }

    async fn delete_subject(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        require_staff(ctx).extend()?;
        catalog::delete_subject(pool(ctx).extend()?, id).await.extend()?;
        Ok(true)
    }

    async fn create_topic(&self, ctx: &Context<'_>, input: CreateTopicInput) -> Result<Topic> {
        require_staff(ctx).extend()?;
        let subject_id = input.subject_id;
        catalog::create_topic(pool(ctx).extend()?, subject_id, NamedDraft::from(input))
            .await
            .extend()
    }

    async fn update_topic(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: UpdateNamedInput,
    ) -> Result<Topic> {
        require_staff(ctx).extend()?;
        catalog::update_topic(pool(ctx).extend()?, id, input)
            .await
            .extend()
    }

    async fn delete_topic(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        require_staff(ctx).extend()?;
        catalog::delete_topic(pool(ctx).extend()?, id).await.extend()?;
        Ok(true)
    }

    // Courses

    async fn create_course(&self, ctx: &Context<'_>, input: CreateCourseInput) -> Result<Course> {
        require_staff(ctx).extend()?;
        catalog::create_course(pool(ctx).extend()?, CourseDraft::from(input))
            .await
            .extend()
    }

    async fn update_course(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: UpdateCourseInput,
    ) -> Result<Course> {
        require_staff(ctx).extend()?;
        catalog::update_course(pool(ctx).extend()?, id, input)
            .await
            .extend()
    }

    async fn set_course_published(
        &self,
        ctx: &Context<'_>,
        id: i64,
        published: bool,
    ) -> Result<Course> {
        require_staff(ctx).extend()?;
        catalog::set_course_published(pool(ctx).extend()?, id, published)
            .await
            .extend()
    }

    async fn delete_course(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        require_staff(ctx).extend()?;
        catalog::delete_course(pool(ctx).extend()?, id).await.extend()?;
        Ok(true)
    }

    // Chapters

    async fn create_chapter(
        &self,
        ctx: &Context<'_>,
        input: CreateChapterInput,
    ) -> Result<Chapter> {
        require_staff(ctx).extend()?;
        let draft = ChapterDraft::new(input.title, input.description);
        catalog::create_chapter(pool(ctx).extend()?, input.course_id, draft)
            .await
            .extend()
    }

    async fn update_chapter(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: UpdateChapterInput,
    ) -> Result<Chapter> {
        require_staff(ctx).extend()?;
        catalog::update_chapter(pool(ctx).extend()?, id, input)
            .await
            .extend()
    }

    async fn delete_chapter(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        require_staff(ctx).extend()?;
        catalog::delete_chapter(pool(ctx).extend()?, id).await.extend()?;
        Ok(true)
    }

    /// `chapter_ids` lists every chapter of the course in the new order.
    async fn reorder_chapters(
        &self,
        ctx: &Context<'_>,
        course_id: i64,
        chapter_ids: Vec<i64>,
    ) -> Result<Vec<Chapter>> {
        require_staff(ctx).extend()?;
        catalog::reorder_chapters(pool(ctx).extend()?, course_id, &chapter_ids)
            .await
            .extend()
    }

    // Lessons

    async fn create_lesson(&self, ctx: &Context<'_>, input: CreateLessonInput) -> Result<Lesson> {
        require_staff(ctx).extend()?;
        let chapter_id = input.chapter_id;
        catalog::create_lesson(pool(ctx).extend()?, chapter_id, LessonDraft::from(input))
            .await
            .extend()
    }

    async fn update_lesson(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: UpdateLessonInput,
    ) -> Result<Lesson> {
        require_staff(ctx).extend()?;
        catalog::update_lesson(pool(ctx).extend()?, id, input)
            .await
            .extend()
    }

    async fn delete_lesson(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        require_staff(ctx).extend()?;
        catalog::delete_lesson(pool(ctx).extend()?, id).await.extend()?;
        Ok(true)
    }

    async fn reorder_lessons(
        &self,
        ctx: &Context<'_>,
        chapter_id: i64,
        lesson_ids: Vec<i64>,
    ) -> Result<Vec<Lesson>> {
        require_staff(ctx).extend()?;
        catalog::reorder_lessons(pool(ctx).extend()?, chapter_id, &lesson_ids)
            .await
            .extend()
    }

    // Notes

    async fn create_note(&self, ctx: &Context<'_>, input: CreateNoteInput) -> Result<Note> {
        require_staff(ctx).extend()?;
        catalog::create_note(pool(ctx).extend()?, NoteDraft::from(input))
            .await
            .extend()
    }

    async fn update_note(
        &self,
        ctx: &Context<'_>,
        id: i64,
        input: UpdateNoteInput,
    ) -> Result<Note> {
        require_staff(ctx).extend()?;
        catalog::update_note(pool(ctx).extend()?, id, input)
            .await
            .extend()
    }

    async fn delete_note(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        require_staff(ctx).extend()?;
        catalog::delete_note(pool(ctx).extend()?, id).await.extend()?;
        Ok(true)
    }
}
