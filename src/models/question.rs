// src/models/question.rs

use async_graphql::{Enum, InputObject, MaybeUndefined, SimpleObject};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    error::AppError,
    models::apply_patch,
    utils::{html::clean_optional_html, validation::validate_not_blank},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Enum)]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Enum)]
#[sqlx(type_name = "difficulty", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// One answer option. Stored inside the `options` JSONB array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, InputObject)]
#[graphql(input_name = "QuestionOptionInput")]
pub struct QuestionOption {
    pub text: String,
    #[graphql(default)]
    #[serde(default)]
    pub is_correct: bool,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct Question {
    pub id: i64,

    pub question_text: String,

    pub question_type: QuestionType,

    /// Empty for short-answer questions.
    #[graphql(skip)]
    pub options: Json<Vec<QuestionOption>>,

    /// The canonical answer key. Never shown to learners.
    #[graphql(skip)]
    pub correct_answer: String,

    #[graphql(skip)]
    pub explanation: Option<String>,

    pub difficulty: Difficulty,

    pub subject_id: i64,

    pub topic_id: Option<i64>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Question {
    /// Grades a submitted answer.
    ///
    /// Choice questions compare against the option flagged correct; short-answer
    /// questions compare against the stored key. Both comparisons are exact.
    pub fn grade(&self, selected: &str) -> bool {
        if self.question_type.is_choice() {
            if let Some(correct) = self.options.iter().find(|o| o.is_correct) {
                return correct.text == selected;
            }
        }
        self.correct_answer == selected
    }
}

/// An option as shown to a client. `is_correct` is withheld from learners.
#[derive(Debug, Clone, SimpleObject)]
pub struct OptionView {
    pub text: String,
    pub is_correct: Option<bool>,
}

impl OptionView {
    pub fn from_option(option: &QuestionOption, reveal: bool) -> Self {
        Self {
            text: option.text.clone(),
            is_correct: reveal.then_some(option.is_correct),
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, InputObject)]
pub struct CreateQuestionInput {
    pub question_text: String,
    pub question_type: QuestionType,
    #[graphql(default)]
    pub options: Vec<QuestionOption>,
    /// Required for short-answer and option-less true/false questions;
    /// derived from the flagged option otherwise.
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub subject_id: i64,
    pub topic_id: Option<i64>,
}

/// DTO for updating a question. Absent fields keep their stored value.
#[derive(Debug, Default, InputObject)]
pub struct UpdateQuestionInput {
    pub question_text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub options: Option<Vec<QuestionOption>>,
    pub correct_answer: Option<String>,
    pub explanation: MaybeUndefined<String>,
    pub difficulty: Option<Difficulty>,
    pub subject_id: Option<i64>,
    pub topic_id: MaybeUndefined<i64>,
}

/// Filters for listing the question bank.
#[derive(Debug, Default, InputObject)]
pub struct QuestionFilter {
    pub subject_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    /// Case-insensitive substring of the question text.
    pub search: Option<String>,
}

/// A question as submitted, before its answer key is settled.
#[derive(Debug, Clone, Validate)]
pub struct QuestionDraft {
    #[validate(
        length(min = 1, max = 5000, message = "must be 1 to 5000 characters"),
        custom(function = validate_not_blank)
    )]
    pub question_text: String,
    pub question_type: QuestionType,
    #[validate(length(max = 10, message = "at most 10 options"))]
    pub options: Vec<QuestionOption>,
    #[validate(length(max = 1000, message = "at most 1000 characters"))]
    pub correct_answer: Option<String>,
    #[validate(length(max = 10000, message = "at most 10000 characters"))]
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub subject_id: i64,
    pub topic_id: Option<i64>,
}

/// A validated question, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<QuestionOption>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub subject_id: i64,
    pub topic_id: Option<i64>,
}

impl From<CreateQuestionInput> for QuestionDraft {
    fn from(input: CreateQuestionInput) -> Self {
        Self {
            question_text: input.question_text,
            question_type: input.question_type,
            options: input.options,
            correct_answer: input.correct_answer,
            explanation: input.explanation,
            difficulty: input.difficulty,
            subject_id: input.subject_id,
            topic_id: input.topic_id,
        }
    }
}

impl QuestionDraft {
    /// Starts from the stored question and applies a partial update.
    ///
    /// When the type or options change, the stored key is dropped and derived
    /// again unless the patch supplies a new one.
    pub fn from_existing(existing: &Question, patch: UpdateQuestionInput) -> Self {
        let structure_changed = patch.question_type.is_some() || patch.options.is_some();

        let mut draft = Self {
            question_text: existing.question_text.clone(),
            question_type: existing.question_type,
            options: existing.options.0.clone(),
            correct_answer: Some(existing.correct_answer.clone()),
            explanation: existing.explanation.clone(),
            difficulty: existing.difficulty,
            subject_id: existing.subject_id,
            topic_id: existing.topic_id,
        };

        if structure_changed && patch.correct_answer.is_none() {
            draft.correct_answer = None;
        }
        if let Some(text) = patch.question_text {
            draft.question_text = text;
        }
        if let Some(question_type) = patch.question_type {
            draft.question_type = question_type;
        }
        if let Some(options) = patch.options {
            draft.options = options;
        }
        if let Some(answer) = patch.correct_answer {
            draft.correct_answer = Some(answer);
        }
        apply_patch(&mut draft.explanation, patch.explanation);
        if let Some(difficulty) = patch.difficulty {
            draft.difficulty = difficulty;
        }
        if let Some(subject_id) = patch.subject_id {
            draft.subject_id = subject_id;
        }
        apply_patch(&mut draft.topic_id, patch.topic_id);

        draft
    }

    /// Validates the draft and settles its options and answer key.
    pub fn into_canonical(self) -> Result<CanonicalQuestion, AppError> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);

        let answer = self.correct_answer.as_deref();
        let key = match check_shape(self.question_type, &self.options, answer) {
            Ok(key) => Some(key),
            Err((field, error)) => {
                errors.add(field, error);
                None
            }
        };

        match key {
            Some((options, correct_answer)) if errors.errors().is_empty() => Ok(CanonicalQuestion {
                question_text: self.question_text.trim().to_string(),
                question_type: self.question_type,
                options,
                correct_answer,
                explanation: clean_optional_html(self.explanation.as_deref()),
                difficulty: self.difficulty,
                subject_id: self.subject_id,
                topic_id: self.topic_id,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

fn shape_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Per-type rules for options and the answer key.
/// Returns the options to store and the canonical correct answer.
fn check_shape(
    question_type: QuestionType,
    options: &[QuestionOption],
    correct_answer: Option<&str>,
) -> Result<(Vec<QuestionOption>, String), (&'static str, ValidationError)> {
    match question_type {
        QuestionType::MultipleChoice => {
            if options.len() < 2 {
                return Err((
                    "options",
                    shape_error(
                        "too_few_options",
                        "multiple-choice questions need at least two options",
                    ),
                ));
            }
            let correct = single_correct_option(options)?;
            if let Some(given) = correct_answer {
                if given != correct {
                    return Err((
                        "correct_answer",
                        shape_error("answer_mismatch", "must match the option marked correct"),
                    ));
                }
            }
            Ok((options.to_vec(), correct))
        }
        QuestionType::TrueFalse => {
            if options.is_empty() {
                let truth = match correct_answer.map(|a| a.trim().to_ascii_lowercase()).as_deref() {
                    Some("true") => true,
                    Some("false") => false,
                    _ => {
                        return Err((
                            "correct_answer",
                            shape_error("invalid_boolean", "must be True or False"),
                        ));
                    }
                };
                let generated = vec![
                    QuestionOption { text: "True".to_string(), is_correct: truth },
                    QuestionOption { text: "False".to_string(), is_correct: !truth },
                ];
                let key = if truth { "True" } else { "False" };
                return Ok((generated, key.to_string()));
            }

            let mut texts: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
            texts.sort_unstable();
            if texts != ["False", "True"] {
                return Err((
                    "options",
                    shape_error(
                        "invalid_true_false",
                        "true/false options must be exactly True and False",
                    ),
                ));
            }
            let correct = single_correct_option(options)?;
            if let Some(given) = correct_answer {
                if !given.eq_ignore_ascii_case(&correct) {
                    return Err((
                        "correct_answer",
                        shape_error("answer_mismatch", "must match the option marked correct"),
                    ));
                }
            }
            Ok((options.to_vec(), correct))
        }
        QuestionType::ShortAnswer => {
            if !options.is_empty() {
                return Err((
                    "options",
                    shape_error("unexpected_options", "short-answer questions take no options"),
                ));
            }
            match correct_answer {
                Some(answer) if !answer.trim().is_empty() => Ok((Vec::new(), answer.to_string())),
                _ => Err((
                    "correct_answer",
                    shape_error("required", "short-answer questions need a correct answer"),
                )),
            }
        }
    }
}

/// Option texts must be non-blank and distinct, with exactly one marked correct.
fn single_correct_option(
    options: &[QuestionOption],
) -> Result<String, (&'static str, ValidationError)> {
    if options.iter().any(|o| o.text.trim().is_empty()) {
        return Err(("options", shape_error("blank_option", "option text must not be blank")));
    }
    for (idx, option) in options.iter().enumerate() {
        if options[..idx].iter().any(|prev| prev.text == option.text) {
            return Err((
                "options",
                shape_error("duplicate_option", "option texts must be distinct"),
            ));
        }
    }

    let mut correct = options.iter().filter(|o| o.is_correct);
    match (correct.next(), correct.next()) {
        (Some(only), None) => Ok(only.text.clone()),
        _ => Err((
            "options",
            shape_error("correct_option_count", "exactly one option must be marked correct"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(text: &str, is_correct: bool) -> QuestionOption {
        QuestionOption { text: text.to_string(), is_correct }
    }

    fn draft(
        question_type: QuestionType,
        options: Vec<QuestionOption>,
        answer: Option<&str>,
    ) -> QuestionDraft {
        QuestionDraft {
            question_text: "Unit of resistance?".to_string(),
            question_type,
            options,
            correct_answer: answer.map(str::to_string),
            explanation: None,
            difficulty: Difficulty::Easy,
            subject_id: 1,
            topic_id: None,
        }
    }

    fn stored(question_type: QuestionType, options: Vec<QuestionOption>, answer: &str) -> Question {
        Question {
            id: 1,
            question_text: "q".to_string(),
            question_type,
            options: Json(options),
            correct_answer: answer.to_string(),
            explanation: None,
            difficulty: Difficulty::Medium,
            subject_id: 1,
            topic_id: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn field_codes(err: AppError) -> Vec<(String, String)> {
        match err {
            AppError::Validation(errors) => errors
                .field_errors()
                .into_iter()
                .flat_map(|(field, errs)| {
                    errs.iter()
                        .map(|e| (field.to_string(), e.code.to_string()))
                        .collect::<Vec<_>>()
                })
                .collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_choice_key_comes_from_flagged_option() {
        let canonical = draft(
            QuestionType::MultipleChoice,
            vec![opt("Ohm", true), opt("Volt", false), opt("Ampere", false)],
            None,
        )
        .into_canonical()
        .unwrap();
        assert_eq!(canonical.correct_answer, "Ohm");
        assert_eq!(canonical.options.len(), 3);
    }

    #[test]
    fn test_multiple_choice_needs_two_options() {
        let err = draft(QuestionType::MultipleChoice, vec![opt("Ohm", true)], None)
            .into_canonical()
            .unwrap_err();
        assert_eq!(field_codes(err), vec![("options".to_string(), "too_few_options".to_string())]);
    }

    #[test]
    fn test_multiple_choice_needs_exactly_one_correct() {
        let none = draft(
            QuestionType::MultipleChoice,
            vec![opt("Ohm", false), opt("Volt", false)],
            None,
        );
        let two = draft(
            QuestionType::MultipleChoice,
            vec![opt("Ohm", true), opt("Volt", true)],
            None,
        );
        for d in [none, two] {
            let codes = field_codes(d.into_canonical().unwrap_err());
            assert_eq!(codes[0].1, "correct_option_count");
        }
    }

    #[test]
    fn test_multiple_choice_rejects_mismatched_answer() {
        let err = draft(
            QuestionType::MultipleChoice,
            vec![opt("Ohm", true), opt("Volt", false)],
            Some("Volt"),
        )
        .into_canonical()
        .unwrap_err();
        assert_eq!(field_codes(err)[0].0, "correct_answer");
    }

    #[test]
    fn test_duplicate_option_texts_rejected() {
        let err = draft(
            QuestionType::MultipleChoice,
            vec![opt("Ohm", true), opt("Ohm", false)],
            None,
        )
        .into_canonical()
        .unwrap_err();
        assert_eq!(field_codes(err)[0].1, "duplicate_option");
    }

    #[test]
    fn test_true_false_options_generated_from_answer() {
        let canonical = draft(QuestionType::TrueFalse, vec![], Some("false"))
            .into_canonical()
            .unwrap();
        assert_eq!(canonical.correct_answer, "False");
        assert_eq!(canonical.options, vec![opt("True", false), opt("False", true)]);
    }

    #[test]
    fn test_true_false_rejects_other_options() {
        let err = draft(
            QuestionType::TrueFalse,
            vec![opt("Yes", true), opt("No", false)],
            None,
        )
        .into_canonical()
        .unwrap_err();
        assert_eq!(field_codes(err)[0].1, "invalid_true_false");
    }

    #[test]
    fn test_short_answer_requires_key_and_no_options() {
        let missing = draft(QuestionType::ShortAnswer, vec![], Some("  ")).into_canonical();
        assert!(missing.is_err());

        let with_options =
            draft(QuestionType::ShortAnswer, vec![opt("x", true)], Some("x")).into_canonical();
        assert_eq!(field_codes(with_options.unwrap_err())[0].1, "unexpected_options");

        let ok = draft(QuestionType::ShortAnswer, vec![], Some("9.8")).into_canonical().unwrap();
        assert_eq!(ok.correct_answer, "9.8");
        assert!(ok.options.is_empty());
    }

    #[test]
    fn test_field_and_shape_errors_are_reported_together() {
        let mut d = draft(QuestionType::MultipleChoice, vec![], None);
        d.question_text = "   ".to_string();
        let codes = field_codes(d.into_canonical().unwrap_err());
        assert!(codes.iter().any(|(f, _)| f == "question_text"));
        assert!(codes.iter().any(|(f, _)| f == "options"));
    }

    #[test]
    fn test_explanation_is_sanitized() {
        let mut d = draft(QuestionType::ShortAnswer, vec![], Some("9.8"));
        d.explanation = Some("<p>g</p><script>steal()</script>".to_string());
        let canonical = d.into_canonical().unwrap();
        assert_eq!(canonical.explanation.as_deref(), Some("<p>g</p>"));
    }

    #[test]
    fn test_update_changing_type_rederives_key() {
        let existing = stored(QuestionType::ShortAnswer, vec![], "Ohm");
        let patch = UpdateQuestionInput {
            question_type: Some(QuestionType::MultipleChoice),
            options: Some(vec![opt("Volt", false), opt("Ohm", true)]),
            ..Default::default()
        };
        let canonical = QuestionDraft::from_existing(&existing, patch).into_canonical().unwrap();
        assert_eq!(canonical.correct_answer, "Ohm");
    }

    #[test]
    fn test_update_can_clear_topic() {
        let mut existing = stored(QuestionType::ShortAnswer, vec![], "Ohm");
        existing.topic_id = Some(4);
        let patch = UpdateQuestionInput {
            topic_id: MaybeUndefined::Null,
            ..Default::default()
        };
        let d = QuestionDraft::from_existing(&existing, patch);
        assert_eq!(d.topic_id, None);
        assert_eq!(d.correct_answer.as_deref(), Some("Ohm"));
    }

    #[test]
    fn test_grade_choice_uses_flagged_option() {
        let q = stored(
            QuestionType::MultipleChoice,
            vec![opt("A", true), opt("B", false)],
            "A",
        );
        assert!(q.grade("A"));
        assert!(!q.grade("B"));
        assert!(!q.grade("a"));
    }

    #[test]
    fn test_grade_short_answer_is_exact() {
        let q = stored(QuestionType::ShortAnswer, vec![], "9.8");
        assert!(q.grade("9.8"));
        assert!(!q.grade("9.80"));
        assert!(!q.grade(" 9.8"));
    }

    #[test]
    fn test_option_view_hides_flag_from_learners() {
        let o = opt("A", true);
        assert_eq!(OptionView::from_option(&o, false).is_correct, None);
        assert_eq!(OptionView::from_option(&o, true).is_correct, Some(true));
    }
}
