// models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::validate::{self, FieldErrors, FormFields};

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_TEXT_LEN: usize = 5_000;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Space {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub valid_until: NaiveDate,
    pub pin: i64,
    pub password: String,
    pub created: DateTime<Utc>,
}

impl Space {
    /// Constant-time comparison against the stored host password.
    pub fn is_host(&self, password: Option<&str>) -> bool {
        password.is_some_and(|p| bool::from(p.as_bytes().ct_eq(self.password.as_bytes())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Choice,
    MultiChoice,
    Textarea,
}

#[derive(Debug, Error)]
#[error("unknown question type {0:?}")]
pub struct UnknownQuestionType(String);

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Choice => "choice",
            QuestionType::MultiChoice => "multichoice",
            QuestionType::Textarea => "textarea",
        }
    }

    pub fn has_choices(self) -> bool {
        !matches!(self, QuestionType::Textarea)
    }
}

impl TryFrom<String> for QuestionType {
    type Error = UnknownQuestionType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "choice" => Ok(QuestionType::Choice),
            "multichoice" => Ok(QuestionType::MultiChoice),
            "textarea" => Ok(QuestionType::Textarea),
            _ => Err(UnknownQuestionType(value)),
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Question {
    pub id: String,
    pub space_id: String,
    pub text: String,
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub sort_order: i64,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Choice {
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub sort_order: i64,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Answer {
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackQuery {
    pub password: Option<String>,
    /// Present (usually empty) right after the space was created.
    pub created: Option<String>,
}

/// Validated "create space" submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSpace {
    pub title: String,
    pub valid_until: NaiveDate,
}

impl TryFrom<&FormFields> for NewSpace {
    type Error = FieldErrors;

    fn try_from(form: &FormFields) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();

        let title = validate::required_text(&mut errors, "title", form.get("title"), MAX_TITLE_LEN);
        let valid_until = validate::date(&mut errors, "valid_until", form.get("valid_until"));

        match valid_until {
            Some(valid_until) => errors.finish(NewSpace { title, valid_until }),
            None => Err(errors),
        }
    }
}

/// Validated "add question" submission. The password is checked separately
/// against the space it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub text: String,
    pub kind: QuestionType,
    /// `(sort_order, text)` pairs; empty for free-text questions.
    pub choices: Vec<(i64, String)>,
}

impl TryFrom<&FormFields> for NewQuestion {
    type Error = FieldErrors;

    fn try_from(form: &FormFields) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();

        let text = validate::required_text(&mut errors, "text", form.get("text"), MAX_TEXT_LEN);

        let kind = match QuestionType::try_from(form.get("type").unwrap_or_default().to_string()) {
            Ok(kind) => kind,
            Err(e) => {
                errors.push("type", e.to_string());
                return Err(errors);
            }
        };

        let choices = if kind.has_choices() {
            let choices = validate::positioned_entries(&form.all("choices[]"));
            if choices.is_empty() {
                errors.push("choices", "at least one choice required");
            }
            choices
        } else {
            Vec::new()
        };

        errors.finish(NewQuestion {
            text,
            kind,
            choices,
        })
    }
}

/// Validated answer submission for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswers {
    pub question_id: String,
    pub texts: Vec<String>,
}

impl TryFrom<&FormFields> for NewAnswers {
    type Error = FieldErrors;

    fn try_from(form: &FormFields) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();

        let question_id = form.get("question_id").unwrap_or_default().trim().to_string();
        if question_id.is_empty() {
            errors.push("question_id", "cannot be blank");
        }

        let texts: Vec<String> = validate::positioned_entries(&form.all("text[]"))
            .into_iter()
            .map(|(_, text)| text)
            .collect();
        if texts.is_empty() {
            errors.push("text", "at least one answer required");
        }
        if texts.iter().any(|t| t.chars().count() > MAX_TEXT_LEN) {
            errors.push("text", format!("must be at most {MAX_TEXT_LEN} characters"));
        }

        errors.finish(NewAnswers { question_id, texts })
    }
}
