// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The prompt shown to the player.
    pub text: String,

    /// Ordered answer choices.
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<QuizOption>>,

    /// Seconds allowed to answer.
    pub time_limit: i32,

    /// Points credited when a correct option is chosen.
    pub points: i32,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A single answer choice of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

impl Question {
    /// Seconds allowed for this question, never negative.
    pub fn time_limit_secs(&self) -> u32 {
        u32::try_from(self.time_limit).unwrap_or(0)
    }

    pub fn option(&self, option_id: &str) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// DTO for sending a question to a player (excludes correctness flags).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<PublicOption>,
    pub time_limit: i32,
    pub points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: String,
    pub text: String,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q
                .options
                .iter()
                .map(|o| PublicOption {
                    id: o.id.clone(),
                    text: o.text.clone(),
                })
                .collect(),
            time_limit: q.time_limit,
            points: q.points,
        }
    }
}

/// Fields needed to insert a question.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub text: String,
    pub options: Vec<QuizOption>,
    pub time_limit: i32,
    pub points: i32,
}

/// Partial update of a question.
#[derive(Debug, Clone, Default)]
pub struct QuestionChanges {
    pub text: Option<String>,
    pub options: Option<Vec<QuizOption>>,
    pub time_limit: Option<i32>,
    pub points: Option<i32>,
}

/// Option payload used when creating or replacing a question's options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating a new question.
/// `time_limit` and `points` fall back to the panel defaults when omitted.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<NewOption>,
    #[validate(range(min = 1, max = 3600))]
    pub time_limit: Option<i32>,
    #[validate(range(min = 1, max = 1000))]
    pub points: Option<i32>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<NewOption>>,
    #[validate(range(min = 1, max = 3600))]
    pub time_limit: Option<i32>,
    #[validate(range(min = 1, max = 1000))]
    pub points: Option<i32>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.options.is_none()
            && self.time_limit.is_none()
            && self.points.is_none()
    }
}

fn validate_options(options: &[NewOption]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.text.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_blank"));
        }
        if opt.text.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: Vec<NewOption>) -> CreateQuestionRequest {
        CreateQuestionRequest {
            text: "Capital of France?".to_string(),
            options,
            time_limit: Some(30),
            points: Some(2),
        }
    }

    #[test]
    fn test_create_question_requires_options() {
        assert!(request(vec![]).validate().is_err());
    }

    #[test]
    fn test_create_question_rejects_blank_option() {
        let req = request(vec![NewOption {
            text: "   ".to_string(),
            is_correct: true,
        }]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_question_rejects_zero_time_limit() {
        let mut req = request(vec![NewOption {
            text: "Paris".to_string(),
            is_correct: true,
        }]);
        req.time_limit = Some(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_option_errors_carry_submitted_options() {
        let req = request(vec![NewOption {
            text: "".to_string(),
            is_correct: false,
        }]);
        let errors = req.validate().unwrap_err();
        let option_errors = &errors.field_errors()["options"];
        assert_eq!(option_errors[0].code, "option_cannot_be_blank");
        assert_eq!(option_errors[0].params["value"][0]["text"], "");
    }

    #[test]
    fn test_update_question_validates_options_when_present() {
        let req: UpdateQuestionRequest =
            serde_json::from_value(serde_json::json!({ "options": [] })).unwrap();
        assert!(req.validate().is_err());

        let req: UpdateQuestionRequest =
            serde_json::from_value(serde_json::json!({ "points": 3 })).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_public_question_hides_correctness() {
        let q = Question {
            id: 7,
            text: "2 + 2?".to_string(),
            options: Json(vec![QuizOption {
                id: "a".to_string(),
                text: "4".to_string(),
                is_correct: true,
            }]),
            time_limit: 20,
            points: 3,
            created_at: None,
        };
        let public = serde_json::to_value(PublicQuestion::from(&q)).unwrap();
        assert_eq!(public["options"][0]["text"], "4");
        assert!(public["options"][0].get("is_correct").is_none());
    }
}
