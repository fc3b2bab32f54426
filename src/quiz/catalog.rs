use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::quiz::{answers_match, Question};

/// CSAT social-studies subjects served by the bot.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Subject {
    #[default]
    #[serde(rename = "사회문화")]
    SocialCulture,
    #[serde(rename = "생활과윤리")]
    LifeEthics,
    #[serde(rename = "정치와법")]
    PoliticsLaw,
    #[serde(rename = "한국지리")]
    KoreanGeography,
}

impl Subject {
    pub const ALL: [Subject; 4] = [
        Subject::SocialCulture,
        Subject::LifeEthics,
        Subject::PoliticsLaw,
        Subject::KoreanGeography,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::SocialCulture => "사회문화",
            Subject::LifeEthics => "생활과윤리",
            Subject::PoliticsLaw => "정치와법",
            Subject::KoreanGeography => "한국지리",
        }
    }

    pub fn from_label(label: &str) -> Option<Subject> {
        Subject::ALL.iter().copied().find(|s| s.as_str() == label.trim())
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The built-in question bank, loaded once at startup. Questions created by
/// users live in the persisted overlay (see `store`) and are merged with
/// these at selection time.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Catalog {
    pub questions: Vec<Question>,
}

impl Catalog {
    pub fn new(file: File) -> Self {
        let reader = BufReader::new(file);
        let questions: Vec<Question> =
            serde_json::from_reader(reader).expect("Failed to parse the question bank");
        for q in &questions {
            assert!(
                question_is_consistent(q),
                "Question {}:{} has an answer that matches no option",
                q.subject,
                q.id
            );
        }
        Self { questions }
    }

    pub fn for_subject(&self, subject: Subject) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| q.subject == subject)
            .cloned()
            .collect()
    }
}

/// The correct answer must match exactly one option under trim + case-fold.
pub fn question_is_consistent(q: &Question) -> bool {
    q.options
        .iter()
        .filter(|o| answers_match(o, &q.answer))
        .count()
        == 1
}

#[derive(Debug)]
pub enum CustomQuestionError {
    BadFormat,
    TooFewOptions,
    AnswerNotAnOption,
}

impl fmt::Display for CustomQuestionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadFormat => {
                write!(f, "형식: 문제 | 보기1; 보기2; ... | 정답 | 개념")
            }
            Self::TooFewOptions => write!(f, "보기는 2개 이상이어야 합니다"),
            Self::AnswerNotAnOption => {
                write!(f, "정답이 보기 중 정확히 하나와 일치해야 합니다")
            }
        }
    }
}

impl std::error::Error for CustomQuestionError {}

/// Parses a user-created question from one message of the form
/// `문제 | 보기1; 보기2; ... | 정답 | 개념`. The id is derived from the
/// current time so ids never clash with the numeric built-in ones.
pub fn parse_custom_question(
    subject: Subject,
    input: &str,
) -> Result<Question, CustomQuestionError> {
    let parts: Vec<&str> = input.split('|').map(str::trim).collect();
    if parts.len() != 4 || parts.iter().any(|p| p.is_empty()) {
        return Err(CustomQuestionError::BadFormat);
    }

    let options: Vec<String> = parts[1]
        .split(';')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if options.len() < 2 {
        return Err(CustomQuestionError::TooFewOptions);
    }

    let question = Question {
        subject,
        id: timestamp_id(),
        question: parts[0].to_string(),
        options,
        answer: parts[2].to_string(),
        concept: parts[3].to_string(),
        category: String::new(),
        image_url: None,
        attempts_count: 0,
        correct_count: 0,
    };

    if !question_is_consistent(&question) {
        return Err(CustomQuestionError::AnswerNotAnOption);
    }
    Ok(question)
}

fn timestamp_id() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
