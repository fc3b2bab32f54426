pub mod ai_helper;
pub mod catalog;
pub mod session;
pub mod stats;
pub mod store;
pub mod sync;

use self::catalog::Subject;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub subject: Subject,
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub concept: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub attempts_count: u64,
    #[serde(default)]
    pub correct_count: u64,
}

impl Question {
    /// Composite key used for stats and remote counters, so identical
    /// numeric ids in different subjects never collide.
    pub fn stat_key(&self) -> String {
        format!("{}:{}", self.subject.as_str(), self.id)
    }
}

/// One scored question of a finished session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResultEntry {
    pub question: Question,
    pub user_answer: String,
    pub is_correct: bool,
}

/// Answers are compared after trimming and case-folding, so "Seoul " and
/// "seoul" count as the same answer.
pub fn answers_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_match_trims_and_case_folds() {
        assert!(answers_match("Seoul ", "seoul"));
        assert!(answers_match("  서울", "서울  "));
        assert!(!answers_match("Seoul", "Busan"));
    }

    #[test]
    fn answers_match_is_symmetric() {
        assert_eq!(answers_match("A ", " a"), answers_match(" a", "A "));
    }

    #[test]
    fn stat_key_includes_subject() {
        let q = Question {
            subject: Subject::SocialCulture,
            id: 7,
            ..Default::default()
        };
        assert_eq!(q.stat_key(), "사회문화:7");
    }
}
