use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::quiz::catalog::Subject;
use crate::quiz::stats::StatMap;
use crate::quiz::Question;

const STATS_FILE: &str = "stats.json";
const CUSTOM_QUESTIONS_FILE: &str = "custom_questions.json";
const SETTINGS_FILE: &str = "settings.json";

/// Per-chat configuration, the bot's counterpart of the original's saved
/// preferences: chosen subject, desired test length, mastery-exclusion
/// threshold (0 disables the filter).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ChatSettings {
    pub subject: Subject,
    pub amount: usize,
    pub mastery_threshold: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            subject: Subject::default(),
            amount: 10,
            mastery_threshold: 0,
        }
    }
}

/// JSON-file persistence under a single data directory. Reads fall back to
/// defaults when a file is missing or corrupt; failed writes are logged and
/// otherwise ignored, so the session degrades to in-memory state.
#[derive(Debug)]
pub struct LocalStore {
    dir: PathBuf,
    pub stats: StatMap,
    pub custom_questions: Vec<Question>,
    pub settings: HashMap<String, ChatSettings>,
}

impl LocalStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Could not create data dir {}: {}", dir.display(), e);
        }
        let stats = read_json(&dir.join(STATS_FILE)).unwrap_or_default();
        let custom_questions =
            read_json(&dir.join(CUSTOM_QUESTIONS_FILE)).unwrap_or_default();
        let settings = read_json(&dir.join(SETTINGS_FILE)).unwrap_or_default();
        Self {
            dir,
            stats,
            custom_questions,
            settings,
        }
    }

    pub fn save_stats(&self) {
        write_json(&self.dir.join(STATS_FILE), &self.stats);
    }

    pub fn add_custom_question(&mut self, question: Question) {
        self.custom_questions.push(question);
        write_json(&self.dir.join(CUSTOM_QUESTIONS_FILE), &self.custom_questions);
    }

    pub fn custom_for_subject(&self, subject: Subject) -> Vec<Question> {
        self.custom_questions
            .iter()
            .filter(|q| q.subject == subject)
            .cloned()
            .collect()
    }

    pub fn settings_for(&self, chat_id: &str) -> ChatSettings {
        self.settings.get(chat_id).copied().unwrap_or_default()
    }

    pub fn update_settings(&mut self, chat_id: &str, settings: ChatSettings) {
        self.settings.insert(chat_id.to_string(), settings);
        write_json(&self.dir.join(SETTINGS_FILE), &self.settings);
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring corrupt {}: {}", path.display(), e);
            None
        }
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) {
    let raw = match serde_json::to_string_pretty(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Could not serialize {}: {}", path.display(), e);
            return;
        }
    };
    if let Err(e) = fs::write(path, raw) {
        warn!("Could not write {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::stats::record_result;

    #[test]
    fn open_on_empty_dir_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path());
        assert!(store.stats.is_empty());
        assert!(store.custom_questions.is_empty());
        assert_eq!(store.settings_for("123").amount, 10);
    }

    #[test]
    fn stats_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = LocalStore::open(dir.path());
            record_result(&mut store.stats, "사회문화:1", true);
            store.save_stats();
        }
        let store = LocalStore::open(dir.path());
        assert_eq!(store.stats["사회문화:1"].attempts, 1);
        assert_eq!(store.stats["사회문화:1"].correct, 1);
    }

    #[test]
    fn corrupt_stats_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STATS_FILE), "{not json").unwrap();
        let store = LocalStore::open(dir.path());
        assert!(store.stats.is_empty());
    }

    #[test]
    fn settings_are_persisted_per_chat() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = LocalStore::open(dir.path());
            store.update_settings(
                "42",
                ChatSettings {
                    subject: Subject::PoliticsLaw,
                    amount: 5,
                    mastery_threshold: 3,
                },
            );
        }
        let store = LocalStore::open(dir.path());
        let settings = store.settings_for("42");
        assert_eq!(settings.subject, Subject::PoliticsLaw);
        assert_eq!(settings.amount, 5);
        assert_eq!(settings.mastery_threshold, 3);
        assert_eq!(store.settings_for("43").mastery_threshold, 0);
    }

    #[test]
    fn amount_setting_survives_a_failed_selection() {
        use crate::quiz::session::{select_questions, SelectionError};
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = LocalStore::open(dir.path());
            let mut settings = store.settings_for("42");
            settings.amount = 7;
            store.update_settings("42", settings);
            let selected = select_questions(
                vec![],
                store.custom_for_subject(settings.subject),
                &store.stats,
                settings.amount,
                settings.mastery_threshold,
                &mut StdRng::seed_from_u64(7),
            );
            assert_eq!(selected.unwrap_err(), SelectionError::NoQuestions);
        }
        let store = LocalStore::open(dir.path());
        assert_eq!(store.settings_for("42").amount, 7);
    }

    #[test]
    fn custom_questions_are_appended_and_filtered_by_subject() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open(dir.path());
        store.add_custom_question(Question {
            subject: Subject::LifeEthics,
            id: 1,
            ..Default::default()
        });
        store.add_custom_question(Question {
            subject: Subject::SocialCulture,
            id: 2,
            ..Default::default()
        });
        assert_eq!(store.custom_for_subject(Subject::LifeEthics).len(), 1);
        assert_eq!(store.custom_for_subject(Subject::KoreanGeography).len(), 0);
    }
}
