use std::collections::HashMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::quiz::stats::StatMap;
use crate::quiz::sync::StatUpdate;
use crate::quiz::{answers_match, stats, Question, ResultEntry};

#[derive(Debug, PartialEq, Eq)]
pub enum SelectionError {
    NoQuestions,
    AllMastered { threshold: u64 },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoQuestions => write!(f, "이 과목에는 아직 문제가 없습니다"),
            Self::AllMastered { threshold } => write!(
                f,
                "정답 {}회 이상 맞힌 문제를 제외하니 남은 문제가 없습니다. 숙달 기준을 낮춰보세요",
                threshold
            ),
        }
    }
}

impl std::error::Error for SelectionError {}

/// Builds the question set for a session: merge built-in and user-created
/// questions, attach current counters, drop mastered ones when a threshold
/// is set, shuffle options and question order, cut to `amount`.
pub fn select_questions<R: Rng>(
    builtin: Vec<Question>,
    custom: Vec<Question>,
    stat_map: &StatMap,
    amount: usize,
    mastery_threshold: u64,
    rng: &mut R,
) -> Result<Vec<Question>, SelectionError> {
    let mut pool: Vec<Question> = builtin.into_iter().chain(custom).collect();
    if pool.is_empty() {
        return Err(SelectionError::NoQuestions);
    }

    stats::merge_stats(&mut pool, stat_map);
    if mastery_threshold > 0 {
        pool.retain(|q| q.correct_count < mastery_threshold);
        if pool.is_empty() {
            return Err(SelectionError::AllMastered {
                threshold: mastery_threshold,
            });
        }
    }

    for q in pool.iter_mut() {
        q.options.shuffle(rng);
    }
    pool.shuffle(rng);
    pool.truncate(amount);
    Ok(pool)
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitError {
    EmptyAnswer,
    NoCurrentQuestion,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAnswer => write!(f, "보기 중 하나를 선택해주세요"),
            Self::NoCurrentQuestion => write!(f, "진행 중인 문제가 없습니다"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Everything derived from a finished session: the scored results and the
/// stat deltas to persist locally and mirror remotely.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SessionReport {
    pub results: Vec<ResultEntry>,
    pub stat_updates: Vec<StatUpdate>,
}

impl SessionReport {
    pub fn correct_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_correct).count()
    }

    pub fn incorrect(&self) -> Vec<&ResultEntry> {
        self.results.iter().filter(|r| !r.is_correct).collect()
    }
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The answer was recorded and the session moved to the next question.
    Advanced,
    /// That was the last question; all answers were scored in this step.
    Finished(SessionReport),
}

/// A test-mode session: the selected questions, the cursor, and one answer
/// slot per question. The whole value is serialized into the dialogue
/// state, so every transition is a plain function of the value.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct QuizSession {
    pub questions: Vec<Question>,
    pub current: usize,
    pub answers: Vec<String>,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Self {
        let answers = vec![String::new(); questions.len()];
        Self {
            questions,
            current: 0,
            answers,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Records the answer for the current question. On the last question the
    /// whole session is scored atomically and the report is returned.
    pub fn submit_answer(&mut self, answer: &str) -> Result<SubmitOutcome, SubmitError> {
        if answer.trim().is_empty() {
            return Err(SubmitError::EmptyAnswer);
        }
        let slot = self
            .answers
            .get_mut(self.current)
            .ok_or(SubmitError::NoCurrentQuestion)?;
        *slot = answer.to_string();

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            Ok(SubmitOutcome::Advanced)
        } else {
            Ok(SubmitOutcome::Finished(self.score()))
        }
    }

    fn score(&self) -> SessionReport {
        let results: Vec<ResultEntry> = self
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(q, answer)| ResultEntry {
                question: q.clone(),
                user_answer: answer.clone(),
                is_correct: answers_match(&q.answer, answer),
            })
            .collect();

        let stat_updates = results
            .iter()
            .map(|r| StatUpdate {
                id: r.question.stat_key(),
                attempts_delta: 1,
                correct_delta: if r.is_correct { 1 } else { 0 },
            })
            .collect();

        SessionReport {
            results,
            stat_updates,
        }
    }
}

/// Outcome of picking an option in browse mode.
#[derive(Debug, Clone)]
pub struct BrowseFeedback {
    pub is_correct: bool,
    /// Present only on the first answer to this question; re-selections
    /// update the displayed choice without touching the counters.
    pub stat_update: Option<StatUpdate>,
}

/// Un-scored walk over the filtered pool with immediate feedback. The
/// answered map resets with the session, so recomputing the pool allows
/// re-practice by design.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct BrowseSession {
    pub questions: Vec<Question>,
    pub current: usize,
    pub answered: HashMap<String, String>,
}

impl BrowseSession {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            current: 0,
            answered: HashMap::new(),
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    pub fn next(&mut self) {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
    }

    pub fn prev(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn answer_for_current(&self) -> Option<&String> {
        let q = self.current_question()?;
        self.answered.get(&q.stat_key())
    }

    pub fn select_answer(&mut self, answer: &str) -> Option<BrowseFeedback> {
        let question = self.questions.get(self.current)?.clone();
        let key = question.stat_key();
        let is_correct = answers_match(&question.answer, answer);
        let first_time = !self.answered.contains_key(&key);
        self.answered.insert(key.clone(), answer.to_string());

        let stat_update = first_time.then(|| StatUpdate {
            id: key,
            attempts_delta: 1,
            correct_delta: if is_correct { 1 } else { 0 },
        });
        Some(BrowseFeedback {
            is_correct,
            stat_update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::catalog::Subject;
    use crate::quiz::stats::QuestionStat;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn question(id: i64, answer: &str) -> Question {
        Question {
            subject: Subject::SocialCulture,
            id,
            question: format!("문제 {}", id),
            options: vec![answer.to_string(), "오답1".into(), "오답2".into()],
            answer: answer.to_string(),
            concept: format!("개념{}", id % 3),
            ..Default::default()
        }
    }

    fn pool(n: i64) -> Vec<Question> {
        (1..=n).map(|i| question(i, "정답")).collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn selecting_more_than_pool_returns_whole_pool() {
        let picked =
            select_questions(pool(3), vec![], &StatMap::new(), 10, 0, &mut rng()).unwrap();
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn selection_returns_exactly_n_distinct_questions() {
        let picked =
            select_questions(pool(20), vec![], &StatMap::new(), 10, 0, &mut rng()).unwrap();
        assert_eq!(picked.len(), 10);
        let mut ids: Vec<i64> = picked.iter().map(|q| q.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn custom_questions_are_merged_into_the_pool() {
        let custom = vec![question(1_700_000_000_000, "정답")];
        let picked =
            select_questions(pool(2), custom, &StatMap::new(), 10, 0, &mut rng()).unwrap();
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().any(|q| q.id == 1_700_000_000_000));
    }

    #[test]
    fn empty_pool_is_an_error() {
        let err =
            select_questions(vec![], vec![], &StatMap::new(), 10, 0, &mut rng()).unwrap_err();
        assert_eq!(err, SelectionError::NoQuestions);
    }

    #[test]
    fn threshold_excludes_mastered_questions() {
        let mut stat_map = StatMap::new();
        stat_map.insert("사회문화:1".into(), QuestionStat { attempts: 5, correct: 3 });
        stat_map.insert("사회문화:2".into(), QuestionStat { attempts: 5, correct: 2 });
        let picked =
            select_questions(pool(2), vec![], &stat_map, 10, 3, &mut rng()).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, 2);
    }

    #[test]
    fn threshold_zero_disables_filtering() {
        let mut stat_map = StatMap::new();
        stat_map.insert("사회문화:1".into(), QuestionStat { attempts: 99, correct: 99 });
        let picked =
            select_questions(pool(1), vec![], &stat_map, 10, 0, &mut rng()).unwrap();
        assert_eq!(picked.len(), 1);
    }

    #[test]
    fn exhausted_pool_error_names_the_threshold() {
        let mut stat_map = StatMap::new();
        stat_map.insert("사회문화:1".into(), QuestionStat { attempts: 9, correct: 9 });
        let err = select_questions(pool(1), vec![], &stat_map, 10, 2, &mut rng()).unwrap_err();
        assert_eq!(err, SelectionError::AllMastered { threshold: 2 });
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn session_walks_to_a_scored_report() {
        let mut session = QuizSession::new(pool(3));
        assert!(matches!(
            session.submit_answer("정답").unwrap(),
            SubmitOutcome::Advanced
        ));
        assert!(matches!(
            session.submit_answer("오답1").unwrap(),
            SubmitOutcome::Advanced
        ));
        let report = match session.submit_answer("정답").unwrap() {
            SubmitOutcome::Finished(report) => report,
            other => panic!("expected Finished, got {:?}", other),
        };
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.correct_count(), 2);
        assert_eq!(report.incorrect().len(), 1);
        assert_eq!(report.stat_updates.len(), 3);
        assert!(report
            .stat_updates
            .iter()
            .all(|u| u.attempts_delta == 1 && u.correct_delta <= 1));
    }

    #[test]
    fn scoring_trims_and_case_folds() {
        let mut session = QuizSession::new(vec![question(1, "seoul")]);
        let report = match session.submit_answer("Seoul ").unwrap() {
            SubmitOutcome::Finished(report) => report,
            other => panic!("expected Finished, got {:?}", other),
        };
        assert!(report.results[0].is_correct);
    }

    #[test]
    fn submitting_to_an_empty_session_is_an_error_not_a_panic() {
        let mut session = QuizSession::default();
        assert_eq!(
            session.submit_answer("정답").unwrap_err(),
            SubmitError::NoCurrentQuestion
        );
        let mut session = QuizSession::new(vec![]);
        assert_eq!(
            session.submit_answer("정답").unwrap_err(),
            SubmitError::NoCurrentQuestion
        );
    }

    #[test]
    fn blank_answer_is_rejected_and_does_not_advance() {
        let mut session = QuizSession::new(pool(2));
        assert_eq!(session.submit_answer("  ").unwrap_err(), SubmitError::EmptyAnswer);
        assert_eq!(session.current, 0);
    }

    #[test]
    fn browse_first_answer_yields_one_stat_update() {
        let mut browse = BrowseSession::new(pool(2));
        let feedback = browse.select_answer("정답").unwrap();
        assert!(feedback.is_correct);
        let update = feedback.stat_update.expect("first answer counts");
        assert_eq!(update.id, "사회문화:1");
        assert_eq!(update.attempts_delta, 1);
        assert_eq!(update.correct_delta, 1);
    }

    #[test]
    fn browse_reselection_updates_choice_but_not_counters() {
        let mut browse = BrowseSession::new(pool(1));
        browse.select_answer("정답").unwrap();
        let feedback = browse.select_answer("오답1").unwrap();
        assert!(!feedback.is_correct);
        assert!(feedback.stat_update.is_none());
        assert_eq!(browse.answer_for_current().unwrap(), "오답1");
    }

    #[test]
    fn browse_navigation_clamps_at_both_ends() {
        let mut browse = BrowseSession::new(pool(2));
        browse.prev();
        assert_eq!(browse.current, 0);
        browse.next();
        browse.next();
        assert_eq!(browse.current, 1);
    }
}
