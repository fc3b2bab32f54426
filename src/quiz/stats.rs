use std::collections::HashMap;

use crate::quiz::{Question, ResultEntry};

/// Cumulative per-question counters, keyed by the composite
/// `"{subject}:{id}"` key. Counters only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuestionStat {
    #[serde(rename = "attemptsCount")]
    pub attempts: u64,
    #[serde(rename = "correctCount")]
    pub correct: u64,
}

pub type StatMap = HashMap<String, QuestionStat>;

/// Records one scored answer: exactly one attempt, and one correct when the
/// answer was right.
pub fn record_result(stats: &mut StatMap, key: &str, is_correct: bool) {
    let stat = stats.entry(key.to_string()).or_default();
    stat.attempts += 1;
    if is_correct {
        stat.correct += 1;
    }
}

/// Records a whole finished session in one pass.
pub fn record_session(stats: &mut StatMap, results: &[ResultEntry]) {
    for r in results {
        record_result(stats, &r.question.stat_key(), r.is_correct);
    }
}

/// Copies the current counters onto the question records so selection and
/// the results view see up-to-date numbers.
pub fn merge_stats(questions: &mut [Question], stats: &StatMap) {
    for q in questions.iter_mut() {
        if let Some(stat) = stats.get(&q.stat_key()) {
            q.attempts_count = stat.attempts;
            q.correct_count = stat.correct;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::catalog::Subject;

    fn question(id: i64) -> Question {
        Question {
            subject: Subject::SocialCulture,
            id,
            ..Default::default()
        }
    }

    #[test]
    fn record_result_counts_attempt_and_correct() {
        let mut stats = StatMap::new();
        record_result(&mut stats, "사회문화:1", true);
        record_result(&mut stats, "사회문화:1", false);
        let stat = stats["사회문화:1"];
        assert_eq!(stat.attempts, 2);
        assert_eq!(stat.correct, 1);
    }

    #[test]
    fn counters_never_decrease() {
        let mut stats = StatMap::new();
        let mut last = QuestionStat::default();
        for correct in [true, false, false, true, true] {
            record_result(&mut stats, "k", correct);
            let now = stats["k"];
            assert!(now.attempts >= last.attempts);
            assert!(now.correct >= last.correct);
            assert!(now.correct <= now.attempts);
            last = now;
        }
    }

    #[test]
    fn record_session_touches_every_question_once() {
        let mut stats = StatMap::new();
        let results = vec![
            ResultEntry {
                question: question(1),
                user_answer: "가".into(),
                is_correct: true,
            },
            ResultEntry {
                question: question(2),
                user_answer: "나".into(),
                is_correct: false,
            },
        ];
        record_session(&mut stats, &results);
        assert_eq!(stats["사회문화:1"], QuestionStat { attempts: 1, correct: 1 });
        assert_eq!(stats["사회문화:2"], QuestionStat { attempts: 1, correct: 0 });
    }

    #[test]
    fn merge_stats_fills_in_counters() {
        let mut stats = StatMap::new();
        stats.insert("사회문화:1".into(), QuestionStat { attempts: 4, correct: 3 });
        let mut questions = vec![question(1), question(2)];
        merge_stats(&mut questions, &stats);
        assert_eq!(questions[0].attempts_count, 4);
        assert_eq!(questions[0].correct_count, 3);
        assert_eq!(questions[1].attempts_count, 0);
    }
}
