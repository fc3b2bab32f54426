use std::fs::File;
use std::sync::{Arc, Mutex};

use dotenv::dotenv;
use log::{debug, warn};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup},
};

use csat_quiz_bot::quiz::ai_helper::{GeneratedQuestion, QuizHelper};
use csat_quiz_bot::quiz::catalog::{parse_custom_question, Catalog, Subject};
use csat_quiz_bot::quiz::session::{
    select_questions, BrowseSession, QuizSession, SessionReport, SubmitOutcome,
};
use csat_quiz_bot::quiz::stats::{record_result, record_session};
use csat_quiz_bot::quiz::store::LocalStore;
use csat_quiz_bot::quiz::sync::SyncClient;
use csat_quiz_bot::quiz::{answers_match, Question};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveSubject,
    ReceiveMenuChoice,
    ReceiveAmount,
    ReceiveThreshold,
    ReceiveCustomQuestion,
    Test {
        session: QuizSession,
    },
    Results {
        report: SessionReport,
    },
    SimilarQuiz {
        report: SessionReport,
        generated: GeneratedQuestion,
    },
    Browse {
        browse: BrowseSession,
    },
}

type DialogueStorage = std::sync::Arc<ErasedStorage<State>>;
type SharedStore = Arc<Mutex<LocalStore>>;

#[tokio::main]
async fn main() {
    dotenv().expect("Failed to load .env file");
    let gemini_api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY is not set");
    let stats_api_url = std::env::var("STATS_API_URL").ok();
    let questions_file =
        std::env::var("QUESTIONS_FILE").unwrap_or_else(|_| "data/questions.json".to_string());
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

    pretty_env_logger::init();
    log::info!("Starting CSAT quiz bot...");

    let bot = Bot::from_env();

    let storage: DialogueStorage = SqliteStorage::open("db.sqlite", Json)
        .await
        .unwrap()
        .erase();

    log::info!("Loading the question bank from {}", questions_file);
    let catalog = Arc::new(Catalog::new(
        File::open(&questions_file).expect("Failed to open the question bank file"),
    ));
    log::info!("Question bank loaded: {} questions", catalog.questions.len());

    let store: SharedStore = Arc::new(Mutex::new(LocalStore::open(&data_dir)));
    let sync_client = Arc::new(SyncClient::new(stats_api_url));
    let quiz_helper = Arc::new(QuizHelper::new(&gemini_api_key));

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveSubject].endpoint(receive_subject))
            .branch(dptree::case![State::ReceiveMenuChoice].endpoint(receive_menu_choice))
            .branch(dptree::case![State::ReceiveAmount].endpoint(receive_amount))
            .branch(dptree::case![State::ReceiveThreshold].endpoint(receive_threshold))
            .branch(
                dptree::case![State::ReceiveCustomQuestion].endpoint(receive_custom_question),
            )
            .branch(dptree::case![State::Test { session }].endpoint(test_answer))
            .branch(dptree::case![State::Results { report }].endpoint(results_action))
            .branch(
                dptree::case![State::SimilarQuiz { report, generated }]
                    .endpoint(similar_quiz_answer),
            )
            .branch(dptree::case![State::Browse { browse }].endpoint(browse_action)),
    )
    .dependencies(dptree::deps![storage, catalog, store, sync_client, quiz_helper])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

const GREETING_TEXT: &str =
    "안녕하세요! 수능 사회탐구 퀴즈 봇입니다. 어떤 과목을 공부할까요?";

const START_TEST: &str = "시험 시작";
const BROWSE_QUESTIONS: &str = "문제 둘러보기";
const ADD_QUESTION: &str = "문제 추가";
const SET_THRESHOLD: &str = "숙달 기준 설정";
const CHANGE_SUBJECT: &str = "과목 변경";

const AI_ANALYSIS: &str = "AI 총평 보기";
const AI_EXPLANATIONS: &str = "틀린 개념 해설";
const RETRY: &str = "다시 풀기";
const SIMILAR_PREFIX: &str = "유사 문제 ";

const BROWSE_NEXT: &str = "다음 문제";
const BROWSE_PREV: &str = "이전 문제";
const BROWSE_QUIT: &str = "그만하기";

fn subject_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![Subject::ALL
        .iter()
        .map(|s| KeyboardButton::new(s.as_str()))
        .collect::<Vec<_>>()])
}

fn menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(START_TEST),
            KeyboardButton::new(BROWSE_QUESTIONS),
        ],
        vec![
            KeyboardButton::new(ADD_QUESTION),
            KeyboardButton::new(SET_THRESHOLD),
            KeyboardButton::new(CHANGE_SUBJECT),
        ],
    ])
}

fn options_keyboard(options: &[String]) -> KeyboardMarkup {
    KeyboardMarkup::new(
        options
            .iter()
            .map(|o| vec![KeyboardButton::new(o.clone())])
            .collect::<Vec<_>>(),
    )
}

fn browse_keyboard(question: &Question) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = question
        .options
        .iter()
        .map(|o| vec![KeyboardButton::new(o.clone())])
        .collect();
    rows.push(vec![
        KeyboardButton::new(BROWSE_PREV),
        KeyboardButton::new(BROWSE_NEXT),
        KeyboardButton::new(BROWSE_QUIT),
    ]);
    KeyboardMarkup::new(rows)
}

fn results_keyboard(report: &SessionReport) -> KeyboardMarkup {
    let mut rows = vec![vec![
        KeyboardButton::new(AI_ANALYSIS),
        KeyboardButton::new(AI_EXPLANATIONS),
    ]];
    let similar: Vec<KeyboardButton> = (1..=report.incorrect().len())
        .map(|i| KeyboardButton::new(format!("{}{}", SIMILAR_PREFIX, i)))
        .collect();
    for chunk in similar.chunks(3) {
        rows.push(chunk.to_vec());
    }
    rows.push(vec![KeyboardButton::new(RETRY)]);
    KeyboardMarkup::new(rows)
}

fn format_question(question: &Question, number: usize, total: usize) -> String {
    let mut text = if question.category.is_empty() {
        format!("문제 {}/{}\n\n{}", number, total, question.question)
    } else {
        format!(
            "문제 {}/{} [{}]\n\n{}",
            number, total, question.category, question.question
        )
    };
    if let Some(url) = &question.image_url {
        text.push_str(&format!("\n\n(자료: {})", url));
    }
    for (i, option) in question.options.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, option));
    }
    text
}

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(subject_keyboard())
        .await?;

    dialogue.update(State::ReceiveSubject).await?;
    Ok(())
}

async fn receive_subject(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    store: SharedStore,
) -> HandlerResult {
    let Some(subject) = msg.text().and_then(Subject::from_label) else {
        bot.send_message(msg.chat.id, "과목을 버튼에서 선택해주세요")
            .reply_markup(subject_keyboard())
            .await?;
        return Ok(());
    };

    {
        let mut store = store.lock().expect("local store lock");
        let chat_id = msg.chat.id.to_string();
        let mut settings = store.settings_for(&chat_id);
        settings.subject = subject;
        store.update_settings(&chat_id, settings);
    }

    bot.send_message(
        msg.chat.id,
        format!("{} 과목을 선택했습니다. 무엇을 할까요?", subject),
    )
    .reply_markup(menu_keyboard())
    .await?;

    dialogue.update(State::ReceiveMenuChoice).await?;
    Ok(())
}

async fn receive_menu_choice(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    catalog: Arc<Catalog>,
    store: SharedStore,
) -> HandlerResult {
    match msg.text() {
        Some(START_TEST) => {
            let keyboard = KeyboardMarkup::new(vec![
                vec![KeyboardButton::new("5")],
                vec![KeyboardButton::new("10")],
                vec![KeyboardButton::new("15")],
            ]);
            bot.send_message(msg.chat.id, "몇 문제를 풀까요?")
                .reply_markup(keyboard)
                .await?;
            dialogue.update(State::ReceiveAmount).await?;
        }
        Some(BROWSE_QUESTIONS) => {
            // Browse walks the whole filtered pool, so no truncation.
            let pool = {
                let store = store.lock().expect("local store lock");
                let settings = store.settings_for(&msg.chat.id.to_string());
                select_questions(
                    catalog.for_subject(settings.subject),
                    store.custom_for_subject(settings.subject),
                    &store.stats,
                    usize::MAX,
                    settings.mastery_threshold,
                    &mut rand::thread_rng(),
                )
            };
            match pool {
                Ok(pool) => {
                    let browse = BrowseSession::new(pool);
                    send_browse_question(&bot, &msg, &browse).await?;
                    dialogue.update(State::Browse { browse }).await?;
                }
                Err(e) => {
                    bot.send_message(msg.chat.id, e.to_string())
                        .reply_markup(menu_keyboard())
                        .await?;
                }
            }
        }
        Some(ADD_QUESTION) => {
            bot.send_message(
                msg.chat.id,
                "새 문제를 한 줄로 보내주세요:\n문제 | 보기1; 보기2; ... | 정답 | 개념",
            )
            .await?;
            dialogue.update(State::ReceiveCustomQuestion).await?;
        }
        Some(SET_THRESHOLD) => {
            let current = {
                let store = store.lock().expect("local store lock");
                store.settings_for(&msg.chat.id.to_string()).mastery_threshold
            };
            bot.send_message(
                msg.chat.id,
                format!(
                    "숙달 기준(정답 횟수)을 숫자로 보내주세요. 0은 제외 없음 (현재: {})",
                    current
                ),
            )
            .await?;
            dialogue.update(State::ReceiveThreshold).await?;
        }
        Some(CHANGE_SUBJECT) => {
            bot.send_message(msg.chat.id, "어떤 과목을 공부할까요?")
                .reply_markup(subject_keyboard())
                .await?;
            dialogue.update(State::ReceiveSubject).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "메뉴에서 하나를 선택해주세요")
                .reply_markup(menu_keyboard())
                .await?;
        }
    }
    Ok(())
}

async fn receive_amount(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    catalog: Arc<Catalog>,
    store: SharedStore,
) -> HandlerResult {
    let amount = match msg.text().map(str::parse::<usize>) {
        Some(Ok(amount)) if amount > 0 => amount,
        Some(Ok(_)) => {
            bot.send_message(msg.chat.id, "문제 수는 0이 될 수 없습니다")
                .await?;
            return Ok(());
        }
        _ => {
            bot.send_message(msg.chat.id, "숫자를 입력해주세요").await?;
            return Ok(());
        }
    };

    let chat_id = msg.chat.id.to_string();
    // The chosen amount is remembered even when no questions can be
    // selected, so the next attempt starts from the same setting.
    let selected = {
        let mut store = store.lock().expect("local store lock");
        let mut settings = store.settings_for(&chat_id);
        settings.amount = amount;
        store.update_settings(&chat_id, settings);
        select_questions(
            catalog.for_subject(settings.subject),
            store.custom_for_subject(settings.subject),
            &store.stats,
            amount,
            settings.mastery_threshold,
            &mut rand::thread_rng(),
        )
    };

    match selected {
        Ok(questions) => {
            let session = QuizSession::new(questions);
            let question = session.current_question().expect("non-empty session");
            bot.send_message(msg.chat.id, "좋아요, 시작합니다!").await?;
            bot.send_message(msg.chat.id, format_question(question, 1, session.len()))
                .reply_markup(options_keyboard(&question.options))
                .await?;
            dialogue.update(State::Test { session }).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string())
                .reply_markup(menu_keyboard())
                .await?;
            dialogue.update(State::ReceiveMenuChoice).await?;
        }
    }
    Ok(())
}

async fn test_answer(
    bot: Bot,
    dialogue: QuizDialogue,
    session: QuizSession,
    msg: Message,
    store: SharedStore,
    sync_client: Arc<SyncClient>,
) -> HandlerResult {
    let answer = msg.text().unwrap_or_default();
    let mut session = session;

    match session.submit_answer(answer) {
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
        }
        Ok(SubmitOutcome::Advanced) => {
            let question = session.current_question().expect("advanced within bounds");
            let text = format_question(question, session.current + 1, session.len());
            bot.send_message(msg.chat.id, text)
                .reply_markup(options_keyboard(&question.options))
                .await?;
            dialogue.update(State::Test { session }).await?;
        }
        Ok(SubmitOutcome::Finished(report)) => {
            {
                let mut store = store.lock().expect("local store lock");
                record_session(&mut store.stats, &report.results);
                store.save_stats();
            }
            sync_client.push_detached(report.stat_updates.clone());

            let summary = format_report(&report, &store);
            bot.send_message(msg.chat.id, summary)
                .reply_markup(results_keyboard(&report))
                .await?;
            dialogue.update(State::Results { report }).await?;
        }
    }
    Ok(())
}

fn format_report(report: &SessionReport, store: &SharedStore) -> String {
    let store = store.lock().expect("local store lock");
    let mut text = format!(
        "시험 결과: 총 {}문제 중 {}개를 맞혔습니다!\n",
        report.results.len(),
        report.correct_count()
    );
    let mut incorrect_no = 0;
    for (i, r) in report.results.iter().enumerate() {
        let stat = store.stats.get(&r.question.stat_key()).copied().unwrap_or_default();
        if r.is_correct {
            text.push_str(&format!("\n✅ {}. {}", i + 1, r.question.question));
        } else {
            incorrect_no += 1;
            text.push_str(&format!(
                "\n❌ {}. {}\n   내 선택: {}\n   정답: {}\n   (유사 문제 {})",
                i + 1,
                r.question.question,
                r.user_answer,
                r.question.answer,
                incorrect_no
            ));
        }
        text.push_str(&format!(
            "\n   누적 기록: 시도 {}회, 정답 {}회",
            stat.attempts, stat.correct
        ));
    }
    text.push_str("\n\n아래 버튼으로 AI 해설을 받아볼 수 있어요.");
    text
}

async fn results_action(
    bot: Bot,
    dialogue: QuizDialogue,
    report: SessionReport,
    msg: Message,
    quiz_helper: Arc<QuizHelper>,
) -> HandlerResult {
    match msg.text() {
        Some(AI_ANALYSIS) => {
            let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
            match quiz_helper.analyze_performance(&report.results).await {
                Ok(analysis) => {
                    bot.send_message(msg.chat.id, format!("🤖 AI 학습 컨설턴트\n\n{}", analysis))
                        .reply_markup(results_keyboard(&report))
                        .await?;
                }
                Err(e) => {
                    warn!("AI analysis failed: {}", e);
                    bot.send_message(msg.chat.id, "AI 분석 생성 중 오류가 발생했습니다.")
                        .reply_markup(results_keyboard(&report))
                        .await?;
                }
            }
        }
        Some(AI_EXPLANATIONS) => {
            let incorrect = report.incorrect();
            if incorrect.is_empty() {
                bot.send_message(msg.chat.id, "틀린 문제가 없습니다. 완벽해요! 🎉")
                    .reply_markup(results_keyboard(&report))
                    .await?;
                return Ok(());
            }
            let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
            match quiz_helper.explain_concepts(&incorrect).await {
                Ok(explanations) => {
                    for (concept, explanation) in &explanations {
                        bot.send_message(
                            msg.chat.id,
                            format!("📖 {}\n\n{}", concept, explanation),
                        )
                        .await?;
                    }
                    bot.send_message(msg.chat.id, "개념 해설을 모두 보냈습니다.")
                        .reply_markup(results_keyboard(&report))
                        .await?;
                }
                Err(e) => {
                    warn!("AI explanations failed: {}", e);
                    bot.send_message(msg.chat.id, "AI 설명 생성 중 오류가 발생했습니다.")
                        .reply_markup(results_keyboard(&report))
                        .await?;
                }
            }
        }
        Some(RETRY) => {
            bot.send_message(msg.chat.id, "무엇을 할까요?")
                .reply_markup(menu_keyboard())
                .await?;
            dialogue.update(State::ReceiveMenuChoice).await?;
        }
        Some(text) if text.starts_with(SIMILAR_PREFIX) => {
            let incorrect = report.incorrect();
            let number: usize = match text[SIMILAR_PREFIX.len()..].trim().parse() {
                Ok(n) if n >= 1 && n <= incorrect.len() => n,
                _ => {
                    bot.send_message(msg.chat.id, "버튼에 있는 유사 문제 번호를 선택해주세요")
                        .reply_markup(results_keyboard(&report))
                        .await?;
                    return Ok(());
                }
            };
            let original = &incorrect[number - 1].question;
            let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
            match quiz_helper.generate_similar_question(original).await {
                Ok(generated) => {
                    let mut text = format!(
                        "✨ AI 생성 유사 문제 (개념: {})\n\n{}",
                        original.concept, generated.question
                    );
                    for (i, option) in generated.options.iter().enumerate() {
                        text.push_str(&format!("\n{}. {}", i + 1, option));
                    }
                    let keyboard = options_keyboard(&generated.options);
                    bot.send_message(msg.chat.id, text)
                        .reply_markup(keyboard)
                        .await?;
                    dialogue
                        .update(State::SimilarQuiz { report, generated })
                        .await?;
                }
                Err(e) => {
                    warn!("Similar question generation failed: {}", e);
                    bot.send_message(
                        msg.chat.id,
                        "AI 유사 문제 생성 중 오류가 발생했습니다. 다른 문제로 시도해보세요.",
                    )
                    .reply_markup(results_keyboard(&report))
                    .await?;
                }
            }
        }
        _ => {
            bot.send_message(msg.chat.id, "아래 버튼 중 하나를 선택해주세요")
                .reply_markup(results_keyboard(&report))
                .await?;
        }
    }
    Ok(())
}

/// The generated question is a one-off: it is scored against the generated
/// answer only and never touches the stat store.
async fn similar_quiz_answer(
    bot: Bot,
    dialogue: QuizDialogue,
    (report, generated): (SessionReport, GeneratedQuestion),
    msg: Message,
) -> HandlerResult {
    let answer = msg.text().unwrap_or_default();
    if answer.trim().is_empty() {
        bot.send_message(msg.chat.id, "보기 중 하나를 선택해주세요")
            .await?;
        return Ok(());
    }

    let feedback = if answers_match(&generated.answer, answer) {
        format!("정답입니다! 🎉\n\n{}", generated.explanation)
    } else {
        format!(
            "아쉽네요. 정답은 \"{}\"입니다.\n\n{}",
            generated.answer, generated.explanation
        )
    };
    bot.send_message(msg.chat.id, feedback)
        .reply_markup(results_keyboard(&report))
        .await?;

    dialogue.update(State::Results { report }).await?;
    Ok(())
}

async fn receive_custom_question(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    store: SharedStore,
) -> HandlerResult {
    let Some(input) = msg.text() else {
        bot.send_message(msg.chat.id, "문제를 텍스트로 보내주세요").await?;
        return Ok(());
    };

    let subject = {
        let store = store.lock().expect("local store lock");
        store.settings_for(&msg.chat.id.to_string()).subject
    };

    match parse_custom_question(subject, input) {
        Ok(question) => {
            {
                let mut store = store.lock().expect("local store lock");
                store.add_custom_question(question);
            }
            bot.send_message(
                msg.chat.id,
                format!("{} 과목에 문제를 추가했습니다!", subject),
            )
            .reply_markup(menu_keyboard())
            .await?;
            dialogue.update(State::ReceiveMenuChoice).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
        }
    }
    Ok(())
}

async fn receive_threshold(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    store: SharedStore,
) -> HandlerResult {
    let threshold = match msg.text().map(str::parse::<u64>) {
        Some(Ok(threshold)) => threshold,
        _ => {
            bot.send_message(msg.chat.id, "숫자를 입력해주세요").await?;
            return Ok(());
        }
    };

    {
        let mut store = store.lock().expect("local store lock");
        let chat_id = msg.chat.id.to_string();
        let mut settings = store.settings_for(&chat_id);
        settings.mastery_threshold = threshold;
        store.update_settings(&chat_id, settings);
    }

    let confirmation = if threshold == 0 {
        "숙달 기준을 해제했습니다. 모든 문제가 출제됩니다.".to_string()
    } else {
        format!("정답 {}회 이상 맞힌 문제는 앞으로 제외됩니다.", threshold)
    };
    bot.send_message(msg.chat.id, confirmation)
        .reply_markup(menu_keyboard())
        .await?;
    dialogue.update(State::ReceiveMenuChoice).await?;
    Ok(())
}

async fn send_browse_question(bot: &Bot, msg: &Message, browse: &BrowseSession) -> HandlerResult {
    let question = browse.current_question().expect("non-empty browse pool");
    let mut text = format_question(question, browse.current + 1, browse.questions.len());
    if let Some(chosen) = browse.answer_for_current() {
        text.push_str(&format!("\n\n내 선택: {}", chosen));
    }
    bot.send_message(msg.chat.id, text)
        .reply_markup(browse_keyboard(question))
        .await?;
    Ok(())
}

async fn browse_action(
    bot: Bot,
    dialogue: QuizDialogue,
    browse: BrowseSession,
    msg: Message,
    store: SharedStore,
    sync_client: Arc<SyncClient>,
) -> HandlerResult {
    let mut browse = browse;
    match msg.text() {
        Some(BROWSE_NEXT) => {
            browse.next();
            send_browse_question(&bot, &msg, &browse).await?;
            dialogue.update(State::Browse { browse }).await?;
        }
        Some(BROWSE_PREV) => {
            browse.prev();
            send_browse_question(&bot, &msg, &browse).await?;
            dialogue.update(State::Browse { browse }).await?;
        }
        Some(BROWSE_QUIT) => {
            bot.send_message(msg.chat.id, "둘러보기를 마쳤습니다. 무엇을 할까요?")
                .reply_markup(menu_keyboard())
                .await?;
            dialogue.update(State::ReceiveMenuChoice).await?;
        }
        Some(answer) => {
            let question = browse.current_question().cloned();
            let Some(question) = question else {
                dialogue.update(State::ReceiveMenuChoice).await?;
                return Ok(());
            };
            if !question.options.iter().any(|o| answers_match(o, answer)) {
                bot.send_message(msg.chat.id, "보기 중 하나를 선택해주세요")
                    .reply_markup(browse_keyboard(&question))
                    .await?;
                return Ok(());
            }
            let Some(feedback) = browse.select_answer(answer) else {
                return Ok(());
            };

            // Only a first-time answer moves the counters; re-selections
            // just change the displayed choice.
            if let Some(update) = feedback.stat_update {
                {
                    let mut store = store.lock().expect("local store lock");
                    record_result(&mut store.stats, &update.id, update.correct_delta > 0);
                    store.save_stats();
                }
                sync_client.push_detached(vec![update]);
            } else {
                debug!("Browse re-selection for {}, not counted", question.stat_key());
            }

            let text = if feedback.is_correct {
                "정답입니다! ✅".to_string()
            } else {
                format!("오답입니다. 정답: {}", question.answer)
            };
            bot.send_message(msg.chat.id, text)
                .reply_markup(browse_keyboard(&question))
                .await?;
            dialogue.update(State::Browse { browse }).await?;
        }
        None => {
            bot.send_message(msg.chat.id, "보기 중 하나를 선택하거나 버튼을 눌러주세요")
                .await?;
        }
    }
    Ok(())
}
