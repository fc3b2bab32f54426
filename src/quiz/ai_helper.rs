use std::collections::HashMap;
use std::fmt;

use futures::future::join_all;
use log::debug;

use crate::quiz::{Question, ResultEntry};

const MODEL: &str = "gemini-2.5-flash-preview-05-20";
const NO_EXPLANATION: &str = "설명을 생성하지 못했습니다.";
const NO_ANALYSIS: &str = "분석 결과를 생성하지 못했습니다.";

#[derive(Debug)]
pub enum AiError {
    Http(reqwest::Error),
    EmptyResponse,
    BadGeneratedQuestion(String),
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "AI 요청에 실패했습니다: {}", e),
            Self::EmptyResponse => write!(f, "AI 응답이 비어 있습니다"),
            Self::BadGeneratedQuestion(reason) => {
                write!(f, "생성된 문제가 올바르지 않습니다: {}", reason)
            }
        }
    }
}

impl std::error::Error for AiError {}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Content {
    parts: Vec<Part>,
}

impl Content {
    fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(serde::Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<serde_json::Value>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<serde_json::Value>,
}

impl GenerateRequest {
    fn prompt(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::text(text)],
            tools: None,
            system_instruction: None,
            generation_config: None,
        }
    }
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()
            .map(|p| p.text)
    }
}

/// A question produced by the similar-question feature. Played once in the
/// dialogue and never written to any stat store.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: String,
}

/// Thin client over the Gemini `generateContent` endpoint covering the three
/// result-screen features: concept explanations, a performance analysis, and
/// similar-question generation. Every call is best-effort and never retried.
pub struct QuizHelper {
    client: reqwest::Client,
    api_url: String,
}

impl QuizHelper {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
                MODEL, api_key
            ),
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Option<String>, AiError> {
        let response: GenerateResponse = self
            .client
            .post(&self.api_url)
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response.first_text())
    }

    /// One explanation per distinct concept among the incorrect results,
    /// requested concurrently. A concept the model stays silent on gets a
    /// fixed placeholder; any transport failure fails the whole batch.
    pub async fn explain_concepts(
        &self,
        incorrect: &[&ResultEntry],
    ) -> Result<HashMap<String, String>, AiError> {
        let mut concepts: Vec<String> = Vec::new();
        for r in incorrect {
            if !concepts.contains(&r.question.concept) {
                concepts.push(r.question.concept.clone());
            }
        }
        if concepts.is_empty() {
            return Ok(HashMap::new());
        }
        debug!("Requesting explanations for {} concept(s)", concepts.len());

        let requests = concepts.iter().map(|concept| {
            let request = GenerateRequest {
                contents: vec![Content::text(format!(
                    "'{}' 개념에 대해 수능 사회탐구 과목을 공부하는 학생이 쉽게 이해할 수 \
                     있도록 자세히 설명해줘. 관련된 심화 내용이나 기출문제 풀이 팁도 포함해줘.",
                    concept
                ))],
                tools: Some(serde_json::json!([{ "google_search": {} }])),
                system_instruction: Some(Content::text(
                    "You are a friendly and knowledgeable tutor AI. Your goal is to explain \
                     concepts clearly and concisely to a student who got a question wrong.",
                )),
                generation_config: None,
            };
            async move { self.generate(&request).await }
        });

        let mut explanations = HashMap::new();
        for (concept, outcome) in concepts.iter().zip(join_all(requests).await) {
            let text = outcome?.unwrap_or_else(|| NO_EXPLANATION.to_string());
            explanations.insert(concept.clone(), text);
        }
        Ok(explanations)
    }

    /// One prose diagnostic over the whole session.
    pub async fn analyze_performance(&self, results: &[ResultEntry]) -> Result<String, AiError> {
        let correct = concept_list(results, true);
        let incorrect = concept_list(results, false);

        let prompt = format!(
            "저는 수능 사회탐구 과목을 공부하는 학생입니다. 방금 {}문제 퀴즈를 풀었고 \
             결과는 다음과 같습니다:\n\n**정답 개념:**\n{}\n\n**오답 개념:**\n{}\n\n\
             이 결과를 바탕으로 제 학습 성과에 대한 종합적인 분석을 해주세요. 강점과 약점을 \
             진단하고, 취약한 부분을 보완하기 위한 구체적이고 실천 가능한 학습 팁 2-3가지를 \
             제안해주세요. 격려하는 말투로 친절하게 작성해주세요.",
            results.len(),
            correct,
            incorrect
        );

        let text = self.generate(&GenerateRequest::prompt(prompt)).await?;
        Ok(text.unwrap_or_else(|| NO_ANALYSIS.to_string()))
    }

    /// Asks the model for a new question on the same concept, constrained to
    /// a fixed JSON schema. Anything other than exactly five options is a
    /// generation failure.
    pub async fn generate_similar_question(
        &self,
        original: &Question,
    ) -> Result<GeneratedQuestion, AiError> {
        let prompt = format!(
            "You are a test question creator for South Korean college entrance exams (CSAT). \
             Based on the following social studies concept and example question, create a new, \
             similar multiple-choice question. The new question should test the same core \
             concept but use a different scenario or wording. Provide 5 options, with one \
             correct answer. Ensure the options are plausible distractors for a high school \
             student.\n\n**Core Concept:** {}\n\n**Original Question:**\n{}\n\n\
             **Original Options:**\n{}\n\n**Original Answer:** {}\n\n\
             Generate the new question in the specified JSON format.",
            original.concept,
            original.question,
            original.options.join("\n"),
            original.answer
        );

        let request = GenerateRequest {
            contents: vec![Content::text(prompt)],
            tools: None,
            system_instruction: None,
            generation_config: Some(serde_json::json!({
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING" },
                        "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "answer": { "type": "STRING" },
                        "explanation": {
                            "type": "STRING",
                            "description": "A brief explanation of why the correct answer is correct."
                        }
                    },
                    "required": ["question", "options", "answer", "explanation"]
                }
            })),
        };

        let text = self
            .generate(&request)
            .await?
            .ok_or(AiError::EmptyResponse)?;
        parse_generated_question(&text)
    }
}

fn concept_list(results: &[ResultEntry], correct: bool) -> String {
    let mut concepts: Vec<&str> = Vec::new();
    for r in results.iter().filter(|r| r.is_correct == correct) {
        if !concepts.contains(&r.question.concept.as_str()) {
            concepts.push(&r.question.concept);
        }
    }
    if concepts.is_empty() {
        "없음".to_string()
    } else {
        concepts.join(", ")
    }
}

/// Parses and validates the schema-constrained model reply.
pub fn parse_generated_question(text: &str) -> Result<GeneratedQuestion, AiError> {
    let generated: GeneratedQuestion = serde_json::from_str(text)
        .map_err(|e| AiError::BadGeneratedQuestion(e.to_string()))?;
    if generated.options.len() != 5 {
        return Err(AiError::BadGeneratedQuestion(format!(
            "보기가 5개가 아니라 {}개입니다",
            generated.options.len()
        )));
    }
    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::catalog::Subject;

    fn entry(concept: &str, is_correct: bool) -> ResultEntry {
        ResultEntry {
            question: Question {
                subject: Subject::SocialCulture,
                concept: concept.to_string(),
                ..Default::default()
            },
            user_answer: String::new(),
            is_correct,
        }
    }

    #[test]
    fn parse_generated_question_accepts_five_options() {
        let text = r#"{
            "question": "다음 중 문화 상대주의에 해당하는 태도는?",
            "options": ["가", "나", "다", "라", "마"],
            "answer": "가",
            "explanation": "문화를 그 사회의 맥락에서 이해하는 태도이다."
        }"#;
        let generated = parse_generated_question(text).unwrap();
        assert_eq!(generated.options.len(), 5);
        assert_eq!(generated.answer, "가");
    }

    #[test]
    fn parse_generated_question_rejects_four_options() {
        let text = r#"{
            "question": "q",
            "options": ["가", "나", "다", "라"],
            "answer": "가",
            "explanation": "e"
        }"#;
        let err = parse_generated_question(text).unwrap_err();
        assert!(matches!(err, AiError::BadGeneratedQuestion(_)));
    }

    #[test]
    fn parse_generated_question_rejects_non_json() {
        assert!(parse_generated_question("죄송합니다, 생성할 수 없습니다.").is_err());
    }

    #[test]
    fn concept_list_dedupes_and_partitions() {
        let results = vec![
            entry("계층 이동", true),
            entry("계층 이동", true),
            entry("문화 변동", false),
        ];
        assert_eq!(concept_list(&results, true), "계층 이동");
        assert_eq!(concept_list(&results, false), "문화 변동");
        assert_eq!(concept_list(&[], true), "없음");
    }

    #[test]
    fn response_text_extraction_survives_empty_candidates() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(response.first_text().is_none());
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"안녕"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text().unwrap(), "안녕");
    }
}
