//! REST persistence gateway.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quizdraft_core::error::GatewayError;
use quizdraft_core::model::{split_options, Question, QuestionId, QuestionKind, QuestionSet};
use quizdraft_core::traits::PersistenceGateway;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gateway that talks JSON to the assessment REST API.
pub struct HttpGateway {
    base_url: String,
    api_token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: &str, api_token: Option<String>, timeout_secs: Option<u64>) -> Self {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
            timeout_secs,
            client,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json");
        if let Some(token) = &self.api_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        target: Option<u64>,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                GatewayError::NetworkError(format!(
                    "assessment API not reachable at {}: {e}",
                    self.base_url
                ))
            } else {
                GatewayError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status < 400 {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match (status, target) {
            (401 | 403, _) => GatewayError::Unauthorized(message),
            (404, Some(id)) => GatewayError::NotFound(id),
            (400 | 409 | 422, _) => GatewayError::Rejected { status, message },
            _ => GatewayError::ApiError { status, message },
        })
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status().as_u16();
        response.json().await.map_err(|e| GatewayError::ApiError {
            status,
            message: format!("failed to parse response: {e}"),
        })
    }
}

/// A question as the REST API carries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(rename = "type")]
    kind: String,
    statement: String,
    #[serde(default)]
    options: String,
    #[serde(default)]
    correct_answer: String,
    #[serde(default)]
    points: u32,
    #[serde(default)]
    order: i32,
}

impl WireQuestion {
    fn from_question(question: &Question) -> Self {
        Self {
            id: question.id.persisted(),
            kind: question.kind.to_string(),
            statement: question.statement.clone(),
            options: question.options_wire(),
            correct_answer: question.correct_answer.clone(),
            points: question.points,
            order: question.order,
        }
    }

    fn into_question(self) -> Result<Question, GatewayError> {
        let id = self.id.ok_or_else(|| GatewayError::ApiError {
            status: 0,
            message: "store returned a question without an id".into(),
        })?;
        Ok(Question {
            id: QuestionId::Persisted(id),
            kind: QuestionKind::coerce(&self.kind),
            statement: self.statement,
            options: split_options(&self.options),
            correct_answer: self.correct_answer,
            points: self.points,
            order: self.order,
        })
    }
}

#[derive(Deserialize)]
struct WireQuestionSet {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    questions: Vec<WireQuestion>,
}

impl WireQuestionSet {
    fn into_set(self) -> Result<QuestionSet, GatewayError> {
        let mut questions = self
            .questions
            .into_iter()
            .map(WireQuestion::into_question)
            .collect::<Result<Vec<_>, _>>()?;
        questions.sort_by_key(|q| q.order);
        Ok(QuestionSet {
            assessment_id: self.id,
            title: self.title,
            questions,
        })
    }
}

#[derive(Serialize)]
struct RegenerateRequest {
    count: usize,
}

#[async_trait]
impl PersistenceGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, question), fields(statement_len = question.statement.len()))]
    async fn create_question(
        &self,
        assessment_id: u64,
        question: &Question,
    ) -> Result<Question, GatewayError> {
        let mut body = WireQuestion::from_question(question);
        body.id = None;
        let req = self
            .request(
                reqwest::Method::POST,
                &format!("/assessments/{assessment_id}/questions"),
            )
            .json(&body);
        let response = self.send(req, None).await?;
        Self::parse::<WireQuestion>(response).await?.into_question()
    }

    #[instrument(skip(self, question))]
    async fn update_question(&self, id: u64, question: &Question) -> Result<Question, GatewayError> {
        let req = self
            .request(reqwest::Method::PUT, &format!("/questions/{id}"))
            .json(&WireQuestion::from_question(question));
        let response = self.send(req, Some(id)).await?;
        Self::parse::<WireQuestion>(response).await?.into_question()
    }

    #[instrument(skip(self))]
    async fn delete_question(&self, id: u64) -> Result<(), GatewayError> {
        let req = self.request(reqwest::Method::DELETE, &format!("/questions/{id}"));
        self.send(req, Some(id)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reload(&self, assessment_id: u64) -> Result<QuestionSet, GatewayError> {
        let req = self.request(
            reqwest::Method::GET,
            &format!("/assessments/{assessment_id}/questions"),
        );
        let response = self.send(req, None).await?;
        Self::parse::<WireQuestionSet>(response).await?.into_set()
    }

    #[instrument(skip(self))]
    async fn regenerate_questions(
        &self,
        assessment_id: u64,
        count: usize,
    ) -> Result<QuestionSet, GatewayError> {
        let req = self
            .request(
                reqwest::Method::POST,
                &format!("/assessments/{assessment_id}/questions/regenerate"),
            )
            .json(&RegenerateRequest { count });
        let response = self.send(req, None).await?;
        Self::parse::<WireQuestionSet>(response).await?.into_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mcq() -> Question {
        Question::draft(QuestionKind::MultipleChoice, "Which is a prime?", 20)
            .with_options(["4", "6", "7"], "7")
            .with_order(3)
    }

    #[tokio::test]
    async fn create_sends_joined_options() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/assessments/5/questions"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "type": "MULTIPLE_CHOICE",
                "options": "4|6|7",
                "correctAnswer": "7",
                "points": 20
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 31,
                "type": "MULTIPLE_CHOICE",
                "statement": "Which is a prime?",
                "options": "4|6|7",
                "correctAnswer": "7",
                "points": 20,
                "order": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri(), Some("secret".into()), None);
        let created = gateway.create_question(5, &mcq()).await.unwrap();

        assert_eq!(created.id, QuestionId::Persisted(31));
        assert_eq!(created.options, vec!["4", "6", "7"]);
        assert_eq!(created.kind, QuestionKind::MultipleChoice);
    }

    #[tokio::test]
    async fn reload_coerces_kinds_and_sorts_by_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/assessments/2/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 2,
                "title": "Rust basics",
                "questions": [
                    {"id": 8, "type": "ESSAY", "statement": "Explain borrowing", "points": 60, "order": 2},
                    {"id": 7, "type": "TRUE_FALSE", "statement": "Rust has GC", "options": "True|False",
                     "correctAnswer": "False", "points": 40, "order": 1}
                ]
            })))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri(), None, None);
        let set = gateway.reload(2).await.unwrap();

        assert_eq!(set.title, "Rust basics");
        assert_eq!(set.questions[0].id, QuestionId::Persisted(7));
        assert_eq!(set.questions[0].options, vec!["True", "False"]);
        assert_eq!(set.questions[1].kind, QuestionKind::Open);
        assert_eq!(set.total_points(), 100);
    }

    #[tokio::test]
    async fn update_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/questions/44"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such question"))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri(), None, None);
        let mut question = mcq();
        question.id = QuestionId::Persisted(44);
        let err = gateway.update_question(44, &question).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/questions/1"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/questions/2"))
            .respond_with(ResponseTemplate::new(422).set_body_string("locked"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/questions/3"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/questions/4"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri(), None, None);
        assert!(matches!(
            gateway.delete_question(1).await,
            Err(GatewayError::Unauthorized(_))
        ));
        assert!(matches!(
            gateway.delete_question(2).await,
            Err(GatewayError::Rejected { status: 422, .. })
        ));
        assert!(matches!(
            gateway.delete_question(3).await,
            Err(GatewayError::ApiError { status: 503, .. })
        ));
        assert!(gateway.delete_question(4).await.is_ok());
    }

    #[tokio::test]
    async fn regenerate_posts_count() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/assessments/9/questions/regenerate"))
            .and(body_partial_json(serde_json::json!({"count": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 9,
                "questions": [
                    {"id": 100, "type": "THEORY", "statement": "One", "points": 50, "order": 1},
                    {"id": 101, "type": "CODE", "statement": "Two", "points": 50, "order": 2}
                ]
            })))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri(), None, None);
        let set = gateway.regenerate_questions(9, 2).await.unwrap();
        assert_eq!(set.questions.len(), 2);
        assert_eq!(set.questions[1].kind, QuestionKind::Code);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let gateway = HttpGateway::new("http://127.0.0.1:9", None, Some(2));
        let err = gateway.reload(1).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::NetworkError(_) | GatewayError::Timeout(_)
        ));
    }
}
