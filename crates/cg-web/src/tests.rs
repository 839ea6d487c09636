//! HTTP flows against a live server on an ephemeral port

#[cfg(test)]
mod http_tests {
    use crate::{AppState, SUGGESTED_QUESTIONS, serve};
    use async_trait::async_trait;
    use cg_core::{
        AnswerMode, AnswerRequest, AnswerResult, ChatSession, ChatTurn, Error, HistoryStore,
        RAGEngine, RagConfig, RagStats, Result, ScoredChunk, UserId,
    };
    use cg_rag::{CareerRagEngine, FlatIndex, UNAVAILABLE_MESSAGE};
    use cg_store::{MemoryStore, Stores};
    use insta::assert_yaml_snapshot;
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// Engine that echoes the question and remembers each request
    #[derive(Default)]
    struct EchoEngine {
        requests: Mutex<Vec<AnswerRequest>>,
    }

    impl EchoEngine {
        fn last_request(&self) -> Option<AnswerRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl RAGEngine for EchoEngine {
        async fn answer(&self, request: AnswerRequest) -> AnswerResult {
            let response_text = format!("Echo: {}", request.question);
            self.requests.lock().unwrap().push(request);
            AnswerResult {
                response_text,
                used_context: vec![0],
                mode: AnswerMode::Grounded,
            }
        }

        async fn retrieve(&self, _question: &str) -> Result<Vec<ScoredChunk>> {
            Ok(Vec::new())
        }

        fn stats(&self) -> RagStats {
            RagStats {
                generator: Some("echo".to_string()),
                embedder: None,
                indexed_chunks: 1,
                top_k: 3,
            }
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    /// History store whose session lookups fail once `failing` is set
    struct FlakyHistory {
        inner: Arc<MemoryStore>,
        failing: AtomicBool,
    }

    #[async_trait]
    impl HistoryStore for FlakyHistory {
        async fn create_session(&self, user_id: UserId, name: Option<&str>) -> Result<ChatSession> {
            self.inner.create_session(user_id, name).await
        }

        async fn get_session(&self, session_id: &str) -> Result<Option<ChatSession>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::StoreUnavailable("database is locked".to_string()));
            }
            self.inner.get_session(session_id).await
        }

        async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<()> {
            self.inner.append(session_id, turn).await
        }

        async fn list(&self, session_id: &str) -> Result<Vec<ChatTurn>> {
            self.inner.list(session_id).await
        }

        async fn list_sessions(&self, user_id: UserId) -> Result<Vec<ChatSession>> {
            self.inner.list_sessions(user_id).await
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    struct TestApp {
        base: String,
        client: reqwest::Client,
    }

    impl TestApp {
        async fn spawn(engine: Arc<dyn RAGEngine>) -> Self {
            Self::spawn_with(engine, Stores::memory()).await
        }

        async fn spawn_with(engine: Arc<dyn RAGEngine>, stores: Stores) -> Self {
            let state = AppState::new(engine, stores, 6).with_index_status("loaded");
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(serve(listener, state, std::future::pending()));

            Self {
                base: format!("http://{}", addr),
                client: reqwest::Client::new(),
            }
        }

        async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
            let mut request = self.client.post(format!("{}{}", self.base, path)).json(&body);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await.unwrap();
            let status = response.status();
            (status, response.json().await.unwrap())
        }

        /// Post a body as is, without a content type
        async fn post_raw(
            &self,
            path: &str,
            token: Option<&str>,
            body: &'static str,
        ) -> (StatusCode, Value) {
            let mut request = self.client.post(format!("{}{}", self.base, path)).body(body);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await.unwrap();
            let status = response.status();
            (status, response.json().await.unwrap())
        }

        async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
            let mut request = self.client.get(format!("{}{}", self.base, path));
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await.unwrap();
            let status = response.status();
            (status, response.json().await.unwrap())
        }

        /// Sign up and return `(token, session_id)`
        async fn signup(&self, username: &str) -> (String, String) {
            let (status, body) = self
                .post(
                    "/api/signup",
                    None,
                    json!({
                        "username": username,
                        "email": format!("{}@example.com", username),
                        "password": "pa55word",
                        "full_name": "Ayesha Khan",
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{}", body);
            (
                body["token"].as_str().unwrap().to_string(),
                body["session_id"].as_str().unwrap().to_string(),
            )
        }
    }

    #[tokio::test]
    async fn test_signup_chat_history_flow() {
        let engine = Arc::new(EchoEngine::default());
        let app = TestApp::spawn(engine.clone()).await;
        let (token, session_id) = app.signup("ayesha").await;

        let (status, body) = app
            .post("/api/chat", Some(&token), json!({ "message": "  What after FSC?  " }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Echo: What after FSC?");
        assert_eq!(body["session_id"], session_id.as_str());

        let (status, history) = app.get("/api/history", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        let entries = history.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["type"], "user");
        assert_eq!(entries[0]["text"], "What after FSC?");
        assert_eq!(entries[1]["type"], "assistant");
        assert_eq!(entries[1]["text"], "Echo: What after FSC?");

        app.post("/api/chat", Some(&token), json!({ "message": "And engineering?" }))
            .await;
        let request = engine.last_request().unwrap();
        assert_eq!(request.session_id, session_id);
        assert_eq!(request.history.len(), 2);
        assert!(request.profile.is_none());
    }

    #[tokio::test]
    async fn test_chat_requires_authentication() {
        let app = TestApp::spawn(Arc::new(EchoEngine::default())).await;

        let (status, body) = app.post("/api/chat", None, json!({ "message": "hi" })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Not authenticated" }));

        let (status, _) = app
            .post("/api/chat", Some("not-a-token"), json!({ "message": "hi" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authentication_is_checked_before_the_body() {
        let app = TestApp::spawn(Arc::new(EchoEngine::default())).await;

        for body in ["hi", "{bad", ""] {
            let (status, reply) = app.post_raw("/api/chat", None, body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "body {:?}", body);
            assert_eq!(reply, json!({ "error": "Not authenticated" }));
        }

        let (status, _) = app.post_raw("/api/update-profile", None, "{bad").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bodies_are_read_as_json_without_content_type() {
        let engine = Arc::new(EchoEngine::default());
        let app = TestApp::spawn(engine.clone()).await;
        let (token, session_id) = app.signup("farah").await;

        let (status, reply) = app
            .post_raw("/api/chat", Some(&token), r#"{"message": "Is nursing a good fit?"}"#)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["response"], "Echo: Is nursing a good fit?");
        assert_eq!(reply["session_id"], session_id.as_str());

        let (status, reply) = app.post_raw("/api/chat", Some(&token), "{bad").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(reply["error"].as_str().unwrap().starts_with("Invalid JSON body"));

        let (status, reply) = app.post_raw("/api/signup", None, "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(reply["error"].is_string());

        let (status, created) = app.post_raw("/api/sessions", Some(&token), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["session_name"], "Career Counseling Session");
    }

    #[tokio::test]
    async fn test_chat_survives_failed_session_lookup() {
        let memory = Arc::new(MemoryStore::new());
        let history = Arc::new(FlakyHistory {
            inner: memory.clone(),
            failing: AtomicBool::new(false),
        });
        let stores = Stores {
            history: history.clone(),
            users: memory.clone(),
        };
        let app = TestApp::spawn_with(Arc::new(EchoEngine::default()), stores).await;
        let (token, session_id) = app.signup("rehan").await;

        history.failing.store(true, Ordering::SeqCst);
        let (status, reply) = app.post("/api/chat", Some(&token), json!({ "message": "hi" })).await;
        assert_eq!(status, StatusCode::OK, "{}", reply);
        assert_eq!(reply["response"], "Echo: hi");
        assert_eq!(reply["session_id"], session_id.as_str());

        let turns = memory.list(&session_id).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, "Echo: hi");
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let engine = Arc::new(EchoEngine::default());
        let app = TestApp::spawn(engine.clone()).await;
        let (token, _) = app.signup("bilal").await;

        let (status, body) = app.post("/api/chat", Some(&token), json!({ "message": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is empty");
        assert!(engine.last_request().is_none());
    }

    #[tokio::test]
    async fn test_anonymous_lists_are_empty() {
        let app = TestApp::spawn(Arc::new(EchoEngine::default())).await;

        assert_eq!(app.get("/api/history", None).await, (StatusCode::OK, json!([])));
        assert_eq!(app.get("/api/sessions", None).await, (StatusCode::OK, json!([])));

        let (status, _) = app.get("/api/user-profile", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_signup_and_bad_login() {
        let app = TestApp::spawn(Arc::new(EchoEngine::default())).await;
        let (_, session_id) = app.signup("omar").await;

        let (status, body) = app
            .post(
                "/api/signup",
                None,
                json!({ "username": "omar", "email": "other@example.com", "password": "x" }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Username or email already exists");

        let (status, _) = app
            .post("/api/signup", None, json!({ "username": "nomail", "password": "x" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .post("/api/login", None, json!({ "username": "omar", "password": "wrong" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid username or password");

        let (status, body) = app
            .post("/api/login", None, json!({ "username": "omar", "password": "pa55word" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], session_id.as_str());
        assert_eq!(body["full_name"], "Ayesha Khan");
    }

    #[tokio::test]
    async fn test_profile_reaches_the_engine() {
        let engine = Arc::new(EchoEngine::default());
        let app = TestApp::spawn(engine.clone()).await;
        let (token, _) = app.signup("hina").await;

        let (status, body) = app
            .post(
                "/api/update-profile",
                Some(&token),
                json!({ "educational_background": "FSC Pre-Medical", "interests": ["biology", " "] }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let (_, profile) = app.get("/api/user-profile", Some(&token)).await;
        assert_yaml_snapshot!(profile, @r###"
        ---
        educational_background: FSC Pre-Medical
        full_name: Ayesha Khan
        interests:
          - biology
        username: hina
        "###);

        app.post(
            "/api/chat",
            Some(&token),
            json!({ "message": "What career options are available after FSC Pre-Medical?" }),
        )
        .await;
        let profile = engine.last_request().unwrap().profile.unwrap();
        assert_eq!(profile.educational_background, "FSC Pre-Medical");
        assert!(profile.interests.contains("biology"));
    }

    #[tokio::test]
    async fn test_sessions_are_private_and_switchable() {
        let app = TestApp::spawn(Arc::new(EchoEngine::default())).await;
        let (alice, alice_session) = app.signup("alice").await;
        let (bob, _) = app.signup("bob").await;

        let (status, _) = app
            .post("/api/chat", Some(&bob), json!({ "message": "hi", "session_id": alice_session }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .get(&format!("/api/history?session_id={}", alice_session), Some(&bob))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, created) = app
            .post("/api/sessions", Some(&alice), json!({ "session_name": "Engineering" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["session_name"], "Engineering");

        let (_, reply) = app.post("/api/chat", Some(&alice), json!({ "message": "hi" })).await;
        assert_eq!(reply["session_id"], created["session_id"]);

        let (_, sessions) = app.get("/api/sessions", Some(&alice)).await;
        let sessions = sessions.as_array().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0]["session_id"], created["session_id"]);
        assert_eq!(sessions[1]["session_name"], "Career Counseling Session");
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let app = TestApp::spawn(Arc::new(EchoEngine::default())).await;
        let (token, _) = app.signup("sana").await;

        let (status, body) = app.post("/api/logout", Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = app.post("/api/chat", Some(&token), json!({ "message": "hi" })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_generator_still_answers() {
        let engine = CareerRagEngine::new(Arc::new(FlatIndex::new("unused")), RagConfig::default());
        let app = TestApp::spawn(Arc::new(engine)).await;
        let (token, _) = app.signup("zain").await;

        let (status, body) = app.post("/api/chat", Some(&token), json!({ "message": "hi" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], UNAVAILABLE_MESSAGE);

        let (_, health) = app.get("/healthz", None).await;
        assert_eq!(health["generator"], Value::Null);
        assert_eq!(health["store"], "memory");
        assert_eq!(health["indexed_chunks"], 0);
    }

    #[tokio::test]
    async fn test_suggested_questions() {
        let app = TestApp::spawn(Arc::new(EchoEngine::default())).await;
        let (status, body) = app.get("/api/suggested-questions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(SUGGESTED_QUESTIONS));
        assert_yaml_snapshot!(body, @r###"
        ---
        - What are the career options after FSC Pre-Medical?
        - Which fields have the highest growth potential in healthcare?
        - How can I transition from medical to business fields?
        - What are the scope and salary of data science in healthcare?
        "###);
    }

    #[tokio::test]
    async fn test_healthz_reports_components() {
        let app = TestApp::spawn(Arc::new(EchoEngine::default())).await;
        let (status, health) = app.get("/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");
        assert_eq!(health["generator"], "echo");
        assert_eq!(health["index"], "loaded");
    }
}
