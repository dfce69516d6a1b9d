//! HTTP surface: the chat endpoint plus CRUD over the business records.
//! Conversation state travels with each request; nothing is kept per client.

mod error;
mod handlers;

use crate::config::ServerConfig;
use crate::core::error::EloyError;
use crate::session::Conversation;
use crate::store::RecordStore;
use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<Conversation>,
}

impl AppState {
    pub fn new(conversation: Arc<Conversation>) -> Self {
        Self { conversation }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        self.conversation.store()
    }
}

/// `*` allows any origin; otherwise a comma-separated list of origins.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, EloyError> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if origin.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origin
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| EloyError::Config(format!("Invalid CORS origin: {}", o)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

pub fn router(state: AppState, cors_origin: &str) -> Result<Router, EloyError> {
    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/chat", post(handlers::chat))
        .route(
            "/api/equipe",
            get(handlers::list_team).post(handlers::add_member),
        )
        .route(
            "/api/equipe/:nome",
            axum::routing::put(handlers::update_member).delete(handlers::remove_member),
        )
        .route(
            "/api/relatorios",
            get(handlers::list_reports).post(handlers::add_report),
        )
        .route(
            "/api/relatorios/:data",
            get(handlers::get_report)
                .put(handlers::update_report)
                .delete(handlers::remove_report),
        )
        .route(
            "/api/empresa",
            get(handlers::get_company).put(handlers::set_company),
        )
        .fallback(handlers::not_found)
        .layer(cors_layer(cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    Ok(app)
}

pub async fn serve(config: &ServerConfig, conversation: Arc<Conversation>) -> Result<(), EloyError> {
    let app = router(AppState::new(conversation), &config.cors_origin)?;
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, cors = %config.cors_origin, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not install Ctrl+C handler");
            }
            tracing::info!("shutdown requested");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{LLMProvider, Message};
    use crate::store::JsonFileStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use futures::stream::{self, BoxStream, StreamExt};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LLMProvider for CountingProvider {
        fn model(&self) -> &str {
            "counting"
        }

        async fn get_response(&self, _messages: &[Message]) -> Result<String, EloyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("resposta do modelo".to_string())
        }

        async fn get_response_stream(
            &self,
            messages: &[Message],
        ) -> Result<BoxStream<'static, Result<String, EloyError>>, EloyError> {
            let answer = self.get_response(messages).await;
            Ok(stream::once(async move { answer }).boxed())
        }
    }

    struct TestApp {
        _dir: tempfile::TempDir,
        provider: Arc<CountingProvider>,
        app: Router,
    }

    fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("banco.json")));
        let provider = Arc::new(CountingProvider::default());
        let conversation = Arc::new(Conversation::new(store, provider.clone(), "Eloy"));
        let app = router(AppState::new(conversation), "*").unwrap();
        TestApp {
            _dir: dir,
            provider,
            app,
        }
    }

    impl TestApp {
        async fn send(&self, method: &str, uri: &str, body: &str) -> Response {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::from(body.to_string()))
                .unwrap();
            self.app.clone().oneshot(request).await.unwrap()
        }

        fn model_calls(&self) -> usize {
            self.provider.calls.load(Ordering::SeqCst)
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_does_not_touch_the_model() {
        let t = test_app();
        let response = t.send("GET", "/health", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "online");
        assert_eq!(body["armazenamento"], "json");
        assert_eq!(t.model_calls(), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_a_structured_400() {
        let t = test_app();
        for uri in ["/api/chat", "/api/equipe", "/api/relatorios"] {
            let response = t.send("POST", uri, "{mensagem: oi").await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body = json_body(response).await;
            assert!(body["error"].as_str().unwrap().contains("JSON inválido"));
        }
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let t = test_app();
        let response = t.send("GET", "/api/financeiro", "").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({"error": "rota não encontrada"})
        );
    }

    #[tokio::test]
    async fn chat_greeting_and_forwarding() {
        let t = test_app();
        let response = t
            .send("POST", "/api/chat", r#"{"mensagem": "Oi!", "contexto": {}}"#)
            .await;
        let body = json_body(response).await;
        assert_eq!(body["action"], "saudacao");
        assert_eq!(body["contexto"], json!({}));
        assert_eq!(t.model_calls(), 0);

        let response = t
            .send(
                "POST",
                "/api/chat",
                r#"{"mensagem": "Quais projetos temos?", "contexto": "lixo"}"#,
            )
            .await;
        let body = json_body(response).await;
        assert_eq!(body["resposta"], "resposta do modelo");
        assert_eq!(t.model_calls(), 1);
    }

    #[tokio::test]
    async fn chat_threads_the_context() {
        let t = test_app();
        let body = json_body(
            t.send(
                "POST",
                "/api/chat",
                r#"{"mensagem": "2", "contexto": {"menu": "equipe"}}"#,
            )
            .await,
        )
        .await;
        assert_eq!(
            body["contexto"],
            json!({"menu": "equipe", "pendente": "adicionar_membro"})
        );

        let request = json!({"mensagem": "Ana - Analista", "contexto": body["contexto"]});
        let body = json_body(t.send("POST", "/api/chat", &request.to_string()).await).await;
        assert_eq!(body["action"], "membro_salvo");

        let team = json_body(t.send("GET", "/api/equipe", "").await).await;
        assert_eq!(team, json!([{"nome": "Ana", "cargo": "Analista"}]));
    }

    #[tokio::test]
    async fn empty_chat_body_is_treated_as_empty_object() {
        let t = test_app();
        let response = t.send("POST", "/api/chat", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["contexto"], json!({}));
        assert_eq!(t.model_calls(), 0);
    }

    #[tokio::test]
    async fn report_crud_over_http() {
        let t = test_app();
        let response = t
            .send(
                "POST",
                "/api/relatorios",
                r#"{"data": "7/4/2025", "conteudo": "Sprint concluída"}"#,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = t.send("GET", "/api/relatorios/07-04-2025", "").await;
        assert_eq!(
            json_body(response).await,
            json!({"data": "07/04/2025", "conteudo": "Sprint concluída"})
        );

        let response = t
            .send(
                "PUT",
                "/api/relatorios/07%2F04%2F2025",
                r#"{"conteudo": "Sprint revisada"}"#,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = t
            .send("PUT", "/api/relatorios/08-04-2025", r#"{"conteudo": "x"}"#)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = t.send("GET", "/api/relatorios/31-02-2025", "").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = t.send("DELETE", "/api/relatorios/07-04-2025", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        let list = json_body(t.send("GET", "/api/relatorios", "").await).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn team_updates_and_missing_members() {
        let t = test_app();
        let response = t
            .send("POST", "/api/equipe", r#"{"nome": "Ana", "cargo": "Analista"}"#)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = t
            .send("PUT", "/api/equipe/ana", r#"{"cargo": "Gerente"}"#)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"nome": "Ana", "cargo": "Gerente"})
        );

        let response = t.send("DELETE", "/api/equipe/Carlos", "").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let team = json_body(t.send("GET", "/api/equipe", "").await).await;
        assert_eq!(team, json!([{"nome": "Ana", "cargo": "Gerente"}]));

        let response = t.send("POST", "/api/equipe", "{}").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn company_is_404_until_set() {
        let t = test_app();
        let response = t.send("GET", "/api/empresa", "").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = t
            .send(
                "PUT",
                "/api/empresa",
                r#"{"nome": "Eloy Ltda", "data_fundacao": "5/5/2010"}"#,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(t.send("GET", "/api/empresa", "").await).await;
        assert_eq!(body, json!({"nome": "Eloy Ltda", "data_fundacao": "05/05/2010"}));
    }

    #[test]
    fn cors_origins_are_validated() {
        assert!(cors_layer("*").is_ok());
        assert!(cors_layer("https://a.example, https://b.example").is_ok());
        assert!(matches!(
            cors_layer("https://bad\norigin"),
            Err(EloyError::Config(_))
        ));
    }
}
