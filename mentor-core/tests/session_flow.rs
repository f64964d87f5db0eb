//! End-to-end client flows against a mock MyMentor backend.
//!
//! Everything here goes through the public crate surface the way the CLI
//! does: build a session, build a client around it, then drive login, chat
//! and reload flows over the wire.

use std::sync::Arc;

use mentor_core::models::ApiKind;
use mentor_core::{AdviceStore, ApiClient, ApiError, MemoryCredentialStore, Session};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fresh_session() -> Arc<Session> {
    Arc::new(Session::new(Box::new(MemoryCredentialStore::default())))
}

fn user_body(email: &str) -> serde_json::Value {
    json!({
        "usuario": {
            "uuid": "7b5c24ab-1234-5678-9abc-def012345678",
            "name": "Ana",
            "last_name": "García",
            "phone_number": 5551234,
            "email": email,
            "admin": false,
            "enabled": true,
            "asesores": [
                {
                    "id": 7,
                    "professional": {
                        "id": 3,
                        "name": "Consulta General",
                        "description": "Asesor por defecto",
                        "area": { "id": 1, "name": "General" }
                    }
                },
                {
                    "id": 8,
                    "professional": {
                        "id": 4,
                        "name": "Nutrición",
                        "description": "Asesoría de nutrición",
                        "area": { "id": 2, "name": "Salud" }
                    }
                }
            ]
        },
        "mensaje": "ok"
    })
}

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "bienvenida",
            "email": "ana@example.com",
            "token": token
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/email/ana@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("ana@example.com")))
        .mount(server)
        .await;
}

// ===========================================================================
// Login → send first chat message → thread appears in the store
// ===========================================================================
#[tokio::test]
async fn login_then_first_message_creates_a_thread() {
    let server = MockServer::start().await;
    let session = fresh_session();
    let client = ApiClient::with_base_url(&server.uri(), session.clone()).unwrap();

    mount_login(&server, "token-1").await;
    Mock::given(method("POST"))
        .and(path("/gpt/professional/advice"))
        .and(header("Authorization", "Bearer token-1"))
        .and(body_partial_json(json!({ "user_professional_id": 7 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "advice": { "id": 21, "description": "Hola", "advisorys_details": [] },
            "mensaje": "creada"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gpt/professional/advice/21"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "advice": {
                "id": 21,
                "description": "Hola",
                "advisorys_details": [{
                    "id": 1,
                    "line_number": 1,
                    "question": "Hola",
                    "answer": "¡Hola! ¿En qué te ayudo?",
                    "model": "anthropic"
                }]
            },
            "mensaje": "ok"
        })))
        .mount(&server)
        .await;

    session
        .login(&client, "ana@example.com", "segura123")
        .await
        .unwrap();
    let asesor_id = session.general_asesor_id().expect("general advisor assigned");
    assert_eq!(asesor_id, 7);

    let mut store = AdviceStore::new();
    let advice = store
        .send_message(&client, asesor_id, "Consulta General", "Hola", ApiKind::Anthropic)
        .await
        .unwrap();

    assert_eq!(advice.id, 21);
    assert_eq!(store.selected_id(), Some(21));
    assert_eq!(store.entries().len(), 1);
    assert_eq!(store.entries()[0].asesor_name, "Consulta General");
}

// ===========================================================================
// Reload across all assignments: one advisor has threads, one has none yet
// ===========================================================================
#[tokio::test]
async fn reload_spans_all_assignments_and_sorts_for_display() {
    let server = MockServer::start().await;
    let session = fresh_session();
    let client = ApiClient::with_base_url(&server.uri(), session.clone()).unwrap();

    mount_login(&server, "token-1").await;
    Mock::given(method("GET"))
        .and(path("/gpt/professional/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "advisorys": [
                { "id": 3, "description": "antigua", "advisorys_details": [] },
                { "id": 14, "description": "reciente", "advisorys_details": [] }
            ],
            "mensaje": "ok"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gpt/professional/8"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let user = session
        .login(&client, "ana@example.com", "segura123")
        .await
        .unwrap();

    let mut store = AdviceStore::new();
    let loaded = store.load_all(&client, &user.asesores).await.unwrap();
    assert_eq!(loaded, 2);

    let ids: Vec<i64> = store.sorted_for_display().iter().map(|v| v.id()).collect();
    assert_eq!(ids, vec![14, 3], "descending by id, newest first");
}

// ===========================================================================
// A 401 mid-session expels the user: teardown plus SessionExpired
// ===========================================================================
#[tokio::test]
async fn expired_token_mid_session_forces_logout() {
    let server = MockServer::start().await;
    let session = fresh_session();
    let client = ApiClient::with_base_url(&server.uri(), session.clone()).unwrap();

    mount_login(&server, "token-1").await;
    Mock::given(method("GET"))
        .and(path("/gpt/professional/7"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let user = session
        .login(&client, "ana@example.com", "segura123")
        .await
        .unwrap();
    assert!(session.is_authenticated());

    let mut store = AdviceStore::new();
    let err = store
        .load_all(&client, &user.asesores[..1])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(err.is_session_fatal());
    assert!(!session.is_authenticated());
    assert!(session.token().is_none());
    assert!(session.email().is_none());
}

// ===========================================================================
// Refresh keeps identity stable while rotating the token
// ===========================================================================
#[tokio::test]
async fn refresh_after_login_preserves_user_identity() {
    let server = MockServer::start().await;
    let session = fresh_session();
    let client = ApiClient::with_base_url(&server.uri(), session.clone()).unwrap();

    mount_login(&server, "token-1").await;
    Mock::given(method("POST"))
        .and(path("/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "token-2"
        })))
        .mount(&server)
        .await;

    let before = session
        .login(&client, "ana@example.com", "segura123")
        .await
        .unwrap();

    let renewed = session.refresh(&client).await.unwrap();
    assert_eq!(renewed, "token-2");
    assert_eq!(session.token().as_deref(), Some("token-2"));

    let after = session.current_user().expect("user still loaded");
    assert_eq!(after.uuid, before.uuid);
    assert_eq!(after.email, before.email);
}
