mod common;

use axum::body::to_bytes;
use axum::http::{Method, StatusCode};
use serde_json::json;
use std::time::Duration;

use ald_transport::storage::key_from_url;
use ald_transport::config::EnvironmentConfig;
use common::{paulista_to_ibirapuera, test_config, TestApp};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "ald_transport");
}

#[tokio::test]
async fn test_company_creates_pending_request() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;

    let request = app.create_request(&company.token).await;

    assert_eq!(request["status"], "pending");
    assert_eq!(request["company_id"], company.id.to_string());
    assert!(request["driver_id"].is_null());
    assert_eq!(request["destinations"][0]["address"], "Shopping Ibirapuera");

    let (status, mine) = app
        .send(Method::GET, "/api/requests/mine", Some(&company.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_request_is_rejected() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;

    let mut body = paulista_to_ibirapuera();
    body["destinations"] = json!([]);
    let (status, response) = app
        .send(Method::POST, "/api/requests", Some(&company.token), Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_driver_cannot_create_requests() {
    let app = TestApp::new();
    let driver = app.sign_up("driver", "motorista@ald.com.br").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/requests",
            Some(&driver.token),
            Some(paulista_to_ibirapuera()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_concurrent_claims_have_one_winner() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;
    let first = app.sign_up("driver", "primeiro@ald.com.br").await;
    let second = app.sign_up("driver", "segundo@ald.com.br").await;

    let request = app.create_request(&company.token).await;
    let uri = format!("/api/requests/{}/claim", request["id"].as_str().unwrap());

    let (a, b) = tokio::join!(
        app.send(Method::POST, &uri, Some(&first.token), None),
        app.send(Method::POST, &uri, Some(&second.token), None),
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);

    let outcomes = [
        a.1["data"]["outcome"].as_str().unwrap(),
        b.1["data"]["outcome"].as_str().unwrap(),
    ];
    assert_eq!(outcomes.iter().filter(|o| **o == "accepted").count(), 1);
    assert_eq!(outcomes.iter().filter(|o| **o == "unavailable").count(), 1);

    let winner = if outcomes[0] == "accepted" { &first } else { &second };
    let (_, stored) = app
        .send(
            Method::GET,
            &format!("/api/requests/{}", request["id"].as_str().unwrap()),
            Some(&company.token),
            None,
        )
        .await;
    assert_eq!(stored["data"]["status"], "accepted");
    assert_eq!(stored["data"]["driver_id"], winner.id.to_string());

    // Ya no figura como pendiente
    let (_, pending) = app
        .send(Method::GET, "/api/requests/pending", Some(&first.token), None)
        .await;
    assert!(pending["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_full_lifecycle_and_invalid_edges() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;
    let driver = app.sign_up("driver", "motorista@ald.com.br").await;
    let other = app.sign_up("driver", "outro@ald.com.br").await;

    let request = app.create_request(&company.token).await;
    let id = request["id"].as_str().unwrap().to_string();
    let action = |name: &str| format!("/api/requests/{}/{}", id, name);

    // No se puede iniciar antes del claim
    let (status, _) = app
        .send(Method::POST, &action("start"), Some(&driver.token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, claimed) = app
        .send(Method::POST, &action("claim"), Some(&driver.token), None)
        .await;
    assert_eq!(claimed["data"]["outcome"], "accepted");

    // Sólo el driver asignado avanza
    let (status, _) = app
        .send(Method::POST, &action("start"), Some(&other.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, started) = app
        .send(Method::POST, &action("start"), Some(&driver.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["data"]["status"], "in_progress");
    assert!(started["data"]["started_at"].is_string());

    let (status, completed) = app
        .send(Method::POST, &action("complete"), Some(&driver.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["data"]["status"], "completed");

    // Terminal: ni cancelar ni reclamar
    let (status, _) = app
        .send(Method::POST, &action("cancel"), Some(&company.token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, retry) = app
        .send(Method::POST, &action("claim"), Some(&other.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(retry["data"]["outcome"], "unavailable");
}

#[tokio::test]
async fn test_company_cancels_pending_request() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;
    let stranger = app.sign_up("passenger", "passageiro@ald.com.br").await;

    let request = app.create_request(&company.token).await;
    let uri = format!("/api/requests/{}/cancel", request["id"].as_str().unwrap());

    let (status, _) = app.send(Method::POST, &uri, Some(&stranger.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) = app.send(Method::POST, &uri, Some(&company.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["data"]["status"], "cancelled");
    assert!(cancelled["data"]["cancelled_at"].is_string());
}

#[tokio::test]
async fn test_phone_only_update_keeps_other_fields() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;

    let (status, updated) = app
        .send(
            Method::PATCH,
            "/api/profile",
            Some(&company.token),
            Some(json!({ "phone": "+55 11 99876-5432" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["phone"], "+55 11 99876-5432");
    assert_eq!(updated["data"]["full_name"], "Maria Souza");
    assert_eq!(updated["data"]["role"], "company");
    assert_eq!(updated["data"]["company_name"], "ALD Logística");
}

#[tokio::test]
async fn test_avatar_replacement_removes_previous_blob() {
    let app = TestApp::new();
    let passenger = app.sign_up("passenger", "passageiro@ald.com.br").await;

    let (status, first) = app
        .send_bytes(
            Method::PUT,
            "/api/profile/avatar",
            &passenger.token,
            "image/png",
            vec![0x89, b'P', b'N', b'G', 1],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let first_url = first["data"]["avatar_url"].as_str().unwrap().to_string();

    let (status, body) = app.get_raw(&first_url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, vec![0x89, b'P', b'N', b'G', 1]);

    let (status, second) = app
        .send_bytes(
            Method::PUT,
            "/api/profile/avatar",
            &passenger.token,
            "image/jpeg",
            vec![0xFF, 0xD8, 0xFF, 2],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second_url = second["data"]["avatar_url"].as_str().unwrap();
    assert_ne!(second_url, first_url);

    let first_key = key_from_url(&first_url).unwrap();
    assert!(app.state.blobs.get(first_key).await.unwrap().is_none());
    let second_key = key_from_url(second_url).unwrap();
    assert!(app.state.blobs.get(second_key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_avatar_rejects_unsupported_type() {
    let app = TestApp::new();
    let passenger = app.sign_up("passenger", "passageiro@ald.com.br").await;

    let (status, _) = app
        .send_bytes(
            Method::PUT,
            "/api/profile/avatar",
            &passenger.token,
            "application/pdf",
            b"%PDF".to_vec(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_out_revokes_token() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;

    let (status, _) = app
        .send(Method::GET, "/api/auth/session", Some(&company.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Method::POST, "/api/auth/sign-out", Some(&company.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Method::GET, "/api/profile", Some(&company.token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_in_with_wrong_password() {
    let app = TestApp::new();
    app.sign_up("company", "empresa@ald.com.br").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/sign-in",
            None,
            Some(json!({ "email": "empresa@ald.com.br", "password": "errada" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let app = TestApp::new();
    app.sign_up("passenger", "passageiro@ald.com.br").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/sign-up",
            None,
            Some(json!({
                "email": "passageiro@ald.com.br",
                "password": "secret123",
                "full_name": "Outra Pessoa",
                "phone": "+55 11 90000-0000",
                "role": "passenger"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_controller_cannot_self_register() {
    let app = TestApp::new();
    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/sign-up",
            None,
            Some(json!({
                "email": "central@ald.com.br",
                "password": "secret123",
                "full_name": "Central",
                "phone": "+55 11 90000-0000",
                "role": "controller"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_requests_require_authentication() {
    let app = TestApp::new();
    let (status, _) = app.send(Method::GET, "/api/requests/pending", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_home_view_follows_role() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;
    let driver = app.sign_up("driver", "motorista@ald.com.br").await;
    app.create_request(&company.token).await;

    let (status, home) = app.send(Method::GET, "/api/home", Some(&company.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(home["data"]["view"], "requester");
    assert_eq!(home["data"]["requests"].as_array().unwrap().len(), 1);

    let (status, home) = app.send(Method::GET, "/api/home", Some(&driver.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(home["data"]["view"], "driver");
    assert_eq!(home["data"]["pending"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_alerts_are_controller_only() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;
    let controller = app.controller("central@ald.com.br").await;

    let (status, _) = app.send(Method::GET, "/api/alerts", Some(&company.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, alerts) = app
        .send(Method::GET, "/api/alerts", Some(&controller.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(alerts["data"].as_array().unwrap().is_empty());

    let (status, home) = app
        .send(Method::GET, "/api/home", Some(&controller.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(home["data"]["view"], "controller");
}

#[tokio::test]
async fn test_driver_vehicle_registration() {
    let app = TestApp::new();
    let driver = app.sign_up("driver", "motorista@ald.com.br").await;

    let (status, _) = app.send(Method::GET, "/api/drivers/me", Some(&driver.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, details) = app
        .send(
            Method::PUT,
            "/api/drivers/me",
            Some(&driver.token),
            Some(json!({
                "driver_license": "12345678900",
                "vehicle_model": "Mercedes Sprinter",
                "vehicle_plate": "abc1d23",
                "vehicle_color": "Branco",
                "vehicle_type": "van"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["data"]["vehicle_plate"], "ABC1D23");
    assert_eq!(details["data"]["total_trips"], 0);

    let (status, details) = app
        .send(
            Method::PUT,
            "/api/drivers/me/availability",
            Some(&driver.token),
            Some(json!({ "is_available": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["data"]["is_available"], false);
}

#[tokio::test]
async fn test_completed_trip_counts_for_driver() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;
    let driver = app.sign_up("driver", "motorista@ald.com.br").await;

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/drivers/me",
            Some(&driver.token),
            Some(json!({
                "driver_license": "12345678900",
                "vehicle_model": "Toyota Corolla",
                "vehicle_plate": "FGH2J34",
                "vehicle_color": "Prata",
                "vehicle_type": "sedan"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let request = app.create_request(&company.token).await;
    let id = request["id"].as_str().unwrap().to_string();
    for action in ["claim", "start", "complete"] {
        let uri = format!("/api/requests/{}/{}", id, action);
        let (status, _) = app.send(Method::POST, &uri, Some(&driver.token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, details) = app.send(Method::GET, "/api/drivers/me", Some(&driver.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["data"]["total_trips"], 1);
}

#[tokio::test]
async fn test_metrics_count_claims() {
    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;
    let driver = app.sign_up("driver", "motorista@ald.com.br").await;
    let request = app.create_request(&company.token).await;

    app.send(
        Method::POST,
        &format!("/api/requests/{}/claim", request["id"].as_str().unwrap()),
        Some(&driver.token),
        None,
    )
    .await;

    let (status, body) = app.get_raw("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("transport_request_claims_total"));
}

#[tokio::test]
async fn test_stale_request_raises_single_alert() {
    use ald_transport::services::AlertMonitor;
    use chrono::{Duration, Utc};

    let app = TestApp::new();
    let company = app.sign_up("company", "empresa@ald.com.br").await;
    let controller = app.controller("central@ald.com.br").await;
    let request = app.create_request(&company.token).await;

    let monitor = AlertMonitor::new(&app.state);
    let later = Utc::now() + Duration::minutes(30);
    assert_eq!(monitor.run_once(later).await.unwrap(), 1);
    assert_eq!(monitor.run_once(later).await.unwrap(), 0);

    let (_, alerts) = app
        .send(Method::GET, "/api/alerts", Some(&controller.token), None)
        .await;
    let alerts = alerts["data"].as_array().unwrap().clone();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["request_id"], request["id"]);
    assert_eq!(alerts[0]["alert_type"], "pending_timeout");

    // La alerta no toca la solicitud
    let (_, stored) = app
        .send(
            Method::GET,
            &format!("/api/requests/{}", request["id"].as_str().unwrap()),
            Some(&company.token),
            None,
        )
        .await;
    assert_eq!(stored["data"]["status"], "pending");

    let resolve = format!("/api/alerts/{}/resolve", alerts[0]["id"].as_str().unwrap());
    let (status, resolved) = app
        .send(Method::POST, &resolve, Some(&controller.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["data"]["is_resolved"], true);

    let (status, _) = app
        .send(Method::POST, &resolve, Some(&controller.token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_realtime_feed_ends_after_sign_out() {
    let app = TestApp::with_config(EnvironmentConfig {
        realtime_session_check_secs: 1,
        ..test_config()
    });
    let driver = app.sign_up("driver", "motorista@ald.com.br").await;

    let response = app
        .open_stream("/api/realtime/transport_requests", &driver.token)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = app
        .send(Method::POST, "/api/auth/sign-out", Some(&driver.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let closed = tokio::time::timeout(
        Duration::from_secs(5),
        to_bytes(response.into_body(), usize::MAX),
    )
    .await;
    assert!(closed.is_ok(), "feed stayed open after sign-out");
}
