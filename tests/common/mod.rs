#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use ald_transport::config::EnvironmentConfig;
use ald_transport::models::auth::UserCredentials;
use ald_transport::models::profile::{Profile, Role};
use ald_transport::{create_router, AppState};

pub fn test_config() -> EnvironmentConfig {
    EnvironmentConfig {
        bcrypt_cost: 4,
        ..EnvironmentConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: EnvironmentConfig) -> Self {
        let state = AppState::in_memory(config).unwrap();
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    pub async fn send_bytes(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(data))
            .unwrap();

        self.dispatch(request).await
    }

    pub async fn get_raw(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    /// Abrir un feed SSE; el body queda abierto mientras el server lo mantenga
    pub async fn open_stream(&self, uri: &str, token: &str) -> Response {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn sign_up(&self, role: &str, email: &str) -> TestUser {
        let mut body = json!({
            "email": email,
            "password": "secret123",
            "full_name": "Maria Souza",
            "phone": "+55 11 91234-5678",
            "role": role,
        });
        if role == "company" {
            body["company_name"] = json!("ALD Logística");
        }

        let (status, response) = self
            .send(Method::POST, "/api/auth/sign-up", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "sign-up failed: {}", response);

        TestUser {
            id: response["data"]["user"]["id"]
                .as_str()
                .unwrap()
                .parse()
                .unwrap(),
            token: response["data"]["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Los controladores no se registran solos; se crean directo en el store
    pub async fn controller(&self, email: &str) -> TestUser {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let credentials = UserCredentials {
            id,
            email: email.to_string(),
            password_hash: bcrypt::hash("secret123", 4).unwrap(),
            created_at: now,
        };
        let profile = Profile {
            id,
            email: email.to_string(),
            full_name: "Central ALD".to_string(),
            phone: None,
            role: Role::Controller,
            avatar_url: None,
            company_name: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .repos
            .users
            .create_account(&credentials, &profile)
            .await
            .unwrap();

        let (status, response) = self
            .send(
                Method::POST,
                "/api/auth/sign-in",
                None,
                Some(json!({ "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        TestUser {
            id,
            token: response["data"]["access_token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn create_request(&self, token: &str) -> Value {
        let (status, response) = self
            .send(
                Method::POST,
                "/api/requests",
                Some(token),
                Some(paulista_to_ibirapuera()),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", response);
        response["data"].clone()
    }
}

pub fn paulista_to_ibirapuera() -> Value {
    json!({
        "origin_address": "Av. Paulista, 1000 - Bela Vista, São Paulo",
        "origin_lat": -23.5614,
        "origin_lng": -46.6559,
        "destinations": [
            { "address": "Shopping Ibirapuera", "lat": -23.6101, "lng": -46.6664 }
        ],
        "num_passengers": 3,
        "vehicle_type": "van",
        "notes": "Equipe de vendas"
    })
}
