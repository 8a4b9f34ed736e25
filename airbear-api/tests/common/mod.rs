#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use airbear_api::{app, AppState, Repositories};
use airbear_core::identity::{AuthProvider, AuthSession, IdentityUser};
use airbear_core::payment::{
    CheckoutRequest, CheckoutSession, IntentRequest, PaymentAdapter, PaymentIntent, PaymentStatus,
};
use airbear_core::{AirBear, CoreError, CoreResult, Role, Spot, UserProfile};
use airbear_shared::Masked;
use airbear_store::{app_config::Config, MemoryStore};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const LOG_SECRET: &str = "log-signing-secret";

pub fn test_config(log_signing: bool) -> Config {
    let logging = if log_signing {
        format!("rate_limit = 3\nwindow_seconds = 60\nsigning_secret = \"{}\"", LOG_SECRET)
    } else {
        "rate_limit = 3\nwindow_seconds = 60".to_string()
    };

    Config::from_toml(&format!(
        r#"
        [server]
        port = 0
        public_url = "https://app.airbear.test"
        [database]
        [auth]
        url = "http://auth.invalid"
        anon_key = "anon"
        jwt_secret = "{jwt}"
        [payments]
        secret_key = "sk_test"
        webhook_secret = "{webhook}"
        [logging]
        {logging}
        "#,
        jwt = JWT_SECRET,
        webhook = WEBHOOK_SECRET,
        logging = logging,
    ))
    .unwrap()
}

pub fn token_for(user_id: Uuid) -> String {
    let claims = serde_json::json!({
        "sub": user_id.to_string(),
        "email": format!("{}@airbear.test", user_id.simple()),
        "aud": "authenticated",
        "role": "authenticated",
        "exp": (Utc::now().timestamp() + 3600) as usize,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
}

/// Identity service stand-in: any password but "wrong-password" succeeds
pub struct FakeAuth;

impl FakeAuth {
    fn session(email: &str) -> AuthSession {
        let id = Uuid::new_v4();
        AuthSession {
            user: IdentityUser { id, email: Some(email.to_string()) },
            access_token: Some(Masked(token_for(id))),
            refresh_token: None,
            expires_in: Some(3600),
        }
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_up(&self, email: &str, _password: &str) -> CoreResult<AuthSession> {
        if email.starts_with("taken@") {
            return Err(CoreError::IdentityError("User already registered".to_string()));
        }
        Ok(Self::session(email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> CoreResult<AuthSession> {
        if password == "wrong-password" {
            return Err(CoreError::IdentityError("Invalid login credentials".to_string()));
        }
        Ok(Self::session(email))
    }

    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> CoreResult<AuthSession> {
        match (code, code_verifier) {
            ("good-code", Some("verifier")) => Ok(Self::session("oauth@airbear.test")),
            _ => Err(CoreError::IdentityError("invalid flow state".to_string())),
        }
    }
}

/// Records what the handlers asked the processor for
#[derive(Default)]
pub struct FakePayments {
    pub intents: Mutex<Vec<IntentRequest>>,
    pub checkouts: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl PaymentAdapter for FakePayments {
    async fn create_intent(&self, request: &IntentRequest) -> CoreResult<PaymentIntent> {
        self.intents.lock().unwrap().push(request.clone());
        Ok(PaymentIntent {
            id: "pi_test".to_string(),
            amount_cents: request.amount_cents,
            currency: request.currency.clone(),
            status: PaymentStatus::RequiresPaymentMethod,
            client_secret: Some(Masked("pi_test_secret".to_string())),
        })
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> CoreResult<CheckoutSession> {
        self.checkouts.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            id: "cs_test".to_string(),
            url: Some("https://pay.test/cs_test".to_string()),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub payments: Arc<FakePayments>,
    pub pickup: Spot,
    pub dropoff: Spot,
    pub airbear: AirBear,
}

pub fn spot(name: &str) -> Spot {
    Spot {
        id: Uuid::new_v4(),
        name: name.to_string(),
        latitude: 40.4406,
        longitude: -79.9959,
        is_active: true,
    }
}

pub fn airbear(name: &str) -> AirBear {
    AirBear {
        id: Uuid::new_v4(),
        name: name.to_string(),
        latitude: 40.4406,
        longitude: -79.9959,
        heading: None,
        battery_level: Some(90),
        is_available: true,
        is_charging: false,
        updated_at: Utc::now(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(false), true).await
}

pub async fn spawn_app_with(config: Config, with_payments: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let pickup = spot("Cathedral of Learning");
    let dropoff = spot("Market Square");
    let bear = airbear("AirBear 1");
    store.insert_spot(pickup.clone()).await;
    store.insert_spot(dropoff.clone()).await;
    store.insert_airbear(bear.clone()).await;

    let payments = Arc::new(FakePayments::default());
    let adapter: Option<Arc<dyn PaymentAdapter>> = if with_payments {
        Some(payments.clone() as Arc<dyn PaymentAdapter>)
    } else {
        None
    };

    let state = AppState::new(
        &config,
        Repositories::memory(store.clone()),
        Arc::new(FakeAuth),
        adapter,
    );

    TestApp {
        router: app(state),
        store,
        payments,
        pickup,
        dropoff,
        airbear: bear,
    }
}

impl TestApp {
    pub async fn rider(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_profile(UserProfile::new(id, None, Role::Rider)).await;
        id
    }

    pub async fn driver(&self, assigned: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        let mut profile = UserProfile::new(id, None, Role::Driver);
        profile.assigned_airbear_id = assigned;
        self.store.insert_profile(profile).await;
        id
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// Book a ride between the seeded spots, returning its id
    pub async fn book(&self, rider: Uuid) -> Uuid {
        let (status, body) = self
            .send(post_json(
                "/api/rides",
                Some(rider),
                serde_json::json!({
                    "pickup_spot_id": self.pickup.id,
                    "dropoff_spot_id": self.dropoff.id,
                    "fare": 4.5,
                    "distance": 1.3,
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "booking failed: {}", body);
        body["id"].as_str().unwrap().parse().unwrap()
    }
}

pub fn post_json(uri: &str, user: Option<Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, user: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
    }
    builder.body(Body::empty()).unwrap()
}
