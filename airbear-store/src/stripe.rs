use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{error, info};

use airbear_core::payment::{
    CheckoutRequest, CheckoutSession, IntentRequest, PaymentAdapter, PaymentIntent, PaymentStatus,
};
use airbear_core::{CoreError, CoreResult};
use airbear_shared::Masked;

/// Payment processor client speaking the form-encoded REST API
pub struct StripeClient {
    secret_key: Masked<String>,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct IntentResponse {
    id: String,
    amount: i64,
    currency: String,
    status: PaymentStatus,
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: String) -> Self {
        Self {
            secret_key: Masked(secret_key),
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> CoreResult<T> {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(self.secret_key.expose())
            .form(form)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::UpstreamError(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            error!("Payment processor rejected {}: {}", path, message);
            return Err(CoreError::UpstreamError(message));
        }

        serde_json::from_str(&body).map_err(|e| CoreError::UpstreamError(e.to_string()))
    }
}

fn push_metadata(form: &mut Vec<(String, String)>, prefix: &str, metadata: &BTreeMap<String, String>) {
    for (key, value) in metadata {
        form.push((format!("{}[{}]", prefix, key), value.clone()));
    }
}

fn intent_form(request: &IntentRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), request.amount_cents.to_string()),
        ("currency".to_string(), request.currency.clone()),
        ("description".to_string(), request.description.clone()),
        ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
    ];
    if let Some(email) = &request.receipt_email {
        form.push(("receipt_email".to_string(), email.clone()));
    }
    push_metadata(&mut form, "metadata", &request.metadata);
    form
}

fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];
    for (i, line) in request.lines.iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        form.push((format!("{}[price_data][currency]", prefix), request.currency.clone()));
        form.push((format!("{}[price_data][product_data][name]", prefix), line.name.clone()));
        form.push((format!("{}[price_data][unit_amount]", prefix), line.unit_amount_cents.to_string()));
        form.push((format!("{}[quantity]", prefix), line.quantity.to_string()));
    }
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    // session and intent both carry the ids so either event can be reconciled
    push_metadata(&mut form, "metadata", &request.metadata);
    push_metadata(&mut form, "payment_intent_data[metadata]", &request.metadata);
    form
}

#[async_trait]
impl PaymentAdapter for StripeClient {
    async fn create_intent(&self, request: &IntentRequest) -> CoreResult<PaymentIntent> {
        let response: IntentResponse = self.post_form("/v1/payment_intents", &intent_form(request)).await?;
        info!("Created payment intent {} for {} {}", response.id, response.amount, response.currency);

        Ok(PaymentIntent {
            id: response.id,
            amount_cents: response.amount,
            currency: response.currency,
            status: response.status,
            client_secret: response.client_secret.map(Masked),
        })
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> CoreResult<CheckoutSession> {
        let session: CheckoutSession = self
            .post_form("/v1/checkout/sessions", &checkout_form(request))
            .await?;
        info!("Created checkout session {}", session.id);
        Ok(session)
    }
}
