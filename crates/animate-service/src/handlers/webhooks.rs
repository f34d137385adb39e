//! Payment webhook handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use animate_core::{UserId, BASIC_PACK_CREDITS};
use animate_store::{Store, StoreError, UsageChange};

use crate::crypto::verify_signature;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying `hex(HMAC-SHA256(secret, body))`.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Payment event forwarded by the front end.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    /// `payment_succeeded`, `subscription_active`, `subscription_cancelled`, ...
    pub event_type: String,
    /// The paying user.
    pub clerk_id: String,
    /// Product purchased, for one-time payments.
    #[serde(default)]
    pub product_id: Option<String>,
    /// Provider event id; repeated deliveries with the same id are ignored.
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub success: bool,
    /// What was done.
    pub message: String,
}

impl WebhookResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// Handle payment webhooks.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing webhook signature".into()))?;

        if !verify_signature(secret, body.as_bytes(), signature) {
            tracing::warn!("Invalid payment webhook signature");
            return Err(ApiError::BadRequest("Invalid webhook signature".into()));
        }
    } else {
        tracing::warn!("Webhook secret not configured - skipping signature verification");
    }

    let webhook: PaymentWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user_id: UserId = webhook
        .clerk_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    tracing::info!(
        event_type = %webhook.event_type,
        event_id = ?webhook.event_id,
        user_id = %user_id,
        "Received payment webhook"
    );

    let (change, message) = match webhook.event_type.as_str() {
        "payment_succeeded" => {
            let is_basic_pack = webhook
                .product_id
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains("basic"));

            if !is_basic_pack {
                tracing::debug!(product_id = ?webhook.product_id, "Payment for unknown product");
                return Ok(WebhookResponse::ok("Webhook processed"));
            }
            (
                UsageChange::AddBasicCredits(BASIC_PACK_CREDITS),
                format!("Added {BASIC_PACK_CREDITS} Basic credits"),
            )
        }
        "subscription_active" => (
            UsageChange::SetPro(true),
            "Pro subscription activated".to_string(),
        ),
        "subscription_cancelled" => (
            UsageChange::SetPro(false),
            "Pro subscription cancelled".to_string(),
        ),
        other => {
            tracing::debug!(event_type = %other, "Unhandled payment event");
            return Ok(WebhookResponse::ok("Webhook processed"));
        }
    };

    match state
        .store
        .apply_usage_event(webhook.event_id.as_deref(), &user_id, change, Utc::now())
    {
        Ok(usage) => {
            tracing::info!(
                user_id = %user_id,
                ?change,
                plan = ?usage.plan,
                basic_credits = usage.basic_credits,
                "Payment event applied"
            );
            Ok(WebhookResponse::ok(message))
        }
        Err(StoreError::DuplicateEvent { event_id }) => {
            tracing::info!(event_id = %event_id, "Duplicate webhook delivery ignored");
            Ok(WebhookResponse::ok("Event already processed"))
        }
        Err(e) => Err(e.into()),
    }
}
