//! SMS/voice relay: a small router forwarding to a Twilio-shaped telephony
//! API. Runs inside this binary but is a plain axum `Router`, so it can be
//! mounted standalone next to the main API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::TelephonyConfig;

#[derive(Clone)]
pub struct RelayState {
    config: Arc<TelephonyConfig>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct SendSmsRequest {
    pub message: String,
    pub recipient: String,
}

#[derive(Debug, Deserialize)]
pub struct MakeCallRequest {
    pub recipient: String,
}

#[derive(Debug, Serialize)]
struct RelayResponse {
    success: bool,
    detail: String,
}

pub fn router(config: TelephonyConfig) -> Router {
    let state = RelayState {
        config: Arc::new(config),
        client: reqwest::Client::new(),
    };
    Router::new()
        .route("/send-sms", post(send_sms))
        .route("/make-call", post(make_call))
        .with_state(state)
}

async fn send_sms(
    State(state): State<RelayState>,
    Json(request): Json<SendSmsRequest>,
) -> Response {
    if request.recipient.trim().is_empty() || request.message.trim().is_empty() {
        return relay_error(StatusCode::UNPROCESSABLE_ENTITY, "recipient and message required");
    }

    let url = format!(
        "{}/Accounts/{}/Messages.json",
        state.config.base_url, state.config.account_sid
    );
    let form = [
        ("To", request.recipient.as_str()),
        ("From", state.config.from_number.as_str()),
        ("Body", request.message.as_str()),
    ];

    forward(&state, &url, &form, "sms", &request.recipient).await
}

async fn make_call(
    State(state): State<RelayState>,
    Json(request): Json<MakeCallRequest>,
) -> Response {
    if request.recipient.trim().is_empty() {
        return relay_error(StatusCode::UNPROCESSABLE_ENTITY, "recipient required");
    }

    let url = format!(
        "{}/Accounts/{}/Calls.json",
        state.config.base_url, state.config.account_sid
    );
    let twiml = "<Response><Say>Emergency alert. Please check on your contact.</Say></Response>";
    let form = [
        ("To", request.recipient.as_str()),
        ("From", state.config.from_number.as_str()),
        ("Twiml", twiml),
    ];

    forward(&state, &url, &form, "call", &request.recipient).await
}

async fn forward(
    state: &RelayState,
    url: &str,
    form: &[(&str, &str)],
    kind: &str,
    recipient: &str,
) -> Response {
    let result = state
        .client
        .post(url)
        .basic_auth(&state.config.account_sid, Some(&state.config.auth_token))
        .form(form)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            info!("relayed {kind} to {recipient}");
            (
                StatusCode::OK,
                Json(RelayResponse {
                    success: true,
                    detail: format!("{kind} dispatched"),
                }),
            )
                .into_response()
        }
        Ok(response) => {
            error!("telephony API rejected {kind}: HTTP {}", response.status());
            relay_error(StatusCode::BAD_GATEWAY, "telephony provider rejected the request")
        }
        Err(e) => {
            error!("telephony API unreachable: {e}");
            relay_error(StatusCode::BAD_GATEWAY, "telephony provider unreachable")
        }
    }
}

fn relay_error(status: StatusCode, detail: &str) -> Response {
    (
        status,
        Json(RelayResponse {
            success: false,
            detail: detail.to_string(),
        }),
    )
        .into_response()
}
