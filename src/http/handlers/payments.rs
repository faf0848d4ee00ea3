use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::domain::aggregates::{Invoice, PaymentStatus};
use crate::domain::value_objects::DocumentCode;
use crate::error::Result;
use crate::http::extract::ValidJson;
use crate::http::response::{ok, ApiResponse};
use crate::services::{CallbackOutcome, GatewayCallback};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaymentStatusView { pub code: DocumentCode, pub status: PaymentStatus, pub paid_at: Option<DateTime<Utc>> }

#[derive(Debug, Serialize)]
pub struct CallbackAck { pub applied: bool, pub status: Option<PaymentStatus> }

pub async fn show(State(s): State<AppState>, user: AuthUser, Path(code): Path<String>) -> Result<ApiResponse<Invoice>> {
    Ok(ok("Invoice retrieved", s.payments.invoice_for_buyer(&DocumentCode::parse(code)?, user.id).await?))
}

pub async fn status(State(s): State<AppState>, user: AuthUser, Path(code): Path<String>) -> Result<ApiResponse<PaymentStatusView>> {
    let invoice = s.payments.invoice_for_buyer(&DocumentCode::parse(code)?, user.id).await?;
    Ok(ok("Payment status retrieved", PaymentStatusView { code: invoice.code, status: invoice.status, paid_at: invoice.paid_at }))
}

/// Gateway webhook. Authenticated by the signature in the body, not a token.
pub async fn callback(State(s): State<AppState>, ValidJson(cb): ValidJson<GatewayCallback>) -> Result<ApiResponse<CallbackAck>> {
    let ack = match s.payments.handle_callback(cb).await? {
        CallbackOutcome::Applied(status) => CallbackAck { applied: true, status: Some(status) },
        CallbackOutcome::Ignored => CallbackAck { applied: false, status: None },
    };
    Ok(ok("Callback processed", ack))
}
