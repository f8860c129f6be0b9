// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dev HTTP surface: inbound message injection and run timeline reads.

use crate::problem::Problem;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use textops_core::{parse, Clock, InboundMessage, Intent, OutboundMessage};
use textops_engine::{EngineError, Orchestrator};
use textops_storage::{ExecutionQueue, RunRepository, RunTimeline};

/// Channel id for everything injected through the dev API.
const DEV_CHANNEL: &str = "dev";

/// Shared handler state: the orchestrator plus the queue that receives
/// its dispatch signals.
pub struct AppState<S, C> {
    pub orchestrator: Arc<Orchestrator<S, C>>,
    pub queue: Arc<dyn ExecutionQueue>,
}

impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            queue: self.queue.clone(),
        }
    }
}

/// Build the dev API router.
pub fn router<S, C>(state: AppState<S, C>) -> Router
where
    S: RunRepository + Send + Sync + 'static,
    C: Clock,
{
    Router::new()
        .route("/dev/inbound", post(post_inbound::<S, C>))
        .route("/runs/{run_id}", get(get_run::<S, C>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    pub from: Option<String>,
    pub conversation: Option<String>,
    pub body: Option<String>,
    pub provider_message_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundDto {
    pub body: String,
    pub correlation_id: String,
    pub idempotency_key: String,
    pub channel_id: String,
    pub conversation: String,
}

impl From<&OutboundMessage> for OutboundDto {
    fn from(m: &OutboundMessage) -> Self {
        Self {
            body: m.body.clone(),
            correlation_id: m.correlation_id.clone(),
            idempotency_key: m.idempotency_key.clone(),
            channel_id: m.channel_id.clone(),
            conversation: m.conversation_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundResponse {
    pub intent_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_key: Option<String>,
    pub run_id: Option<String>,
    pub dispatched_execution: bool,
    pub outbound: Vec<OutboundDto>,
}

/// Reject missing or blank required fields with a problem-details body
/// naming the offending field.
fn require<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, Problem> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Problem::bad_request(format!(
            "field '{field}' is required and must not be blank"
        ))),
    }
}

/// Prefix dev identities so they cannot collide with real channels.
fn dev_prefixed(value: &str) -> String {
    if value.starts_with("dev:") {
        value.to_string()
    } else {
        format!("dev:{value}")
    }
}

async fn post_inbound<S, C>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<InboundRequest>,
) -> Result<Json<InboundResponse>, Problem>
where
    S: RunRepository + Send + Sync + 'static,
    C: Clock,
{
    let from = require(&request.from, "from")?;
    let conversation = require(&request.conversation, "conversation")?;
    let body = require(&request.body, "body")?;

    let provider_message_id = request
        .provider_message_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    let message = InboundMessage {
        channel_id: DEV_CHANNEL.to_string(),
        provider_message_id,
        from_address: dev_prefixed(from),
        conversation_id: dev_prefixed(conversation),
        body: body.to_string(),
    };
    let parsed = parse(&message.body);

    let result = state
        .orchestrator
        .handle_inbound(&message, &parsed)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "inbound handling failed");
            Problem::internal(e.to_string())
        })?;

    if let Some(dispatch) = &result.dispatch {
        state
            .queue
            .enqueue(dispatch.run_id, &dispatch.job_key)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, run_id = %dispatch.run_id, "enqueue failed");
                Problem::internal(e.to_string())
            })?;
    }

    let job_key = match &parsed.intent {
        Intent::RunJob { job_key: Some(key) } => Some(key.to_string()),
        _ => None,
    };
    Ok(Json(InboundResponse {
        intent_type: parsed.intent.to_string(),
        job_key,
        run_id: result.run_id.map(|id| id.to_string()),
        dispatched_execution: result.dispatched_execution,
        outbound: result.outbound.iter().map(OutboundDto::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDto {
    pub run_id: String,
    pub job_key: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub requested_by_address: String,
    pub channel_id: String,
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEventDto {
    pub run_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct RunDetailResponse {
    pub run: RunDto,
    pub events: Vec<RunEventDto>,
}

impl From<RunTimeline> for RunDetailResponse {
    fn from(timeline: RunTimeline) -> Self {
        let run = timeline.run;
        Self {
            run: RunDto {
                run_id: run.run_id.to_string(),
                job_key: run.job_key.to_string(),
                status: run.status.to_string(),
                created_at: run.created_at,
                requested_by_address: run.requested_by_address,
                channel_id: run.channel_id,
                conversation_id: run.conversation_id,
            },
            events: timeline
                .events
                .into_iter()
                .map(|e| RunEventDto {
                    run_id: e.run_id.to_string(),
                    kind: e.kind.to_string(),
                    at: e.at,
                    actor: e.actor,
                    payload: e.payload,
                })
                .collect(),
        }
    }
}

async fn get_run<S, C>(
    State(state): State<AppState<S, C>>,
    Path(run_id): Path<String>,
) -> Result<Json<RunDetailResponse>, Problem>
where
    S: RunRepository + Send + Sync + 'static,
    C: Clock,
{
    match state.orchestrator.get_timeline(&run_id).await {
        Ok(timeline) => Ok(Json(RunDetailResponse::from(timeline))),
        Err(EngineError::RunNotFound(id)) => {
            Err(Problem::not_found(format!("unknown run id: {id}")))
        }
        Err(e) => {
            tracing::error!(error = %e, "timeline read failed");
            Err(Problem::internal(e.to_string()))
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
