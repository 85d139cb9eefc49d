use std::convert::Infallible;

use axum::{
    Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

use crate::{
    dto::{sse::SubscribeParams, validation::validate_channel_name},
    error::{AppError, ServiceError},
    services::{admission::IdentityScope, sse_service},
    state::SharedState,
};

/// Mount point of the broadcast subscription endpoint.
pub const MOUNT_PATH: &str = "/sse/broadcast";

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route(MOUNT_PATH, get(subscribe).options(preflight))
}

#[utoipa::path(
    get,
    path = "/sse/broadcast",
    tag = "sse",
    params(SubscribeParams),
    responses(
        (status = 200, description = "Broadcast event stream", content_type = "text/event-stream", body = String),
        (status = 400, description = "Missing or invalid channel parameter"),
        (status = 401, description = "Authentication required"),
    )
)]
/// Subscribe to a broadcast channel as a Server-Sent Events stream.
///
/// CORS headers are computed up front and attached to every outcome,
/// including the failure responses.
pub async fn subscribe(
    State(state): State<SharedState>,
    Query(params): Query<SubscribeParams>,
    headers: HeaderMap,
) -> Response {
    let cors_headers = state.cors_policy().response_headers(origin(&headers));

    let mut response = match open_subscription(&state, params, &headers) {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    response.headers_mut().extend(cors_headers);
    response
}

/// Handle the CORS preflight for the subscribe endpoint.
pub async fn preflight(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let cors_headers = state.cors_policy().response_headers(origin(&headers));
    (StatusCode::OK, cors_headers, Body::empty()).into_response()
}

/// Run admission for one subscriber and open its event stream.
fn open_subscription(
    state: &SharedState,
    params: SubscribeParams,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let channel_name = params
        .channel
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            warn!("broadcast subscribe request missing channel parameter");
            AppError::BadRequest("Missing required parameter: 'channel'".to_string())
        })?;

    validate_channel_name(&channel_name).map_err(|err| {
        warn!(channel = %channel_name, "rejecting subscribe request with invalid channel name");
        AppError::from(ServiceError::invalid_channel_name(err))
    })?;

    let identity = state
        .admission_policy()
        .authorize(headers)
        .map_err(|denied| AppError::Unauthorized(denied.reason))?;

    let channel = state
        .broadcast_service()
        .lookup_by_channel_name(&channel_name)
        .map_err(|err| {
            error!(channel = %channel_name, error = %err, "failed to create/lookup channel");
            AppError::Internal("Failed to create channel".to_string())
        })?;

    let scope = IdentityScope::open(channel_name.clone(), identity);
    let frames = sse_service::open_stream(channel, scope);

    info!(
        channel = %channel_name,
        clients = state.broadcast_service().get_client_count(&channel_name),
        "client connected to broadcast channel"
    );

    let body = Body::from_stream(ReceiverStream::new(frames).map(Ok::<_, Infallible>));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream;charset=UTF-8")
        .header(header::CACHE_CONTROL, "no-cache,no-store")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .map_err(|err| AppError::Internal(err.to_string()))
}

fn origin(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
}
