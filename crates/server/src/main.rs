use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use crm_integration::TwentyCrmClient;
use shared::{
    domain::NewCustomer,
    error::{ApiError, ErrorCode},
    protocol::{
        CustomerListResponse, OperationResult, SendMessageRequest, SendMessageResponse,
        CUSTOMERS_ROUTE, CUSTOMER_ID_HEADER, SEND_MESSAGE_ROUTE, STARTING_FROM_HEADER,
    },
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;
mod sms;

use api::ApiContext;
use app_state::AppState;
use config::load_settings;
use sms::LoggingSmsGateway;

type JsonFailure<T> = (StatusCode, Json<T>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let crm = settings.crm_config()?;
    info!(crm = %crm.base_url, page_limit = settings.page_limit, "CRM proxy configured");

    let api = ApiContext {
        directory: Arc::new(TwentyCrmClient::new(crm)),
        sms: Arc::new(LoggingSmsGateway),
        page_limit: settings.page_limit,
    };
    let app = build_router(Arc::new(AppState { api }), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            CUSTOMERS_ROUTE,
            get(http_list_customers)
                .post(http_create_customer)
                .delete(http_delete_customer),
        )
        .route(SEND_MESSAGE_ROUTE, post(http_send_message))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn status_for(err: &ApiError) -> StatusCode {
    match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Upstream | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

async fn http_list_customers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CustomerListResponse>, JsonFailure<OperationResult>> {
    let cursor = header_value(&headers, STARTING_FROM_HEADER);
    let page = api::list_customers(&state.api, cursor)
        .await
        .map_err(|e| {
            (
                status_for(&e),
                Json(OperationResult::failed("Failed to retrieve customers")),
            )
        })?;
    Ok(Json(page))
}

async fn http_create_customer(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<Json<OperationResult>, JsonFailure<OperationResult>> {
    let Json(customer) = body.map_err(|rejection| {
        warn!(%rejection, "rejected customer payload");
        (
            StatusCode::BAD_REQUEST,
            Json(OperationResult::failed(rejection.body_text())),
        )
    })?;

    api::create_customer(&state.api, &customer)
        .await
        .map_err(|e| {
            let message = match e.code {
                ErrorCode::Validation => e.message.clone(),
                _ => "Failed to create customer".to_string(),
            };
            (status_for(&e), Json(OperationResult::failed(message)))
        })?;
    Ok(Json(OperationResult::ok()))
}

async fn http_delete_customer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<OperationResult>, JsonFailure<OperationResult>> {
    let customer_id = header_value(&headers, CUSTOMER_ID_HEADER);
    api::delete_customer(&state.api, customer_id)
        .await
        .map_err(|e| {
            let message = match e.code {
                ErrorCode::Validation => e.message.clone(),
                _ => "Failed to delete customer".to_string(),
            };
            (status_for(&e), Json(OperationResult::failed(message)))
        })?;
    Ok(Json(OperationResult::ok()))
}

async fn http_send_message(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, JsonFailure<SendMessageResponse>> {
    let failed = |status: StatusCode, error: String| {
        (
            status,
            Json(SendMessageResponse {
                success: false,
                messages_sent: 0,
                error: Some(error),
            }),
        )
    };

    let Json(request) =
        body.map_err(|rejection| failed(StatusCode::BAD_REQUEST, rejection.body_text()))?;
    let messages_sent = api::send_message(&state.api, &request)
        .await
        .map_err(|e| failed(status_for(&e), e.message))?;

    Ok(Json(SendMessageResponse {
        success: true,
        messages_sent,
        error: None,
    }))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
