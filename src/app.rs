use crate::app_state::{AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::dashboard;
use crate::error::DashboardError;
use crate::filter::TracingObserver;
use crate::metrics;
use crate::models::{AggregateUpdate, FilterOptions, FilterSpec, OptionsRequest};
use crate::validated_json::ValidatedJson;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Application service type.
pub type Service = NormalizePath<Router>;

/// Initialise the application
///
/// Sizes the global rayon pool when rayon is in use and a thread limit was given.
pub fn init(args: &CommandLineArgs) {
    if args.use_rayon {
        if let Some(thread_limit) = args.thread_limit {
            rayon::ThreadPoolBuilder::new()
                .num_threads(thread_limit)
                .build_global()
                .expect("Failed to initialise rayon thread pool");
        }
    }
}

/// Attempt the initial load of the job postings.
///
/// Failure is not fatal: the load is retried on the next filter options request.
pub async fn load_dataset(state: &AppState) {
    if state.dataset_cache.get_dataset().await.is_err() {
        tracing::warn!("Starting without job postings, will retry on the next request");
    }
}

/// Returns an application service
///
/// Trailing slashes are trimmed from request paths before routing.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn service(state: SharedAppState) -> Service {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// Returns a [axum::Router] for the application
fn router(state: SharedAppState) -> Router {
    fn v1(state: SharedAppState) -> Router {
        Router::new()
            .route("/filter-options", post(filter_options))
            .route("/aggregates", post(aggregates))
            .with_state(state)
    }

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/v1", v1(state))
        .layer(
            TraceLayer::new_for_http()
                .on_request(metrics::request_counter)
                .on_response(metrics::record_response_metrics),
        )
}

async fn healthz() -> &'static str {
    "ok"
}

/// Handler for filter options requests
///
/// Refreshes the job postings if they are stale.
async fn filter_options(
    State(state): State<SharedAppState>,
    ValidatedJson(selection): ValidatedJson<OptionsRequest>,
) -> Result<Json<FilterOptions>, DashboardError> {
    let options = dashboard::refresh_filter_options(&state.dataset_cache, &selection).await?;
    Ok(Json(options))
}

/// Handler for aggregate update requests
///
/// Uses the current snapshot without refreshing it.
async fn aggregates(
    State(state): State<SharedAppState>,
    ValidatedJson(spec): ValidatedJson<FilterSpec>,
) -> Result<Json<AggregateUpdate>, DashboardError> {
    let dataset = state
        .dataset_cache
        .current()
        .await
        .ok_or(DashboardError::DatasetUnavailable)?;
    let update = if state.args.use_rayon {
        let taxonomy = state.taxonomy.clone();
        tokio_rayon::spawn(move || {
            dashboard::update_aggregates(&dataset, &spec, &taxonomy, Some(&TracingObserver))
        })
        .await
    } else {
        let _task_permit = state.resource_manager.task().await?;
        dashboard::update_aggregates(&dataset, &spec, &state.taxonomy, Some(&TracingObserver))
    };
    Ok(Json(update))
}
