//! Runs list and detail requests off the event loop and reports the outcome
//! as [`AppEvent`]s. Neither request is retried; the user retries by
//! refreshing or re-expanding.

use crate::app::{DetailRequest, ListRequest};
use crate::events::AppEvent;
use crate::server::client::ExperimentSource;
use tokio::sync::mpsc;

pub async fn request_experiment_list(
    source: &dyn ExperimentSource,
    request: ListRequest,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    tracing::info!(
        "requesting experiment list (generation {}, project {}, mask {})",
        request.generation,
        request.project,
        request.mask
    );
    let result = source.fetch_list(&request.project, &request.mask).await;
    match &result {
        Ok(fragments) => tracing::info!(
            "generation {}: {} experiment fragments",
            request.generation,
            fragments.len()
        ),
        Err(e) => tracing::warn!("generation {}: list request failed: {e}", request.generation),
    }
    if tx
        .send(AppEvent::ListResult {
            generation: request.generation,
            result,
        })
        .is_err()
    {
        tracing::warn!("experiment list: channel closed");
    }
}

pub async fn load_experiment_detail(
    source: &dyn ExperimentSource,
    request: DetailRequest,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    tracing::info!("loading detail for experiment {}", request.xid);
    let result = source.fetch_detail(&request.xid, &request.project).await;
    if let Err(e) = &result {
        tracing::warn!("detail for experiment {} failed: {e}", request.xid);
    }
    if tx.send(AppEvent::DetailResult { request, result }).is_err() {
        tracing::warn!("experiment detail: channel closed");
    }
}
