use tracker_app::Result;
use tracker_core::MetricsResponse;

use crate::{AppContext, HealthResponse, MetricsRequest, TrackRequest, TrackResponse};

pub async fn metrics(ctx: &AppContext, req: MetricsRequest) -> Result<MetricsResponse> {
    ctx.app_state.services.metrics.metrics(&req.into()).await
}

pub async fn track(ctx: &AppContext, req: TrackRequest) -> Result<TrackResponse> {
    let written = ctx.app_state.services.ingest.track(&req).await?;
    tracing::info!(records = written, "tracked usage batch");
    Ok(TrackResponse { success: true })
}

pub async fn health(ctx: &AppContext) -> Result<HealthResponse> {
    ctx.app_state.health().await?;
    Ok(HealthResponse {
        ok: true,
        backend: ctx.app_state.backend_name(),
    })
}
