use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use super::Metrics;

/// Serve `/metrics` and `/health` for the fulfillment core.
/// Runs its own actix system, so call it from a dedicated thread.
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> std::io::Result<()> {
    tracing::info!("📊 Starting metrics server on http://0.0.0.0:{}/metrics", port);

    HttpServer::new(move || App::new().configure(routes(metrics.clone())))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}

fn routes(metrics: Arc<Metrics>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::from(metrics))
            .route("/metrics", web::get().to(metrics_handler))
            .route("/health", web::get().to(health_handler));
    }
}

async fn metrics_handler(metrics: web::Data<Metrics>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

async fn health_handler(metrics: web::Data<Metrics>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "kitchen-flow",
        "active_deliveries": metrics.active_deliveries.get(),
        "lock_timeouts": metrics.lock_timeouts.get(),
    }))
}
