use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use kitchen_flow::collaborators::CurrentUser;
use kitchen_flow::domain::delivery::GeoPoint;
use kitchen_flow::domain::order::{Collaborators, NewOrder, OrderItem, OrderTotals, OrderType};
use kitchen_flow::metrics::{self, Metrics};
use kitchen_flow::utils::{retry_on_transient, RetryConfig, SystemClock};
use kitchen_flow::{FulfillmentConfig, FulfillmentService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, crate at DEBUG; RUST_LOG overrides
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kitchen_flow=debug"))
        )
        .init();

    tracing::info!("🚀 Starting kitchen flow demo");

    // === 1. Configuration ===
    let config = FulfillmentConfig::from_env()?;
    config.validate()?;
    tracing::info!(
        lock_timeout_ms = config.lock_timeout_ms,
        average_speed_kmh = config.average_speed_kmh,
        payment_trigger = ?config.payment_trigger,
        "Configuration loaded"
    );

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let server_metrics = metrics.clone();
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        actix_web::rt::System::new().block_on(async {
            if let Err(e) = metrics::start_metrics_server(server_metrics, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 3. Fulfillment core ===
    let service = FulfillmentService::new(config, Collaborators::default(), Arc::new(SystemClock), metrics);

    let restaurant_id = Uuid::new_v4();
    let staff = CurrentUser::new(Uuid::new_v4()).at_restaurant(restaurant_id);
    let partner = CurrentUser::new(Uuid::new_v4()).with_role("delivery_partner");

    // === 4. Walk one delivery order end to end ===
    let order = service
        .register_order(
            &staff,
            NewOrder {
                restaurant_id,
                customer_id: Uuid::new_v4(),
                order_type: OrderType::Delivery,
                items: vec![
                    OrderItem {
                        id: Uuid::new_v4(),
                        name: "Margherita pizza".to_string(),
                        quantity: 1,
                        unit_price_cents: 1200,
                        modifiers: vec!["extra basil".to_string()],
                        special_instructions: None,
                    },
                    OrderItem {
                        id: Uuid::new_v4(),
                        name: "Caesar salad".to_string(),
                        quantity: 1,
                        unit_price_cents: 800,
                        modifiers: vec![],
                        special_instructions: Some("dressing on the side".to_string()),
                    },
                ],
                totals: OrderTotals {
                    subtotal_cents: 2000,
                    tax_cents: 160,
                    delivery_fee_cents: 300,
                    discount_cents: 0,
                    total_cents: 2460,
                },
                priority: 0,
                destination: Some(GeoPoint::new(40.7306, -73.9352)?),
                notes: None,
            },
        )
        .await?;
    tracing::info!("✅ Order registered: {}", order.id);

    // Busy/Timeout are the only retryable rejections
    retry_on_transient(RetryConfig::conservative(), |_| service.confirm(&staff, order.id))
        .await
        .into_result()?;

    let order = service.start_preparation(&staff, order.id, 20, vec![]).await?;
    for item in order.kitchen.items() {
        service.start_item(&staff, item.id, Some(staff.id), Some("pass".to_string())).await?;
        service.complete_item(&staff, item.id, None).await?;
    }
    service.mark_ready(&staff, order.id).await?;
    tracing::info!("🍳 Kitchen finished order {}", order.id);

    let assignment = service.assign_delivery(&staff, order.id, partner.id, 25, None).await?;
    service.accept_delivery(&partner, assignment.id).await?;
    service.pick_up(&partner, assignment.id, Some(GeoPoint::new(40.7128, -74.0060)?)).await?;
    let assignment = service.update_location(&partner, assignment.id, 40.7200, -73.9800, Some(2.5)).await?;
    tracing::info!(
        "🛵 {:.1} km to go, about {} minutes",
        assignment.distance_remaining_km.unwrap_or_default(),
        assignment.estimated_minutes_remaining.unwrap_or_default()
    );

    service.deliver(&partner, assignment.id, None, Some("J. Doe".to_string()), None).await?;
    service.complete(&staff, order.id).await?;

    // === 5. Report ===
    let snapshot = service.snapshot(&staff, order.id).await?;
    for event in &snapshot.timeline {
        tracing::info!(
            "{} {} ({})",
            event.icon(),
            event.title,
            event.display_time(service.now())
        );
    }
    tracing::info!("{}", serde_json::to_string_pretty(&snapshot.live)?);

    tracing::info!("🎉 Demo complete!");

    Ok(())
}
