use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // System Handlers
        crate::api::handlers::health_handler,
        crate::api::handlers::metrics_handler,
        // Stock Handlers
        crate::api::stock_handlers::list_stocks_handler,
        crate::api::stock_handlers::average_price_handler,
        crate::api::stock_handlers::correlation_handler
    ),
    components(
        schemas(
            crate::api::handlers::HealthResponse,
            crate::api::error::ErrorResponse,
            crate::domain::Tick,
            crate::domain::PriceSeries,
            crate::application::AverageResult,
            crate::application::TickerStats,
            crate::application::CorrelationResult,
            crate::application::TickerListResult
        )
    ),
    tags(
        (name = "system", description = "System endpoints for health checks and metrics"),
        (name = "stocks", description = "Price averages and pairwise correlation over a lookback window")
    ),
    info(
        title = "Stock Statistics Gateway API",
        version = "0.1.0",
        description = "On-demand descriptive statistics (average, standard deviation, Pearson correlation) over tick-level stock price histories from a remote pricing source."
    )
)]
pub struct ApiDoc;
