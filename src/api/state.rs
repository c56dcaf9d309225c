use crate::application::AggregationService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub aggregation_service: Arc<AggregationService>,
    pub metrics: PrometheusHandle,
    /// Reported by `/health`
    pub upstream_base_url: String,
}
