use carelink::domain::DocumentCategory;
use carelink::integrations::LocalBlobStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) blobs: Arc<LocalBlobStore>,
}

pub(crate) fn parse_category(value: &str) -> Result<DocumentCategory, String> {
    DocumentCategory::parse(value).ok_or_else(|| {
        format!(
            "unknown category '{value}', expected PRIMARY, SECONDARY, WORKING_RIGHTS or SERVICE_QUALIFICATION"
        )
    })
}
