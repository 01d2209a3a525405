use cafe_hub::workflows::lifecycle::{
    InMemoryLifecycleStore, LifecycleService, Notification, NotificationError,
    NotificationPublisher, RetryPolicy,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type ApiService =
    LifecycleService<InMemoryLifecycleStore, InMemoryLifecycleStore, TracingNotificationPublisher>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stand-in for the e-mail and SMS senders: records each dispatch in the log.
#[derive(Debug, Default, Clone)]
pub(crate) struct TracingNotificationPublisher;

impl NotificationPublisher for TracingNotificationPublisher {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            recipient = %notification.recipient,
            details = ?notification.details,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Wires one process-local store into both repositories of the lifecycle service.
pub(crate) fn build_service(retry: RetryPolicy) -> (Arc<ApiService>, Arc<InMemoryLifecycleStore>) {
    let store = Arc::new(InMemoryLifecycleStore::default());
    let service = LifecycleService::new(
        store.clone(),
        store.clone(),
        Arc::new(TracingNotificationPublisher),
        retry,
    );
    (Arc::new(service), store)
}
