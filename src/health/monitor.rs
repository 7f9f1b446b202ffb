//! Periodic health monitoring.
//!
//! # Responsibilities
//! - Probe the backend on an interval
//! - Publish healthy/unhealthy transitions on a watch channel

use tokio::sync::{broadcast, watch};
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::probe::probe;
use crate::health::state::{HealthState, HealthTracker};
use crate::http::client::ResilientClient;
use crate::http::transport::HttpTransport;

pub struct HealthMonitor<T: HttpTransport> {
    client: ResilientClient<T>,
    config: HealthCheckConfig,
    tracker: HealthTracker,
    state: watch::Sender<HealthState>,
}

impl<T: HttpTransport> HealthMonitor<T> {
    pub fn new(client: ResilientClient<T>, config: HealthCheckConfig) -> Self {
        let tracker = HealthTracker::new(config.healthy_threshold, config.unhealthy_threshold);
        let (state, _) = watch::channel(HealthState::Unknown);
        Self {
            client,
            config,
            tracker,
            state,
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.state.subscribe()
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn check(&mut self) {
        let healthy = probe(&self.client, &self.config.path).await;
        if let Some(state) = self.tracker.record(healthy) {
            tracing::info!(state = %state, base_url = %self.client.config().base_url, "Backend health changed");
            self.state.send_replace(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures_util::FutureExt;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;

    use super::*;
    use crate::config::{CircuitBreakerConfig, HttpConfig};
    use crate::health::probe::check_health;
    use crate::http::error::TransportError;
    use crate::http::request::HttpRequest;
    use crate::http::response::ResponseHead;

    #[derive(Default)]
    struct Statuses {
        queue: Mutex<VecDeque<u16>>,
        paths: Mutex<Vec<String>>,
    }

    impl HttpTransport for Arc<Statuses> {
        fn send(&self, request: HttpRequest) -> impl Future<Output = Result<ResponseHead, TransportError>> + Send {
            self.paths.lock().unwrap().push(request.url.path().to_string());
            let status = self.queue.lock().unwrap().pop_front();
            async move {
                match status {
                    Some(code) => Ok(ResponseHead {
                        status: StatusCode::from_u16(code).unwrap(),
                        headers: HeaderMap::new(),
                        body: async { Ok(Vec::new()) }.boxed(),
                    }),
                    None => Err(TransportError::Connect("refused".into())),
                }
            }
        }
    }

    fn client(statuses: &[u16]) -> (ResilientClient<Arc<Statuses>>, Arc<Statuses>) {
        let transport = Arc::new(Statuses {
            queue: Mutex::new(statuses.iter().copied().collect()),
            ..Default::default()
        });
        let http = HttpConfig {
            max_retries: 0,
            ..HttpConfig::default()
        };
        let breaker = CircuitBreakerConfig {
            failure_threshold: 100,
            ..CircuitBreakerConfig::default()
        };
        let client = ResilientClient::with_transport(transport.clone(), http, &breaker).unwrap();
        (client, transport)
    }

    #[tokio::test]
    async fn check_health_maps_outcomes_to_bool() {
        let (client, transport) = client(&[200, 503, 404]);
        assert!(check_health(&client).await);
        assert!(!check_health(&client).await);
        assert!(!check_health(&client).await);
        // Queue exhausted: connection refused.
        assert!(!check_health(&client).await);
        assert!(transport.paths.lock().unwrap().iter().all(|p| p == "/health"));
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_publishes_transitions_until_shutdown() {
        let (client, _) = client(&[200, 200, 500, 500, 500]);
        let config = HealthCheckConfig {
            interval_secs: 1,
            healthy_threshold: 2,
            unhealthy_threshold: 3,
            ..HealthCheckConfig::default()
        };
        let monitor = HealthMonitor::new(client, config);
        let mut state = monitor.subscribe();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(monitor.run(shutdown_rx));

        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), HealthState::Healthy);
        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), HealthState::Unhealthy);

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn disabled_monitor_returns_immediately() {
        let (client, transport) = client(&[]);
        let config = HealthCheckConfig {
            enabled: false,
            ..HealthCheckConfig::default()
        };
        let (_tx, rx) = broadcast::channel(1);
        HealthMonitor::new(client, config).run(rx).await;
        assert!(transport.paths.lock().unwrap().is_empty());
    }
}
