//! Single "latest result" slot observed by the presentation layer.
//!
//! Every [`ResultController::fetch_weather`] call publishes
//! [`FetchResult::Loading`] before it returns, then resolves to exactly one
//! terminal state. Only the newest call may publish its terminal state: a
//! generation counter, advanced under the slot's lock, identifies it.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{sync::watch, task::JoinHandle};
use tracing::{info, instrument, warn};

use crate::{FetchResult, WeatherProvider, config::DEFAULT_QUERY};

/// Published slot; `None` until the first fetch starts.
pub type Published = Option<FetchResult>;

#[derive(Debug, Clone)]
pub struct ResultController {
    provider: Arc<dyn WeatherProvider>,
    state: Arc<watch::Sender<Published>>,
    generation: Arc<AtomicU64>,
    default_query: String,
}

impl ResultController {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        let (state, _) = watch::channel(None);

        Self {
            provider,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            default_query: DEFAULT_QUERY.to_string(),
        }
    }

    /// Query used by [`Self::fetch_default_if_unset`].
    pub fn with_default_query(mut self, query: impl Into<String>) -> Self {
        self.default_query = query.into();
        self
    }

    /// Publish `Loading` and start fetching `query` on the current tokio runtime.
    ///
    /// The returned handle completes once the fetch has resolved; dropping it
    /// does not cancel the fetch.
    pub fn fetch_weather(&self, query: &str) -> JoinHandle<()> {
        let mut generation = 0;
        self.state.send_modify(|slot| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *slot = Some(FetchResult::Loading);
        });

        let this = self.clone();
        let query = query.to_string();
        tokio::spawn(async move { this.resolve(generation, query).await })
    }

    #[instrument(skip(self))]
    async fn resolve(&self, generation: u64, query: String) {
        let result = match self.provider.fetch(&query).await {
            Ok(record) => {
                info!(location = %record.location.name, "weather fetched");
                FetchResult::Success(record)
            }
            Err(err) => {
                warn!(error = %err, "weather fetch failed");
                FetchResult::Error(err.to_string())
            }
        };

        let published = self.state.send_if_modified(|slot| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *slot = Some(result);
            true
        });

        if !published {
            warn!("discarding result of superseded fetch");
        }
    }

    /// Issue the default query when nothing has been published yet.
    pub fn fetch_default_if_unset(&self) -> Option<JoinHandle<()>> {
        if self.state.borrow().is_some() {
            return None;
        }
        Some(self.fetch_weather(&self.default_query))
    }

    pub fn current_result(&self) -> Published {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.state.subscribe()
    }
}

/// Wait until `rx` holds a terminal result and return it.
///
/// Returns `None` if the controller was dropped first.
pub async fn wait_for_terminal(rx: &mut watch::Receiver<Published>) -> Option<FetchResult> {
    let slot = rx
        .wait_for(|slot| slot.as_ref().is_some_and(FetchResult::is_terminal))
        .await
        .ok()?;
    slot.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        FetchError,
        model::{Condition, Current, Location, WeatherRecord},
    };
    use async_trait::async_trait;
    use std::{collections::HashMap, sync::Mutex};
    use tokio::sync::oneshot;

    type Reply = Result<WeatherRecord, FetchError>;

    /// Provider whose replies are released by the test, one gate per query.
    #[derive(Debug, Default)]
    struct GatedProvider {
        gates: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
    }

    impl GatedProvider {
        fn gate(&self, query: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(query.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl WeatherProvider for GatedProvider {
        async fn fetch(&self, query: &str) -> Result<WeatherRecord, FetchError> {
            let rx = self.gates.lock().unwrap().remove(query);
            match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(FetchError::Transport("gate dropped".into()))),
                None => Err(FetchError::Transport(format!("no gate for {query}"))),
            }
        }
    }

    fn record(name: &str, temp_c: f64) -> WeatherRecord {
        WeatherRecord {
            location: Location {
                name: name.into(),
                country: "Somewhere".into(),
                localtime: "2024-03-01 14:05".into(),
            },
            current: Current {
                temp_c,
                condition: Condition {
                    text: "Cloudy".into(),
                    icon: "//cdn.weatherapi.com/weather/64x64/day/119.png".into(),
                },
                humidity: "82".into(),
                wind_kph: "13.7".into(),
                pressure_in: "30.01".into(),
                uv: "3.0".into(),
            },
        }
    }

    fn controller() -> (Arc<GatedProvider>, ResultController) {
        let provider = Arc::new(GatedProvider::default());
        let controller = ResultController::new(provider.clone());
        (provider, controller)
    }

    #[tokio::test]
    async fn starts_unset() {
        let (_, controller) = controller();
        assert_eq!(controller.current_result(), None);
    }

    #[tokio::test]
    async fn loading_is_published_before_success() {
        let (provider, controller) = controller();
        let gate = provider.gate("London");

        let handle = controller.fetch_weather("London");
        assert_eq!(controller.current_result(), Some(FetchResult::Loading));

        gate.send(Ok(record("London", 15.0))).unwrap();
        handle.await.unwrap();

        assert_eq!(
            controller.current_result(),
            Some(FetchResult::Success(record("London", 15.0)))
        );
    }

    #[tokio::test]
    async fn failure_publishes_error_message() {
        let (provider, controller) = controller();
        let gate = provider.gate("Atlantis");

        let handle = controller.fetch_weather("Atlantis");
        assert_eq!(controller.current_result(), Some(FetchResult::Loading));

        gate.send(Err(FetchError::Transport("status 404".into()))).unwrap();
        handle.await.unwrap();

        assert_eq!(controller.current_result(), Some(FetchResult::Error("status 404".into())));
    }

    #[tokio::test]
    async fn subscriber_sees_loading_then_one_terminal_state() {
        let (provider, controller) = controller();
        let mut rx = controller.subscribe();
        let gate = provider.gate("London");

        let handle = controller.fetch_weather("London");
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(FetchResult::Loading));

        gate.send(Ok(record("London", 15.0))).unwrap();
        handle.await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().as_ref().is_some_and(FetchResult::is_terminal));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn last_request_wins() {
        let (provider, controller) = controller();
        let paris = provider.gate("Paris");
        let tokyo = provider.gate("Tokyo");

        let first = controller.fetch_weather("Paris");
        let second = controller.fetch_weather("Tokyo");

        tokyo.send(Ok(record("Tokyo", 21.0))).unwrap();
        second.await.unwrap();
        paris.send(Ok(record("Paris", 9.0))).unwrap();
        first.await.unwrap();

        assert_eq!(
            controller.current_result(),
            Some(FetchResult::Success(record("Tokyo", 21.0)))
        );
    }

    #[tokio::test]
    async fn stale_result_does_not_replace_loading() {
        let (provider, controller) = controller();
        let paris = provider.gate("Paris");
        let _tokyo = provider.gate("Tokyo");

        let first = controller.fetch_weather("Paris");
        let _second = controller.fetch_weather("Tokyo");

        paris.send(Ok(record("Paris", 9.0))).unwrap();
        first.await.unwrap();

        assert_eq!(controller.current_result(), Some(FetchResult::Loading));
    }

    #[tokio::test]
    async fn default_query_only_when_unset() {
        let (provider, controller) = controller();
        let gate = provider.gate(DEFAULT_QUERY);

        let handle = controller.fetch_default_if_unset().expect("slot is unset");
        gate.send(Ok(record("New Delhi", 31.0))).unwrap();
        handle.await.unwrap();

        assert!(controller.fetch_default_if_unset().is_none());
        assert_eq!(
            controller.current_result(),
            Some(FetchResult::Success(record("New Delhi", 31.0)))
        );
    }

    #[tokio::test]
    async fn custom_default_query() {
        let provider = Arc::new(GatedProvider::default());
        let controller = ResultController::new(provider.clone()).with_default_query("Oslo");
        let gate = provider.gate("Oslo");

        let handle = controller.fetch_default_if_unset().unwrap();
        gate.send(Ok(record("Oslo", -2.0))).unwrap();
        handle.await.unwrap();

        assert_eq!(
            controller.current_result(),
            Some(FetchResult::Success(record("Oslo", -2.0)))
        );
    }

    #[tokio::test]
    async fn wait_for_terminal_skips_loading() {
        let (provider, controller) = controller();
        let mut rx = controller.subscribe();
        let gate = provider.gate("London");

        let _handle = controller.fetch_weather("London");
        gate.send(Ok(record("London", 15.0))).unwrap();

        let result = wait_for_terminal(&mut rx).await;
        assert_eq!(result, Some(FetchResult::Success(record("London", 15.0))));
    }
}
