use crate::{FetchError, WeatherRecord};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod weatherapi;

pub use weatherapi::WeatherApiProvider;

/// Source of current conditions for a free-text location query.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, query: &str) -> Result<WeatherRecord, FetchError>;
}
