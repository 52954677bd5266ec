//! Core library for the `weather` search tool.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weatherapi.com client behind the [`WeatherProvider`] trait
//! - The [`ResultController`] that publishes loading/success/error states
//!
//! It is used by `weather-cli`, but any front end that can watch a
//! `tokio::sync::watch` channel can render from it.

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod provider;

pub use config::Config;
pub use controller::{Published, ResultController, wait_for_terminal};
pub use error::FetchError;
pub use model::{Condition, Current, FetchResult, Location, WeatherRecord};
pub use provider::{WeatherApiProvider, WeatherProvider};
