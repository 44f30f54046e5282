// Library exports for the binary and for tests

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod models;
pub mod monitoring;
pub mod resolver;
pub mod web;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use client::ApiClient;
use config::Settings;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub client: ApiClient,
}

impl AppState {
    pub fn new(settings: Settings, client: ApiClient) -> Self {
        Self {
            settings: Arc::new(settings),
            client,
        }
    }
}
