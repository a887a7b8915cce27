//! Test utilities for HTTP-level tests.

use std::sync::Arc;

use axum_test::TestServer;

use crate::{
    AppState, build_router,
    config::Config,
    db::MemoryStore,
    payment_providers::{PaymentProvider, dummy::DummyProvider},
    pricing::{StaticCatalog, test_support::tea_shop},
};

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.storefront_url = "http://shop.test".to_string();
    config
}

/// App state over a memory store and the tea shop catalog
pub fn state_with_provider(payment_provider: Option<Arc<dyn PaymentProvider>>) -> AppState {
    AppState::builder()
        .config(create_test_config())
        .store(Arc::new(MemoryStore::new()))
        .catalog(Arc::new(StaticCatalog(tea_shop())))
        .maybe_payment_provider(payment_provider)
        .build()
}

/// App state backed by the dummy provider, returned alongside it so tests can settle sessions
pub fn dummy_state(auto_complete: bool) -> (AppState, Arc<DummyProvider>) {
    let provider = Arc::new(DummyProvider::new(auto_complete));
    (state_with_provider(Some(provider.clone())), provider)
}

pub fn state_without_provider() -> AppState {
    state_with_provider(None)
}

pub fn create_test_server(state: AppState) -> TestServer {
    let router = build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}
