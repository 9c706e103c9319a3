//! Shared helpers for the integration suites

#![allow(dead_code)]

use std::sync::Once;

use apiary::{params, Binding, HttpRequest};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a test-writer subscriber once per binary; `RUST_LOG` filters it
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apiary=debug")))
            .with_test_writer()
            .try_init();
    });
}

/// `GET /numbers?page=N` decoding into `Vec<u32>`
pub fn numbers() -> Binding<Vec<u32>, Vec<u32>> {
    Binding::new()
        .with_name("numbers")
        .with_paginated(true)
        .with_params(|| params!["page", 1, true, "limit", 100])
        .with_request(|cx| {
            let url = format!("/numbers?page={}&limit={}", cx.args[0], cx.args[1]);
            Ok(Box::new(HttpRequest::get(url)))
        })
}
