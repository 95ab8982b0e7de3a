//! Test helpers for PromptGate integration tests.
//!
//! - spawning a service on an ephemeral port
//! - a spy answer pipeline that records what reached it

#![allow(unused_imports)] // Not every test file uses every helper

pub mod mock_answer;

pub use mock_answer::*;

use std::net::SocketAddr;

use axum::Router;
use promptgate_core::config::ServiceConfig;
use tokio::net::TcpListener;

/// Serve `router` on 127.0.0.1 with an OS-assigned port.
pub async fn spawn_app(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Base URL for `addr`.
pub fn url(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

/// Default configuration with every peer pointed at `addr`.
pub fn config_with_peers(
    pdp: SocketAddr,
    pep: SocketAddr,
    rag: SocketAddr,
    aims: SocketAddr,
) -> ServiceConfig {
    ServiceConfig {
        pdp_url: url(pdp),
        pep_url: url(pep),
        rag_url: url(rag),
        aims_url: url(aims),
        version: "test".to_string(),
        ..ServiceConfig::default()
    }
}
