//! Shared utilities for integration tests.

use std::net::SocketAddr;

use swift_api::client::ApiClient;
use swift_api::{ApiDefinition, ApiServer, Shutdown};
use tokio::net::TcpListener;

/// Serve `server` on an ephemeral local port.
pub async fn spawn_server(server: ApiServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.signal();
    tokio::spawn(async move {
        let _ = server.serve(listener, signal).await;
    });

    (addr, shutdown)
}

pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

/// Plain HTTP client that bypasses any proxy settings from the environment.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[allow(dead_code)]
pub fn api_client(api: ApiDefinition, addr: SocketAddr) -> ApiClient {
    ApiClient::builder(api)
        .base_url(base_url(addr))
        .http_client(http_client())
        .build()
        .unwrap()
}
