//! Shared helpers for lifecycle integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use graceful_server::{HttpServer, Server, ServerError, ServerHandle};

/// Start `server` on an ephemeral loopback port and wait until it is listening.
pub async fn spawn_server(
    server: &Arc<HttpServer>,
) -> (JoinHandle<Result<(), ServerError>>, SocketAddr) {
    let task = tokio::spawn({
        let server = Arc::clone(server);
        async move { server.start("127.0.0.1:0").await }
    });

    let addr = tokio::time::timeout(Duration::from_secs(5), server.handle().listening())
        .await
        .expect("server did not start listening")
        .expect("listener failed or closed before it came up");
    (task, addr)
}

/// Poll until `count` requests are in flight.
#[allow(dead_code)]
pub async fn wait_for_in_flight(handle: &ServerHandle, count: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.in_flight() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("requests never arrived");
}

/// Await the serving task and return what `start` returned.
pub async fn join_start(
    task: JoinHandle<Result<(), ServerError>>,
    within: Duration,
) -> Result<(), ServerError> {
    tokio::time::timeout(within, task)
        .await
        .expect("start did not return in time")
        .expect("serving task panicked")
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
