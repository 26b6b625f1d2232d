//! Skips mock-vendor tests where localhost sockets cannot be bound.

use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

/// Set to make an unbindable localhost a failure instead of a skip.
const REQUIRE_SOCKETS_VAR: &str = "PARTSYNC_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_SOCKETS_VAR).is_ok_and(|value| matches!(value.as_str(), "1" | "true"))
}

/// Starts a mock vendor, or returns `None` (after saying so) when the
/// sandbox forbids listening sockets.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
    let caller = Location::caller();
    let bindable = TcpListener::bind("127.0.0.1:0").is_ok();

    async move {
        if bindable {
            return Some(MockServer::start().await);
        }
        assert!(
            !sockets_required(),
            "mock vendor unavailable at {caller}: cannot bind 127.0.0.1 ({REQUIRE_SOCKETS_VAR} is set)"
        );
        eprintln!("skipping mock vendor test at {caller}: cannot bind 127.0.0.1");
        None
    }
}
