use super::Connection;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Hands out connections, reusing one per address for shared requests.
///
/// Every connection created by the pool stops on [`ConnectionPool::shutdown`].
#[derive(Default)]
pub struct ConnectionPool {
    shared: Mutex<HashMap<String, Connection>>,
    cancel: CancellationToken,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection to `address`. Shared requests for the same address return
    /// clones of one handle; unshared requests always get a new one.
    pub fn connection(&self, address: &str, shared: bool) -> Connection {
        if !shared {
            return Connection::with_cancel(address, self.cancel.child_token());
        }

        self.shared
            .lock()
            .entry(address.to_string())
            .or_insert_with(|| Connection::with_cancel(address, self.cancel.child_token()))
            .clone()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
