//! Fixed spacing between outgoing metadata requests.
//!
//! Every lookup that reached the network is followed by a pause of the
//! configured length. Cache hits and disabled sources never pause.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct CallThrottle {
    delay: Duration,
}

impl CallThrottle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Wait out the inter-call delay after a network call.
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tracing::trace!(delay_ms = self.delay.as_millis() as u64, "throttling");
            tokio::time::sleep(self.delay).await;
        }
    }
}
