use std::time::Duration;

use tokio::time::Instant;

use crate::http::connection::ActivityFlags;

/// Idle deadline for one connection.
///
/// The deadline moves forward whenever the connection reports activity
/// through its [`ActivityFlags`].
#[derive(Debug)]
pub struct IdleTimer {
    timeout: Duration,
    deadline: Instant,
}

impl IdleTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Consumes both activity markers and pushes the deadline out if
    /// either was set.
    pub fn observe(&mut self, flags: &mut ActivityFlags) -> bool {
        let active = flags.take_active();
        let improved = flags.take_improved();
        if active || improved {
            self.deadline = Instant::now() + self.timeout;
            return true;
        }
        false
    }

    pub async fn expired(&self) {
        tokio::time::sleep_until(self.deadline).await
    }
}
