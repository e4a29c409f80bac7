use common::{fix::Fix, subscription::SubscriptionConfig};
use tracing::trace;

/// Drops fixes that are too close to the last delivered one.
///
/// A fix passes if at least `min_interval` passed since the last delivered
/// fix and it lies at least `min_distance_meters` away from it. Time is taken
/// from the fix timestamps. The first fix always passes, so does a fix with a
/// timestamp before the last one (the source clock was reset).
#[derive(Debug)]
pub struct FixThrottle {
    config: SubscriptionConfig,
    last: Option<Fix>,
}

impl FixThrottle {
    pub fn new(config: SubscriptionConfig) -> Self {
        FixThrottle { config, last: None }
    }

    /// Returns `true` if `fix` shall be delivered and remembers it.
    pub fn admit(&mut self, fix: &Fix) -> bool {
        let Some(last) = &self.last else {
            self.last = Some(*fix);
            return true;
        };
        let elapsed = fix.timestamp() - last.timestamp();
        let distance = last.position().distance_to(&fix.position());
        let passes = match elapsed.to_std() {
            Ok(elapsed) => {
                elapsed >= self.config.min_interval() && distance >= self.config.min_distance_meters()
            }
            Err(_) => true,
        };
        if passes {
            self.last = Some(*fix);
        } else {
            trace!("Fix dropped, {elapsed} and {distance:.2}m since the last one");
        }
        passes
    }
}
