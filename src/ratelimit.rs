use governor::{
    Quota, RateLimiter as GovernorRateLimiter,
    clock::{QuantaClock, QuantaInstant},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use nonzero_ext::nonzero;
use std::{num::NonZeroU32, time::Duration};

// The league API is a small community service; keep the crawl gentle.
const REQ_PER_SEC: NonZeroU32 = nonzero!(4u32);
const GAP_BETWEEN_REQ: Duration = Duration::from_millis(250);

type DirectRateLimiter =
    GovernorRateLimiter<NotKeyed, InMemoryState, QuantaClock, NoOpMiddleware<QuantaInstant>>;

/// Caps both the average request rate and the minimum spacing between
/// consecutive requests.
pub struct RateLimiter {
    req_per_sec: DirectRateLimiter,
    gap_between_req: DirectRateLimiter,
}

impl RateLimiter {
    pub fn new() -> Self {
        let req_per_sec = GovernorRateLimiter::direct(Quota::per_second(REQ_PER_SEC));
        let gap_between_req =
            GovernorRateLimiter::direct(Quota::with_period(GAP_BETWEEN_REQ).unwrap());

        RateLimiter {
            req_per_sec,
            gap_between_req,
        }
    }

    pub async fn wait_until_ready(&self) {
        // No more than REQ_PER_SEC calls per second on average.
        self.req_per_sec.until_ready().await;
        // At least GAP_BETWEEN_REQ since the previous caller got through.
        self.gap_between_req.until_ready().await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
