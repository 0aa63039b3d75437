//! Ledger configuration.

use std::time::Duration;

const DEFAULT_DAILY_ALLOTMENT: i64 = 30;
const DEFAULT_UNLIMITED_CREDITS: i64 = 9999;
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RESOLUTION_WAIT: Duration = Duration::from_secs(10);
const DEFAULT_LOCAL_KEY_PREFIX: &str = "limva_credits_";
const DEFAULT_CREDITS_COLLECTION: &str = "users";

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    daily_allotment: i64,
    unlimited_credits: i64,
    remote_timeout: Duration,
    resolution_wait: Duration,
    local_key_prefix: String,
    credits_collection: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            daily_allotment: DEFAULT_DAILY_ALLOTMENT,
            unlimited_credits: DEFAULT_UNLIMITED_CREDITS,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            resolution_wait: DEFAULT_RESOLUTION_WAIT,
            local_key_prefix: DEFAULT_LOCAL_KEY_PREFIX.to_string(),
            credits_collection: DEFAULT_CREDITS_COLLECTION.to_string(),
        }
    }
}

impl LedgerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_daily_allotment(mut self, credits: i64) -> Self {
        self.daily_allotment = credits.max(0);
        self
    }

    #[must_use]
    pub fn with_unlimited_credits(mut self, credits: i64) -> Self {
        self.unlimited_credits = credits;
        self
    }

    #[must_use]
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_resolution_wait(mut self, wait: Duration) -> Self {
        self.resolution_wait = wait;
        self
    }

    #[must_use]
    pub fn with_local_key_prefix(mut self, prefix: String) -> Self {
        self.local_key_prefix = prefix;
        self
    }

    #[must_use]
    pub fn with_credits_collection(mut self, collection: String) -> Self {
        self.credits_collection = collection;
        self
    }

    #[must_use]
    pub fn daily_allotment(&self) -> i64 {
        self.daily_allotment
    }

    /// Value shown to the administrator, who is never metered.
    #[must_use]
    pub fn unlimited_credits(&self) -> i64 {
        self.unlimited_credits
    }

    #[must_use]
    pub fn remote_timeout(&self) -> Duration {
        self.remote_timeout
    }

    #[must_use]
    pub fn resolution_wait(&self) -> Duration {
        self.resolution_wait
    }

    #[must_use]
    pub fn credits_collection(&self) -> &str {
        &self.credits_collection
    }

    /// Local store key holding the credit blob of `uid`.
    #[must_use]
    pub fn local_key(&self, uid: &str) -> String {
        format!("{}{uid}", self.local_key_prefix)
    }
}
