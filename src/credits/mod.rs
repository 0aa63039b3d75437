//! Daily credit metering.

pub mod clock;
pub mod config;
pub mod fallback;
pub mod ledger;
pub mod record;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::config::LedgerConfig;
pub use self::fallback::LocalFallback;
pub use self::ledger::{DebitOutcome, Ledger};
pub use self::record::{CreditRecord, Credits, Feature};
