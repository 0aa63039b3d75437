//! # Limva (session and credit metering)
//!
//! `limva` is the client-side session layer of the Limva exam tools. It signs
//! users in against an identity provider, keeps a per-user daily credit quota
//! for the two metered features (grading and exam generation), and persists
//! that quota to a remote document store with a device-local fallback.
//!
//! ## Credit Ledger
//!
//! Every user gets a daily allotment per feature. The remote document is
//! authoritative whenever it is reachable; the local store is only consulted
//! when the remote call fails. The two copies are eventually consistent and
//! local writes are never replayed to the remote store.
//!
//! - **Lazy reset:** a record whose `lastReset` is not today is reset to the
//!   full allotment on the next resolution.
//! - **Optimistic debit:** consuming a credit decrements the in-memory quota
//!   first; the decrement is never rolled back, even when both stores fail.
//! - **Readiness gate:** consumption waits for the quota of the current
//!   identity to be resolved before reading it.
//!
//! ## Administrator
//!
//! One configured label is exempt from metering. When its login fails with a
//! missing-account or ambiguous-credential error and the secret matches the
//! configured one exactly, the account is recreated on the spot.

pub mod cli;
pub mod credits;
pub mod identity;
pub mod session;
pub mod stats;
pub mod store;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
