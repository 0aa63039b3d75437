//! Identity provider adapters.

pub mod firebase;
pub mod memory;

pub use self::firebase::FirebaseIdentityProvider;
pub use self::memory::MemoryIdentityProvider;
