//! Session-wide signals: current identity, credits, readiness, login prompt.
//!
//! Each signal is a `watch` channel so UI layers can subscribe; the session
//! keeps the senders and mutates them through the methods below.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::admin::AdminPolicy;
use super::identity::Identity;
use crate::credits::{Credits, Feature};

/// Why a debit was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebitRefused {
    Exhausted,
    IdentityChanged,
}

/// Whether the credits signal reflects the current identity yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    SignedOut,
    Resolving,
    Ready,
}

pub struct SessionState {
    admin: AdminPolicy,
    identity: watch::Sender<Option<Identity>>,
    credits: watch::Sender<Credits>,
    readiness: watch::Sender<Readiness>,
    login_prompt: watch::Sender<bool>,
    // Bumped on every identity transition; guards stale resolutions.
    epoch: Mutex<u64>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("identity", &*self.identity.borrow())
            .field("credits", &*self.credits.borrow())
            .field("readiness", &*self.readiness.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionState {
    #[must_use]
    pub fn new(admin: AdminPolicy) -> Self {
        Self {
            admin,
            identity: watch::channel(None).0,
            credits: watch::channel(Credits::zero()).0,
            readiness: watch::channel(Readiness::SignedOut).0,
            login_prompt: watch::channel(false).0,
            epoch: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn admin(&self) -> &AdminPolicy {
        &self.admin
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    #[must_use]
    pub fn credits(&self) -> Credits {
        *self.credits.borrow()
    }

    #[must_use]
    pub fn readiness(&self) -> Readiness {
        *self.readiness.borrow()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.borrow().is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.identity
            .borrow()
            .as_ref()
            .is_some_and(|identity| self.admin.is_admin(identity))
    }

    #[must_use]
    pub fn login_prompt(&self) -> bool {
        *self.login_prompt.borrow()
    }

    pub fn set_login_prompt(&self, show: bool) {
        self.login_prompt.send_replace(show);
    }

    #[must_use]
    pub fn subscribe_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    #[must_use]
    pub fn subscribe_credits(&self) -> watch::Receiver<Credits> {
        self.credits.subscribe()
    }

    #[must_use]
    pub fn subscribe_readiness(&self) -> watch::Receiver<Readiness> {
        self.readiness.subscribe()
    }

    #[must_use]
    pub fn subscribe_login_prompt(&self) -> watch::Receiver<bool> {
        self.login_prompt.subscribe()
    }

    /// Switches to `identity` and returns the epoch a resolution must
    /// present to publish its credits. Signing out zeroes the credits.
    pub(crate) fn begin(&self, identity: Option<Identity>) -> u64 {
        let mut epoch = self.epoch.lock();
        *epoch += 1;

        let signed_in = identity.is_some();
        self.identity.send_replace(identity);
        if signed_in {
            self.readiness.send_replace(Readiness::Resolving);
            self.login_prompt.send_replace(false);
        } else {
            self.credits.send_replace(Credits::zero());
            self.readiness.send_replace(Readiness::SignedOut);
        }

        *epoch
    }

    /// Current epoch and identity, read together.
    pub(crate) fn current(&self) -> (u64, Option<Identity>) {
        let epoch = self.epoch.lock();
        (*epoch, self.identity.borrow().clone())
    }

    /// Publishes resolved credits unless the identity changed meanwhile.
    pub(crate) fn publish(&self, epoch: u64, credits: Credits) -> bool {
        let current = self.epoch.lock();
        if *current != epoch {
            return false;
        }
        self.credits.send_replace(credits);
        self.readiness.send_replace(Readiness::Ready);
        true
    }

    /// Replaces the identity value without re-resolving (same uid, e.g. a
    /// display-name update).
    pub(crate) fn refresh_identity(&self, identity: Identity) {
        self.identity.send_if_modified(|current| match current {
            Some(existing) if existing.uid == identity.uid => {
                let mut next = identity;
                if next.display_name.is_none() {
                    next.display_name = existing.display_name.clone();
                }
                if *existing == next {
                    false
                } else {
                    *existing = next;
                    true
                }
            }
            _ => false,
        });
    }

    /// Decrements `feature` if it is positive and `epoch` is still current.
    /// Returns the new value and the post-debit snapshot.
    pub(crate) fn try_debit(
        &self,
        feature: Feature,
        epoch: u64,
    ) -> Result<(i64, Credits), DebitRefused> {
        let current = self.epoch.lock();
        if *current != epoch {
            return Err(DebitRefused::IdentityChanged);
        }

        let mut debited = Err(DebitRefused::Exhausted);
        self.credits.send_if_modified(|credits| {
            let value = credits.get(feature);
            if value <= 0 {
                return false;
            }
            credits.set(feature, value - 1);
            debited = Ok((value - 1, *credits));
            true
        });
        debited
    }

    /// Waits until no resolution is in flight. `None` if `wait` elapses first.
    pub(crate) async fn settled(&self, wait: Duration) -> Option<Readiness> {
        let mut readiness = self.readiness.subscribe();
        let settled = tokio::time::timeout(
            wait,
            readiness.wait_for(|state| *state != Readiness::Resolving),
        )
        .await
        .ok()?;
        settled.ok().map(|state| *state)
    }
}
