#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use limva::credits::{CreditRecord, FixedClock, LedgerConfig};
use limva::identity::MemoryIdentityProvider;
use limva::session::{AdminPolicy, Session};
use limva::store::{
    BackendError, Document, DocumentBackend, Fields, LocalStore, LocalStoreError,
    MemoryDocumentStore, MemoryLocalStore, Query,
};
use secrecy::SecretString;

pub const ADMIN_LABEL: &str = "admin@limva.edu.vn";
pub const ADMIN_SECRET: &str = "admin-test-secret";
pub const STUDENT: &str = "hocsinh@limva.edu.vn";
pub const STUDENT_SECRET: &str = "hocsinh-123";

pub fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

pub fn today() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-10-18T09:00:00+07:00").expect("valid timestamp")
}

pub fn yesterday() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-10-17T21:00:00+07:00").expect("valid timestamp")
}

pub fn admin_policy() -> AdminPolicy {
    AdminPolicy::default().with_secret(secret(ADMIN_SECRET))
}

/// Memory backend that can be switched to fail every call.
#[derive(Default)]
pub struct FlakyBackend {
    pub inner: MemoryDocumentStore,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let backend = Self::default();
        backend.set_failing(true);
        backend
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(BackendError::PermissionDenied("rules rejected".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn record(&self, uid: &str) -> Option<CreditRecord> {
        let document = self.inner.get("users", uid).await.ok()??;
        CreditRecord::from_fields(&document.fields).ok()
    }
}

#[async_trait]
impl DocumentBackend for FlakyBackend {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        self.check()?;
        self.inner.get(collection, id).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), BackendError> {
        self.check()?;
        self.inner.set(collection, id, fields, merge).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), BackendError> {
        self.check()?;
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        self.check()?;
        self.inner.delete(collection, id).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, BackendError> {
        self.check()?;
        self.inner.query(collection, query).await
    }
}

/// Backend that never answers within any sane timeout.
pub struct HangingBackend;

#[async_trait]
impl DocumentBackend for HangingBackend {
    async fn get(&self, _: &str, _: &str) -> Result<Option<Document>, BackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }

    async fn set(&self, _: &str, _: &str, _: Fields, _: bool) -> Result<(), BackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn update(&self, _: &str, _: &str, _: Fields) -> Result<(), BackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn delete(&self, _: &str, _: &str) -> Result<(), BackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn query(&self, _: &str, _: &Query) -> Result<Vec<Document>, BackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Local store that can be switched to fail every call.
#[derive(Default)]
pub struct FlakyLocalStore {
    pub inner: MemoryLocalStore,
    failing: AtomicBool,
}

impl FlakyLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn record(&self, uid: &str) -> Option<CreditRecord> {
        let raw = self.inner.get_item(&format!("limva_credits_{uid}")).ok()??;
        serde_json::from_str(&raw).ok()
    }
}

impl LocalStore for FlakyLocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LocalStoreError::Unavailable("storage disabled".to_string()));
        }
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LocalStoreError::Unavailable("storage disabled".to_string()));
        }
        self.inner.set_item(key, value)
    }
}

pub struct Harness {
    pub provider: Arc<MemoryIdentityProvider>,
    pub remote: Arc<FlakyBackend>,
    pub local: Arc<FlakyLocalStore>,
    pub clock: Arc<FixedClock>,
    pub session: Session,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_provider(MemoryIdentityProvider::new())
    }

    pub fn with_provider(provider: MemoryIdentityProvider) -> Self {
        Self::with_stores(
            Arc::new(provider),
            Arc::new(FlakyBackend::new()),
            Arc::new(FlakyLocalStore::new()),
        )
    }

    pub fn with_stores(
        provider: Arc<MemoryIdentityProvider>,
        remote: Arc<FlakyBackend>,
        local: Arc<FlakyLocalStore>,
    ) -> Self {
        let clock = Arc::new(FixedClock::new(today()));
        let session = Session::builder(provider.clone(), remote.clone(), local.clone())
            .with_clock(clock.clone())
            .with_config(LedgerConfig::default().with_resolution_wait(Duration::from_millis(200)))
            .with_admin(admin_policy())
            .build();

        Self {
            provider,
            remote,
            local,
            clock,
            session,
        }
    }

    /// Fresh session over the same provider and stores, like reopening the app.
    pub fn reopen(&self) -> Self {
        Self::with_stores(
            self.provider.clone(),
            self.remote.clone(),
            self.local.clone(),
        )
    }

    pub fn add_student(&self) -> String {
        self.provider
            .insert_account(STUDENT, secret(STUDENT_SECRET))
            .uid
    }

    pub async fn login_student(&self) -> String {
        let uid = self.add_student();
        self.session
            .login(STUDENT, &secret(STUDENT_SECRET))
            .await
            .expect("student login");
        uid
    }
}
