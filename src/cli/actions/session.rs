use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::globals::GlobalArgs;
use crate::credits::LedgerConfig;
use crate::identity::FirebaseIdentityProvider;
use crate::session::{AdminPolicy, Session};
use crate::store::{BearerToken, FileLocalStore, FirestoreBackend};

/// Wire the Firebase adapters and the file fallback store into a session.
///
/// # Errors
///
/// Returns an error if an adapter cannot be built or the data directory
/// cannot be created
pub fn connect(globals: &GlobalArgs) -> Result<Session> {
    let token = BearerToken::default();

    let provider = FirebaseIdentityProvider::new(globals.firebase_api_key.clone(), token.clone())
        .context("failed to build identity provider")?;
    let remote = FirestoreBackend::new(&globals.firebase_project_id, token)
        .context("failed to build document backend")?;
    let local = FileLocalStore::open(globals.data_dir.clone())
        .with_context(|| format!("failed to open {}", globals.data_dir.display()))?;

    let mut admin = AdminPolicy::default();
    if let Some(secret) = &globals.admin_secret {
        admin = admin.with_secret(secret.clone());
    } else {
        debug!("no administrator secret configured, self-restore disabled");
    }

    let config = LedgerConfig::default().with_remote_timeout(globals.remote_timeout);

    Ok(
        Session::builder(Arc::new(provider), Arc::new(remote), Arc::new(local))
            .with_config(config)
            .with_admin(admin)
            .build(),
    )
}
