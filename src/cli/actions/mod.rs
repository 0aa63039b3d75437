mod run;
pub mod session;

use secrecy::SecretString;

use crate::cli::globals::GlobalArgs;
use crate::credits::Feature;

#[derive(Debug)]
pub enum Action {
    Credits {
        email: String,
        password: SecretString,
    },
    Consume {
        email: String,
        password: SecretString,
        feature: Feature,
    },
    Register {
        email: String,
        password: SecretString,
        name: String,
    },
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the session cannot be built or the action fails.
    pub async fn execute(self, globals: &GlobalArgs) -> anyhow::Result<()> {
        run::execute(self, globals).await
    }
}
