use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub firebase_api_key: SecretString,
    pub firebase_project_id: String,
    pub data_dir: PathBuf,
    pub remote_timeout: Duration,
    pub admin_secret: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(firebase_project_id: String) -> Self {
        Self {
            firebase_api_key: SecretString::default(),
            firebase_project_id,
            data_dir: PathBuf::from(".limva"),
            remote_timeout: Duration::from_secs(5),
            admin_secret: None,
        }
    }

    pub fn set_api_key(&mut self, key: SecretString) {
        self.firebase_api_key = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let mut args = GlobalArgs::new("limva-test".to_string());
        assert_eq!(args.firebase_project_id, "limva-test");
        assert_eq!(args.firebase_api_key.expose_secret(), "");
        assert!(args.admin_secret.is_none());

        args.set_api_key(SecretString::from("key".to_string()));
        assert_eq!(args.firebase_api_key.expose_secret(), "key");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut args = GlobalArgs::new("limva-test".to_string());
        args.set_api_key(SecretString::from("AIza-very-secret".to_string()));
        args.admin_secret = Some(SecretString::from("admin-secret".to_string()));

        let rendered = format!("{args:?}");
        assert!(!rendered.contains("AIza-very-secret"));
        assert!(!rendered.contains("admin-secret"));
    }
}
