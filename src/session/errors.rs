//! User-facing session errors. Display strings are the localized messages
//! shown by the UI.

use super::identity::AuthProviderError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Sai email hoặc mật khẩu.")]
    InvalidCredential,

    #[error("Tài khoản không tồn tại.")]
    AccountNotFound,

    #[error("Sai mật khẩu.")]
    WrongPassword,

    #[error("Đăng nhập thất bại.")]
    Failed,

    /// The administrator account exists but with another secret.
    #[error("Tài khoản Admin đã tồn tại nhưng sai mật khẩu.")]
    AdminSecretMismatch,

    #[error("Không thể khôi phục tài khoản Admin.")]
    AdminRestoreFailed,
}

impl From<&AuthProviderError> for LoginError {
    fn from(err: &AuthProviderError) -> Self {
        match err {
            AuthProviderError::InvalidCredential => Self::InvalidCredential,
            AuthProviderError::AccountNotFound => Self::AccountNotFound,
            AuthProviderError::WrongPassword => Self::WrongPassword,
            _ => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    #[error("Email không hợp lệ.")]
    InvalidEmail,

    #[error("Email này đã được sử dụng.")]
    EmailInUse,

    #[error("Mật khẩu phải có ít nhất 6 ký tự.")]
    WeakSecret,

    #[error("Đăng ký thất bại.")]
    Failed,
}

impl From<&AuthProviderError> for RegisterError {
    fn from(err: &AuthProviderError) -> Self {
        match err {
            AuthProviderError::EmailInUse => Self::EmailInUse,
            AuthProviderError::WeakSecret => Self::WeakSecret,
            _ => Self::Failed,
        }
    }
}
