use std::fmt::Debug;

use derive_more::{AsRef, Display, From};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

#[derive(Debug, TypedBuilder, Serialize, Deserialize)]
pub struct Credentials {
    pub email: Email,
    pub password: Password,
}

#[derive(Clone, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct Email(String);

/// Never printed: `Debug` is masked and there is no `Display`.
#[derive(Clone, From, AsRef, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct Password(String);
impl Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.email.0.trim().is_empty() && !self.password.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Credentials;

    #[test]
    fn password_is_masked_in_debug_output() {
        let credentials = Credentials::builder()
            .email("someone@example.com".to_owned().into())
            .password("hunter2".to_owned().into())
            .build();
        let printed = format!("{credentials:?}");
        assert!(printed.contains("someone@example.com"));
        assert!(!printed.contains("hunter2"));
        assert!(credentials.is_complete());
    }

    #[test]
    fn credentials_json_layout() {
        let credentials: Credentials =
            serde_json::from_str(r#"{"email":"a@b.c","password":"pw"}"#).unwrap();
        let email: &str = credentials.email.as_ref();
        let password: &str = credentials.password.as_ref();
        assert_eq!(email, "a@b.c");
        assert_eq!(password, "pw");
    }
}
