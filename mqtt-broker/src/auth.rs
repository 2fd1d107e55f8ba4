use std::collections::HashMap;

use argon2::{password_hash::PasswordHash, Argon2, PasswordVerifier};

use mqtt_session::collab::{AuthBackend, AuthError};

/// Accepts every connection, regardless of credentials. Used when
/// `auth.require_auth = false`.
#[derive(Debug, Default)]
pub struct AllowAnonymous;

impl AuthBackend for AllowAnonymous {
    fn authenticate(&self, _client_id: &str, _username: Option<&str>, _password: Option<&[u8]>) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Username/password auth backed by an in-memory map of username to either an
/// argon2 PHC hash (`$argon2...`) or, as a migration path, a plaintext password.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    entries: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new(entries: HashMap<String, String>) -> Self {
        StaticCredentials { entries }
    }

    fn verify(&self, username: &str, password: &[u8]) -> bool {
        let Some(stored) = self.entries.get(username) else {
            return false;
        };

        if stored.starts_with("$argon2") {
            let Ok(hash) = PasswordHash::new(stored) else {
                return false;
            };
            Argon2::default().verify_password(password, &hash).is_ok()
        } else {
            stored.as_bytes() == password
        }
    }
}

impl AuthBackend for StaticCredentials {
    fn authenticate(&self, _client_id: &str, username: Option<&str>, password: Option<&[u8]>) -> Result<(), AuthError> {
        let (Some(username), Some(password)) = (username, password) else {
            return Err(AuthError::BadCredentials);
        };
        if self.verify(username, password) {
            Ok(())
        } else {
            Err(AuthError::BadCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(password: &str) -> String {
        use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn accepts_correct_hashed_password() {
        let mut entries = HashMap::new();
        entries.insert("alice".to_string(), hash("hunter2"));
        let creds = StaticCredentials::new(entries);
        assert!(creds.authenticate("c1", Some("alice"), Some(b"hunter2")).is_ok());
    }

    #[test]
    fn rejects_wrong_hashed_password() {
        let mut entries = HashMap::new();
        entries.insert("alice".to_string(), hash("hunter2"));
        let creds = StaticCredentials::new(entries);
        assert_eq!(
            creds.authenticate("c1", Some("alice"), Some(b"wrong")),
            Err(AuthError::BadCredentials)
        );
    }

    #[test]
    fn falls_back_to_plaintext_comparison() {
        let mut entries = HashMap::new();
        entries.insert("bob".to_string(), "plain-password".to_string());
        let creds = StaticCredentials::new(entries);
        assert!(creds.authenticate("c1", Some("bob"), Some(b"plain-password")).is_ok());
    }

    #[test]
    fn rejects_unknown_user() {
        let creds = StaticCredentials::new(HashMap::new());
        assert_eq!(
            creds.authenticate("c1", Some("ghost"), Some(b"x")),
            Err(AuthError::BadCredentials)
        );
    }

    #[test]
    fn rejects_missing_username_or_password() {
        let creds = StaticCredentials::new(HashMap::new());
        assert_eq!(creds.authenticate("c1", None, None), Err(AuthError::BadCredentials));
    }
}
