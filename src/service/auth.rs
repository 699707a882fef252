use eyre::{ensure, Result};
use log::info;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use types::domain::Session;
use types::error::Error;

use crate::repository::credentials::CredentialRepository;
use crate::repository::sessions::SessionRepository;

/// Unsalted hex SHA-256, the format stored in the credential file.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Clone)]
pub struct AuthService {
    pub credential_repository: CredentialRepository,
    pub session_repository: SessionRepository,
}

impl AuthService {
    pub fn register(&self, email: String, password: String) -> Result<bool> {
        self.credential_repository
            .insert(email, hash_password(&password))
    }

    pub fn authenticate(&self, email: String, password: String) -> Result<bool> {
        let stored = self.credential_repository.get_hash(email)?;
        Ok(stored.is_some_and(|hash| hash == hash_password(&password)))
    }

    pub fn signup(&self, email: String, password: String) -> Result<()> {
        ensure!(
            self.register(email.clone(), password)?,
            Error::EmailAlreadyExists
        );
        info!("registered {}", email);
        Ok(())
    }

    pub fn login(&self, email: String, password: String) -> Result<Uuid> {
        ensure!(
            self.authenticate(email.clone(), password)?,
            Error::InvalidCredentials
        );
        info!("{} logged in", email);
        Ok(self.session_repository.create(Session::authenticated(email)))
    }

    pub fn logout(&self, token: Uuid) -> Option<Session> {
        self.session_repository.remove(token)
    }

    pub fn get_session_by_token(&self, token: Uuid) -> Option<Session> {
        self.session_repository
            .get(token)
            .filter(|session| session.authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn service_on_disk(dir: &tempfile::TempDir) -> AuthService {
        AuthService {
            credential_repository: CredentialRepository::new(dir.path().join("users.json")),
            session_repository: SessionRepository::new(),
        }
    }

    #[rstest]
    #[case("", "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")]
    #[case("abc", "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")]
    fn test_hash_password_is_hex_sha256(#[case] password: &str, #[case] expected: &str) {
        assert_eq!(hash_password(password), expected);
    }

    #[test]
    fn test_register_and_authenticate_scenario() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = service_on_disk(&dir);

        assert!(service.register("a@x.com".to_string(), "pw1".to_string())?);
        assert!(!service.register("a@x.com".to_string(), "pw2".to_string())?);
        assert!(service.authenticate("a@x.com".to_string(), "pw1".to_string())?);
        assert!(!service.authenticate("a@x.com".to_string(), "pw2".to_string())?);
        Ok(())
    }

    #[rstest]
    #[case("a@x.com", "pw1", true)]
    #[case("a@x.com", "PW1", false)]
    #[case("a@x.com", "", false)]
    #[case("A@x.com", "pw1", false)]
    #[case("b@x.com", "pw1", false)]
    fn test_authenticate_requires_exact_email_and_password(
        #[case] email: &str,
        #[case] password: &str,
        #[case] expected: bool,
    ) -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = service_on_disk(&dir);
        service.register("a@x.com".to_string(), "pw1".to_string())?;
        assert_eq!(
            service.authenticate(email.to_string(), password.to_string())?,
            expected
        );
        Ok(())
    }

    #[test]
    fn test_signup_duplicate_is_email_already_exists() {
        let mut credential_repository = CredentialRepository::faux();
        faux::when!(credential_repository.insert).then(|(_, _)| Ok(false));
        let service = AuthService {
            credential_repository,
            session_repository: SessionRepository::new(),
        };
        let err = service
            .signup("a@x.com".to_string(), "pw".to_string())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::EmailAlreadyExists)
        ));
    }

    #[test]
    fn test_login_issues_session_for_stored_hash() -> Result<()> {
        let mut credential_repository = CredentialRepository::faux();
        faux::when!(credential_repository.get_hash)
            .then(|email| Ok((email == "a@x.com").then(|| hash_password("pw1"))));
        let service = AuthService {
            credential_repository,
            session_repository: SessionRepository::new(),
        };

        let token = service.login("a@x.com".to_string(), "pw1".to_string())?;
        assert_eq!(
            service.get_session_by_token(token),
            Some(Session::authenticated("a@x.com".to_string()))
        );

        let err = service
            .login("a@x.com".to_string(), "pw2".to_string())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidCredentials)
        ));

        assert!(service.logout(token).is_some());
        assert!(service.get_session_by_token(token).is_none());
        Ok(())
    }
}
