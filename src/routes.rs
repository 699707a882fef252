use axum::body::Bytes;
use eyre::Result;
use uuid::Uuid;
use validator::Validate;

use types::domain::{LoginRequest, Session, SignupRequest};
use types::error::Error;
use types::table::Table;

use crate::domain::report::Report;
use crate::service::auth::AuthService;
use crate::service::scan::ScanService;

#[derive(Clone)]
pub struct Api {
    pub auth_service: AuthService,
    pub scan_service: ScanService,
}

impl Api {
    pub async fn signup(&self, request: SignupRequest) -> Result<()> {
        request
            .validate()
            .map_err(|_| Error::InvalidEmailOrPassword)?;
        self.auth_service.signup(request.email, request.password)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Uuid> {
        request
            .validate()
            .map_err(|_| Error::InvalidEmailOrPassword)?;
        self.auth_service.login(request.email, request.password)
    }

    pub async fn logout(&self, token: Uuid) -> Option<Session> {
        self.auth_service.logout(token)
    }

    pub fn get_session_by_token(&self, token: Uuid) -> Option<Session> {
        self.auth_service.get_session_by_token(token)
    }

    /// Scoring and persistence run on the blocking pool.
    /// Scores `body` on the blocking pool.
    pub async fn upload(&self, session: Session, body: Bytes) -> Result<Report> {
        let scan_service = self.scan_service.clone();
        tokio::task::spawn_blocking(move || scan_service.upload(&session.email, &body[..])).await?
    }

    pub async fn history(&self, session: &Session) -> Result<Option<Table>> {
        self.scan_service.history(&session.email)
    }

    pub async fn download(&self, session: &Session) -> Result<Option<Vec<u8>>> {
        self.scan_service.download(&session.email)
    }
}
