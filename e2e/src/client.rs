use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use types::domain::{LoginRequest, Session, SignupRequest};

const BASE_URL: &str = "http://localhost:8080";

pub struct Client {
    pub client: reqwest::Client,
    pub token: Option<Uuid>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            token: None,
        }
    }

    fn bearer(&self) -> String {
        self.token.map(|t| t.to_string()).unwrap_or_default()
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<StatusCode, reqwest::Error> {
        let url = format!("{}/signup", BASE_URL);
        let response = self.client.post(url).json(&request).send().await?;
        Ok(response.status())
    }

    pub async fn login(&mut self, request: LoginRequest) -> eyre::Result<Uuid> {
        let url = format!("{}/login", BASE_URL);
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let token = Uuid::parse_str(&response.text().await?)?;
        self.token = Some(token);
        Ok(token)
    }

    pub async fn session(&self) -> Result<Option<Session>, reqwest::Error> {
        let url = format!("{}/session", BASE_URL);
        let response = self.client.get(url).bearer_auth(self.bearer()).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        response.error_for_status()?.json().await.map(Some)
    }

    pub async fn logout(&self) -> Result<StatusCode, reqwest::Error> {
        let url = format!("{}/logout", BASE_URL);
        let response = self.client.post(url).bearer_auth(self.bearer()).send().await?;
        Ok(response.status())
    }

    /// Raw status and JSON body, so callers can assert on error statuses too.
    pub async fn upload(&self, csv: String) -> Result<(StatusCode, Value), reqwest::Error> {
        let url = format!("{}/upload", BASE_URL);
        let response = self
            .client
            .post(url)
            .bearer_auth(self.bearer())
            .body(csv)
            .send()
            .await?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn history(&self) -> Result<(StatusCode, Value), reqwest::Error> {
        let url = format!("{}/history", BASE_URL);
        let response = self.client.get(url).bearer_auth(self.bearer()).send().await?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn download(&self) -> Result<(StatusCode, String), reqwest::Error> {
        let url = format!("{}/download", BASE_URL);
        let response = self.client.get(url).bearer_auth(self.bearer()).send().await?;
        let status = response.status();
        Ok((status, response.text().await?))
    }
}
