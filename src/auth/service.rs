use log::{debug, warn};
use reqwest::StatusCode;
use url::Url;

use super::{Error, User};

#[async_trait::async_trait]
pub trait AuthService {
    /// Resolves a bearer token to the user it was issued for.
    async fn verify(&self, token: &str) -> super::Result<User>;
}

pub struct HttpAuthService {
    http: reqwest::Client,
    session_url: Url,
}

impl HttpAuthService {
    pub fn new(http: reqwest::Client, config: &super::Config) -> super::Result<Self> {
        let session_url = config
            .url()
            .join("session")
            .map_err(|e| Error::Unavailable(format!("invalid auth url: {e}")))?;

        Ok(Self { http, session_url })
    }
}

#[async_trait::async_trait]
impl AuthService for HttpAuthService {
    async fn verify(&self, token: &str) -> super::Result<User> {
        let resp = self
            .http
            .get(self.session_url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                warn!("auth request failed: {e}");
                Error::Unavailable(e.to_string())
            })?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("session rejected by auth service");
                Err(Error::Unauthorized)
            }
            s if s.is_success() => resp
                .json::<User>()
                .await
                .map_err(|e| Error::Unavailable(e.to_string())),
            s => Err(Error::Unavailable(format!("auth responded with {s}"))),
        }
    }
}
