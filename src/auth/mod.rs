use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::{integration, user};

mod handler;
pub mod middleware;
pub mod service;

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::AuthService + Send + Sync>;

/// The verified caller of a request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(rename = "user_id")]
    id: user::Id,
    name: String,
}

impl User {
    pub fn new(id: user::Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub const fn id(&self) -> &user::Id {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&User> for user::model::User {
    fn from(u: &User) -> Self {
        Self::new(u.id, &u.name)
    }
}

#[derive(Clone)]
pub struct Config {
    url: Url,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:8081/").expect("valid default auth url"),
        }
    }
}

impl Config {
    pub fn env() -> integration::Result<Self> {
        let url = Url::parse(&integration::var("AUTH_URL")?)?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unauthorized")]
    Unauthorized,
    #[error("auth service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    _User(#[from] user::Error),
}
