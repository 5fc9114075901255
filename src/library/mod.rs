use std::{fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{integration, user};

pub mod client;

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Client = Arc<dyn PersonalLibrary + Send + Sync>;

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub String);

impl BookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BookId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub owner_id: user::Id,
    pub title: String,
}

/// Read-only view of the personal-library collaborator.
#[async_trait::async_trait]
pub trait PersonalLibrary {
    async fn get_book(&self, id: &BookId) -> Result<Book>;
}

#[derive(Clone)]
pub struct Config {
    url: Url,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:8082/").expect("valid default library url"),
        }
    }
}

impl Config {
    pub fn env() -> integration::Result<Self> {
        let url = Url::parse(&integration::var("LIBRARY_URL")?)?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("book not found: {0}")]
    BookNotFound(BookId),
    #[error("library unavailable: {0}")]
    Unavailable(String),
}

impl From<&Error> for axum::http::StatusCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::BookNotFound(_) => Self::NOT_FOUND,
            Error::Unavailable(_) => Self::SERVICE_UNAVAILABLE,
        }
    }
}
