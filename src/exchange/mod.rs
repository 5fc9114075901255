use std::{fmt::Display, sync::Arc};

use ledger::LoanLedger;
use repository::ExchangeRepository;
use serde::{Deserialize, Serialize};
use service::ExchangeService;
use url::Url;
use uuid::Uuid;

use crate::{integration, message};

mod handler;
pub mod ledger;
pub mod model;
pub mod repository;
pub mod service;

pub(crate) type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn ExchangeRepository + Send + Sync>;
pub type Service = Arc<dyn ExchangeService + Send + Sync>;
pub type Ledger = Arc<dyn LoanLedger + Send + Sync>;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub Uuid);

impl Id {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Loan reference issued by the ledger.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(pub String);

impl Display for LoanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone)]
pub struct Config {
    url: Url,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:8083/").expect("valid default ledger url"),
        }
    }
}

impl Config {
    pub fn env() -> integration::Result<Self> {
        let url = Url::parse(&integration::var("LEDGER_URL")?)?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("exchange already confirmed for proposal {0}")]
    AlreadyConfirmed(message::Id),
    #[error("loan ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error(transparent)]
    _R2d2(#[from] r2d2::Error),
    #[error(transparent)]
    _Diesel(#[from] diesel::result::Error),
}
