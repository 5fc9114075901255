use std::env;
use std::fs::File;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use axum_server::tls_openssl::OpenSSLConfig;
use log::{LevelFilter, warn};
use simplelog::{ColorChoice, CombinedLogger, TermLogger, TerminalMode, WriteLogger};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::{auth, exchange, library};

pub mod db;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} must be set")]
    MissingEnv(&'static str),
    #[error("invalid value for {0}: {1}")]
    InvalidEnv(&'static str, String),
    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error(transparent)]
    _Url(#[from] url::ParseError),
    #[error(transparent)]
    _Io(#[from] std::io::Error),
    #[error(transparent)]
    _Logger(#[from] log::SetLoggerError),
    #[error(transparent)]
    _R2d2(#[from] r2d2::Error),
    #[error(transparent)]
    _Reqwest(#[from] reqwest::Error),
}

pub(crate) fn var(key: &'static str) -> Result<String> {
    env::var(key).map_err(|_| Error::MissingEnv(key))
}

pub(crate) fn parse_var<T: FromStr>(key: &'static str) -> Result<T> {
    let raw = var(key)?;
    raw.parse().map_err(|_| Error::InvalidEnv(key, raw))
}

#[derive(Clone, Debug, PartialEq)]
pub enum Env {
    Local,
    Dev,
    Stage,
    Production,
}

impl FromStr for Env {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Env::Local),
            "dev" => Ok(Env::Dev),
            "stg" => Ok(Env::Stage),
            "prod" => Ok(Env::Production),
            _ => Err(Error::InvalidEnv("ENV", s.to_string())),
        }
    }
}

fn load_tls(cert: &str, key: &str) -> Result<OpenSSLConfig> {
    OpenSSLConfig::from_pem_file(cert, key).map_err(|e| Error::Tls(e.to_string()))
}

impl Env {
    pub fn addr(&self) -> SocketAddr {
        match self {
            Env::Local => SocketAddr::from(([127, 0, 0, 1], 8000)),
            Env::Dev | Env::Stage => SocketAddr::from(([0, 0, 0, 0], 8000)),
            Env::Production => SocketAddr::from(([0, 0, 0, 0], 8443)),
        }
    }

    pub fn ssl_config(&self) -> Result<Option<OpenSSLConfig>> {
        match self {
            Env::Local | Env::Dev | Env::Stage => Ok(None),
            Env::Production => {
                let ssl_config = load_tls(&var("SSL_CERT_FILE")?, &var("SSL_KEY_FILE")?)?;
                Ok(Some(ssl_config))
            }
        }
    }

    pub fn allow_origin(&self) -> Result<AllowOrigin> {
        match self {
            Env::Local | Env::Dev => Ok(AllowOrigin::any()),
            Env::Stage | Env::Production => {
                let origins = var("ALLOW_ORIGIN")?
                    .split(',')
                    .map(|o| {
                        HeaderValue::from_str(o.trim())
                            .map_err(|_| Error::InvalidEnv("ALLOW_ORIGIN", o.to_string()))
                    })
                    .collect::<Result<Vec<HeaderValue>>>()?;
                Ok(AllowOrigin::list(origins))
            }
        }
    }

    pub fn cors(&self) -> Result<CorsLayer> {
        Ok(CorsLayer::new()
            .allow_origin(self.allow_origin()?)
            .allow_methods(AllowMethods::any())
            .allow_headers(AllowHeaders::any()))
    }
}

#[derive(Clone)]
pub struct Config {
    pub env: Env,

    pub postgres: db::Config,

    pub auth: auth::Config,
    pub library: library::Config,
    pub ledger: exchange::Config,
}

impl Config {
    /// Reads the service configuration from the environment.
    ///
    /// Only `ENV` is strict; every collaborator section falls back to its
    /// local defaults when its variables are absent or malformed.
    pub fn env() -> Result<Self> {
        let env = match env::var("ENV") {
            Ok(e) => e.parse()?,
            Err(_) => Env::Local,
        };

        Ok(Self {
            env,
            postgres: db::Config::env().unwrap_or_else(|e| {
                warn!("{e}, using default postgres config");
                db::Config::default()
            }),
            auth: auth::Config::env().unwrap_or_else(|e| {
                warn!("{e}, using default auth config");
                auth::Config::default()
            }),
            library: library::Config::env().unwrap_or_else(|e| {
                warn!("{e}, using default library config");
                library::Config::default()
            }),
            ledger: exchange::Config::env().unwrap_or_else(|e| {
                warn!("{e}, using default ledger config");
                exchange::Config::default()
            }),
        })
    }
}

pub fn init_logger() -> Result<()> {
    let rust_log = env::var("RUST_LOG").unwrap_or("info".into());
    let level = LevelFilter::from_str(&rust_log).unwrap_or(LevelFilter::Info);
    let log_file = env::var("SERVICE_NAME")
        .map(|pkg| format!("{pkg}.log"))
        .unwrap_or("service.log".into());

    CombinedLogger::init(vec![
        TermLogger::new(
            level,
            simplelog::Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(level, simplelog::Config::default(), File::create(log_file)?),
    ])?;

    Ok(())
}

pub fn init_http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(2))
        .timeout(Duration::from_secs(5))
        .build()?;

    Ok(client)
}
