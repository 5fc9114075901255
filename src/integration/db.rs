use std::time::Duration;

use diesel::PgConnection;
use diesel::r2d2::ConnectionManager;

use super::{Result, parse_var, var};

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct Config {
    host: String,
    port: u16,
    user: String,
    password: String,
    db: String,
    pool_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 5432,
            user: String::from("postgres"),
            password: String::from("postgres"),
            db: String::from("book_exchange"),
            pool_size: 10,
        }
    }
}

impl Config {
    pub fn env() -> Result<Self> {
        Ok(Self {
            host: var("POSTGRES_HOST")?,
            port: parse_var("POSTGRES_PORT")?,
            user: var("POSTGRES_USER")?,
            password: var("POSTGRES_PASSWORD")?,
            db: var("POSTGRES_DB")?,
            pool_size: parse_var("POSTGRES_POOL_SIZE").unwrap_or(10),
        })
    }

    fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.db
        )
    }

    pub fn connect(&self) -> Result<Pool> {
        let manager = ConnectionManager::<PgConnection>::new(self.url());

        let pool = r2d2::Pool::builder()
            .max_size(self.pool_size)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        Ok(pool)
    }
}
