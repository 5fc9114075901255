use book_exchange::integration::{self, Config};
use book_exchange::state::AppState;
use log::info;

#[tokio::main]
async fn main() -> book_exchange::Result<()> {
    dotenv::dotenv().ok();
    integration::init_logger()?;

    let config = Config::env()?;
    let state = AppState::init(&config).await?;
    let app = book_exchange::app(state, config.env.cors()?);

    let addr = config.env.addr();
    info!("listening on {addr}");

    let served = match config.env.ssl_config()? {
        Some(ssl_config) => {
            axum_server::bind_openssl(addr, ssl_config)
                .serve(app.into_make_service())
                .await
        }
        None => axum_server::bind(addr).serve(app.into_make_service()).await,
    };

    served.map_err(integration::Error::from)?;
    Ok(())
}
