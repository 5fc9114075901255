use log::{debug, warn};
use reqwest::StatusCode;
use url::Url;

use super::{Book, BookId, Error, PersonalLibrary};

pub struct HttpLibrary {
    http: reqwest::Client,
    base: Url,
}

impl HttpLibrary {
    pub fn new(http: reqwest::Client, config: &super::Config) -> Self {
        Self {
            http,
            base: config.url().clone(),
        }
    }

    fn book_url(&self, id: &BookId) -> super::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Unavailable(format!("invalid library url: {}", self.base)))?
            .pop_if_empty()
            .push("books")
            .push(id.as_str());
        Ok(url)
    }
}

#[async_trait::async_trait]
impl PersonalLibrary for HttpLibrary {
    async fn get_book(&self, id: &BookId) -> super::Result<Book> {
        let url = self.book_url(id)?;
        debug!("fetching book {id} from {url}");

        let resp = self.http.get(url).send().await.map_err(|e| {
            warn!("library request failed: {e}");
            Error::Unavailable(e.to_string())
        })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(Error::BookNotFound(id.clone())),
            s if s.is_success() => resp
                .json::<Book>()
                .await
                .map_err(|e| Error::Unavailable(e.to_string())),
            s => Err(Error::Unavailable(format!("library responded with {s}"))),
        }
    }
}
