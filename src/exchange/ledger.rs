use log::{debug, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::model::LoanRequest;
use super::{Error, LoanId};

/// Loan ledger collaborator. `create_loan` must be idempotent on the
/// proposal id of the request.
#[async_trait::async_trait]
pub trait LoanLedger {
    async fn create_loan(&self, request: &LoanRequest) -> super::Result<LoanId>;

    async fn cancel_loan(&self, loan_id: &LoanId) -> super::Result<()>;
}

pub struct HttpLedger {
    http: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct LoanCreated {
    loan_id: LoanId,
}

impl HttpLedger {
    pub fn new(http: reqwest::Client, config: &super::Config) -> Self {
        Self {
            http,
            base: config.url().clone(),
        }
    }

    fn loans_url(&self, loan_id: Option<&LoanId>) -> super::Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::LedgerUnavailable(format!("invalid ledger url: {}", self.base))
            })?;
            segments.pop_if_empty().push("loans");
            if let Some(id) = loan_id {
                segments.push(&id.0);
            }
        }
        Ok(url)
    }
}

fn unavailable(e: reqwest::Error) -> Error {
    warn!("ledger request failed: {e}");
    Error::LedgerUnavailable(e.to_string())
}

#[async_trait::async_trait]
impl LoanLedger for HttpLedger {
    async fn create_loan(&self, request: &LoanRequest) -> super::Result<LoanId> {
        let url = self.loans_url(None)?;

        let resp = self
            .http
            .post(url)
            .header("Idempotency-Key", request.exchange_id.to_string())
            .json(request)
            .send()
            .await
            .map_err(unavailable)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::LedgerUnavailable(format!(
                "ledger responded with {status}"
            )));
        }

        let created = resp.json::<LoanCreated>().await.map_err(unavailable)?;
        debug!(
            "loan {} issued for proposal {}",
            created.loan_id, request.proposal_id
        );
        Ok(created.loan_id)
    }

    async fn cancel_loan(&self, loan_id: &LoanId) -> super::Result<()> {
        let url = self.loans_url(Some(loan_id))?;

        let resp = self.http.delete(url).send().await.map_err(unavailable)?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(()),
            s if s.is_success() => Ok(()),
            s => Err(Error::LedgerUnavailable(format!(
                "ledger responded with {s}"
            ))),
        }
    }
}
