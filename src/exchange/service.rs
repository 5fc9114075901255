use log::{info, warn};

use crate::message;

use super::model::{Exchange, LoanRequest};
use super::{Ledger, Repository};

#[async_trait::async_trait]
pub trait ExchangeService {
    /// Issues the loan and returns the exchange record to be committed
    /// together with the accepted proposal.
    async fn issue(&self, request: LoanRequest) -> super::Result<Exchange>;

    /// Compensates an issued exchange whose commit did not happen.
    async fn revoke(&self, exchange: &Exchange) -> super::Result<()>;

    async fn find_by_proposal(&self, proposal_id: &message::Id) -> super::Result<Option<Exchange>>;
}

#[derive(Clone)]
pub struct ExchangeServiceImpl {
    repo: Repository,
    ledger: Ledger,
}

impl ExchangeServiceImpl {
    pub fn new(repo: Repository, ledger: Ledger) -> Self {
        Self { repo, ledger }
    }
}

#[async_trait::async_trait]
impl ExchangeService for ExchangeServiceImpl {
    async fn issue(&self, request: LoanRequest) -> super::Result<Exchange> {
        if self.repo.find_by_proposal(&request.proposal_id)?.is_some() {
            return Err(super::Error::AlreadyConfirmed(request.proposal_id));
        }

        let loan_id = self.ledger.create_loan(&request).await?;
        let exchange = Exchange::new(request, loan_id);
        info!(
            "loan {} issued for proposal {}",
            exchange.loan_id(),
            exchange.proposal_id()
        );

        Ok(exchange)
    }

    async fn revoke(&self, exchange: &Exchange) -> super::Result<()> {
        warn!(
            "cancelling loan {} of proposal {}",
            exchange.loan_id(),
            exchange.proposal_id()
        );
        self.ledger.cancel_loan(exchange.loan_id()).await
    }

    async fn find_by_proposal(&self, proposal_id: &message::Id) -> super::Result<Option<Exchange>> {
        self.repo.find_by_proposal(proposal_id)
    }
}
