use log::debug;

use super::model::User;
use super::{Id, Repository};

#[async_trait::async_trait]
pub trait UserService {
    /// Stores or refreshes the local copy of a verified user.
    async fn project(&self, user: &User) -> super::Result<()>;

    async fn find_name(&self, id: &Id) -> super::Result<String>;
}

#[derive(Clone)]
pub struct UserServiceImpl {
    repo: Repository,
}

impl UserServiceImpl {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait::async_trait]
impl UserService for UserServiceImpl {
    async fn project(&self, user: &User) -> super::Result<()> {
        debug!("projecting user {}", user.id());
        self.repo.upsert(user)
    }

    async fn find_name(&self, id: &Id) -> super::Result<String> {
        self.repo
            .find_by_id(id)?
            .map(|u| u.name().to_string())
            .ok_or(super::Error::NotFound(*id))
    }
}
