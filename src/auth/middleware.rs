use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use log::debug;

use crate::{auth, user};

fn bearer(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies the bearer token, refreshes the local user projection and
/// exposes the caller as an `auth::User` extension.
pub async fn authorize(
    user_service: State<user::Service>,
    auth_service: State<auth::Service>,
    mut req: Request,
    next: Next,
) -> crate::Result<Response> {
    let token = bearer(&req)
        .map(str::to_owned)
        .ok_or(super::Error::Unauthorized)?;

    let auth_user = auth_service.verify(&token).await?;
    debug!("request authorized for {}", auth_user.id());

    user_service
        .project(&user::model::User::from(&auth_user))
        .await
        .map_err(super::Error::from)?;

    req.extensions_mut().insert(auth_user);

    Ok(next.run(req).await)
}
