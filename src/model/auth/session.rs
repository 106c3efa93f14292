use log::warn;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::config::Config;
use crate::error::Error;
use crate::model::{common::access::AccessGrants, mongodb::Id};

use super::token::{AuthToken, AUTH_TOKEN_COOKIE};

/// The signed-in account behind a request, and the private polls it has
/// unlocked during this browser session.
///
/// Taking a `Session` guard makes a route require authentication; requests
/// without a valid token fail with 401.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Id,
    pub grants: AccessGrants,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Session {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Please sign in first."),
                ))
            }
        };

        match AuthToken::from_cookie(cookie, config) {
            Ok(token) => Outcome::Success(Session {
                user_id: token.id,
                grants: AccessGrants::from_cookies(req.cookies()),
            }),
            Err(err) => {
                warn!("Rejected auth token: {err}");
                Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Your session has expired. Please sign in again."),
                ))
            }
        }
    }
}
