use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::{ErrorBody, GENERIC_MESSAGE};

mod auth;
mod polls;
mod profile;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(polls::routes());
    routes.extend(profile::routes());
    routes
}

/// JSON bodies for errors raised outside of a handler, such as a failed
/// request guard or a malformed body.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error,
        default_catcher
    ]
}

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new("The request could not be understood."))
}

#[catch(401)]
fn unauthorized() -> Json<ErrorBody> {
    Json(ErrorBody::new("Please sign in first."))
}

#[catch(403)]
fn forbidden() -> Json<ErrorBody> {
    Json(ErrorBody::new("You are not allowed to do that."))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new(format!("Not found: {}", req.uri())))
}

#[catch(422)]
fn unprocessable() -> Json<ErrorBody> {
    Json(ErrorBody::new("The request was well-formed but had invalid fields."))
}

#[catch(500)]
fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody::new(GENERIC_MESSAGE))
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new(status.reason_lossy()))
}
