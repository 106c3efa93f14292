use chrono::Utc;
use log::{error, info};
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::auth::{normalise_email, AccountView, LoginRequest, RegisterRequest},
        auth::{AuthToken, LoginThrottle, AUTH_TOKEN_COOKIE},
        common::access::POLL_ACCESS_COOKIE,
        db::{NewUser, Profile},
        store::Store,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

#[post("/auth/register", data = "<request>", format = "json")]
pub async fn register(
    request: Json<RegisterRequest>,
    cookies: &CookieJar<'_>,
    store: Store,
    config: &State<Config>,
) -> Result<Json<AccountView>> {
    let new_user = NewUser::try_from(request.into_inner())?;

    let user = match store.insert_user(new_user).await {
        Ok(user) => user,
        Err(Error::UniqueViolation(_)) => {
            return Err(Error::Status(
                Status::Conflict,
                "An account with this email already exists.".to_string(),
            ))
        }
        Err(err) => return Err(err),
    };
    info!("Registered account {}", user.id);

    // Every account has a profile sharing its ID. If this write fails the
    // profile routes create it on first use.
    if let Err(err) = store.save_profile(Profile::new(user.id, Utc::now())).await {
        error!("Could not create profile for account {}: {err}", user.id);
    }

    cookies.add(AuthToken::new(&user).into_cookie(config)?);
    Ok(Json(user.into()))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    credentials: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    store: Store,
    config: &State<Config>,
    throttle: &State<LoginThrottle>,
) -> Result<Json<AccountView>> {
    let email = normalise_email(&credentials.email);
    let now = Utc::now();
    throttle.check(&email, now).await?;

    let user = store
        .select_user_by_email(&email)
        .await?
        .filter(|user| user.verify_password(&credentials.password));

    match user {
        Some(user) => {
            throttle.record_success(&email).await;
            cookies.add(AuthToken::new(&user).into_cookie(config)?);
            Ok(Json(user.into()))
        }
        None => {
            throttle.record_failure(&email, now).await;
            Err(Error::unauthorized("Invalid email or password."))
        }
    }
}

/// Sign out, forgetting every private poll unlocked in this session too.
#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    cookies.remove_private(Cookie::named(POLL_ACCESS_COOKIE));
    Status::Ok
}
