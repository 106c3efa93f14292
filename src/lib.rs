#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

use config::{ConfigFairing, StoreFairing};
use logging::LoggerFairing;

/// Build the server, choosing the storage backend from the configuration.
pub fn build() -> Rocket<Build> {
    rocket_base(rocket::build()).attach(StoreFairing)
}

/// Everything but the storage backend.
fn rocket_base(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
}

/// A rocket over the given store, configured independently of `Rocket.toml`.
#[cfg(test)]
pub(crate) fn test_rocket(store: model::store::Store) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", "test jwt secret"))
        .merge(("auth_ttl", 3600))
        .merge(("login_max_attempts", 5))
        .merge(("login_lockout", 60))
        .merge((
            "secret_key",
            "4c6f72656d20697073756d20646f6c6f722073697420616d65742c20636f6e73",
        ));
    rocket_base(rocket::custom(figment)).manage(store)
}

/// A local client over the given store, with nobody signed in.
#[cfg(test)]
pub(crate) async fn client_for(store: &model::store::Store) -> rocket::local::asynchronous::Client {
    rocket::local::asynchronous::Client::tracked(test_rocket(store.clone()))
        .await
        .unwrap()
}

/// A local client over the given store, signed in as a freshly registered
/// account.
#[cfg(test)]
pub(crate) async fn signed_in_client(
    store: &model::store::Store,
    account: model::api::auth::RegisterRequest,
) -> rocket::local::asynchronous::Client {
    let client = client_for(store).await;
    let response = client
        .post("/auth/register")
        .header(rocket::http::ContentType::JSON)
        .body(rocket::serde::json::json!(account).to_string())
        .dispatch()
        .await;
    assert_eq!(rocket::http::Status::Ok, response.status());
    drop(response);
    client
}
