use chrono::Duration;
use log::{error, info, warn};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    auth::LoginThrottle,
    mongodb::{ensure_indexes_exist, MongoBackend},
    store::Store,
};

const DEFAULT_LOGIN_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_LOGIN_LOCKOUT: u32 = 60;
const DEFAULT_DB_NAME: &str = "quickpoll";

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default = "default_login_max_attempts")]
    login_max_attempts: u32,
    #[serde(default = "default_login_lockout")]
    login_lockout: u32,
    // secrets
    jwt_secret: String,
}

fn default_login_max_attempts() -> u32 {
    DEFAULT_LOGIN_MAX_ATTEMPTS
}

fn default_login_lockout() -> u32 {
    DEFAULT_LOGIN_LOCKOUT
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Consecutive failed sign-ins before an email is locked out.
    pub fn login_max_attempts(&self) -> u32 {
        self.login_max_attempts
    }

    /// How long a locked-out email must wait.
    pub fn login_lockout(&self) -> Duration {
        Duration::seconds(self.login_lockout.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it, along with the
/// sign-in throttle it configures, in managed state.
/// This could mostly be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let throttle = LoginThrottle::new(config.login_max_attempts(), config.login_lockout());

        // Manage the state.
        rocket = rocket.manage(config).manage(throttle);
        Ok(rocket)
    }
}

/// Configuration for the storage backend.
#[derive(Deserialize)]
struct StoreConfig {
    // secrets
    db_uri: Option<String>,
    // non-secrets
    db_name: Option<String>,
}

/// A fairing that picks the storage backend and places a [`Store`] into
/// managed state.
///
/// With a `db_uri` it connects to MongoDB and ensures the required indexes
/// exist. Without one it falls back to the in-process backend, whose data is
/// lost on shutdown.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let db_uri = match config.db_uri {
            Some(db_uri) => db_uri,
            None => {
                warn!("No `db_uri` configured, using the in-memory store. Data will not persist.");
                return Ok(rocket.manage(Store::in_memory()));
            }
        };

        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db_name = config.db_name.as_deref().unwrap_or(DEFAULT_DB_NAME);
        let db = client.database(db_name);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to set up database {db_name}: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        Ok(rocket.manage(Store::new(MongoBackend::new(&db))))
    }
}


#[cfg(test)]
mod tests {
    use rocket::figment::Figment;

    use super::*;

    #[test]
    fn lockout_settings_default() {
        let config: Config = Figment::new()
            .merge(("auth_ttl", 3600))
            .merge(("jwt_secret", "secret"))
            .extract()
            .unwrap();
        assert_eq!(5, config.login_max_attempts());
        assert_eq!(Duration::seconds(60), config.login_lockout());
        assert_eq!(Duration::hours(1), config.auth_ttl());
    }
}
