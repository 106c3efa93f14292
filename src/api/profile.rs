use chrono::Utc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::profile::{ProfileUpdate, ProfileView},
        auth::Session,
        db::Profile,
        store::Store,
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_profile, update_profile]
}

/// Load the session's profile, starting an empty one if none exists yet.
async fn load_profile(store: &Store, session: &Session) -> Result<Profile> {
    match store.select_profile(session.user_id).await? {
        Some(profile) => Ok(profile),
        None => {
            let profile = Profile::new(session.user_id, Utc::now());
            store.save_profile(profile.clone()).await?;
            Ok(profile)
        }
    }
}

#[get("/profile")]
pub async fn get_profile(session: Session, store: Store) -> Result<Json<ProfileView>> {
    Ok(Json(load_profile(&store, &session).await?.into()))
}

#[put("/profile", data = "<update>", format = "json")]
pub async fn update_profile(
    update: Json<ProfileUpdate>,
    session: Session,
    store: Store,
) -> Result<Json<ProfileView>> {
    let mut profile = load_profile(&store, &session).await?;
    profile.apply(update.into_inner(), Utc::now());
    store.save_profile(profile.clone()).await?;
    Ok(Json(profile.into()))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use super::*;

    #[backend_test(user)]
    async fn new_account_has_empty_profile(client: Client) {
        let response = client.get(uri!(get_profile)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let profile: ProfileView = response.into_json().await.unwrap();
        assert_eq!(None, profile.username);
        assert_eq!(None, profile.bio);
    }

    #[backend_test(user)]
    async fn update_merges_fields(client: Client, store: Store) {
        let response = client
            .put(uri!(update_profile))
            .header(ContentType::JSON)
            .body(json!({ "username": "pollster", "bio": "Lunch enthusiast" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let first: ProfileView = response.into_json().await.unwrap();
        assert_eq!(Some("pollster".to_string()), first.username);

        // Absent fields stay, blank fields are cleared.
        let response = client
            .put(uri!(update_profile))
            .header(ContentType::JSON)
            .body(json!({ "full_name": "Pat Pollster", "bio": "" }).to_string())
            .dispatch()
            .await;
        let second: ProfileView = response.into_json().await.unwrap();
        assert_eq!(Some("pollster".to_string()), second.username);
        assert_eq!(Some("Pat Pollster".to_string()), second.full_name);
        assert_eq!(None, second.bio);
        assert!(second.updated_at >= first.updated_at);

        let stored = store.select_profile(*second.id).await.unwrap().unwrap();
        assert_eq!(second, ProfileView::from(stored));
    }

    #[backend_test]
    async fn profile_requires_a_session(client: Client) {
        let response = client
            .put(uri!(update_profile))
            .header(ContentType::JSON)
            .body(json!({ "username": "ghost" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
