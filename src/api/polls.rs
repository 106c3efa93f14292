use chrono::Utc;
use log::info;
use rocket::{
    http::{CookieJar, Status},
    serde::json::Json,
    Route,
};

use crate::{
    error::Result,
    model::{
        api::{
            ballot::{BallotRequest, VotedView},
            poll::{DashboardView, PollQuery, PollSpec, PollView, UnlockRequest},
        },
        auth::Session,
        common::{access, ballot::Ballot, filter::PollFilter, poll::DashboardSplit},
        db::PollOption,
        mongodb::Id,
        store::Store,
    },
};

pub fn routes() -> Vec<Route> {
    routes![list, dashboard, create, get, unlock, voted, cast_vote]
}

/// Every poll matching the query, newest first.
#[get("/polls?<query..>")]
pub async fn list(query: PollQuery, session: Session, store: Store) -> Result<Json<Vec<PollView>>> {
    let filter = PollFilter::try_from(query)?;
    let now = Utc::now();
    let polls = filter
        .apply(store.tallied_polls().await?)
        .into_iter()
        .map(|poll| PollView::for_viewer(poll, session.user_id, &session.grants, now))
        .collect();
    Ok(Json(polls))
}

#[get("/dashboard?<search>")]
pub async fn dashboard(
    search: Option<String>,
    session: Session,
    store: Store,
) -> Result<Json<DashboardView>> {
    let filter = PollFilter {
        search,
        ..PollFilter::default()
    };
    let now = Utc::now();
    let polls = filter.apply(store.tallied_polls().await?);
    let split = DashboardSplit::new(polls, session.user_id, now);
    Ok(Json(DashboardView::new(
        split,
        session.user_id,
        &session.grants,
        now,
    )))
}

#[post("/polls", data = "<spec>", format = "json")]
pub async fn create(
    spec: Json<PollSpec>,
    session: Session,
    store: Store,
) -> Result<(Status, Json<PollView>)> {
    let now = Utc::now();
    let (poll, options) = spec.into_inner().into_new_poll(session.user_id, now)?;
    let tallied = store.create_poll(poll, options).await?;
    info!("Account {} created poll {}", session.user_id, tallied.poll.id);
    // Creators always see their own polls.
    Ok((Status::Created, Json(PollView::new(tallied, true, now))))
}

#[get("/polls/<poll_id>")]
pub async fn get(poll_id: Id, session: Session, store: Store) -> Result<Json<PollView>> {
    let tallied = store.tallied_poll(poll_id).await?;
    Ok(Json(PollView::for_viewer(
        tallied,
        session.user_id,
        &session.grants,
        Utc::now(),
    )))
}

/// Unlock a private poll for the rest of the browser session.
#[post("/polls/<poll_id>/unlock", data = "<request>", format = "json")]
pub async fn unlock(
    poll_id: Id,
    request: Json<UnlockRequest>,
    cookies: &CookieJar<'_>,
    mut session: Session,
    store: Store,
) -> Result<Json<PollView>> {
    let tallied = store.tallied_poll(poll_id).await?;
    access::unlock(&*store, &tallied.poll, &request.password, &mut session.grants).await?;
    cookies.add_private(session.grants.to_cookie());
    Ok(Json(PollView::for_viewer(
        tallied,
        session.user_id,
        &session.grants,
        Utc::now(),
    )))
}

#[get("/polls/<poll_id>/voted")]
pub async fn voted(poll_id: Id, session: Session, store: Store) -> Result<Json<VotedView>> {
    let has_voted = store.has_voted(poll_id, session.user_id).await?;
    Ok(Json(VotedView { has_voted }))
}

/// Cast a ballot, returning the poll with its updated results.
#[post("/polls/<poll_id>/votes", data = "<ballot>", format = "json")]
pub async fn cast_vote(
    poll_id: Id,
    ballot: Json<BallotRequest>,
    session: Session,
    store: Store,
) -> Result<Json<PollView>> {
    let now = Utc::now();
    let tallied = store.tallied_poll(poll_id).await?;
    let permitted = session.grants.permits(&tallied.poll, session.user_id);
    let options: Vec<PollOption> = tallied
        .options
        .iter()
        .map(|tallied| tallied.option.clone())
        .collect();

    let ballot = Ballot::check(
        &tallied.poll,
        &options,
        session.user_id,
        ballot.selection(),
        permitted,
        now,
    )?;
    store.submit_ballot(ballot, now).await?;

    let tallied = store.tallied_poll(poll_id).await?;
    Ok(Json(PollView::new(tallied, true, now)))
}
