use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use futures::future::{self, Either};
use tracing::{debug, info};

use crate::{
    AppState,
    auth::{current_user, verify_token},
    content::{ContentError, SessionQuery},
    distance::bounding_box,
    error::ApiError,
    models::ClassesPage,
    pipeline::build_listing,
    validation::{ClassesQuery, search_area, validate_filters},
};

#[utoipa::path(get, path = "/", tag = "classes")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Class Finder API",
        "endpoints": {
            "/classes": "Classes near you, grouped by day, as JSON",
            "/classes.ical": "Classes near you as an iCal file"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "classes")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "classes")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

enum PageOutcome {
    Onboarding,
    Ready(Box<ClassesPage>),
}

async fn load_classes_page(
    state: &AppState,
    user_id: Option<String>,
    query: &ClassesQuery,
) -> Result<PageOutcome, ApiError> {
    let filters = validate_filters(query)?;

    let preferences = match &user_id {
        Some(id) => state.content.fetch_user_preferences(id).await?,
        None => None,
    };
    let Some(area) = search_area(preferences.as_ref()) else {
        info!(user = ?user_id, "search preferences missing, redirecting to onboarding");
        return Ok(PageOutcome::Onboarding);
    };

    let unit = state.settings.distance_unit;
    let bounds = bounding_box(area.origin, area.radius, unit);
    debug!(
        ?bounds,
        radius = area.radius,
        all_longitudes = bounds.spans_all_longitudes(),
        "bounding box prefilter"
    );

    let session_query = SessionQuery {
        search_term: filters.search.clone(),
        venue_id: filters.venue_id.clone(),
        category_ids: filters.category_ids.clone(),
        tier_levels: filters.tier_levels.clone(),
        bounds: Some(bounds),
    };

    let booked = match &user_id {
        Some(id) => Either::Left(state.content.fetch_booked_session_ids(id)),
        None => Either::Right(future::ok::<Vec<String>, ContentError>(Vec::new())),
    };
    let venue_name = match &filters.venue_id {
        Some(id) => Either::Left(state.content.fetch_venue_name(id)),
        None => Either::Right(future::ok::<Option<String>, ContentError>(None)),
    };

    let (sessions, categories, booked_session_ids, venue_name) = futures::try_join!(
        state.content.fetch_sessions(&session_query),
        state.content.fetch_categories(),
        booked,
        venue_name,
    )?;

    let listing = build_listing(sessions, area.origin, area.radius, unit, state.timezone);

    Ok(PageOutcome::Ready(Box::new(ClassesPage {
        days: listing.days,
        venues: listing.venues,
        categories,
        booked_session_ids,
        venue_name,
        search_query: filters.search.clone(),
        active_filter_count: filters.active_count(),
        total_sessions: listing.total_sessions,
        radius: area.radius,
        distance_unit: unit,
    })))
}

#[utoipa::path(
    get,
    path = "/classes",
    params(
        ("q" = Option<String>, Query, description = "Free-text search over class and venue names"),
        ("venue" = Option<String>, Query, description = "Venue id filter"),
        ("category" = Option<String>, Query, description = "Comma-separated category ids"),
        ("tier" = Option<String>, Query, description = "Comma-separated membership tier levels"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)"),
        ("x-user-id" = Option<String>, Header, description = "Signed-in user id")
    ),
    responses(
        (status = 200, description = "Classes within the user's search radius", body = ClassesPage),
        (status = 303, description = "Search preferences missing, redirect to onboarding"),
        (status = 400, description = "Invalid filter parameters"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "classes"
)]
pub async fn get_classes(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    headers: HeaderMap,
    Query(query): Query<ClassesQuery>,
) -> Result<Response, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    match load_classes_page(&state, current_user(&headers), &query).await? {
        PageOutcome::Onboarding => Ok(Redirect::to(&state.settings.onboarding_url).into_response()),
        PageOutcome::Ready(page) => Ok(Json(*page).into_response()),
    }
}

#[utoipa::path(
    get,
    path = "/classes.ical",
    params(
        ("q" = Option<String>, Query, description = "Free-text search over class and venue names"),
        ("venue" = Option<String>, Query, description = "Venue id filter"),
        ("category" = Option<String>, Query, description = "Comma-separated category ids"),
        ("tier" = Option<String>, Query, description = "Comma-separated membership tier levels"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)"),
        ("x-user-id" = Option<String>, Header, description = "Signed-in user id")
    ),
    responses(
        (status = 200, description = "iCal file", content_type = "text/calendar"),
        (status = 303, description = "Search preferences missing, redirect to onboarding"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "No classes found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "classes"
)]
pub async fn get_classes_ical(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    headers: HeaderMap,
    Query(query): Query<ClassesQuery>,
) -> Result<Response, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    let page = match load_classes_page(&state, current_user(&headers), &query).await? {
        PageOutcome::Onboarding => {
            return Ok(Redirect::to(&state.settings.onboarding_url).into_response());
        }
        PageOutcome::Ready(page) => page,
    };

    if page.total_sessions == 0 {
        return Err(ApiError::NotFound("No classes found".into()));
    }

    let unit = page.distance_unit;
    let sessions: Vec<_> = page
        .days
        .into_iter()
        .flat_map(|day| day.sessions)
        .collect();
    let body = state.exporter.generate(&sessions, unit);
    Ok((
        StatusCode::OK,
        [
            ("content-type", "text/calendar"),
            ("content-disposition", "attachment; filename=classes.ics"),
        ],
        body,
    )
        .into_response())
}
