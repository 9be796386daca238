//! HTTP routes.

use acornquest_domain::{BattleRecord, BattleStatus, JournalEntry, PlayerId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::app::App;
use crate::use_cases::battle::{BattleError, BattleReport};
use crate::use_cases::players::{LeaderboardEntry, PlayerError, PlayerView};
use crate::use_cases::rewards::{
    AttendanceReward, AttendanceRevocation, ClaimResult, RewardError, RewardResult,
};
use crate::use_cases::DEFAULT_LIST_LIMIT;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/players", post(create_player))
        .route("/api/players/{id}", get(get_player))
        .route("/api/players/{id}/battle-status", get(battle_status))
        .route(
            "/api/players/{id}/battles",
            get(battle_history).post(initiate_battle),
        )
        .route("/api/players/{id}/attendance", post(claim_attendance))
        .route("/api/players/{id}/attendance/revoke", post(revoke_attendance))
        .route(
            "/api/players/{id}/assignments/{course}/{assignment}/claim",
            post(claim_assignment),
        )
        .route("/api/players/{id}/journal", get(journal))
        .route("/api/leaderboard", get(leaderboard))
}

async fn health() -> &'static str {
    "OK"
}

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlayerRequest {
    id: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttendanceRequest {
    date: NaiveDate,
    #[serde(default)]
    event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<u32>,
}

impl ListQuery {
    fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

/// Claim outcome on the wire: `{"status":"claimed", ...}` or
/// `{"status":"alreadyClaimed"}`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum ClaimResponse<T> {
    Claimed {
        #[serde(flatten)]
        reward: T,
    },
    AlreadyClaimed,
}

impl<T> From<ClaimResult<T>> for ClaimResponse<T> {
    fn from(result: ClaimResult<T>) -> Self {
        match result {
            ClaimResult::Claimed(reward) => Self::Claimed { reward },
            ClaimResult::AlreadyClaimed => Self::AlreadyClaimed,
        }
    }
}

fn parse_player_id(id: String) -> Result<PlayerId, ApiError> {
    PlayerId::new(id).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// =============================================================================
// Players
// =============================================================================

async fn create_player(
    State(app): State<Arc<App>>,
    Json(request): Json<CreatePlayerRequest>,
) -> Result<Json<PlayerView>, ApiError> {
    let view = app
        .use_cases
        .players
        .profiles
        .create(&request.id, &request.display_name)
        .await?;
    Ok(Json(view))
}

async fn get_player(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
) -> Result<Json<PlayerView>, ApiError> {
    let id = parse_player_id(id)?;
    Ok(Json(app.use_cases.players.profiles.get(&id).await?))
}

async fn journal(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    let id = parse_player_id(id)?;
    let entries = app
        .use_cases
        .players
        .journal
        .execute(&id, query.limit())
        .await?;
    Ok(Json(entries))
}

async fn leaderboard(
    State(app): State<Arc<App>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let board = app
        .use_cases
        .players
        .leaderboard
        .execute(query.limit())
        .await?;
    Ok(Json(board))
}

// =============================================================================
// Battles
// =============================================================================

async fn battle_status(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
) -> Result<Json<BattleStatus>, ApiError> {
    let id = parse_player_id(id)?;
    Ok(Json(app.use_cases.battle.status.execute(&id).await?))
}

async fn initiate_battle(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
) -> Result<Json<BattleReport>, ApiError> {
    let id = parse_player_id(id)?;
    Ok(Json(app.use_cases.battle.initiate.execute(&id).await?))
}

async fn battle_history(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BattleRecord>>, ApiError> {
    let id = parse_player_id(id)?;
    let battles = app
        .use_cases
        .battle
        .history
        .execute(&id, query.limit())
        .await?;
    Ok(Json(battles))
}

// =============================================================================
// Rewards
// =============================================================================

async fn claim_attendance(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
    Json(request): Json<AttendanceRequest>,
) -> Result<Json<ClaimResponse<AttendanceReward>>, ApiError> {
    let id = parse_player_id(id)?;
    let result = app
        .use_cases
        .rewards
        .attendance
        .execute(&id, request.date, request.event_id.as_deref())
        .await?;
    Ok(Json(result.into()))
}

async fn revoke_attendance(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
    Json(request): Json<AttendanceRequest>,
) -> Result<Json<AttendanceRevocation>, ApiError> {
    let id = parse_player_id(id)?;
    let revoked = app
        .use_cases
        .rewards
        .revoke_attendance
        .execute(&id, request.date, request.event_id.as_deref())
        .await?;
    Ok(Json(revoked))
}

async fn claim_assignment(
    State(app): State<Arc<App>>,
    Path((id, course_id, assignment_id)): Path<(String, String, String)>,
) -> Result<Json<ClaimResponse<RewardResult>>, ApiError> {
    let id = parse_player_id(id)?;
    let result = app
        .use_cases
        .rewards
        .assignment
        .execute(&id, &course_id, &assignment_id)
        .await?;
    Ok(Json(result.into()))
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    NotEligible { remaining_secs: i64 },
    Conflict(String),
    Unprocessable(String),
    /// No one to fight right now. Retryable, but not an outage.
    NoOpponentAvailable,
    /// Transient failure; the message is logged, never returned.
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "notFound", "message": msg }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "badRequest", "message": msg }),
            ),
            ApiError::NotEligible { remaining_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "notEligible", "canBattleIn": remaining_secs }),
            ),
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                json!({ "error": "conflict", "message": msg }),
            ),
            ApiError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "unprocessable", "message": msg }),
            ),
            ApiError::NoOpponentAvailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "noOpponentAvailable",
                    "message": "No opponent available, try again later"
                }),
            ),
            ApiError::Unavailable(detail) => {
                tracing::warn!(detail = %detail, "Request failed, service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "unavailable", "message": "Try again later" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<PlayerError> for ApiError {
    fn from(e: PlayerError) -> Self {
        match e {
            PlayerError::Validation(msg) => ApiError::BadRequest(msg),
            PlayerError::PlayerNotFound(_) => ApiError::NotFound(e.to_string()),
            PlayerError::StorageUnavailable(detail) => ApiError::Unavailable(detail),
        }
    }
}

impl From<BattleError> for ApiError {
    fn from(e: BattleError) -> Self {
        match e {
            BattleError::PlayerNotFound(_) => ApiError::NotFound(e.to_string()),
            BattleError::NotEligible { remaining_secs } => {
                ApiError::NotEligible { remaining_secs }
            }
            BattleError::NoOpponentAvailable => ApiError::NoOpponentAvailable,
            BattleError::Conflict => ApiError::Conflict(e.to_string()),
            BattleError::StorageUnavailable(detail) => ApiError::Unavailable(detail),
        }
    }
}

impl From<RewardError> for ApiError {
    fn from(e: RewardError) -> Self {
        match e {
            RewardError::PlayerNotFound(_) => ApiError::NotFound(e.to_string()),
            RewardError::AssignmentIncomplete { .. } => ApiError::Unprocessable(e.to_string()),
            RewardError::RevokeNotAllowed(_) | RewardError::Conflict => {
                ApiError::Conflict(e.to_string())
            }
            RewardError::Validation(msg) => ApiError::BadRequest(msg),
            RewardError::CourseDataUnavailable(detail)
            | RewardError::StorageUnavailable(detail) => ApiError::Unavailable(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::canvas::StaticCourseData;
    use crate::infrastructure::clock::{FixedClock, FixedRandom};
    use crate::infrastructure::config::AssignmentReward;
    use crate::infrastructure::memory::InMemoryStore;
    use crate::test_fixtures::{fixed_now, player, seeded_store};
    use crate::use_cases::retry::RetryPolicy;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn router(store: Arc<InMemoryStore>, course_data: Arc<StaticCourseData>) -> Router {
        let app = App::with_runtime(
            store,
            course_data,
            Arc::new(FixedClock(fixed_now())),
            Arc::new(FixedRandom::rolls(0)),
            RetryPolicy::immediate(3),
            AssignmentReward::default(),
        );
        routes().with_state(Arc::new(app))
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn create_then_fetch_player() {
        let router = router(seeded_store(&[]).await, Arc::new(StaticCourseData::new()));

        let (status, created) = send(
            &router,
            "POST",
            "/api/players",
            Some(json!({ "id": "alice", "displayName": "Alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["acorns"], 50);
        assert_eq!(created["level"], 1);

        let (status, fetched) = send(&router, "GET", "/api/players/alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["displayName"], "Alice");
        assert_eq!(fetched["battleStatus"]["canBattle"], true);
    }

    #[tokio::test]
    async fn unknown_player_is_404() {
        let router = router(seeded_store(&[]).await, Arc::new(StaticCourseData::new()));
        let (status, body) = send(&router, "GET", "/api/players/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "notFound");
    }

    #[tokio::test]
    async fn battle_then_cooldown_is_429() {
        let store = seeded_store(&[player("alice", 150), player("bob", 50)]).await;
        let router = router(store, Arc::new(StaticCourseData::new()));

        let (status, report) = send(&router, "POST", "/api/players/alice/battles", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["won"], true);
        assert_eq!(report["xpGained"], 60);
        assert_eq!(report["acornsChange"], 5);
        assert_eq!(report["opponent"]["id"], "bob");

        let (status, body) = send(&router, "POST", "/api/players/alice/battles", None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["canBattleIn"], 8 * 3600);

        let (_, history) = send(&router, "GET", "/api/players/bob/battles", None).await;
        assert_eq!(history.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn lone_player_gets_503() {
        let router = router(
            seeded_store(&[player("alice", 0)]).await,
            Arc::new(StaticCourseData::new()),
        );
        let (status, body) = send(&router, "POST", "/api/players/alice/battles", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "noOpponentAvailable");
    }

    #[tokio::test]
    async fn repeated_attendance_reports_already_claimed() {
        let router = router(
            seeded_store(&[player("alice", 0)]).await,
            Arc::new(StaticCourseData::new()),
        );
        let body = json!({ "date": "2024-09-02", "eventId": "cs101-lecture" });

        let (status, first) =
            send(&router, "POST", "/api/players/alice/attendance", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["status"], "claimed");
        assert_eq!(first["acorns"], 5);
        assert_eq!(first["xp"], 10);

        let (status, second) =
            send(&router, "POST", "/api/players/alice/attendance", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second, json!({ "status": "alreadyClaimed" }));
    }

    #[tokio::test]
    async fn revoking_unknown_attendance_is_409() {
        let router = router(
            seeded_store(&[player("alice", 0)]).await,
            Arc::new(StaticCourseData::new()),
        );
        let (status, _) = send(
            &router,
            "POST",
            "/api/players/alice/attendance/revoke",
            Some(json!({ "date": "2024-09-02" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn encoded_path_in_assignment_id_is_a_bad_request() {
        let router = router(
            seeded_store(&[player("alice", 0)]).await,
            Arc::new(StaticCourseData::new()),
        );
        let uri = "/api/players/alice/assignments/101/7%2Fsubmissions%2Fbob%231/claim";

        let (status, body) = send(&router, "POST", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "badRequest");
    }

    #[tokio::test]
    async fn assignment_claim_requires_completion() {
        let course_data = Arc::new(StaticCourseData::new());
        let router = router(seeded_store(&[player("alice", 0)]).await, course_data.clone());
        let uri = "/api/players/alice/assignments/cs101/hw1/claim";

        let (status, _) = send(&router, "POST", uri, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        course_data
            .mark_complete(&PlayerId::new("alice").unwrap(), "cs101", "hw1")
            .await;
        let (status, paid) = send(&router, "POST", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(paid["status"], "claimed");
        assert_eq!(paid["totalAcorns"], 60);

        let (_, journal) = send(&router, "GET", "/api/players/alice/journal?limit=5", None).await;
        assert_eq!(
            journal[0]["message"],
            "Completed assignment hw1! +10 acorns +25 XP"
        );
    }

    #[tokio::test]
    async fn leaderboard_orders_by_xp() {
        let router = router(
            seeded_store(&[player("alice", 120), player("bob", 400)]).await,
            Arc::new(StaticCourseData::new()),
        );
        let (status, board) = send(&router, "GET", "/api/leaderboard?limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(board, json!([{
            "rank": 1,
            "playerId": "bob",
            "displayName": "bob",
            "level": 5,
            "xp": 400
        }]));
    }

    #[tokio::test]
    async fn storage_details_stay_out_of_the_body() {
        let response =
            ApiError::from(PlayerError::StorageUnavailable("disk I/O error at /var/db".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("/var/db"));
        assert!(body.contains(r#""error":"unavailable""#));
    }
}
