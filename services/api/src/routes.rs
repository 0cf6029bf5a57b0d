use crate::infra::{deserialize_optional_date, AppState};
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use gate_audit::error::AppError;
use gate_audit::workflows::audit::export::{csv_export_file_name, export_csv};
use gate_audit::workflows::audit::report::LeaderboardSummary;
use gate_audit::workflows::audit::{
    Answer, AuditRecord, FilterCriteria, GateType, ResolvedQuestion, ScoreCard, ScoringEngine,
    Shift, SiteStatistics, WeightMap,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FilterQuery {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) to: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) shift: Option<Shift>,
    #[serde(default)]
    pub(crate) gate: Option<GateType>,
    #[serde(default)]
    pub(crate) auditor: Option<String>,
    #[serde(default)]
    pub(crate) guard: Option<String>,
    /// Minutes east of UTC used to turn `from`/`to` into instants.
    #[serde(default)]
    pub(crate) utc_offset_minutes: i32,
}

impl FilterQuery {
    fn criteria(self) -> FilterCriteria {
        FilterCriteria {
            start: self.from,
            end: self.to,
            shift: self.shift,
            gate_type: self.gate,
            auditor: self.auditor.unwrap_or_default(),
            guard: self.guard.unwrap_or_default(),
            utc_offset_minutes: self.utc_offset_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AuditListResponse {
    pub(crate) total: usize,
    pub(crate) audits: Vec<AuditRecord>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatisticsResponse {
    pub(crate) filtered: bool,
    pub(crate) statistics: Option<SiteStatistics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScorePreviewRequest {
    pub(crate) gate_type: GateType,
    #[serde(default)]
    pub(crate) answers: BTreeMap<String, Answer>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScorePreviewResponse {
    pub(crate) gate_type: GateType,
    pub(crate) card: ScoreCard,
    pub(crate) max_points: u32,
    pub(crate) answered: usize,
    pub(crate) questions: Vec<ResolvedQuestion>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SettingsResponse {
    pub(crate) pass_threshold_pct: u8,
    pub(crate) weights: WeightMap,
    pub(crate) max_points: BTreeMap<&'static str, u32>,
}

pub(crate) fn with_audit_routes() -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/audits", axum::routing::get(list_audits_endpoint))
        .route(
            "/api/v1/audits/stats",
            axum::routing::get(statistics_endpoint),
        )
        .route(
            "/api/v1/audits/leaderboard",
            axum::routing::get(leaderboard_endpoint),
        )
        .route(
            "/api/v1/audits/export.csv",
            axum::routing::get(csv_export_endpoint),
        )
        .route(
            "/api/v1/audits/score",
            axum::routing::post(score_preview_endpoint),
        )
        .route("/api/v1/audits/:id", axum::routing::get(audit_endpoint))
        .route("/api/v1/settings", axum::routing::get(settings_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn list_audits_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<FilterQuery>,
) -> Json<AuditListResponse> {
    let workspace = state.workspace();
    let audits: Vec<AuditRecord> = workspace
        .filtered(&query.criteria())
        .into_iter()
        .cloned()
        .collect();

    Json(AuditListResponse {
        total: workspace.records().len(),
        audits,
    })
}

pub(crate) async fn audit_endpoint(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AuditRecord>, AppError> {
    let workspace = state.workspace();
    let record = workspace.get(&id)?;
    Ok(Json(record.clone()))
}

pub(crate) async fn statistics_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<FilterQuery>,
) -> Json<StatisticsResponse> {
    let criteria = query.criteria();
    let statistics = state.workspace().statistics(&criteria);

    Json(StatisticsResponse {
        filtered: !criteria.is_empty(),
        statistics,
    })
}

pub(crate) async fn leaderboard_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<FilterQuery>,
) -> Json<LeaderboardSummary> {
    Json(state.workspace().leaderboard(&query.criteria()).summary())
}

pub(crate) async fn csv_export_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let workspace = state.workspace();
    let body = export_csv(workspace.filtered(&query.criteria()), workspace.catalog())?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        csv_export_file_name(Local::now().date_naive())
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

pub(crate) async fn score_preview_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ScorePreviewRequest>,
) -> Json<ScorePreviewResponse> {
    let ScorePreviewRequest { gate_type, answers } = payload;
    let workspace = state.workspace();
    let engine = ScoringEngine::new(workspace.catalog(), workspace.settings());
    let questions = engine.resolve(gate_type);
    let answered = questions
        .iter()
        .filter(|question| answers.contains_key(question.id))
        .count();

    Json(ScorePreviewResponse {
        gate_type,
        card: workspace.preview(gate_type, &answers),
        max_points: engine.max_points(gate_type),
        answered,
        questions,
    })
}

pub(crate) async fn settings_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<SettingsResponse> {
    let workspace = state.workspace();
    let settings = workspace.settings();
    let engine = ScoringEngine::new(workspace.catalog(), settings);
    let max_points = GateType::ordered()
        .into_iter()
        .map(|gate| (gate.label(), engine.max_points(gate)))
        .collect();

    Json(SettingsResponse {
        pass_threshold_pct: settings.pass_threshold_pct(),
        weights: settings.weights().clone(),
        max_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use gate_audit::workflows::audit::{AuditWorkspace, BlobStore, InMemoryBlobStore};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn seeded_state() -> AppState {
        let store = Arc::new(InMemoryBlobStore::default());
        let mut workspace = AuditWorkspace::load(store.clone());
        let samples = [
            ("Jane Doe", GateType::Inbound, Shift::Dayshift, 3, None),
            ("Jane Doe", GateType::Outbound, Shift::Nightshift, 4, None),
            (
                "Rob Stone",
                GateType::Outbound,
                Shift::Nightshift,
                5,
                Some("out_no_missed_gate_outs"),
            ),
        ];
        for (guard, gate, shift, day, fail) in samples {
            let at = Utc
                .with_ymd_and_hms(2025, 3, day, 14, 0, 0)
                .single()
                .expect("valid timestamp");
            let mut draft = workspace.new_draft(gate, shift, at);
            draft.set_guard_name(guard);
            draft.set_auditor_name("Site Manager");
            draft.mark_all(Answer::Pass);
            if let Some(id) = fail {
                draft.set_answer(id, Answer::Fail).expect("known question");
            }
            workspace.save_audit(&draft).expect("audit saves");
        }

        AppState {
            readiness: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            store: store as Arc<dyn BlobStore>,
        }
    }

    fn app(state: AppState) -> axum::Router {
        with_audit_routes().layer(Extension(state))
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let response = app(state)
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn statistics_honor_gate_filter() {
        let (status, body) = get_json(seeded_state(), "/api/v1/audits/stats?gate=outbound").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filtered"], true);
        assert_eq!(body["statistics"]["total_audits"], 2);
        assert_eq!(body["statistics"]["overall_pass_rate"], 100);
        assert_eq!(
            body["statistics"]["top_misses"][0]["id"],
            "out_no_missed_gate_outs"
        );
    }

    #[tokio::test]
    async fn statistics_are_null_without_audits() {
        let state = AppState {
            store: Arc::new(InMemoryBlobStore::default()) as Arc<dyn BlobStore>,
            ..seeded_state()
        };
        let (status, body) = get_json(state, "/api/v1/audits/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filtered"], false);
        assert!(body["statistics"].is_null());
    }

    #[tokio::test]
    async fn audit_list_applies_date_window() {
        let (status, body) =
            get_json(seeded_state(), "/api/v1/audits?from=2025-03-04&to=2025-03-04").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        let audits = body["audits"].as_array().expect("array");
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0]["gate_type"], "outbound");
    }

    #[tokio::test]
    async fn unknown_audit_id_is_not_found() {
        let (status, body) = get_json(seeded_state(), "/api/v1/audits/missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"]
            .as_str()
            .expect("message")
            .contains("missing"));
    }

    #[tokio::test]
    async fn leaderboard_ranks_by_average() {
        let (status, body) = get_json(seeded_state(), "/api/v1/audits/leaderboard").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["guards"][0]["guard"], "Jane Doe");
        assert_eq!(body["guards"][0]["count"], 2);
        assert_eq!(body["top_performers"][0]["guard"], "Jane Doe");
        assert_eq!(body["guards"][1]["guard"], "Rob Stone");
    }

    #[tokio::test]
    async fn score_preview_uses_current_weights() {
        let request = Request::post("/api/v1/audits/score")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "gate_type": "inbound",
                    "answers": { "gen_on_time": "pass", "gen_uniform": "fail", "gen_attentive": "na" }
                })
                .to_string(),
            ))
            .expect("request");
        let response = app(seeded_state())
            .oneshot(request)
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["card"]["earned"], 5);
        // unanswered inbound questions still count toward the total
        assert_eq!(body["card"]["total"], 69);
        assert_eq!(body["card"]["pct"], 7);
        assert_eq!(body["card"]["passed"], false);
        assert_eq!(body["max_points"], 72);
        assert_eq!(body["answered"], 3);
    }

    #[tokio::test]
    async fn csv_export_is_an_attachment() {
        let response = app(seeded_state())
            .oneshot(
                Request::get("/api/v1/audits/export.csv?guard=rob")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"gate_audits_"));

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Rob Stone"));
    }

    #[tokio::test]
    async fn readiness_reports_initializing() {
        let state = seeded_state();
        state
            .readiness
            .store(false, std::sync::atomic::Ordering::Relaxed);
        let (status, body) = get_json(state, "/ready").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");
    }
}
