//! JSON API for tournament operations
//!
//! String-in/string-out entry points for the UI host. Requests carry raw
//! store documents; normalization happens here before the engine sees them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::config::{TournamentConfig, DEFAULT_CONFIG};
use crate::error::EngineError;
use crate::registry::{DeckRecord, DeckRegistry};
use crate::snapshot::Snapshot;
use crate::tournament::{
    compute_next_pairing, compute_standings, detect_anomalies, pairing_state, reconcile,
    reset_tournament, resolve_match, Anomaly, Intent, MatchReport, NextPairing, PairingState,
    Standings, StandingsSummary, TournamentState,
};

/// API version for schema compatibility
pub const API_VERSION: &str = "v1";

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub schema_version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl ApiError {
    pub fn new(code: &str, message: &str) -> Self {
        Self { code: code.to_string(), message: message.to_string(), details: None }
    }

    pub fn with_details(code: &str, message: &str, details: HashMap<String, Value>) -> Self {
        Self { code: code.to_string(), message: message.to_string(), details: Some(details) }
    }

    pub fn from_engine_error(err: &EngineError) -> Self {
        let mut details = HashMap::new();
        details.insert("retryable".to_string(), Value::Bool(err.is_retryable()));
        match err {
            EngineError::StaleRound { expected, found } => {
                details.insert("expected_round".to_string(), Value::from(*expected));
                details.insert("found_round".to_string(), Value::from(*found));
            }
            EngineError::PartialCommit { applied, total, .. } => {
                details.insert("applied".to_string(), Value::from(*applied));
                details.insert("total".to_string(), Value::from(*total));
            }
            _ => {}
        }
        Self::with_details(err.code(), &err.to_string(), details)
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            schema_version: API_VERSION.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            schema_version: API_VERSION.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Deck documents plus the tournament document, as the store returns them
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SnapshotPayload {
    pub decks: Vec<DeckRecord>,
    pub tournament: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StandingsRequest {
    pub schema_version: Option<String>,
    #[serde(default)]
    pub decks: Vec<DeckRecord>,
    pub config: Option<TournamentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PairingRequest {
    pub schema_version: Option<String>,
    pub snapshot: SnapshotPayload,
    pub config: Option<TournamentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PairingResponse {
    pub state: PairingState,
    pub next: NextPairing,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResolveMatchRequest {
    pub schema_version: Option<String>,
    pub snapshot: SnapshotPayload,
    pub report: MatchReport,
    /// Defaults to the current time
    pub now: Option<DateTime<Utc>>,
    pub config: Option<TournamentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResetTournamentRequest {
    pub schema_version: Option<String>,
    #[serde(default)]
    pub decks: Vec<DeckRecord>,
    pub now: Option<DateTime<Utc>>,
    pub config: Option<TournamentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconcileRequest {
    pub schema_version: Option<String>,
    pub snapshot: SnapshotPayload,
    pub config: Option<TournamentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IntentResponse {
    pub intent: Intent,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconcileResponse {
    pub anomalies: Vec<Anomaly>,
    pub intent: Intent,
}

fn check_version(schema_version: &Option<String>) -> Result<(), ApiError> {
    match schema_version.as_deref() {
        None => Ok(()),
        Some(v) if v == API_VERSION => Ok(()),
        Some(v) => Err(ApiError::new(
            "UNSUPPORTED_SCHEMA_VERSION",
            &format!("Unsupported schema version {}, expected {}", v, API_VERSION),
        )),
    }
}

/// Request config, else `SURVIVAL_CONFIG_PATH`, else the built-in default
fn resolve_config(config: Option<TournamentConfig>) -> Result<TournamentConfig, ApiError> {
    let invalid = |e: crate::config::ConfigError| ApiError::new("INVALID_CONFIG", &e.to_string());
    match config {
        Some(config) => {
            config.validate().map_err(invalid)?;
            Ok(config)
        }
        None => Ok(TournamentConfig::from_env()
            .map_err(invalid)?
            .unwrap_or_else(|| DEFAULT_CONFIG.clone())),
    }
}

/// Unusable documents are dropped with a warning, the rest still count
fn registry_from(records: &[DeckRecord], config: &TournamentConfig) -> DeckRegistry {
    DeckRegistry::from_records(records, config.starting_lives)
}

fn snapshot_from(payload: &SnapshotPayload, config: &TournamentConfig) -> Result<Snapshot, ApiError> {
    let decks = registry_from(&payload.decks, config);
    let tournament = match &payload.tournament {
        Some(body) => {
            TournamentState::from_document(body).map_err(|e| ApiError::from_engine_error(&e))?
        }
        None => TournamentState::default(),
    };
    Ok(Snapshot::new(decks, tournament))
}

fn parse_request<R: DeserializeOwned>(request_json: &str, name: &str) -> Result<R, ApiError> {
    serde_json::from_str(request_json).map_err(|e| {
        error!("Failed to parse {}: {}", name, e);
        ApiError::new("INVALID_JSON", &format!("Invalid JSON format: {}", e))
    })
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> String {
    let response = match result {
        Ok(data) => ApiResponse::success(data),
        Err(error) => ApiResponse::error(error),
    };
    serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
}

fn standings(request_json: &str) -> Result<StandingsSummary, ApiError> {
    let request: StandingsRequest = parse_request(request_json, "StandingsRequest")?;
    check_version(&request.schema_version)?;
    let config = resolve_config(request.config)?;
    let decks = registry_from(&request.decks, &config);
    Ok(compute_standings(&decks, &config))
}

/// JSON string containing `ApiResponse<StandingsSummary>`
pub fn compute_standings_json(request_json: &str) -> String {
    debug!("Processing standings request");
    respond(standings(request_json))
}

fn next_pairing(request_json: &str) -> Result<PairingResponse, ApiError> {
    let request: PairingRequest = parse_request(request_json, "PairingRequest")?;
    check_version(&request.schema_version)?;
    let config = resolve_config(request.config)?;
    let snapshot = snapshot_from(&request.snapshot, &config)?;

    let state = pairing_state(&Standings::new(&snapshot.decks, &config));
    let next = compute_next_pairing(&snapshot, &config);
    Ok(PairingResponse { state, next })
}

/// JSON string containing `ApiResponse<PairingResponse>`
pub fn compute_next_pairing_json(request_json: &str) -> String {
    debug!("Processing pairing request");
    respond(next_pairing(request_json))
}

fn resolution(request_json: &str) -> Result<IntentResponse, ApiError> {
    let request: ResolveMatchRequest = parse_request(request_json, "ResolveMatchRequest")?;
    check_version(&request.schema_version)?;
    let config = resolve_config(request.config)?;
    let snapshot = snapshot_from(&request.snapshot, &config)?;
    let now = request.now.unwrap_or_else(Utc::now);

    let intent = resolve_match(&snapshot, &request.report, now).map_err(|e| {
        warn!("Match resolution rejected: {}", e);
        ApiError::from_engine_error(&e)
    })?;
    Ok(IntentResponse { intent })
}

/// JSON string containing `ApiResponse<IntentResponse>`
pub fn resolve_match_json(request_json: &str) -> String {
    info!("Processing match resolution request");
    respond(resolution(request_json))
}

fn reset(request_json: &str) -> Result<IntentResponse, ApiError> {
    let request: ResetTournamentRequest = parse_request(request_json, "ResetTournamentRequest")?;
    check_version(&request.schema_version)?;
    let config = resolve_config(request.config)?;
    let decks = registry_from(&request.decks, &config);
    let now = request.now.unwrap_or_else(Utc::now);
    Ok(IntentResponse { intent: reset_tournament(&decks, &config, now) })
}

/// JSON string containing `ApiResponse<IntentResponse>`
pub fn reset_tournament_json(request_json: &str) -> String {
    info!("Processing tournament reset request");
    respond(reset(request_json))
}

fn reconciliation(request_json: &str) -> Result<ReconcileResponse, ApiError> {
    let request: ReconcileRequest = parse_request(request_json, "ReconcileRequest")?;
    check_version(&request.schema_version)?;
    let config = resolve_config(request.config)?;
    let snapshot = snapshot_from(&request.snapshot, &config)?;

    Ok(ReconcileResponse {
        anomalies: detect_anomalies(&snapshot, &config),
        intent: reconcile(&snapshot, &config),
    })
}

/// JSON string containing `ApiResponse<ReconcileResponse>`
pub fn reconcile_json(request_json: &str) -> String {
    debug!("Processing reconcile request");
    respond(reconciliation(request_json))
}

/// JSON schemas for every request type, keyed by type name
pub fn request_schemas() -> HashMap<&'static str, schemars::schema::RootSchema> {
    let mut schemas = HashMap::new();
    schemas.insert("StandingsRequest", schemars::schema_for!(StandingsRequest));
    schemas.insert("PairingRequest", schemars::schema_for!(PairingRequest));
    schemas.insert("ResolveMatchRequest", schemars::schema_for!(ResolveMatchRequest));
    schemas.insert("ResetTournamentRequest", schemars::schema_for!(ResetTournamentRequest));
    schemas.insert("ReconcileRequest", schemars::schema_for!(ReconcileRequest));
    schemas
}
