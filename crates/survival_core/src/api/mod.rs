pub mod tournament_json;

pub use tournament_json::{
    compute_next_pairing_json, compute_standings_json, reconcile_json, request_schemas,
    reset_tournament_json, resolve_match_json, ApiError, ApiResponse, IntentResponse,
    PairingRequest, PairingResponse, ReconcileRequest, ReconcileResponse, ResetTournamentRequest,
    ResolveMatchRequest, SnapshotPayload, StandingsRequest, API_VERSION,
};
