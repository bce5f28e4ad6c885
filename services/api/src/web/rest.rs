//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{protocol::TierDto, state::AppState};
use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_session_core::{daily_request_limit, Capability, EntitlementPolicy, Tier};
use tracing::info;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        entitlements_handler,
    ),
    components(
        schemas(EntitlementsResponse, CapabilityEntry, TierDto)
    ),
    tags(
        (name = "Study Session API", description = "Entitlement lookups for the study session views.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, IntoParams)]
pub struct EntitlementQuery {
    /// The subscription tier to evaluate. Defaults to `free`.
    pub tier: Option<TierDto>,
}

/// Whether one capability is available to the requested tier.
#[derive(Serialize, ToSchema, Debug, PartialEq, Eq)]
pub struct CapabilityEntry {
    capability: String,
    allowed: bool,
}

/// The full entitlement picture for a tier.
#[derive(Serialize, ToSchema, Debug, PartialEq, Eq)]
pub struct EntitlementsResponse {
    tier: String,
    /// `None` means unlimited.
    daily_request_limit: Option<u32>,
    capabilities: Vec<CapabilityEntry>,
}

/// Evaluates every known capability for a tier under the given policy.
pub fn entitlements_for(policy: &EntitlementPolicy, tier: Tier) -> EntitlementsResponse {
    EntitlementsResponse {
        tier: tier.as_str().to_string(),
        daily_request_limit: daily_request_limit(tier),
        capabilities: Capability::ALL
            .into_iter()
            .map(|capability| CapabilityEntry {
                capability: capability.as_str().to_string(),
                allowed: policy.can_use(tier, capability),
            })
            .collect(),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Report which capabilities a subscription tier unlocks.
#[utoipa::path(
    get,
    path = "/entitlements",
    params(EntitlementQuery),
    responses(
        (status = 200, description = "Entitlements for the tier", body = EntitlementsResponse),
        (status = 400, description = "Unknown tier")
    )
)]
pub async fn entitlements_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<EntitlementQuery>,
) -> Json<EntitlementsResponse> {
    let tier = query.tier.map(Tier::from).unwrap_or_default();
    info!("Entitlement lookup for tier '{}'.", tier);
    Json(entitlements_for(&app_state.policy, tier))
}
