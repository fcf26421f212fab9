// src/services/api_server.rs
//! HTTP API for the credential engine.
//!
//! Endpoints:
//! - `GET    /issuer` issuer public key
//! - `POST   /credentials/issue` issue and store a credential
//! - `GET    /credentials/:id?holder=` decrypt a stored credential
//! - `DELETE /credentials/:id` local deletion (not revocation)
//! - `GET    /holders/:holder/credentials`, `GET /issuers/:issuer/credentials` index queries
//! - `POST   /proofs/inputs` holder presentation preparation
//! - `POST   /proofs/format` on-chain calldata encoding
//! - `POST   /proofs/check` verifier checks
//! - `POST   /revocations` issuer revocation
//! - `POST   /revocations/events` append a signed event from elsewhere
//! - `GET    /revocations/:id?issuer=` revocation by one issuer (defaults to this node's issuer)
//! - `GET    /revocations/export`, `POST /revocations/merge`
//!
//! Invalid input maps to 400, failed verification to 422, missing records to
//! 404 and internal failures to 500. Every error body is JSON with `error`
//! and `class`, including bodies and query strings that fail to parse.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Json, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::{CredentialError, ErrorClass};
use crate::models::{CredentialAttributes, DisclosureScope, RevocationEvent, SignedCredential};
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::verifier::{VerificationReport, Verifier};
use crate::storage::{AppendOutcome, LedgerSnapshot, MergeReport, RevocationLedger};
use crate::wallet::credential_storage::{CredentialIndex, CredentialStorage};
use crate::wallet::zkp_generation::{prepare_presentation, Presentation};
use crate::zkp::proof_contract::{format_for_chain, ChainCalldata};
use crate::wallet::key_management::canonical_public_key;
use crate::zkp::ZKProof;

/// Error wrapper that renders a [`CredentialError`] as an HTTP response.
pub struct ApiError(CredentialError);

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CredentialError::InvalidRequest(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(CredentialError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, class) = match (&self.0, self.0.class()) {
            (CredentialError::NotFound(_), _) => (StatusCode::NOT_FOUND, "not_found"),
            (_, ErrorClass::InvalidInput) => (StatusCode::BAD_REQUEST, "invalid_input"),
            (_, ErrorClass::VerificationFailed) => (StatusCode::UNPROCESSABLE_ENTITY, "verification_failed"),
            (_, ErrorClass::Internal) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string(), "class": class }))).into_response()
    }
}

/// JSON body extractor whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct ApiJson<T>(T);

/// Query string extractor whose rejections render as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
struct ApiQuery<T>(T);

type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;

fn ok<T>(body: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(body)))
}

// API request and response structures

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuerResponse {
    public_key: String,
}

#[derive(Deserialize)]
struct HolderQuery {
    holder: String,
}

#[derive(Deserialize)]
struct IssuerQuery {
    issuer: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrepareProofRequest {
    credential_id: String,
    holder_public_key: String,
    scope: DisclosureScope,
    now: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckProofRequest {
    proof: ZKProof,
    now: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevokeRequest {
    credential_id: String,
    reason: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    outcome: AppendOutcome,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevocationStatus {
    credential_id: String,
    issuer_public_key: String,
    revoked: bool,
    event: Option<RevocationEvent>,
}

/// API server state containing all service dependencies.
#[derive(Clone)]
pub struct ApiServer {
    credential_issuer: Arc<CredentialIssuer>,
    verifier: Arc<Verifier>,
    ledger: Arc<RevocationLedger>,
    store: Arc<CredentialStorage>,
    verifier_contract_address: String,
}

impl ApiServer {
    /// Creates a new instance of the API server.
    ///
    /// # Arguments
    /// * `credential_issuer` - Issuer service
    /// * `verifier` - Verifier service
    /// * `ledger` - Revocation ledger replica shared with both services
    /// * `store` - Encrypted credential store
    /// * `verifier_contract_address` - Address recorded in generated proofs
    pub fn new(
        credential_issuer: Arc<CredentialIssuer>,
        verifier: Arc<Verifier>,
        ledger: Arc<RevocationLedger>,
        store: Arc<CredentialStorage>,
        verifier_contract_address: String,
    ) -> Self {
        Self {
            credential_issuer,
            verifier,
            ledger,
            store,
            verifier_contract_address,
        }
    }

    pub fn verifier_contract_address(&self) -> &str {
        &self.verifier_contract_address
    }

    /// Builds the router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/issuer", get(Self::issuer_handler))
            .route("/credentials/issue", post(Self::issue_credential_handler))
            .route(
                "/credentials/:id",
                get(Self::get_credential_handler).delete(Self::delete_credential_handler),
            )
            .route("/holders/:holder/credentials", get(Self::holder_credentials_handler))
            .route("/issuers/:issuer/credentials", get(Self::issuer_credentials_handler))
            .route("/proofs/inputs", post(Self::prepare_proof_handler))
            .route("/proofs/format", post(Self::format_proof_handler))
            .route("/proofs/check", post(Self::check_proof_handler))
            .route("/revocations", post(Self::revoke_handler))
            .route("/revocations/events", post(Self::append_event_handler))
            .route("/revocations/export", get(Self::export_ledger_handler))
            .route("/revocations/merge", post(Self::merge_ledger_handler))
            .route("/revocations/:id", get(Self::revocation_status_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests.
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API listening on {addr}");
        axum::serve(listener, app).await
    }

    async fn issuer_handler(State(state): State<Arc<ApiServer>>) -> ApiResult<IssuerResponse> {
        ok(IssuerResponse {
            public_key: state.credential_issuer.public_key(),
        })
    }

    /// Issues a credential and keeps an encrypted copy in the store.
    async fn issue_credential_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(attributes): ApiJson<CredentialAttributes>,
    ) -> ApiResult<SignedCredential> {
        let signed = state.credential_issuer.issue(attributes)?;
        state.store.put(&signed)?;
        Ok((StatusCode::CREATED, Json(signed)))
    }

    async fn get_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        ApiQuery(query): ApiQuery<HolderQuery>,
    ) -> ApiResult<SignedCredential> {
        match state.store.get(&id, &query.holder)? {
            Some(signed) => ok(signed),
            None => Err(CredentialError::NotFound(id).into()),
        }
    }

    async fn delete_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> Result<StatusCode, ApiError> {
        if state.store.delete(&id) {
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(CredentialError::NotFound(id).into())
        }
    }

    async fn holder_credentials_handler(
        State(state): State<Arc<ApiServer>>,
        Path(holder): Path<String>,
    ) -> ApiResult<Vec<CredentialIndex>> {
        ok(state.store.by_holder(&holder))
    }

    async fn issuer_credentials_handler(
        State(state): State<Arc<ApiServer>>,
        Path(issuer): Path<String>,
    ) -> ApiResult<Vec<CredentialIndex>> {
        ok(state.store.by_issuer(&issuer))
    }

    async fn prepare_proof_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(payload): ApiJson<PrepareProofRequest>,
    ) -> ApiResult<Presentation> {
        let now = payload.now.unwrap_or_else(|| Utc::now().timestamp());
        ok(prepare_presentation(
            &state.store,
            &payload.credential_id,
            &payload.holder_public_key,
            &payload.scope,
            now,
        )?)
    }

    async fn format_proof_handler(ApiJson(proof): ApiJson<ZKProof>) -> ApiResult<ChainCalldata> {
        ok(format_for_chain(&proof))
    }

    async fn check_proof_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(payload): ApiJson<CheckProofRequest>,
    ) -> ApiResult<VerificationReport> {
        let now = payload.now.unwrap_or_else(|| Utc::now().timestamp());
        ok(state.verifier.check_proof(&payload.proof, now)?)
    }

    async fn revoke_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(payload): ApiJson<RevokeRequest>,
    ) -> ApiResult<RevocationEvent> {
        ok(state.credential_issuer.revoke(&payload.credential_id, payload.reason)?)
    }

    async fn append_event_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(event): ApiJson<RevocationEvent>,
    ) -> ApiResult<AppendResponse> {
        ok(AppendResponse {
            outcome: state.ledger.append(event)?,
        })
    }

    async fn revocation_status_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        ApiQuery(query): ApiQuery<IssuerQuery>,
    ) -> ApiResult<RevocationStatus> {
        let issuer = match query.issuer {
            Some(issuer) => canonical_public_key(&issuer)?,
            None => state.credential_issuer.public_key(),
        };
        let event = state.ledger.get_revocation(&id, &issuer);
        ok(RevocationStatus {
            revoked: event.is_some(),
            credential_id: id,
            issuer_public_key: issuer,
            event,
        })
    }

    async fn export_ledger_handler(State(state): State<Arc<ApiServer>>) -> ApiResult<LedgerSnapshot> {
        ok(state.ledger.export())
    }

    async fn merge_ledger_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(snapshot): ApiJson<LedgerSnapshot>,
    ) -> ApiResult<MergeReport> {
        ok(state.ledger.merge(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::fixtures::college_attributes;
    use crate::services::verifier::VerifierPolicy;
    use crate::wallet::KeyManager;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn server() -> ApiServer {
        let ledger = Arc::new(RevocationLedger::new());
        let issuer = Arc::new(CredentialIssuer::new(KeyManager::generate(), Arc::clone(&ledger)));
        let verifier = Arc::new(Verifier::new(Arc::clone(&ledger), VerifierPolicy::default()).unwrap());
        let store = Arc::new(CredentialStorage::new(b"api-test".to_vec()));
        ApiServer::new(issuer, verifier, ledger, store, "0xverifier".into())
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn college_body() -> Value {
        serde_json::to_value(CredentialAttributes::CollegeId(college_attributes())).unwrap()
    }

    #[tokio::test]
    async fn test_issue_fetch_and_list() {
        let app = server().router();
        let (status, issued) = call(&app, Method::POST, "/credentials/issue", Some(college_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = issued["credential"]["credentialId"].as_str().unwrap().to_string();

        let (status, fetched) = call(&app, Method::GET, &format!("/credentials/{id}?holder=0x02holder"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, issued);

        let (status, _) = call(&app, Method::GET, &format!("/credentials/{id}?holder=0x02intruder"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, listed) = call(&app, Method::GET, "/holders/0x02holder/credentials", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_is_400() {
        let app = server().router();
        let mut body = college_body();
        body["fields"]["yearOfStudy"] = Value::from(-2);
        let (status, error) = call(&app, Method::POST, "/credentials/issue", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["class"], "invalid_input");
    }

    #[tokio::test]
    async fn test_unparseable_body_is_400_json() {
        let app = server().router();
        let mut body = college_body();
        body["credentialType"] = Value::from("passport");
        let (status, error) = call(&app, Method::POST, "/credentials/issue", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["class"], "invalid_input");

        let proof = json!({ "proof": { "credentialType": "passport", "publicInputs": [] } });
        let (status, error) = call(&app, Method::POST, "/proofs/check", Some(proof)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["class"], "invalid_input");
        assert!(error["error"].as_str().unwrap().starts_with("invalid request"));
    }

    #[tokio::test]
    async fn test_malformed_json_and_query_are_400_json() {
        let app = server().router();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/revocations")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error["class"], "invalid_input");

        let (status, error) = call(&app, Method::GET, "/credentials/cred-1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["class"], "invalid_input");
    }

    #[tokio::test]
    async fn test_prepare_and_check_proof() {
        let api = server();
        let app = api.router();
        let (_, issued) = call(&app, Method::POST, "/credentials/issue", Some(college_body())).await;
        let id = issued["credential"]["credentialId"].as_str().unwrap();

        let (status, presentation) = call(
            &app,
            Method::POST,
            "/proofs/inputs",
            Some(json!({
                "credentialId": id,
                "holderPublicKey": "0x02holder",
                "scope": { "fields": ["institutionName"], "predicates": ["age_over_18", "status_active"] }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(presentation["disclosedFields"]["institutionName"], "MIT");

        let proof = json!({
            "proofBytes": "0x01",
            "publicInputs": presentation["circuitInputs"]["publicInputs"],
            "credentialType": "college-id",
            "disclosedFields": presentation["disclosedFields"],
            "verifierContractAddress": api.verifier_contract_address(),
        });
        let (status, report) = call(&app, Method::POST, "/proofs/check", Some(json!({ "proof": proof }))).await;
        assert_eq!(status, StatusCode::OK, "{report}");
        assert_eq!(report["credentialId"], id);

        let (status, calldata) = call(&app, Method::POST, "/proofs/format", Some(proof)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calldata["proofBytes"], "0x01");
    }

    #[tokio::test]
    async fn test_revocation_flow() {
        let app = server().router();
        let (_, issued) = call(&app, Method::POST, "/credentials/issue", Some(college_body())).await;
        let id = issued["credential"]["credentialId"].as_str().unwrap();

        let (status, _) = call(&app, Method::POST, "/revocations", Some(json!({ "credentialId": id, "reason": "expelled" }))).await;
        assert_eq!(status, StatusCode::OK);

        let issuer = issued["issuerPublicKey"].as_str().unwrap();
        let (_, status_body) = call(&app, Method::GET, &format!("/revocations/{id}"), None).await;
        assert_eq!(status_body["revoked"], true);
        assert_eq!(status_body["issuerPublicKey"], issuer);
        assert_eq!(status_body["event"]["reason"], "expelled");

        let (_, scoped) = call(&app, Method::GET, &format!("/revocations/{id}?issuer={issuer}"), None).await;
        assert_eq!(scoped["revoked"], true);
        let other = KeyManager::generate().public_key_hex();
        let (_, unrelated) = call(&app, Method::GET, &format!("/revocations/{id}?issuer={other}"), None).await;
        assert_eq!(unrelated["revoked"], false);
        let (status, _) = call(&app, Method::GET, &format!("/revocations/{id}?issuer=nothex"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, snapshot) = call(&app, Method::GET, "/revocations/export", None).await;
        assert_eq!(snapshot["events"].as_array().unwrap().len(), 1);

        let forged = json!({
            "credentialId": id,
            "issuerPublicKey": other,
            "revokedAt": 5,
            "issuerSignature": "0x00"
        });
        let (status, _) = call(&app, Method::POST, "/revocations/events", Some(forged)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_delete_is_not_revocation() {
        let app = server().router();
        let (_, issued) = call(&app, Method::POST, "/credentials/issue", Some(college_body())).await;
        let id = issued["credential"]["credentialId"].as_str().unwrap();

        let (status, _) = call(&app, Method::DELETE, &format!("/credentials/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::DELETE, &format!("/credentials/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, status_body) = call(&app, Method::GET, &format!("/revocations/{id}"), None).await;
        assert_eq!(status_body["revoked"], false);
    }

    #[tokio::test]
    async fn test_issuer_key() {
        let app = server().router();
        let (status, body) = call(&app, Method::GET, "/issuer", None).await;
        assert_eq!(status, StatusCode::OK);
        tokio_test::assert_ok!(crate::wallet::key_management::parse_public_key(
            body["publicKey"].as_str().unwrap()
        ));
    }
}
