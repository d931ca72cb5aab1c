//! Request handlers — thin wrappers that parse input, call one core
//! operation, and shape the JSON reply.
//!
//! Argon2id-heavy operations (account creation, login, password rotation)
//! run on the blocking pool so a key derivation never stalls the runtime.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use coffre_crypto_core::password;
use coffre_vault::{ExportFormat, Vault, VaultError};

use crate::error::ApiError;

/// Shared handler state.
pub type AppState = Arc<Vault>;

/// Run a KDF-heavy closure on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, VaultError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError(VaultError::Database(format!("blocking task failed: {e}"))))?
        .map_err(ApiError)
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AccountRequest {
    username: Option<String>,
    master_password: Option<String>,
}

/// `POST /account/create`
pub async fn create_account(
    State(vault): State<AppState>,
    Json(req): Json<AccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(master_password)) = (req.username, req.master_password) else {
        return Err(ApiError(VaultError::Validation("missing fields".into())));
    };
    blocking(move || vault.create_account(&username, &master_password)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "account created" })),
    ))
}

/// `POST /account/login`
///
/// Missing fields get the same generic rejection as a wrong password — the
/// response never distinguishes why a login failed.
pub async fn login(
    State(vault): State<AppState>,
    Json(req): Json<AccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(master_password)) = (req.username, req.master_password) else {
        return Err(ApiError(VaultError::IncorrectCredentials));
    };
    blocking(move || vault.login(&username, &master_password)).await?;
    Ok(Json(json!({ "status": "logged in" })))
}

/// `POST /account/logout`
pub async fn logout(State(vault): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    vault.logout()?;
    Ok(Json(json!({ "status": "vault locked" })))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    new_password: Option<String>,
}

/// `PUT /account/password`
pub async fn change_master_password(
    State(vault): State<AppState>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(new_password) = req.new_password else {
        return Err(ApiError(VaultError::Validation("missing fields".into())));
    };
    blocking(move || vault.change_master_password(&new_password)).await?;
    Ok(Json(json!({ "status": "password updated" })))
}

/// `GET /account/lockout-status`
pub async fn lockout_status(
    State(vault): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(vault.lockout_status()?))
}

// ---------------------------------------------------------------------------
// Lock state
// ---------------------------------------------------------------------------

/// `POST /lock`
pub async fn lock(State(vault): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    vault.lock()?;
    Ok(Json(json!({ "status": "vault locked" })))
}

/// `POST /unlock`
pub async fn unlock(State(vault): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    vault.unlock()?;
    Ok(Json(json!({ "status": "vault unlocked" })))
}

/// `GET /status`
pub async fn status(State(vault): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(json!({ "vault_locked": vault.is_locked()? })))
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CredentialRequest {
    site: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// `POST /add`
pub async fn add_credential(
    State(vault): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(site), Some(username), Some(password)) = (req.site, req.username, req.password)
    else {
        return Err(ApiError(VaultError::Validation("missing fields".into())));
    };
    let (id, created_at) = vault.add_credential(&site, &username, &password)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "added", "id": id, "created_at": created_at })),
    ))
}

/// `GET /get/{id}`
pub async fn get_credential(
    State(vault): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(vault.get_credential(id)?))
}

/// `GET /list`
pub async fn list_credentials(
    State(vault): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(vault.list_credentials()?))
}

#[derive(Deserialize)]
pub struct UpdateCredentialRequest {
    id: Option<i64>,
    site: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// `PUT /update`
pub async fn update_credential(
    State(vault): State<AppState>,
    Json(req): Json<UpdateCredentialRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(id) = req.id else {
        return Err(ApiError(VaultError::Validation("missing id".into())));
    };
    let (Some(site), Some(username), Some(password)) = (req.site, req.username, req.password)
    else {
        return Err(ApiError(VaultError::Validation("missing fields".into())));
    };
    vault.update_credential(id, &site, &username, &password)?;
    Ok(Json(json!({ "status": "updated", "id": id })))
}

/// `DELETE /delete/{id}`
pub async fn delete_credential(
    State(vault): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(vault.delete_credential(id)?))
}

#[derive(Deserialize)]
pub struct CheckDuplicateRequest {
    site: Option<String>,
    username: Option<String>,
}

/// `POST /check-duplicate`
pub async fn check_duplicate(
    State(vault): State<AppState>,
    Json(req): Json<CheckDuplicateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(site), Some(username)) = (req.site, req.username) else {
        return Err(ApiError(VaultError::Validation("missing fields".into())));
    };
    let duplicate = vault.check_duplicate(&site, &username)?;
    Ok(Json(json!({ "duplicate": duplicate })))
}

// ---------------------------------------------------------------------------
// Password helpers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct GeneratePasswordQuery {
    length: Option<usize>,
}

/// `GET /generate-password`
pub async fn generate_password(
    Query(query): Query<GeneratePasswordQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let length = query.length.unwrap_or(password::DEFAULT_PASSWORD_LENGTH);
    let generated = password::generate(length)
        .map_err(|e| ApiError(VaultError::Validation(e.to_string())))?;
    Ok(Json(json!({ "password": generated })))
}

#[derive(Deserialize)]
pub struct StrengthRequest {
    password: Option<String>,
}

/// `POST /password-strength` — informational only, gates nothing.
pub async fn password_strength(
    Json(req): Json<StrengthRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(pw) = req.password else {
        return Err(ApiError(VaultError::Validation("missing fields".into())));
    };
    let strength = password::estimate_strength(&pw);
    Ok(Json(json!({ "strength": strength.as_str() })))
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ImportQuery {
    allow_duplicates: Option<bool>,
}

/// `POST /import` — body is raw CSV text.
pub async fn import_csv(
    State(vault): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let allow_duplicates = query.allow_duplicates.unwrap_or(false);
    let summary = vault.import_csv(&body, allow_duplicates)?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct ExportQuery {
    format: Option<String>,
}

/// `GET /export?format=json|csv` — plaintext output; warning the user is
/// the client's job.
pub async fn export(
    State(vault): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let format = ExportFormat::parse(query.format.as_deref().unwrap_or("json"))?;
    let body = vault.export(format)?;
    let content_type = match format {
        ExportFormat::Json => "application/json",
        ExportFormat::Csv => "text/csv; charset=utf-8",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], body))
}
