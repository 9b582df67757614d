use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rapido_core::{Client, ClientPatch, NewClient};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::envelope::{envelope, Envelope};
use crate::error::AppError;
use crate::extract::{parse_id, ApiJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clientes", get(list_clients).post(create_client))
        .route(
            "/clientes/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateClientRequest {
    #[serde(rename = "nomeCom")]
    #[validate(length(min = 3, max = 150, message = "nomeCom must have between 3 and 150 characters"))]
    pub full_name: String,
    #[validate(length(equal = 11, message = "cpf must have exactly 11 characters"))]
    pub cpf: String,
    #[serde(rename = "telefoneCli")]
    #[validate(length(equal = 11, message = "telefoneCli must have exactly 11 characters"))]
    pub phone: String,
    #[serde(rename = "emailCli")]
    #[validate(length(min = 1, max = 150, message = "emailCli is required"))]
    pub email: String,
    #[serde(rename = "enderecoCom")]
    #[validate(length(min = 1, max = 255, message = "enderecoCom is required"))]
    pub address: String,
}

impl CreateClientRequest {
    fn trimmed(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            cpf: self.cpf.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            address: self.address.trim().to_string(),
        }
    }

    fn into_new_client(self) -> NewClient {
        NewClient {
            full_name: self.full_name,
            tax_id: self.cpf,
            phone: self.phone,
            email: self.email,
            address: self.address,
        }
    }
}

/// Every field optional; the tax id is immutable
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateClientRequest {
    #[serde(rename = "nomeCom")]
    #[validate(length(min = 3, max = 150, message = "nomeCom must have between 3 and 150 characters"))]
    pub full_name: Option<String>,
    #[serde(rename = "telefoneCli")]
    #[validate(length(equal = 11, message = "telefoneCli must have exactly 11 characters"))]
    pub phone: Option<String>,
    #[serde(rename = "emailCli")]
    #[validate(length(min = 1, max = 150, message = "emailCli must not be empty"))]
    pub email: Option<String>,
    #[serde(rename = "enderecoCom")]
    #[validate(length(min = 1, max = 255, message = "enderecoCom must not be empty"))]
    pub address: Option<String>,
}

impl UpdateClientRequest {
    fn trimmed(self) -> Self {
        let trim = |s: Option<String>| s.map(|s| s.trim().to_string());
        Self {
            full_name: trim(self.full_name),
            phone: trim(self.phone),
            email: trim(self.email),
            address: trim(self.address),
        }
    }

    fn into_patch(self) -> ClientPatch {
        ClientPatch {
            full_name: self.full_name,
            phone: self.phone,
            email: self.email,
            address: self.address,
        }
    }
}

pub async fn create_client(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Envelope<Value>>), AppError> {
    let req = req.trimmed();
    req.validate()?;

    if state.clients.find_client_by_tax_id(&req.cpf).await?.is_some() {
        return Err(AppError::ConflictError(format!(
            "A client with cpf {} is already registered",
            req.cpf
        )));
    }

    let id = state.clients.create_client(&req.into_new_client()).await?;
    info!("Client {} registered", id);

    Ok((
        StatusCode::CREATED,
        envelope("Client registered", json!({ "id_cliente": id })),
    ))
}

pub async fn list_clients(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<Client>>>, AppError> {
    let clients = state.clients.list_clients().await?;
    Ok(envelope("Clients listed", clients))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Client>>, AppError> {
    let id = parse_id(&id, "idCliente")?;
    let client = state
        .clients
        .get_client(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Client {} not found", id)))?;

    Ok(envelope("Client found", client))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateClientRequest>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let id = parse_id(&id, "idCliente")?;
    let req = req.trimmed();
    req.validate()?;

    let patch = req.into_patch();
    if patch.is_empty() {
        return Err(AppError::ValidationError(
            "At least one field must be provided".to_string(),
        ));
    }

    let rows = state.clients.update_client(id, &patch).await?;
    info!("Client {} updated", id);

    Ok(envelope("Client updated", json!({ "affected_rows": rows })))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let id = parse_id(&id, "id")?;
    let rows = state.clients.delete_client(id).await?;
    info!("Client {} deleted", id);

    Ok(envelope("Client deleted", json!({ "affected_rows": rows })))
}
