use async_trait::async_trait;
use rapido_core::repository::ClientRepository;
use rapido_core::{Client, ClientPatch, CoreError, CoreResult, NewClient};
use sqlx::{PgConnection, PgPool};
use tracing::warn;

use crate::database::{map_db_error, tx_error, Statement};

pub struct StoreClientRepository {
    pool: PgPool,
}

impl StoreClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ClientRow {
    id_cliente: i32,
    nome_completo: String,
    cpf: String,
    telefone: String,
    email: String,
    endereco_completo: String,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id_cliente,
            full_name: row.nome_completo,
            tax_id: row.cpf,
            phone: row.telefone,
            email: row.email,
            address: row.endereco_completo,
        }
    }
}

const SELECT_CLIENT: &str =
    "SELECT id_cliente, nome_completo, cpf, telefone, email, endereco_completo FROM clientes";

async fn write_client_patch(conn: &mut PgConnection, id: i32, patch: &ClientPatch) -> CoreResult<u64> {
    let row = sqlx::query_as::<_, ClientRow>(&format!("{} WHERE id_cliente = $1 FOR UPDATE", SELECT_CLIENT))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(tx_error)?;

    let mut client: Client = row
        .ok_or_else(|| CoreError::NotFoundError(format!("client {} does not exist", id)))?
        .into();
    patch.apply(&mut client);

    let result = sqlx::query(
        "UPDATE clientes SET nome_completo = $1, telefone = $2, email = $3, endereco_completo = $4 WHERE id_cliente = $5",
    )
    .bind(&client.full_name)
    .bind(&client.phone)
    .bind(&client.email)
    .bind(&client.address)
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(tx_error)?;

    Ok(result.rows_affected())
}

#[async_trait]
impl ClientRepository for StoreClientRepository {
    async fn create_client(&self, client: &NewClient) -> CoreResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO clientes (nome_completo, cpf, telefone, email, endereco_completo)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id_cliente
            "#,
        )
        .bind(&client.full_name)
        .bind(&client.tax_id)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(&client.address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, Statement::Insert, &format!("client with cpf {}", client.tax_id)))
    }

    async fn find_client_by_tax_id(&self, tax_id: &str) -> CoreResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(&format!("{} WHERE cpf = $1", SELECT_CLIENT))
            .bind(tax_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, Statement::Select, "client"))?;

        Ok(row.map(Client::from))
    }

    async fn list_clients(&self) -> CoreResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!("{} ORDER BY id_cliente", SELECT_CLIENT))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, Statement::Select, "client"))?;

        Ok(rows.into_iter().map(Client::from).collect())
    }

    async fn get_client(&self, id: i32) -> CoreResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(&format!("{} WHERE id_cliente = $1", SELECT_CLIENT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, Statement::Select, "client"))?;

        Ok(row.map(Client::from))
    }

    async fn update_client(&self, id: i32, patch: &ClientPatch) -> CoreResult<u64> {
        let mut tx = self.pool.begin().await.map_err(tx_error)?;

        match write_client_patch(&mut tx, id, patch).await {
            Ok(rows) => {
                tx.commit().await.map_err(tx_error)?;
                Ok(rows)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback of client {} update failed: {}", id, rollback);
                }
                Err(e)
            }
        }
    }

    async fn delete_client(&self, id: i32) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM clientes WHERE id_cliente = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, Statement::Delete, &format!("client {}", id)))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFoundError(format!("client {} does not exist", id)));
        }
        Ok(result.rows_affected())
    }
}
