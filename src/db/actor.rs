use crate::db::models::Provider;
use crate::db::schema::SQLITE_INIT;
use crate::error::SwitchyardError;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{str::FromStr, time::Duration};
use tracing::info;

#[derive(Debug)]
pub enum DbActorMessage {
    /// List every provider of an app type, in display order.
    ListProviders(String, RpcReplyPort<Result<Vec<Provider>, SwitchyardError>>),

    /// Rows of an app type flagged `is_current` (exactly one when the catalog is healthy).
    CurrentProviders(String, RpcReplyPort<Result<Vec<Provider>, SwitchyardError>>),

    /// Look up one provider by (provider_id, app_type).
    GetProvider(
        String,
        String,
        RpcReplyPort<Result<Option<Provider>, SwitchyardError>>,
    ),

    /// Move `is_current` to (provider_id, app_type) in a single transaction.
    SetCurrent(String, String, RpcReplyPort<Result<(), SwitchyardError>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn list_providers(&self, app_type: &str) -> Result<Vec<Provider>, SwitchyardError> {
        ractor::call!(self.actor, DbActorMessage::ListProviders, app_type.to_string()).map_err(
            |e| SwitchyardError::RactorError(format!("DbActor ListProviders RPC failed: {e}")),
        )?
    }

    pub async fn current_providers(
        &self,
        app_type: &str,
    ) -> Result<Vec<Provider>, SwitchyardError> {
        ractor::call!(
            self.actor,
            DbActorMessage::CurrentProviders,
            app_type.to_string()
        )
        .map_err(|e| {
            SwitchyardError::RactorError(format!("DbActor CurrentProviders RPC failed: {e}"))
        })?
    }

    pub async fn get_provider(
        &self,
        provider_id: &str,
        app_type: &str,
    ) -> Result<Option<Provider>, SwitchyardError> {
        ractor::call!(
            self.actor,
            DbActorMessage::GetProvider,
            provider_id.to_string(),
            app_type.to_string()
        )
        .map_err(|e| SwitchyardError::RactorError(format!("DbActor GetProvider RPC failed: {e}")))?
    }

    pub async fn set_current(&self, provider_id: &str, app_type: &str) -> Result<(), SwitchyardError> {
        ractor::call!(
            self.actor,
            DbActorMessage::SetCurrent,
            provider_id.to_string(),
            app_type.to_string()
        )
        .map_err(|e| SwitchyardError::RactorError(format!("DbActor SetCurrent RPC failed: {e}")))?
    }
}

/// How to open the catalog.
pub struct DbActorArgs {
    pub database_url: String,
    /// Run the schema DDL. Only for a catalog this process just created; an
    /// existing catalog belongs to the desktop app and is never altered.
    pub bootstrap_schema: bool,
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = DbActorArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        // Journal mode is left alone: the catalog belongs to the desktop app.
        let connect_opts = SqliteConnectOptions::from_str(args.database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        if args.bootstrap_schema {
            apply_schema(&pool)
                .await
                .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;
            info!("Bootstrapped empty provider catalog");
        }

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::ListProviders(app_type, reply) => {
                let res = self.list_providers(&state.pool, &app_type).await;
                let _ = reply.send(res);
            }
            DbActorMessage::CurrentProviders(app_type, reply) => {
                let res = self.current_providers(&state.pool, &app_type).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetProvider(provider_id, app_type, reply) => {
                let res = self.get_provider(&state.pool, &provider_id, &app_type).await;
                let _ = reply.send(res);
            }
            DbActorMessage::SetCurrent(provider_id, app_type, reply) => {
                let res = self.set_current(&state.pool, &provider_id, &app_type).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn list_providers(
        &self,
        pool: &SqlitePool,
        app_type: &str,
    ) -> Result<Vec<Provider>, SwitchyardError> {
        let rows = sqlx::query_as::<_, Provider>(
            r#"
        SELECT id, name, app_type, is_current, settings_config, sort_index
        FROM providers
        WHERE app_type = ?
        ORDER BY sort_index, name
        "#,
        )
        .bind(app_type)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn current_providers(
        &self,
        pool: &SqlitePool,
        app_type: &str,
    ) -> Result<Vec<Provider>, SwitchyardError> {
        let rows = sqlx::query_as::<_, Provider>(
            r#"
        SELECT id, name, app_type, is_current, settings_config, sort_index
        FROM providers
        WHERE app_type = ? AND is_current = 1
        ORDER BY sort_index, name
        "#,
        )
        .bind(app_type)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn get_provider(
        &self,
        pool: &SqlitePool,
        provider_id: &str,
        app_type: &str,
    ) -> Result<Option<Provider>, SwitchyardError> {
        let row = sqlx::query_as::<_, Provider>(
            r#"
        SELECT id, name, app_type, is_current, settings_config, sort_index
        FROM providers
        WHERE id = ? AND app_type = ?
        "#,
        )
        .bind(provider_id)
        .bind(app_type)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn set_current(
        &self,
        pool: &SqlitePool,
        provider_id: &str,
        app_type: &str,
    ) -> Result<(), SwitchyardError> {
        // Clear-then-set inside one transaction: readers see either the old or the
        // new current row, never zero or two.
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE providers SET is_current = 0 WHERE app_type = ?")
            .bind(app_type)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query("UPDATE providers SET is_current = 1 WHERE id = ? AND app_type = ?")
            .bind(provider_id)
            .bind(app_type)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated != 1 {
            // Dropping `tx` rolls the clear back.
            return Err(SwitchyardError::DatabaseError(sqlx::Error::RowNotFound));
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Spawn the database actor and return a cloneable handle.
///
/// `bootstrap_schema` creates the `providers` table and index; pass `true` only
/// when the catalog file did not exist before this call.
pub async fn spawn(
    database_url: &str,
    bootstrap_schema: bool,
) -> Result<DbActorHandle, SwitchyardError> {
    let args = DbActorArgs {
        database_url: database_url.to_string(),
        bootstrap_schema,
    };
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, args)
        .await
        .map_err(|e| SwitchyardError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), SwitchyardError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
