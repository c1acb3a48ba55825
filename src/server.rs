//! HTTP access layer.
//!
//! Exposes any [`Storage`] as a REST/JSON API built on `axum`. The routes
//! live in [`router`]; [`serve`] opens the configured backend and runs the
//! server until Ctrl-C.

mod config;
mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

pub use config::{Backend, DEFAULT_ADDR, DEFAULT_ALLOWED_ORIGIN, ServerConfig};
pub use error::ApiError;
pub use routes::router;

use crate::error::{Result, SplitbookError};
use crate::storage::Storage;

/// Opens the configured backend and serves the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the backend cannot be opened, the address cannot
/// be bound, or the server stops with an I/O failure.
#[tracing::instrument(skip_all, fields(addr = %config.addr))]
pub async fn serve(config: ServerConfig) -> Result<()> {
    let ServerConfig {
        addr,
        backend,
        allowed_origins,
    } = config;
    match backend {
        #[cfg(feature = "storage-file")]
        Backend::File { data_dir, seed_dir } => {
            let mut store = crate::storage::FileStorage::new(data_dir)?;
            if let Some(seed_dir) = seed_dir {
                store = store.with_seed_dir(seed_dir);
            }
            tracing::info!(dir = %store.dir().display(), "using file storage");
            serve_store(Arc::new(store), addr, &allowed_origins).await
        }
        #[cfg(feature = "storage-sqlx")]
        Backend::Sqlite { url, seed_dir } => {
            let store = crate::storage::SqliteStorage::connect(&url, seed_dir).await?;
            tracing::info!(url = %url, "using sqlite storage");
            serve_store(Arc::new(store), addr, &allowed_origins).await
        }
    }
}

/// Serves the API over an already opened store until Ctrl-C.
///
/// # Errors
///
/// Returns [`SplitbookError::Server`] if the address cannot be bound or the
/// server stops with an I/O failure.
pub async fn serve_store<S: Storage + 'static>(
    store: Arc<S>,
    addr: SocketAddr,
    allowed_origins: &[String],
) -> Result<()> {
    let app = router(store, allowed_origins);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(SplitbookError::Server)?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(SplitbookError::Server)?;
    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "could not listen for Ctrl-C");
        core::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[cfg(all(test, feature = "storage-file"))]
mod tests {
    use std::path::Path;

    use serde_json::{Value, json};

    use super::*;
    use crate::client::SplitbookClient;
    use crate::models::{Amount, ExpenseId, NewExpense, NewTopUp, NewTransfer, UserId};
    use crate::storage::{Collection, FileStorage};

    const EXPENSE_SEED: &str = r#"[
        {"id": 1, "date": "2024-01-01", "description": "Rent", "payer": "Alice", "amount": 800},
        {"id": 2, "date": "2024-01-02", "description": "Pizza", "payer": "Bob", "amount": 24.5}
    ]"#;

    const USER_SEED: &str = r#"[
        {"id": 1, "name": "Alice", "email": "alice@example.com"},
        {"id": 2, "name": "Bob", "email": "bob@example.com"}
    ]"#;

    /// A running server on an ephemeral port plus a client pointed at it.
    struct TestServer {
        base_url: String,
        client: SplitbookClient,
        dir: tempfile::TempDir,
    }

    fn write_seed(dir: &Path, collection: Collection, json: &str) {
        std::fs::write(dir.join(collection.seed_file_name()), json).unwrap();
    }

    async fn start() -> TestServer {
        let dir = tempfile::tempdir().unwrap();
        write_seed(dir.path(), Collection::Expenses, EXPENSE_SEED);
        write_seed(dir.path(), Collection::Users, USER_SEED);
        write_seed(dir.path(), Collection::Transactions, "[]");
        let store = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());

        let app = router(store, &[DEFAULT_ALLOWED_ORIGIN.to_owned()]);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move { axum::serve(listener, app).await });

        let base_url = format!("http://{addr}");
        let client = SplitbookClient::builder()
            .base_url(base_url.clone())
            .build()
            .unwrap();
        TestServer {
            base_url,
            client,
            dir,
        }
    }

    fn lunch() -> NewExpense {
        NewExpense {
            date: "2024-01-03".to_owned(),
            description: "Lunch".to_owned(),
            payer: "Alice".to_owned(),
            amount: 12.5,
        }
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let server = start().await;
        let status = server.client.health().await.unwrap();
        assert_eq!(status.status, "ok");
    }

    #[tokio::test]
    async fn reset_create_delete_roundtrip() {
        let server = start().await;
        let client = &server.client;

        let seed = client.reset_expenses().await.unwrap();
        assert_eq!(seed.len(), 2);

        let created = client.create_expense(lunch()).await.unwrap();
        assert_eq!(created.id, ExpenseId::new(3));
        let listed = client.expenses().await.unwrap();
        assert_eq!(listed.last(), Some(&created));

        assert!(client.delete_expense(ExpenseId::new(1)).await.unwrap());
        assert!(!client.delete_expense(ExpenseId::new(1)).await.unwrap());
        assert!(client.expense(ExpenseId::new(1)).await.unwrap().is_none());
        assert_eq!(
            client.expense(created.id).await.unwrap().as_ref(),
            Some(&created)
        );
        assert_eq!(client.expenses().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_expense_is_rejected_and_not_stored() {
        let server = start().await;
        let response = reqwest::Client::new()
            .post(format!("{}/api/expenses", server.base_url))
            .json(&json!({"date": "2024-01-01", "description": "x", "amount": "12"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("payer"));
        assert!(server.client.expenses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let server = start().await;
        let response = reqwest::Client::new()
            .post(format!("{}/api/topups", server.base_url))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn bad_expense_id_is_bad_request() {
        let server = start().await;
        let response = reqwest::Client::new()
            .get(format!("{}/api/expenses/abc", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn topups_keep_text_amounts() {
        let server = start().await;
        let created = server
            .client
            .create_topup(NewTopUp {
                user: "Bob".to_owned(),
                amount: Amount::Text("20".to_owned()),
            })
            .await
            .unwrap();
        assert_eq!(created.amount, Amount::Text("20".to_owned()));
        let listed = server.client.topups().await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn transfers_between_seeded_users() {
        let server = start().await;
        let client = &server.client;
        let users = client.reset_users().await.unwrap();
        assert_eq!(users.len(), 2);
        let _empty = client.reset_transactions().await.unwrap();

        let transfer = client
            .create_transfer(NewTransfer {
                amount: 15.0,
                date: None,
                source_id: UserId::new(2),
                target_id: UserId::new(1),
            })
            .await
            .unwrap();
        assert_eq!(transfer.source.name, "Bob");
        assert_eq!(client.transactions().await.unwrap().len(), 1);

        let err = client
            .create_transfer(NewTransfer {
                amount: 15.0,
                date: None,
                source_id: UserId::new(2),
                target_id: UserId::new(9),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SplitbookError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn expense_details_resolve_users() {
        let server = start().await;
        write_seed(
            server.dir.path(),
            Collection::Transactions,
            r#"[{
                "id": 1, "kind": "expense", "description": "Dinner", "amount": 60,
                "date": "2024-02-10", "payer": {"id": 1, "name": "Alice"},
                "participants": [{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]
            }]"#,
        );
        let client = &server.client;
        let _users = client.reset_users().await.unwrap();
        let _transactions = client.reset_transactions().await.unwrap();
        let transfer = client
            .create_transfer(NewTransfer {
                amount: 5.0,
                date: None,
                source_id: UserId::new(1),
                target_id: UserId::new(2),
            })
            .await
            .unwrap();

        let http = reqwest::Client::new();
        let details_url = |id: String| format!("{}/api/transactions/{id}/details", server.base_url);
        let response = http.get(details_url("1".to_owned())).send().await.unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["payer"]["email"], "alice@example.com");
        assert_eq!(body["participants"][1]["name"], "Bob");

        let response = http.get(details_url(transfer.id.to_string())).send().await.unwrap();
        assert_eq!(response.status(), 404);
        let response = http.get(details_url("99".to_owned())).send().await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn missing_seed_is_server_error() {
        let server = start().await;
        std::fs::remove_file(server.dir.path().join("expenses.init.json")).unwrap();
        let err = server.client.reset_expenses().await.unwrap_err();
        assert!(matches!(err, SplitbookError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let server = start().await;
        let response = reqwest::Client::new()
            .get(format!("{}/api/expenses", server.base_url))
            .header("origin", DEFAULT_ALLOWED_ORIGIN)
            .send()
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some(DEFAULT_ALLOWED_ORIGIN)
        );
    }
}
