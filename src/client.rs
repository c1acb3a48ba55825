//! HTTP client for a splitbook server.
//!
//! Provides both async and blocking client variants behind feature flags.
//! Each client implements the matching storage trait, so anything written
//! against [`crate::storage::Storage`] or [`crate::storage::BlockingStorage`]
//! can run against a remote server as well as a local backend.

/// Default server address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// Expense collection path.
const EXPENSES_PATH: &str = "/api/expenses";

/// Expense reset path.
const EXPENSES_RESET_PATH: &str = "/api/expenses/reset";

/// Top-up collection path.
const TOPUPS_PATH: &str = "/api/topups";

/// User collection path.
const USERS_PATH: &str = "/api/users";

/// User reset path.
const USERS_RESET_PATH: &str = "/api/users/reset";

/// Transaction collection path.
const TRANSACTIONS_PATH: &str = "/api/transactions";

/// Transaction reset path.
const TRANSACTIONS_RESET_PATH: &str = "/api/transactions/reset";

/// Transfer creation path.
const TRANSFERS_PATH: &str = "/api/transfers";

/// Health check path.
const HEALTH_PATH: &str = "/api/health";

/// Generates a splitbook client (async or blocking) with builder, storage
/// implementation, and tests.
macro_rules! define_client {
    (
        client_name: $client:ident,
        builder_name: $builder:ident,
        storage_trait: $storage:ident,
        http_type: $http_type:ty,
        request_type: $req_type:ty,
        response_type: $resp_type:ty,
        client_doc: $client_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug, Default)]
        pub struct $builder {
            /// Base URL override.
            base_url: Option<String>,
        }

        impl $builder {
            /// Overrides the base URL (defaults to [`DEFAULT_BASE_URL`]).
            #[inline]
            #[must_use]
            pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
                self.base_url = Some(url.into());
                self
            }

            /// Builds the client.
            ///
            /// # Errors
            ///
            /// Returns [`SplitbookError::Http`] if the HTTP client fails to build.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub fn build(self) -> Result<$client> {
                let base_url = self
                    .base_url
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned())
                    .trim_end_matches('/')
                    .to_owned();
                tracing::debug!(base_url = %base_url, "building client");
                let http = <$http_type>::builder().build()?;

                Ok($client { http, base_url })
            }
        }

        #[doc = $client_doc]
        #[derive(Debug)]
        pub struct $client {
            /// Underlying HTTP client.
            http: $http_type,
            /// Server base URL, without a trailing slash.
            base_url: String,
        }

        impl $client {
            /// Creates a new builder for configuring the client.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder {
                $builder { base_url: None }
            }

            /// Returns the server base URL.
            #[inline]
            #[must_use]
            pub fn base_url(&self) -> &str {
                &self.base_url
            }

            /// Checks that the server is answering via `GET /api/health`.
            ///
            /// # Errors
            ///
            /// Returns an error if the server cannot be reached or answers
            /// with a non-success status.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn health(&self) -> Result<HealthStatus> {
                self.get_json(HEALTH_PATH) $( .$await_ext )?
            }

            /// Builds the absolute URL for `path`.
            fn url(&self, path: &str) -> String {
                format!("{}{path}", self.base_url)
            }

            /// Sends a GET request and deserializes the response.
            $($async_kw)? fn get_json<Resp: DeserializeOwned>(&self, path: &str) -> Result<Resp> {
                let request = self.http.get(self.url(path));
                let response = Self::send(request) $( .$await_ext )? ?;
                Self::decode(response) $( .$await_ext )?
            }

            /// Sends a JSON POST request and deserializes the response.
            $($async_kw)? fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
            where
                Req: Serialize + Sync,
                Resp: DeserializeOwned,
            {
                let request = self
                    .http
                    .post(self.url(path))
                    .header(CONTENT_TYPE, "application/json")
                    .json(body);
                let response = Self::send(request) $( .$await_ext )? ?;
                Self::decode(response) $( .$await_ext )?
            }

            /// Sends a body-less POST request and unwraps the `{data}` envelope.
            $($async_kw)? fn post_reset<Resp: DeserializeOwned>(&self, path: &str) -> Result<Vec<Resp>> {
                let request = self.http.post(self.url(path));
                let response = Self::send(request) $( .$await_ext )? ?;
                let envelope: DataEnvelope<Resp> = Self::decode(response) $( .$await_ext )? ?;
                Ok(envelope.into_inner())
            }

            /// Sends a request, logging the status it came back with.
            #[tracing::instrument(skip_all)]
            $($async_kw)? fn send(request: $req_type) -> Result<$resp_type> {
                let response: $resp_type = request.send() $( .$await_ext )? ?;
                tracing::debug!(status = %response.status(), url = %response.url(), "received response");
                Ok(response)
            }

            /// Parses a successful body, or turns any other status into
            /// [`SplitbookError::Api`].
            $($async_kw)? fn decode<Resp: DeserializeOwned>(response: $resp_type) -> Result<Resp> {
                let status = response.status();
                if status.is_success() {
                    let body = response.text() $( .$await_ext )? ?;
                    tracing::trace!(body_len = body.len(), "parsing response body");
                    serde_json::from_str(&body).map_err(SplitbookError::from)
                } else {
                    let message = response
                        .text()
                        $( .$await_ext )?
                        .unwrap_or_else(|_| "unknown error".to_owned());
                    tracing::debug!(status = status.as_u16(), message = %message, "API error");
                    Err(SplitbookError::Api {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
        }

        impl $storage for $client {
            #[inline]
            $($async_kw)? fn expenses(&self) -> Result<Vec<Expense>> {
                self.get_json(EXPENSES_PATH) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
                let request = self.http.get(self.url(&format!("{EXPENSES_PATH}/{id}")));
                let response = Self::send(request) $( .$await_ext )? ?;
                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                Self::decode(response) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn create_expense(&self, expense: NewExpense) -> Result<Expense> {
                self.post_json(EXPENSES_PATH, &expense) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn delete_expense(&self, id: ExpenseId) -> Result<bool> {
                let request = self.http.delete(self.url(&format!("{EXPENSES_PATH}/{id}")));
                let response = Self::send(request) $( .$await_ext )? ?;
                Self::decode(response) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn reset_expenses(&self) -> Result<Vec<Expense>> {
                self.post_reset(EXPENSES_RESET_PATH) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn topups(&self) -> Result<Vec<TopUp>> {
                self.get_json(TOPUPS_PATH) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn create_topup(&self, topup: NewTopUp) -> Result<TopUp> {
                self.post_json(TOPUPS_PATH, &topup) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn users(&self) -> Result<Vec<User>> {
                self.get_json(USERS_PATH) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn reset_users(&self) -> Result<Vec<User>> {
                self.post_reset(USERS_RESET_PATH) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn transactions(&self) -> Result<Vec<Transaction>> {
                self.get_json(TRANSACTIONS_PATH) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn create_transfer(&self, transfer: NewTransfer) -> Result<Transfer> {
                self.post_json(TRANSFERS_PATH, &transfer) $( .$await_ext )?
            }

            #[inline]
            $($async_kw)? fn reset_transactions(&self) -> Result<Vec<Transaction>> {
                self.post_reset(TRANSACTIONS_RESET_PATH) $( .$await_ext )?
            }
        }

    };
}

#[cfg(feature = "async")]
mod async_client {
    //! Async HTTP client for a splitbook server.

    use reqwest::StatusCode;
    use reqwest::header::CONTENT_TYPE;
    use serde::Serialize;
    use serde::de::DeserializeOwned;

    use super::{
        DEFAULT_BASE_URL, EXPENSES_PATH, EXPENSES_RESET_PATH, HEALTH_PATH, TOPUPS_PATH,
        TRANSACTIONS_PATH, TRANSACTIONS_RESET_PATH, TRANSFERS_PATH, USERS_PATH, USERS_RESET_PATH,
    };
    use crate::error::{Result, SplitbookError};
    use crate::models::{
        DataEnvelope, Expense, ExpenseId, HealthStatus, NewExpense, NewTopUp, NewTransfer, TopUp,
        Transaction, Transfer, User,
    };
    use crate::storage::Storage;

    define_client! {
        client_name: SplitbookClient,
        builder_name: SplitbookClientBuilder,
        storage_trait: Storage,
        http_type: reqwest::Client,
        request_type: reqwest::RequestBuilder,
        response_type: reqwest::Response,
        client_doc: "Async client for a splitbook server.\n\nUse [`SplitbookClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`SplitbookClient`].",
        async_kw: async,
        await_kw: await,
    }

    #[cfg(test)]
    mod tests {
        use serde_json::json;
        use wiremock::matchers::{body_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::*;
        use crate::models::{Amount, UserId};

        async fn client_for(server: &MockServer) -> SplitbookClient {
            SplitbookClient::builder()
                .base_url(server.uri())
                .build()
                .unwrap()
        }

        #[tokio::test]
        async fn lists_expenses() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/expenses"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                    {"id": 1, "date": "2024-01-01", "description": "Rent", "payer": "Alice", "amount": 800}
                ])))
                .mount(&server)
                .await;

            let expenses = client_for(&server).await.expenses().await.unwrap();
            assert_eq!(expenses.len(), 1);
            assert_eq!(expenses[0].payer, "Alice");
        }

        #[tokio::test]
        async fn posts_new_expense() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/expenses"))
                .and(body_json(json!({
                    "date": "2024-01-02", "description": "Pizza", "payer": "Bob", "amount": 24.5
                })))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "id": 7, "date": "2024-01-02", "description": "Pizza", "payer": "Bob", "amount": 24.5
                })))
                .mount(&server)
                .await;

            let created = client_for(&server)
                .await
                .create_expense(NewExpense {
                    date: "2024-01-02".to_owned(),
                    description: "Pizza".to_owned(),
                    payer: "Bob".to_owned(),
                    amount: 24.5,
                })
                .await
                .unwrap();
            assert_eq!(created.id, ExpenseId::new(7));
        }

        #[tokio::test]
        async fn missing_expense_is_none() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/expenses/42"))
                .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
                .mount(&server)
                .await;

            let found = client_for(&server).await.expense(ExpenseId::new(42)).await.unwrap();
            assert!(found.is_none());
        }

        #[tokio::test]
        async fn delete_returns_flag() {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .and(path("/api/expenses/3"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
                .mount(&server)
                .await;

            let deleted = client_for(&server)
                .await
                .delete_expense(ExpenseId::new(3))
                .await
                .unwrap();
            assert!(!deleted);
        }

        #[tokio::test]
        async fn reset_unwraps_envelope() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/expenses/reset"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
                .mount(&server)
                .await;

            let seed = client_for(&server).await.reset_expenses().await.unwrap();
            assert!(seed.is_empty());
        }

        #[tokio::test]
        async fn server_error_maps_to_api_error() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/topups"))
                .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"disk gone"}"#))
                .mount(&server)
                .await;

            let err = client_for(&server).await.topups().await.unwrap_err();
            assert!(matches!(err, SplitbookError::Api { status: 500, .. }));
            assert_eq!(err.user_message(), "Request failed: HTTP error! status: 500");
        }

        #[tokio::test]
        async fn posts_text_topup_verbatim() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/topups"))
                .and(body_json(json!({"user": "Bob", "amount": "20"})))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "id": 1, "user": "Bob", "amount": "20", "date": "2024-05-01T10:00:00Z"
                })))
                .mount(&server)
                .await;

            let topup = client_for(&server)
                .await
                .create_topup(NewTopUp {
                    user: "Bob".to_owned(),
                    amount: Amount::Text("20".to_owned()),
                })
                .await
                .unwrap();
            assert!(topup.amount.is_legacy_text());
        }

        #[tokio::test]
        async fn posts_transfer_with_camel_case_ids() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/transfers"))
                .and(body_json(json!({"amount": 10.0, "sourceId": 1, "targetId": 2})))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "id": 9,
                    "amount": 10.0,
                    "date": "2024-05-01",
                    "source": {"id": 1, "name": "Alice", "email": "a@example.com"},
                    "target": {"id": 2, "name": "Bob", "email": "b@example.com"}
                })))
                .mount(&server)
                .await;

            let transfer = client_for(&server)
                .await
                .create_transfer(NewTransfer {
                    amount: 10.0,
                    date: None,
                    source_id: UserId::new(1),
                    target_id: UserId::new(2),
                })
                .await
                .unwrap();
            assert_eq!(transfer.target.name, "Bob");
        }

        #[tokio::test]
        async fn unreachable_server_is_http_error() {
            let client = SplitbookClient::builder()
                .base_url("http://127.0.0.1:9")
                .build()
                .unwrap();
            let err = client.users().await.unwrap_err();
            assert!(matches!(err, SplitbookError::Http(_)));
        }
    }
}

#[cfg(feature = "blocking")]
mod blocking_client {
    //! Blocking (synchronous) HTTP client for a splitbook server.

    use reqwest::StatusCode;
    use reqwest::header::CONTENT_TYPE;
    use serde::Serialize;
    use serde::de::DeserializeOwned;

    use super::{
        DEFAULT_BASE_URL, EXPENSES_PATH, EXPENSES_RESET_PATH, HEALTH_PATH, TOPUPS_PATH,
        TRANSACTIONS_PATH, TRANSACTIONS_RESET_PATH, TRANSFERS_PATH, USERS_PATH, USERS_RESET_PATH,
    };
    use crate::error::{Result, SplitbookError};
    use crate::models::{
        DataEnvelope, Expense, ExpenseId, HealthStatus, NewExpense, NewTopUp, NewTransfer, TopUp,
        Transaction, Transfer, User,
    };
    use crate::storage::BlockingStorage;

    define_client! {
        client_name: SplitbookBlockingClient,
        builder_name: SplitbookBlockingClientBuilder,
        storage_trait: BlockingStorage,
        http_type: reqwest::blocking::Client,
        request_type: reqwest::blocking::RequestBuilder,
        response_type: reqwest::blocking::Response,
        client_doc: "Blocking (synchronous) client for a splitbook server.\n\nUse [`SplitbookBlockingClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`SplitbookBlockingClient`].",
    }

}

#[cfg(feature = "async")]
pub use async_client::{SplitbookClient, SplitbookClientBuilder};
#[cfg(feature = "blocking")]
pub use blocking_client::{SplitbookBlockingClient, SplitbookBlockingClientBuilder};
