//! Integration tests for monzo-expenses.
//!
//! Every test runs against a local `httpmock` server standing in for both the
//! Monzo API and its token endpoint, so no credentials or network access are
//! needed.
//!
//! Run with: cargo test --test api_tests
//!
//! Set `RUST_LOG=monzo_expenses=debug` to see the client's logging.

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use monzo_expenses::auth::{CallbackListener, CallbackParams, ManualBrowser, TokenCache};
use monzo_expenses::prelude::*;

static INIT: Once = Once::new();

/// Initialize logging for tests
fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn credentials() -> Credentials {
    Credentials::new("oauth2client_1", "secret_1", "http://localhost:3456").unwrap()
}

/// Client pointed at the mock server with no token cache.
fn create_client(server: &MockServer) -> MonzoClient {
    init_logging();
    let config = ClientConfig::default()
        .with_api_base_url(server.base_url())
        .without_token_cache();
    MonzoClient::new(credentials(), config).unwrap()
}

/// Client pointed at the mock server, already holding `token`.
fn create_authenticated_client(server: &MockServer, token: &str) -> MonzoClient {
    init_logging();
    let config = ClientConfig::default()
        .with_api_base_url(server.base_url())
        .without_token_cache();
    MonzoClient::with_session(credentials(), Session::with_access_token(token), config).unwrap()
}

fn account_json(id: &str, code: &str) -> Value {
    json!({
        "id": id,
        "description": "user_00009237aWAIwKEWFKEFuz",
        "created": "2015-11-13T12:17:42.102Z",
        "closed": false,
        "type": code,
        "owners": [{
            "user_id": "user_00009237aWAIwKEWFKEFuz",
            "preferred_name": "Ada Lovelace",
            "preferred_first_name": "Ada"
        }],
        "account_number": "12345678",
        "sort_code": "040004"
    })
}

fn transaction_json(id: &str, created: &str, category: &str, amount: i64) -> Value {
    json!({
        "id": id,
        "account_id": "acc_1",
        "user_id": "user_1",
        "description": format!("Purchase {}", id),
        "amount": amount,
        "currency": "GBP",
        "category": category,
        "local_amount": amount,
        "local_currency": "GBP",
        "account_balance": 5000,
        "created": created,
        "updated": created,
        "settled": "",
        "attachments": [],
        "merchant": {"id": "merch_1", "name": "Pret A Manger"}
    })
}

/// Listener that hands back fixed redirect parameters.
struct StubListener(Option<CallbackParams>);

impl StubListener {
    fn redirect(code: &str, state: &str) -> Self {
        let mut params = CallbackParams::new();
        params.insert("code".to_string(), vec![code.to_string()]);
        params.insert("state".to_string(), vec![state.to_string()]);
        Self(Some(params))
    }
}

impl CallbackListener for StubListener {
    fn wait_for_call(
        self,
        _timeout: Duration,
    ) -> impl Future<Output = monzo_expenses::Result<Option<CallbackParams>>> + Send {
        async move { Ok(self.0) }
    }
}

// =============================================================================
// Accounts Tests
// =============================================================================

mod accounts_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_accounts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/accounts")
                    .header("Authorization", "Bearer tok123");
                then.status(200).json_body(json!({
                    "accounts": [
                        account_json("acc_1", "uk_retail"),
                        account_json("acc_2", "uk_retail_joint"),
                    ]
                }));
            })
            .await;

        let client = create_authenticated_client(&server, "tok123");
        let accounts = client.accounts().list().await.unwrap();
        mock.assert_async().await;

        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].identifier.as_str(), "acc_1");
        assert_eq!(accounts[0].account_type, AccountType::Personal);
        assert_eq!(accounts[1].account_type, AccountType::Joint);
        assert_eq!(accounts[0].owners[0].preferred_name, "Ada Lovelace");
        assert_eq!(accounts[0].sort_code.as_deref(), Some("040004"));
    }

    #[tokio::test]
    async fn test_unknown_account_type() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/accounts");
                then.status(200)
                    .json_body(json!({"accounts": [account_json("acc_1", "uk_business")]}));
            })
            .await;

        let client = create_authenticated_client(&server, "tok123");
        let result = client.accounts().list().await;
        assert!(matches!(result, Err(Error::UnknownAccountType(code)) if code == "uk_business"));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/accounts");
                then.status(401).body("{\"code\":\"unauthorized.bad_access_token\"}");
            })
            .await;

        let client = create_authenticated_client(&server, "expired");
        let err = client.accounts().list().await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized { status: 401, .. }));
        assert!(err.requires_reauthentication());
        assert_eq!(err.body(), Some("{\"code\":\"unauthorized.bad_access_token\"}"));
    }
}

// =============================================================================
// Transactions Tests
// =============================================================================

mod transactions_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_transactions() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/transactions")
                    .query_param("account_id", "acc_1")
                    .query_param("expand[]", "merchant")
                    .header("Authorization", "Bearer tok123");
                then.status(200).json_body(json!({
                    "transactions": [
                        transaction_json("tx_1", "2019-03-02T10:00:00.000Z", "expenses", -1250),
                        transaction_json("tx_2", "2019-03-03T10:00:00Z", "groceries", -400),
                    ]
                }));
            })
            .await;

        let client = create_authenticated_client(&server, "tok123");
        let transactions = client
            .transactions()
            .list(&AccountId::new("acc_1"))
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].identifier.as_str(), "tx_1");
        assert_eq!(transactions[0].amount, -1250);
        assert_eq!(transactions[1].category, "groceries");
        assert_eq!(transactions[0].raw_data["merchant"]["name"], "Pret A Manger");
    }

    #[tokio::test]
    async fn test_get_transaction() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/transactions/tx_9")
                    .query_param("expand[]", "merchant");
                then.status(200).json_body(json!({
                    "transaction": transaction_json("tx_9", "2019-03-02T10:00:00Z", "expenses", -99)
                }));
            })
            .await;

        let client = create_authenticated_client(&server, "tok123");
        let txn = client
            .transactions()
            .get(&TransactionId::new("tx_9"))
            .await
            .unwrap();
        assert_eq!(txn.identifier.as_str(), "tx_9");
        assert_eq!(txn.amount, -99);
    }

    #[tokio::test]
    async fn test_transaction_id_stays_in_its_segment() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/accounts");
                then.status(200)
                    .json_body(json!({"accounts": [account_json("acc_1", "uk_retail")]}));
            })
            .await;

        let client = create_authenticated_client(&server, "tok123");
        let result = client
            .transactions()
            .get(&TransactionId::new("../accounts"))
            .await;
        assert!(matches!(result, Err(Error::NotFound { status: 404, .. })));

        let result = client.transactions().get(&TransactionId::new("..")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_get_missing_transaction() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/transactions/tx_404");
                then.status(404).body("transaction not found");
            })
            .await;

        let client = create_authenticated_client(&server, "tok123");
        let err = client
            .transactions()
            .get(&TransactionId::new("tx_404"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { status: 404, ref body } if body == "transaction not found"));
        assert!(err.to_string().contains("transaction not found"));
    }

    #[tokio::test]
    async fn test_empty_transaction_list_for_get() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/transactions/tx_1");
                then.status(200).json_body(json!({"transactions": []}));
            })
            .await;

        let client = create_authenticated_client(&server, "tok123");
        let result = client.transactions().get(&TransactionId::new("tx_1")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_malformed_timestamp() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/transactions");
                then.status(200).json_body(json!({
                    "transactions": [transaction_json("tx_1", "yesterday", "expenses", -1)]
                }));
            })
            .await;

        let client = create_authenticated_client(&server, "tok123");
        let result = client.transactions().list(&AccountId::new("acc_1")).await;
        assert!(matches!(result, Err(Error::MalformedTimestamp(_))));
    }
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_status_mapping() {
        let cases: [(u16, fn(&Error) -> bool); 5] = [
            (400, |e| matches!(e, Error::BadRequest { .. })),
            (403, |e| matches!(e, Error::Forbidden { .. })),
            (429, |e| matches!(e, Error::TooManyRequests { .. })),
            (504, |e| matches!(e, Error::GatewayTimeout { .. })),
            (418, |e| matches!(e, Error::Api { status: 418, .. })),
        ];

        for (status, check) in cases {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path("/accounts");
                    then.status(status).body("nope");
                })
                .await;

            let client = create_authenticated_client(&server, "tok123");
            let err = client.get("accounts").await.unwrap_err();
            assert!(check(&err), "status {} mapped to {:?}", status, err);
            assert_eq!(err.status(), Some(status));
        }
    }

    #[tokio::test]
    async fn test_not_authenticated_sends_nothing() {
        let server = MockServer::start_async().await;
        let client = create_client(&server);

        let err = client.accounts().list().await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
        assert!(err.requires_reauthentication());
    }
}

// =============================================================================
// Authentication Tests
// =============================================================================

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_authenticate_end_to_end() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth2/token")
                    .body_includes("grant_type=authorization_code")
                    .body_includes("code=abc")
                    .body_includes("client_id=oauth2client_1");
                then.status(200).json_body(json!({
                    "access_token": "tok123",
                    "client_id": "oauth2client_1",
                    "expires_in": 21600,
                    "token_type": "Bearer",
                    "user_id": "user_1"
                }));
            })
            .await;
        let accounts_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/accounts")
                    .header("Authorization", "Bearer tok123");
                then.status(200)
                    .json_body(json!({"accounts": [account_json("acc_1", "uk_retail")]}));
            })
            .await;

        init_logging();
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("monzo.json");
        let config = ClientConfig::default()
            .with_api_base_url(server.base_url())
            .with_token_cache(&cache_path);
        let client = MonzoClient::new(credentials(), config).unwrap();

        let listener = StubListener::redirect("abc", client.state_token());
        client.authenticate_with(listener, &ManualBrowser).await.unwrap();
        token_mock.assert_async().await;

        assert!(client.is_authenticated().await);
        let cached = std::fs::read_to_string(&cache_path).unwrap();
        assert!(cached.contains("tok123"));

        let accounts = client.accounts().list().await.unwrap();
        accounts_mock.assert_async().await;
        assert_eq!(accounts.len(), 1);
    }

    #[tokio::test]
    async fn test_state_mismatch_aborts_before_exchange() {
        // No token endpoint is mocked: an exchange attempt would fail with NotFound.
        let server = MockServer::start_async().await;
        let client = create_client(&server);

        let listener = StubListener::redirect("abc", "forged-state");
        let result = client.authenticate_with(listener, &ManualBrowser).await;

        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_missing_code() {
        let server = MockServer::start_async().await;
        let client = create_client(&server);

        let mut params = CallbackParams::new();
        params.insert("state".to_string(), vec![client.state_token().to_string()]);
        let result = client
            .authenticate_with(StubListener(Some(params)), &ManualBrowser)
            .await;

        assert!(matches!(result, Err(Error::MissingAuthorizationCode)));
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_unreadable_callback() {
        let server = MockServer::start_async().await;
        let client = create_client(&server);

        let result = client
            .authenticate_with(StubListener(None), &ManualBrowser)
            .await;
        assert!(matches!(result, Err(Error::InvalidCallback)));
    }

    #[tokio::test]
    async fn test_token_exchange_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth2/token");
                then.status(400).body("{\"error\":\"invalid_grant\"}");
            })
            .await;

        let client = create_client(&server);
        let listener = StubListener::redirect("stale", client.state_token());
        let result = client.authenticate_with(listener, &ManualBrowser).await;

        assert!(matches!(result, Err(Error::BadRequest { .. })));
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_restore_session_from_cache() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/accounts")
                    .header("Authorization", "Bearer cached-token");
                then.status(200).json_body(json!({"accounts": []}));
            })
            .await;

        init_logging();
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("monzo.json"));
        cache.store(&json!({"access_token": "cached-token"})).unwrap();

        let config = ClientConfig::default()
            .with_api_base_url(server.base_url())
            .with_token_cache(cache.path());
        let client = MonzoClient::new(credentials(), config).unwrap();

        assert!(client.restore_session().await.unwrap());
        assert!(client.is_authenticated().await);
        assert!(client.accounts().list().await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_restore_session_with_empty_cache() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::default()
            .with_api_base_url(server.base_url())
            .with_token_cache(dir.path().join("monzo.json"));
        let client = MonzoClient::new(credentials(), config).unwrap();

        assert!(!client.restore_session().await.unwrap());
        assert!(!client.is_authenticated().await);
    }
}
