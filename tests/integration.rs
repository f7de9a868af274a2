//! Integration tests for the Belvo API Rust client.
//!
//! Every test runs against a local `mockito` server, so no credentials or
//! network access are needed.
//!
//! Run with:
//!
//! ```bash
//! cargo test -- --nocapture
//! ```

use std::sync::Arc;
use std::time::Duration;

use belvo_client::{
    Account, BelvoError, Client, Environment, Filters, Link, ResourceKind, Session, Settings,
};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

const KEY_ID: &str = "monty";
const KEY_SECRET: &str = "python";
// base64("monty:python")
const BASIC_AUTH: &str = "Basic bW9udHk6cHl0aG9u";
const USER_AGENT: &str = "fapi-financial (2024)";

fn mock_login(server: &mut ServerGuard, status: usize) -> Mock {
    server
        .mock("GET", "/api/")
        .match_header("authorization", BASIC_AUTH)
        .match_header("user-agent", USER_AGENT)
        .with_status(status)
        .with_body("{}")
        .create()
}

fn logged_in_session(server: &mut ServerGuard) -> Arc<Session> {
    let _login = mock_login(server, 200);
    let mut session = Session::new(&server.url()).unwrap();
    assert!(session.login(KEY_ID, KEY_SECRET).unwrap());
    Arc::new(session)
}

fn client(server: &mut ServerGuard) -> Client {
    let _login = mock_login(server, 200);
    Client::new(KEY_ID, KEY_SECRET, &server.url()).unwrap()
}

fn page(results: Value, next: Option<String>) -> String {
    json!({ "count": 5, "next": next, "results": results }).to_string()
}

// ---------------------------------------------------------------------------
// 1. Login probe
// ---------------------------------------------------------------------------

#[test]
fn test_login_succeeds_on_2xx() {
    let mut server = Server::new();
    let login = mock_login(&mut server, 200);

    let mut session = Session::new(&server.url()).unwrap();
    assert!(session.login(KEY_ID, KEY_SECRET).unwrap());
    assert_eq!(session.key_id(), Some(KEY_ID));
    assert_eq!(session.user_agent(), USER_AGENT);
    login.assert();
}

#[test]
fn test_login_returns_false_on_error_statuses() {
    for status in [400, 401, 403, 500] {
        let mut server = Server::new();
        let login = mock_login(&mut server, status);

        let mut session = Session::new(&server.url()).unwrap();
        let result = session.login(KEY_ID, KEY_SECRET);
        assert!(
            matches!(result, Ok(false)),
            "status {status} should give Ok(false), got {result:?}"
        );
        login.assert();
    }
}

#[test]
fn test_login_propagates_transport_errors() {
    // Nothing listens on port 1.
    let mut session = Session::new("http://127.0.0.1:1").unwrap();
    let result = session.login_with_timeout(KEY_ID, KEY_SECRET, Duration::from_secs(2));
    assert!(matches!(result, Err(BelvoError::Transport(_))));
}

#[test]
fn test_get_one_propagates_transport_errors() {
    let session = Session::new("http://127.0.0.1:1").unwrap();
    let filters = Filters::new().with("timeout", 2);
    let result = session.get_one("/api/accounts/", "a-1", filters);
    assert!(matches!(result, Err(BelvoError::Transport(_))));
}

#[test]
fn test_trailing_slash_is_trimmed_from_base_url() {
    let mut server = Server::new();
    let login = mock_login(&mut server, 200);

    let mut session = Session::new(&format!("{}/", server.url())).unwrap();
    assert_eq!(session.base_url(), server.url());
    assert!(session.login(KEY_ID, KEY_SECRET).unwrap());
    login.assert();
}

// ---------------------------------------------------------------------------
// 2. Detail fetch
// ---------------------------------------------------------------------------

#[test]
fn test_get_one_fetches_detail_url() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);

    let expected = json!({"id": "123", "name": "Test Resource"});
    let detail = server
        .mock("GET", "/api/resource/123/")
        .match_header("authorization", BASIC_AUTH)
        .match_header("user-agent", USER_AGENT)
        .with_status(200)
        .with_body(expected.to_string())
        .expect(1)
        .create();

    let body = session
        .get_one("/api/resource/", "123", Filters::new())
        .unwrap();
    assert_eq!(body, expected);
    detail.assert();
}

#[test]
fn test_get_one_strips_timeout_from_query() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);

    let detail = server
        .mock("GET", "/api/accounts/a-1/")
        .match_query(Matcher::Exact("fields=id".into()))
        .with_status(200)
        .with_body(r#"{"id": "a-1"}"#)
        .create();

    let filters = Filters::new().with("timeout", 10).with("fields", "id");
    let body = session.get_one("/api/accounts/", "a-1", filters).unwrap();
    assert_eq!(body["id"], "a-1");
    detail.assert();
}

#[test]
fn test_get_one_error_carries_json_detail() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);

    let detail = json!([{"code": "not_found", "message": "Resource not found"}]);
    let _mock = server
        .mock("GET", "/api/links/missing/")
        .with_status(404)
        .with_body(detail.to_string())
        .create();

    let err = session
        .get_one("/api/links/", "missing", Filters::new())
        .unwrap_err();
    match err {
        BelvoError::Request { status, detail: d } => {
            assert_eq!(status, 404);
            assert_eq!(d, detail);
        }
        other => panic!("expected a request error, got {other:?}"),
    }
}

#[test]
fn test_get_one_error_keeps_raw_text_detail() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);

    let _mock = server
        .mock("GET", "/api/links/l-1/")
        .with_status(502)
        .with_body("Bad Gateway")
        .create();

    let err = session
        .get_one("/api/links/", "l-1", Filters::new())
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
    match err {
        BelvoError::Request { detail, .. } => {
            assert_eq!(detail, Value::String("Bad Gateway".into()))
        }
        other => panic!("expected a request error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// 3. Pagination
// ---------------------------------------------------------------------------

#[test]
fn test_list_flattens_pages_in_order() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);
    let next = format!("{}/api/resources/?page=2", server.url());

    let first = server
        .mock("GET", "/api/resources/")
        .with_status(200)
        .with_body(page(json!([1, 2, 3]), Some(next)))
        .expect(1)
        .create();
    let second = server
        .mock("GET", "/api/resources/?page=2")
        .with_status(200)
        .with_body(page(json!([4, 5]), None))
        .expect(1)
        .create();

    let mut items = session.list_many("/api/resources/", Filters::new());
    let results: Vec<Value> = items.by_ref().collect::<Result<_, _>>().unwrap();

    assert_eq!(results, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);
    assert_eq!(items.pages_fetched(), 2);
    assert_eq!(items.reported_count(), Some(5));
    assert!(items.is_exhausted());
    first.assert();
    second.assert();
}

#[test]
fn test_reported_count_does_not_fetch() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);
    let next = format!("{}/api/resources/?page=2", server.url());

    let _mock = server
        .mock("GET", "/api/resources/")
        .with_status(200)
        .with_body(page(json!([1, 2]), Some(next)))
        .create();
    let second = server
        .mock("GET", "/api/resources/?page=2")
        .with_status(200)
        .with_body(page(json!([3, 4, 5]), None))
        .expect(0)
        .create();

    let mut items = session.list_many("/api/resources/", Filters::new());
    assert_eq!(items.reported_count(), None);
    assert_eq!(items.pages_fetched(), 0);

    assert_eq!(items.next().unwrap().unwrap(), json!(1));
    assert_eq!(items.reported_count(), Some(5));
    assert_eq!(items.reported_count(), Some(5));
    assert_eq!(items.pages_fetched(), 1);
    assert!(!items.is_exhausted());
    second.assert();
}

#[test]
fn test_list_is_lazy() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);
    let next = format!("{}/api/resources/?page=2", server.url());

    let _mock = server
        .mock("GET", "/api/resources/")
        .with_status(200)
        .with_body(page(json!(["one", "two"]), Some(next)))
        .create();
    let second = server
        .mock("GET", "/api/resources/?page=2")
        .with_status(200)
        .with_body(page(json!(["three"]), None))
        .expect(0)
        .create();

    let first_two: Vec<Value> = session
        .list_many("/api/resources/", Filters::new())
        .take(2)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(first_two, vec![json!("one"), json!("two")]);
    second.assert();
}

#[test]
fn test_cursor_drops_original_filters() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);
    let next = format!("{}/api/accounts/?page=2", server.url());

    let first = server
        .mock("GET", "/api/accounts/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("institution".into(), "erebor_mx_retail".into()),
            Matcher::UrlEncoded("page_size".into(), "3".into()),
        ]))
        .with_status(200)
        .with_body(page(json!(["a", "b", "c"]), Some(next)))
        .create();
    // Only the literal cursor query, without the original filters.
    let second = server
        .mock("GET", "/api/accounts/")
        .match_query(Matcher::Exact("page=2".into()))
        .with_status(200)
        .with_body(page(json!(["d"]), Some(String::new())))
        .create();

    let filters = Filters::from([("institution", "erebor_mx_retail"), ("page_size", "3")]);
    let results: Vec<Value> = session
        .list_many("/api/accounts/", filters)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(results, vec![json!("a"), json!("b"), json!("c"), json!("d")]);
    first.assert();
    second.assert();
}

#[test]
fn test_error_mid_iteration_ends_the_sequence() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);
    let next = format!("{}/api/owners/?page=2", server.url());

    let _mock = server
        .mock("GET", "/api/owners/")
        .with_status(200)
        .with_body(page(json!([1, 2]), Some(next)))
        .create();
    let _mock = server
        .mock("GET", "/api/owners/?page=2")
        .with_status(500)
        .with_body(r#"{"detail": "boom"}"#)
        .create();

    let mut items = session.list_many("/api/owners/", Filters::new());
    assert_eq!(items.next().unwrap().unwrap(), json!(1));
    assert_eq!(items.next().unwrap().unwrap(), json!(2));
    match items.next() {
        Some(Err(BelvoError::Request { status, detail })) => {
            assert_eq!(status, 500);
            assert_eq!(detail, json!({"detail": "boom"}));
        }
        other => panic!("expected a request error, got {other:?}"),
    }
    assert!(items.next().is_none());
}

#[test]
fn test_transport_error_mid_iteration_ends_the_sequence() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);

    // The cursor points at a port nothing listens on.
    let _mock = server
        .mock("GET", "/api/owners/")
        .with_status(200)
        .with_body(page(
            json!(["o-1"]),
            Some("http://127.0.0.1:1/api/owners/?page=2".into()),
        ))
        .create();

    let mut items = session.list_many("/api/owners/", Filters::new());
    assert_eq!(items.next().unwrap().unwrap(), json!("o-1"));
    assert!(matches!(items.next(), Some(Err(BelvoError::Transport(_)))));
    assert!(items.next().is_none());
    assert_eq!(items.pages_fetched(), 2);
}

#[test]
fn test_first_page_error_is_returned() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);

    let _mock = server
        .mock("GET", "/api/links/")
        .with_status(401)
        .with_body(r#"{"detail": "Invalid credentials"}"#)
        .create();

    let mut items = session.list_many("/api/links/", Filters::new());
    assert_eq!(items.next().unwrap().unwrap_err().status(), Some(401));
    assert!(items.next().is_none());
}

#[test]
fn test_malformed_page_is_a_decode_error() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);

    let _mock = server
        .mock("GET", "/api/links/")
        .with_status(200)
        .with_body(r#"{"detail": "no results here"}"#)
        .create();

    let mut items = session.list_many("/api/links/", Filters::new());
    assert!(matches!(items.next(), Some(Err(BelvoError::Decode(_)))));
}

#[test]
fn test_page_limit_stops_pagination() {
    let mut server = Server::new();
    let _login = mock_login(&mut server, 200);
    let mut session = Session::new(&server.url()).unwrap().with_page_limit(1);
    assert!(session.login(KEY_ID, KEY_SECRET).unwrap());
    let session = Arc::new(session);
    let next = format!("{}/api/links/?page=2", server.url());

    let _mock = server
        .mock("GET", "/api/links/")
        .with_status(200)
        .with_body(page(json!([1, 2]), Some(next)))
        .create();
    let second = server
        .mock("GET", "/api/links/?page=2")
        .with_status(200)
        .with_body(page(json!([3]), None))
        .expect(0)
        .create();

    let results: Vec<_> = session.list_many("/api/links/", Filters::new()).collect();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap(), &json!(1));
    assert_eq!(results[1].as_ref().unwrap(), &json!(2));
    assert!(matches!(
        results[2],
        Err(BelvoError::PageLimitExceeded { limit: 1 })
    ));
    second.assert();
}

#[test]
fn test_cyclic_cursor_is_detected() {
    let mut server = Server::new();
    let session = logged_in_session(&mut server);
    let looping = format!("{}/api/links/?page=2", server.url());

    let _mock = server
        .mock("GET", "/api/links/")
        .with_status(200)
        .with_body(page(json!(["a"]), Some(looping.clone())))
        .create();
    let second = server
        .mock("GET", "/api/links/?page=2")
        .with_status(200)
        .with_body(page(json!(["b"]), Some(looping.clone())))
        .expect(1)
        .create();

    let results: Vec<_> = session.list_many("/api/links/", Filters::new()).collect();
    assert_eq!(results.len(), 3);
    assert_eq!(results[1].as_ref().unwrap(), &json!("b"));
    match &results[2] {
        Err(BelvoError::CursorCycle { url }) => assert_eq!(url, &looping),
        other => panic!("expected a cursor cycle, got {other:?}"),
    }
    second.assert();
}

// ---------------------------------------------------------------------------
// 4. Client construction
// ---------------------------------------------------------------------------

#[test]
fn test_empty_base_url_is_a_config_error() {
    for url in ["", "   "] {
        let err = Client::new(KEY_ID, KEY_SECRET, url).unwrap_err();
        assert!(matches!(err, BelvoError::Config(_)), "url {url:?}: {err:?}");
    }
}

#[test]
fn test_blank_session_url_is_a_config_error() {
    for url in ["", "   "] {
        let session = Session::new(url).unwrap();
        let err = Client::from_session(session, KEY_ID, KEY_SECRET).unwrap_err();
        assert!(matches!(err, BelvoError::Config(_)), "url {url:?}: {err:?}");
    }
}

#[test]
fn test_rejected_login_fails_construction() {
    let mut server = Server::new();
    let login = mock_login(&mut server, 401);

    let err = Client::new(KEY_ID, KEY_SECRET, &server.url()).unwrap_err();
    assert!(matches!(err, BelvoError::Authentication));
    assert_eq!(err.to_string(), "Login failed.");
    login.assert();
}

#[test]
fn test_resources_share_one_session() {
    let mut server = Server::new();
    let login = server
        .mock("GET", "/api/")
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create();
    let _mock = server
        .mock("GET", "/api/accounts/a-1/")
        .with_status(200)
        .with_body(r#"{"id": "a-1"}"#)
        .create();
    let _mock = server
        .mock("GET", "/api/links/l-1/")
        .with_status(200)
        .with_body(r#"{"id": "l-1"}"#)
        .create();

    let client = Client::new(KEY_ID, KEY_SECRET, &server.url()).unwrap();
    client.accounts().get("a-1", Filters::new()).unwrap();
    client.links().get("l-1", Filters::new()).unwrap();

    for kind in ResourceKind::ALL {
        assert!(Arc::ptr_eq(client.session(), client.resource(kind).session()));
    }
    login.assert();
}

#[test]
fn test_from_settings_applies_url_and_limits() {
    let mut server = Server::new();
    let login = mock_login(&mut server, 200);

    let settings = Settings {
        secret_id: KEY_ID.into(),
        secret_password: KEY_SECRET.into(),
        url: server.url(),
        environment: Environment::Sandbox,
        timeout: Duration::from_secs(9),
        max_pages: Some(4),
    };
    let client = Client::from_settings(&settings).unwrap();

    assert_eq!(client.session().base_url(), server.url());
    assert_eq!(client.session().timeout(), Duration::from_secs(9));
    assert_eq!(client.session().page_limit(), Some(4));
    login.assert();
}

#[test]
fn test_client_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Client>();

    let mut server = Server::new();
    let client = client(&mut server);
    let owners = server
        .mock("GET", Matcher::Regex(r"^/api/owners/o-\d/$".into()))
        .with_status(200)
        .with_body(r#"{"id": "owner"}"#)
        .expect(2)
        .create();

    std::thread::scope(|s| {
        for id in ["o-1", "o-2"] {
            let client = &client;
            s.spawn(move || {
                let owner = client.owners().get(id, Filters::new()).unwrap();
                assert_eq!(owner["id"], "owner");
            });
        }
    });
    owners.assert();
}

// ---------------------------------------------------------------------------
// 5. Resources
// ---------------------------------------------------------------------------

#[test]
fn test_resource_endpoints() {
    let mut server = Server::new();
    let client = client(&mut server);

    assert_eq!(client.accounts().endpoint(), "/api/accounts/");
    assert_eq!(client.links().endpoint(), "/api/links/");
    assert_eq!(client.owners().endpoint(), "/api/owners/");
    assert_eq!(client.transactions().endpoint(), "/api/transactions/");
    assert_eq!(client.transactions().kind(), ResourceKind::Transactions);
}

#[test]
fn test_transactions_list_always_sends_link() {
    let mut server = Server::new();
    let client = client(&mut server);

    let listing = server
        .mock("GET", "/api/transactions/")
        .match_query(Matcher::Exact("link=".into()))
        .with_status(200)
        .with_body(page(json!([]), None))
        .create();

    let results: Vec<_> = client.transactions().list(Filters::new()).collect();
    assert!(results.is_empty());
    listing.assert();
}

#[test]
fn test_transactions_list_keeps_caller_link() {
    let mut server = Server::new();
    let client = client(&mut server);

    let listing = server
        .mock("GET", "/api/transactions/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("link".into(), "l-1".into()),
            Matcher::UrlEncoded("account".into(), "a-1".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(page(json!([{"id": "t-1"}]), None))
        .expect(2)
        .create();

    let filters = Filters::new()
        .with("link", "l-1")
        .with("account", "a-1")
        .with("page", 1);
    let via_list: Vec<Value> = client
        .transactions()
        .list(filters)
        .collect::<Result<_, _>>()
        .unwrap();
    let via_link: Vec<Value> = client
        .transactions()
        .list_for_link("l-1", Filters::new().with("account", "a-1").with("page", 1))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(via_list, via_link);
    assert_eq!(via_list[0]["id"], "t-1");
    listing.assert();
}

#[test]
fn test_other_resources_send_no_default_filters() {
    let mut server = Server::new();
    let client = client(&mut server);

    // No query matcher: only matches a request without a query string.
    let listing = server
        .mock("GET", "/api/owners/")
        .with_status(200)
        .with_body(page(json!([{"id": "o-1"}]), None))
        .create();

    let owners: Vec<Value> = client
        .owners()
        .list(Filters::new())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(owners.len(), 1);
    listing.assert();
}

#[test]
fn test_typed_list_and_get() {
    let mut server = Server::new();
    let client = client(&mut server);

    let _mock = server
        .mock("GET", "/api/links/")
        .with_status(200)
        .with_body(page(
            json!([
                {"id": "l-1", "institution": "erebor_mx_retail", "status": "valid"},
                {"id": "l-2", "institution": "gotham_mx_retail", "status": "invalid"}
            ]),
            None,
        ))
        .create();
    let _mock = server
        .mock("GET", "/api/accounts/a-1/")
        .with_status(200)
        .with_body(
            json!({
                "id": "a-1",
                "link": "l-1",
                "name": "Cuenta Perfiles",
                "type": "Cuentas de efectivo",
                "currency": "MXN",
                "balance": {"current": 5874.13, "available": 5621.12}
            })
            .to_string(),
        )
        .create();

    let links: Vec<Link> = client
        .links()
        .list(Filters::new())
        .typed::<Link>()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[1].institution.as_deref(), Some("gotham_mx_retail"));

    let account: Account = client.accounts().get_as("a-1", Filters::new()).unwrap();
    assert_eq!(account.link.as_deref(), Some("l-1"));
    assert_eq!(account.currency.as_deref(), Some("MXN"));
    assert_eq!(account.balance.unwrap().current, Some(5874.13));
}
