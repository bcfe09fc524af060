use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::Router;
use http::{Request, StatusCode};
use quickpoll::clock::ManualClock;
use quickpoll::routes::{cors_layer, create_routes};
use quickpoll::store::MemoryStore;
use quickpoll::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> (Router, Arc<ManualClock>) {
    app_behind_proxies(0)
}

fn app_behind_proxies(hops: usize) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let state = AppState::new(Arc::new(MemoryStore::new()), clock.clone(), hops);
    (create_routes(state, cors_layer(None).unwrap()), clock)
}

/// `client` is the connecting peer's IP, as `axum-server` reports it.
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    client: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send_forwarded(app, method, uri, client, None, body).await
}

async fn send_forwarded(
    app: &Router,
    method: &str,
    uri: &str,
    client: Option<&str>,
    forwarded_for: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(forwarded_for) = forwarded_for {
        builder = builder.header("x-forwarded-for", forwarded_for);
    }
    let mut request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    if let Some(client) = client {
        let peer: SocketAddr = format!("{client}:4000").parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
    }

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_poll(app: &Router, body: Value) -> Value {
    let (status, poll) = send(app, "POST", "/polls", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{poll}");
    poll
}

fn option_id(poll: &Value, index: usize) -> String {
    poll["options"][index]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_and_fetch_poll() {
    let (app, _clock) = app();
    let poll = create_poll(
        &app,
        json!({
            "title": "Yes or no?",
            "options": [{ "value": "Yes" }, { "value": "No" }],
            "duration": "1M",
            "votes_visible": true
        }),
    )
    .await;
    assert_eq!(poll["duration"], "1M");
    assert_eq!(poll["options"].as_array().unwrap().len(), 2);

    let id = poll["id"].as_str().unwrap();
    let (status, detail) = send(&app, "GET", &format!("/polls/{id}"), Some("10.1.1.1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "Yes or no?");
    assert_eq!(detail["remaining_seconds"], 60);
    assert_eq!(detail["is_open"], true);
    assert_eq!(detail["results"]["visibility"], "visible");
    assert_eq!(detail["results"]["total_votes"], 0);
}

#[tokio::test]
async fn invalid_creation_is_bad_request_with_field() {
    let (app, _clock) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/polls",
        None,
        Some(json!({ "title": "Solo", "options": [{ "value": "only" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "options");

    let (status, body) = send(&app, "POST", "/polls", None, Some(json!({ "title": "No options" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "options");

    let (status, body) = send(&app, "POST", "/polls", None, Some(json!("not an object"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "body");
}

#[tokio::test]
async fn vote_without_option_names_the_field() {
    let (app, _clock) = app();
    let poll = create_poll(
        &app,
        json!({ "title": "Pick", "options": [{ "value": "A" }, { "value": "B" }] }),
    )
    .await;
    let votes = format!("/polls/{}/votes", poll["id"].as_str().unwrap());
    let (status, body) = send(&app, "POST", &votes, Some("10.1.1.1"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "option_id");
}

#[tokio::test]
async fn malformed_poll_id_is_json_bad_request() {
    let (app, _clock) = app();
    let (status, body) = send(&app, "GET", "/polls/not-a-uuid", Some("10.1.1.1"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "id");
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/polls/not-a-uuid/votes",
        Some("10.1.1.1"),
        Some(json!({ "option_id": uuid::Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "id");
}

#[tokio::test]
async fn forwarded_header_cannot_mint_new_voters() {
    let (app, _clock) = app();
    let poll = create_poll(
        &app,
        json!({ "title": "Stuffed?", "options": [{ "value": "A" }, { "value": "B" }] }),
    )
    .await;
    let votes = format!("/polls/{}/votes", poll["id"].as_str().unwrap());
    let ballot = json!({ "option_id": option_id(&poll, 0) });

    let mut statuses = Vec::new();
    for spoofed in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
        let (status, _) = send_forwarded(
            &app,
            "POST",
            &votes,
            Some("203.0.113.50"),
            Some(spoofed),
            Some(ballot.clone()),
        )
        .await;
        statuses.push(status.as_u16());
    }
    assert_eq!(statuses, [201, 208, 208]);
}

#[tokio::test]
async fn trusted_proxy_entry_identifies_the_voter() {
    let (app, _clock) = app_behind_proxies(1);
    let poll = create_poll(
        &app,
        json!({ "title": "Proxied", "options": [{ "value": "A" }, { "value": "B" }] }),
    )
    .await;
    let votes = format!("/polls/{}/votes", poll["id"].as_str().unwrap());
    let ballot = json!({ "option_id": option_id(&poll, 0) });

    // the client-supplied left entry changes, the proxy-appended one does not
    let (status, _) = send_forwarded(
        &app,
        "POST",
        &votes,
        Some("10.0.0.2"),
        Some("1.1.1.1, 198.51.100.7"),
        Some(ballot.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send_forwarded(
        &app,
        "POST",
        &votes,
        Some("10.0.0.2"),
        Some("2.2.2.2, 198.51.100.7"),
        Some(ballot.clone()),
    )
    .await;
    assert_eq!(status.as_u16(), 208);

    // a different real client behind the same proxy is a different voter
    let (status, _) = send_forwarded(
        &app,
        "POST",
        &votes,
        Some("10.0.0.2"),
        Some("198.51.100.8"),
        Some(ballot),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn vote_outcomes_map_to_status_codes() {
    let (app, clock) = app();
    let poll = create_poll(
        &app,
        json!({
            "title": "Tabs or spaces?",
            "options": [{ "value": "Tabs" }, { "value": "Spaces" }],
            "duration": "1M",
            "votes_changeable": true
        }),
    )
    .await;
    let id = poll["id"].as_str().unwrap();
    let votes = format!("/polls/{id}/votes");
    let tabs = option_id(&poll, 0);
    let spaces = option_id(&poll, 1);

    let (status, body) = send(&app, "POST", &votes, Some("10.1.1.1"), Some(json!({ "option_id": tabs }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outcome"], "created");

    let (status, body) = send(&app, "POST", &votes, Some("10.1.1.1"), Some(json!({ "option_id": tabs }))).await;
    assert_eq!(status.as_u16(), 208);
    assert_eq!(body["outcome"], "duplicate");

    let (status, body) = send(&app, "POST", &votes, Some("10.1.1.1"), Some(json!({ "option_id": spaces }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "replaced");
    assert_eq!(body["vote"]["option_id"], spaces.as_str());

    clock.advance(61);
    let (status, body) = send(&app, "POST", &votes, Some("10.1.1.2"), Some(json!({ "option_id": tabs }))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["outcome"], "poll_closed");
}

#[tokio::test]
async fn change_on_fixed_poll_is_rejected() {
    let (app, _clock) = app();
    let poll = create_poll(
        &app,
        json!({ "title": "Fixed", "options": [{ "value": "A" }, { "value": "B" }] }),
    )
    .await;
    let votes = format!("/polls/{}/votes", poll["id"].as_str().unwrap());

    send(&app, "POST", &votes, Some("10.1.1.1"), Some(json!({ "option_id": option_id(&poll, 0) }))).await;
    let (status, body) = send(&app, "POST", &votes, Some("10.1.1.1"), Some(json!({ "option_id": option_id(&poll, 1) }))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["outcome"], "change_rejected");
    assert_eq!(body["vote"]["option_id"], option_id(&poll, 0).as_str());
}

#[tokio::test]
async fn restricted_tallies_withheld_until_voted() {
    let (app, _clock) = app();
    let poll = create_poll(
        &app,
        json!({ "title": "Secret", "options": [{ "value": "A" }, { "value": "B" }], "duration": "1M" }),
    )
    .await;
    let id = poll["id"].as_str().unwrap();

    let (_, before) = send(&app, "GET", &format!("/polls/{id}"), Some("10.1.1.1"), None).await;
    assert_eq!(before["results"], json!({ "visibility": "withheld" }));

    send(
        &app,
        "POST",
        &format!("/polls/{id}/votes"),
        Some("10.1.1.1"),
        Some(json!({ "option_id": option_id(&poll, 1) })),
    )
    .await;

    let (_, after) = send(&app, "GET", &format!("/polls/{id}"), Some("10.1.1.1"), None).await;
    assert_eq!(after["results"]["visibility"], "visible");
    assert_eq!(after["results"]["total_votes"], 1);
    assert_eq!(after["voted_option"], option_id(&poll, 1).as_str());

    let (_, other) = send(&app, "GET", &format!("/polls/{id}"), Some("10.1.1.2"), None).await;
    assert_eq!(other["results"]["visibility"], "withheld");
}

#[tokio::test]
async fn unknown_poll_is_not_found() {
    let (app, _clock) = app();
    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(&app, "GET", &format!("/polls/{missing}"), Some("10.1.1.1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/polls/{missing}/votes"),
        Some("10.1.1.1"),
        Some(json!({ "option_id": uuid::Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_without_client_address_is_rejected() {
    let (app, _clock) = app();
    let (status, _) = send(&app, "POST", "/users", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_registration_conflicts_on_second_call() {
    let (app, _clock) = app();
    let (status, first) = send(&app, "POST", "/users", Some("10.2.2.2"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, second) = send(&app, "POST", "/users", Some("10.2.2.2"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(first["id"], second["id"]);
}

#[tokio::test]
async fn listing_pages_newest_first() {
    let (app, clock) = app();
    for title in ["first", "second", "third"] {
        create_poll(
            &app,
            json!({ "title": title, "options": [{ "value": "A" }, { "value": "B" }] }),
        )
        .await;
        clock.advance(1);
    }

    let (status, page) = send(&app, "GET", "/polls?per_page=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["third", "second"]);
    assert_eq!(page["next_page"], 2);

    let (_, page) = send(&app, "GET", "/polls?page=2&per_page=2", None, None).await;
    assert_eq!(page["items"][0]["title"], "first");
    assert!(page.get("next_page").is_none());
}
