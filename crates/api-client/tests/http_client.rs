use api_client::error::ApiError;
use api_client::{DashboardApi, ExecuteRequest, HttpApiClient, ScriptSource, StockListQuery};
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use configuration::ApiConfig;
use core_types::{ScriptDraft, ScriptId, ScriptOutcome};
use serde_json::{json, Value};
use std::collections::HashMap;

async fn serve(app: Router) -> ApiConfig {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

    ApiConfig {
        base_url: format!("http://{addr}/api"),
        data_url: format!("http://{addr}/data/"),
        timeout_secs: 5,
    }
}

async fn spawn(app: Router) -> HttpApiClient {
    HttpApiClient::new(&serve(app).await).expect("client")
}

fn session_app() -> Router {
    Router::new()
        .route(
            "/api/auth/login",
            post(|| async {
                (
                    [(header::SET_COOKIE, "session=abc; Path=/")],
                    Json(json!({"user": {"username": "admin"}})),
                )
            }),
        )
        .route("/api/auth/logout", post(|| async { Json(json!({})) }))
        .route(
            "/api/users",
            get(|headers: axum::http::HeaderMap| async move {
                let authed = headers
                    .get(header::COOKIE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.contains("session=abc"));
                if authed {
                    (StatusCode::OK, Json(json!([])))
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Not authenticated"})))
                }
            }),
        )
}

#[tokio::test]
async fn stock_list_sends_script_ids_and_reads_paged_items() {
    let app = Router::new().route(
        "/data/stock-price/list",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            Json(json!({
                "code": 200,
                "data": {"items": [{
                    "symbol": "600000",
                    "stock_name": "浦发银行",
                    "market_code": "SH",
                    "close_price": 10.5,
                    "script_results": {"7": {"result": params.get("script_ids").cloned()}}
                }]}
            }))
        }),
    );
    let client = spawn(app).await;

    let query = StockListQuery {
        limit: Some(200),
        script_ids: vec![ScriptId::from(7), ScriptId::from(9)],
        ..StockListQuery::default()
    };
    let stocks = client.list_stocks(&query).await.unwrap();
    assert_eq!(stocks.len(), 1);
    assert_eq!(
        stocks[0].script_outcome(&ScriptId::from(7)),
        Some(&ScriptOutcome::Value(json!("7,9")))
    );
}

#[tokio::test]
async fn stock_list_accepts_bare_arrays() {
    let app = Router::new().route(
        "/data/stock-price/list",
        get(|| async { Json(json!({"code": 200, "data": [{"symbol": "000001"}, {"symbol": "000002"}]})) }),
    );
    let client = spawn(app).await;
    let stocks = client.list_stocks(&StockListQuery::default()).await.unwrap();
    let symbols: Vec<_> = stocks.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["000001", "000002"]);
}

#[tokio::test]
async fn failed_execution_surfaces_remote_message_or_default() {
    let app = Router::new().route(
        "/data/custom-calculations/execute",
        post(|Json(body): Json<Value>| async move {
            if body.get("script_id").is_some() {
                Json(json!({"code": 404, "message": "Script not found"})).into_response()
            } else {
                (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
            }
        }),
    );
    let client = spawn(app).await;

    let stored = ExecuteRequest::new(ScriptSource::Stored(ScriptId::from(1)), "x", vec![]);
    match client.execute_script(&stored).await {
        Err(ApiError::Remote { message, .. }) => assert_eq!(message, "Script not found"),
        other => panic!("unexpected: {other:?}"),
    }

    let inline = ExecuteRequest::new(ScriptSource::Inline("return 1".into()), "x", vec![]);
    match client.execute_script(&inline).await {
        Err(ApiError::Remote { status, message }) => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "Script execution failed");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn successful_execution_is_normalized() {
    let app = Router::new().route(
        "/data/custom-calculations/execute",
        post(|| async {
            Json(json!({
                "code": 200,
                "data": {"column_name": "ratio", "results": {"600000": 0.5, "000001": {"error": "nan"}}}
            }))
        }),
    );
    let client = spawn(app).await;
    let request = ExecuteRequest::new(ScriptSource::Inline("return 1".into()), "ratio", vec![]);
    let results = client.execute_script(&request).await.unwrap();
    assert_eq!(results.results["600000"], ScriptOutcome::Value(json!(0.5)));
    assert_eq!(results.failures().count(), 1);
}

#[tokio::test]
async fn script_crud_round_trips_through_envelopes() {
    let app = Router::new()
        .route(
            "/data/custom-calculations/scripts",
            get(|| async {
                Json(json!({"code": 200, "data": {"items": [
                    {"id": 1, "name": "A", "code": "return 1"},
                    {"id": "2", "description": "B", "code": "return 2"}
                ]}}))
            })
            .post(|Json(body): Json<Value>| async move {
                (
                    StatusCode::CREATED,
                    Json(json!({"code": 201, "data": {"id": 3, "name": body["name"], "code": body["code"]}})),
                )
            }),
        )
        .route(
            "/data/custom-calculations/scripts/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({"code": 200, "data": {"id": id, "name": "fetched", "code": "return 0"}}))
            })
            .delete(|Path(id): Path<String>| async move {
                if id == "1" {
                    Json(json!({"code": 200, "data": null}))
                } else {
                    Json(json!({"code": 404, "message": "not found"}))
                }
            }),
        );
    let client = spawn(app).await;

    let scripts = client.list_scripts().await.unwrap();
    assert_eq!(scripts.len(), 2);
    assert_eq!(scripts[1].id, ScriptId::from(2));

    let draft = ScriptDraft {
        name: "C".into(),
        description: None,
        code: "return close".into(),
    };
    let created = client.create_script(&draft).await.unwrap();
    assert_eq!(created.id, ScriptId::from(3));
    assert_eq!(created.name.as_deref(), Some("C"));

    let fetched = client.get_script(&ScriptId::from(5)).await.unwrap();
    assert_eq!(fetched.id, ScriptId::from(5));

    client.delete_script(&ScriptId::from(1)).await.unwrap();
    assert!(client.delete_script(&ScriptId::from(2)).await.is_err());
}

#[tokio::test]
async fn login_cookie_is_sent_on_later_requests() {
    let app = Router::new()
        .route(
            "/api/auth/login",
            post(|Json(body): Json<Value>| async move {
                if body["use_cookie"] != json!(true) || body["password"] != json!("admin123") {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"})))
                        .into_response();
                }
                (
                    [(header::SET_COOKIE, "session=abc; Path=/")],
                    Json(json!({"user": {"username": body["username"]}})),
                )
                    .into_response()
            }),
        )
        .route(
            "/api/users",
            get(|headers: axum::http::HeaderMap| async move {
                let authed = headers
                    .get(header::COOKIE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.contains("session=abc"));
                if authed {
                    (StatusCode::OK, Json(json!([])))
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Not authenticated"})))
                }
            }),
        );
    let client = spawn(app).await;

    assert!(client.check_auth().await.is_err());

    match client.login("admin", "wrong").await {
        Err(ApiError::Remote { status, message }) => {
            assert_eq!(status, Some(401));
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected: {other:?}"),
    }

    let user = client.login("admin", "admin123").await.unwrap();
    assert_eq!(user.map(|u| u.username).as_deref(), Some("admin"));
    client.check_auth().await.unwrap();
}

#[tokio::test]
async fn funds_accept_enveloped_or_bare_lists() {
    let app = Router::new()
        .route(
            "/api/funds",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("search").map(String::as_str), Some("tech"));
                Json(json!({"data": [{"id": 1, "code": "TGF001", "name": "Tech Growth Fund", "type": "equity", "netValue": 2.45}]}))
            }),
        )
        .route(
            "/api/portfolios",
            get(|| async { Json(json!([{"id": "1", "name": "Growth", "totalValue": 75000, "holdings": []}])) }),
        );
    let client = spawn(app).await;

    let funds = client.list_funds(Some("tech")).await.unwrap();
    assert_eq!(funds[0].code, "TGF001");
    assert_eq!(funds[0].fund_type.as_deref(), Some("equity"));

    let portfolios = client.list_portfolios().await.unwrap();
    assert_eq!(portfolios[0].name, "Growth");
}

#[tokio::test]
async fn saved_session_is_reused_by_the_next_client() {
    let config = serve(session_app()).await;
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("session.json");

    let first = HttpApiClient::with_session_file(&config, &jar).unwrap();
    first.login("admin", "admin123").await.unwrap();
    assert!(jar.exists());

    // A later process starts from the saved jar and is already logged in.
    let second = HttpApiClient::with_session_file(&config, &jar).unwrap();
    second.check_auth().await.unwrap();
    assert!(HttpApiClient::new(&config).unwrap().check_auth().await.is_err());

    second.logout().await.unwrap();
    let third = HttpApiClient::with_session_file(&config, &jar).unwrap();
    assert!(third.check_auth().await.is_err());
}

#[tokio::test]
async fn unreadable_session_file_starts_logged_out() {
    let config = serve(session_app()).await;
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("session.json");
    std::fs::write(&jar, "not json").unwrap();

    let client = HttpApiClient::with_session_file(&config, &jar).unwrap();
    assert!(client.check_auth().await.is_err());
    client.login("admin", "admin123").await.unwrap();
    client.check_auth().await.unwrap();
}

#[tokio::test]
async fn path_values_are_percent_encoded() {
    let app = Router::new()
        .route(
            "/data/stock-price/info/:symbol",
            get(|Path(symbol): Path<String>| async move {
                Json(json!({"code": 200, "data": {"symbol": symbol}}))
            }),
        )
        .route(
            "/data/custom-calculations/scripts/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({"code": 200, "data": {"id": id, "code": "return 0"}}))
            }),
        );
    let client = spawn(app).await;

    let stock = client.stock_info("600000/../list?x=1").await.unwrap();
    assert_eq!(stock.symbol, "600000/../list?x=1");

    let script = client.get_script(&ScriptId::new("7?debug")).await.unwrap();
    assert_eq!(script.id, ScriptId::new("7?debug"));
}
