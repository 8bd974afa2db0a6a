use std::sync::Arc;

use chrono::Duration;
use foodgram_sdk::{
    jwt::JwtSessionData, routes::routes, schema::UserRole, Config, State,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use warp::http::StatusCode;

const SECRET: &str = "route-test-secret";

// Every request below is answered before a connection is needed.
fn state() -> Arc<State> {
    let config = Config::from_lookup(|key: &str| match key {
        "DATABASE_URL" => Some("postgres://localhost/foodgram".to_owned()),
        "JWT_SECRET" => Some(SECRET.to_owned()),
        _ => None,
    })
    .unwrap();

    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();

    State::with_pool(pool, config)
}

fn session_cookie(user_id: i32) -> String {
    let token = JwtSessionData::new(user_id, UserRole::User, Duration::hours(1))
        .sign(SECRET.as_bytes())
        .unwrap();

    format!("session={token}")
}

fn body(res: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn protected_endpoints_require_a_session() {
    let filter = routes(state());

    let res = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .json(&json!({}))
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = warp::test::request()
        .path("/api/recipes/download_shopping_cart")
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = warp::test::request()
        .method("POST")
        .path("/api/recipes/3/favorite")
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = warp::test::request()
        .path("/api/users/me")
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_sessions_are_rejected() {
    let filter = routes(state());

    let res = warp::test::request()
        .method("DELETE")
        .path("/api/recipes/3/shopping_cart")
        .header("cookie", "session=not-a-token")
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_recipe_is_reported_by_field() {
    let filter = routes(state());

    let res = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .header("cookie", session_cookie(7))
        .json(&json!({
            "name": "Borscht",
            "text": "Boil the beets",
            "image": "data:image/png;base64,AAAA",
            "cooking_time": 0,
            "ingredients": [{ "id": 1, "amount": 3 }],
            "tags": [1],
        }))
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body(&res).get("cooking_time").is_some());
}

#[tokio::test]
async fn duplicate_ingredients_are_rejected() {
    let filter = routes(state());

    let res = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .header("cookie", session_cookie(7))
        .json(&json!({
            "name": "Borscht",
            "text": "Boil the beets",
            "image": "data:image/png;base64,AAAA",
            "cooking_time": 40,
            "ingredients": [{ "id": 1, "amount": 3 }, { "id": 1, "amount": 5 }],
            "tags": [1],
        }))
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body(&res).get("ingredients").is_some());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let filter = routes(state());

    let res = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .header("cookie", session_cookie(7))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cannot_subscribe_to_yourself() {
    let filter = routes(state());

    let res = warp::test::request()
        .method("POST")
        .path("/api/users/7/subscribe")
        .header("cookie", session_cookie(7))
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body(&res).get("author").is_some());
}

#[tokio::test]
async fn invalid_query_parameters_are_rejected() {
    let filter = routes(state());

    let res = warp::test::request()
        .path("/api/recipes?page=abc")
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body(&res).get("page").is_some());
}

#[tokio::test]
async fn out_of_range_page_numbers_are_rejected() {
    let filter = routes(state());

    let res = warp::test::request()
        .path(&format!("/api/recipes?page={}", i64::MAX))
        .reply(&filter)
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body(&res).get("page").is_some());
}

#[tokio::test]
async fn unknown_paths_and_methods() {
    let filter = routes(state());

    let res = warp::test::request()
        .path("/api/nothing/here")
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = warp::test::request()
        .method("PUT")
        .path("/api/tags")
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}
