use followwatch_core::twitter::{TwitterApi, TwitterClient, TwitterError};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client(server: &MockServer) -> TwitterClient {
    TwitterClient::with_http_client(reqwest::Client::new(), &server.uri(), "test-key")
}

#[tokio::test]
async fn profile_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/twitter/user/info"))
        .and(query_param("userName", "loxous"))
        .and(header("X-API-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "msg": "success",
            "data": {
                "userName": "loxous",
                "name": "Lox",
                "followers": 1200,
                "following": 87,
                "statusesCount": 4000,
                "createdAt": "Tue Dec 10 07:00:30 +0000 2024"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = client(&server)
        .fetch_profile("loxous")
        .await
        .expect("profile");

    assert_eq!(profile.user_name, "loxous");
    assert_eq!(profile.following, 87);
    assert_eq!(profile.followers, 1200);
}

#[tokio::test]
async fn api_error_message_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(path("/twitter/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "msg": "User not found"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_profile("ghost")
        .await
        .expect_err("api error");

    assert_eq!(err, TwitterError::Api("User not found".to_string()));
    assert_eq!(err.to_string(), "User not found");
}

#[tokio::test]
async fn api_error_without_message() {
    let server = MockServer::start().await;
    Mock::given(path("/twitter/user/followings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "error"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_following_page("ghost", 20, None)
        .await
        .expect_err("api error");

    assert_eq!(err, TwitterError::Api("Unknown error".to_string()));
}

#[tokio::test]
async fn http_failure_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(path("/twitter/user/info"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_profile("loxous")
        .await
        .expect_err("transport error");

    assert!(matches!(err, TwitterError::Transport(msg) if msg.contains("500")));
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    let client = TwitterClient::with_http_client(reqwest::Client::new(), "http://127.0.0.1:9", "k");

    let err = client
        .fetch_account_credits()
        .await
        .expect_err("connection refused");

    assert!(matches!(err, TwitterError::Transport(_)));
}

#[tokio::test]
async fn followings_page_forwards_size_and_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/twitter/user/followings"))
        .and(query_param("userName", "alice"))
        .and(query_param("pageSize", "137"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "followings": [
                {"userName": "one", "name": "One", "followers_count": 5, "following_count": 6},
                {"userName": "two", "name": "Two", "description": null}
            ],
            "has_next_page": true,
            "next_cursor": "def"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .fetch_following_page("alice", 137, Some("abc".to_string()))
        .await
        .expect("page");

    assert_eq!(page.followings.len(), 2);
    assert_eq!(page.followings[0].followers, 5);
    assert_eq!(page.followings[1].description, "");
    assert!(page.has_next_page);
    assert_eq!(page.next_cursor.as_deref(), Some("def"));
}

#[tokio::test]
async fn first_page_sends_no_cursor() {
    let server = MockServer::start().await;
    Mock::given(path("/twitter/user/followings"))
        .respond_with(|req: &Request| {
            let has_cursor = req.url.query_pairs().any(|(k, _)| k == "cursor");
            let status = if has_cursor { "error" } else { "success" };
            ResponseTemplate::new(200).set_body_json(json!({
                "status": status,
                "msg": "cursor must not be sent",
                "followings": [],
                "has_next_page": false
            }))
        })
        .mount(&server)
        .await;

    let page = client(&server)
        .fetch_following_page("alice", 20, None)
        .await
        .expect("page without cursor");

    assert!(page.followings.is_empty());
    assert!(!page.has_next_page);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn credits_are_read_without_status() {
    let server = MockServer::start().await;
    Mock::given(path("/oapi/my/info"))
        .and(header("X-API-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "recharge_credits": 9000,
            "total_bonus_credits": 500
        })))
        .mount(&server)
        .await;

    let credits = client(&server)
        .fetch_account_credits()
        .await
        .expect("credits");

    assert_eq!(credits.recharge_credits, 9000);
    assert_eq!(credits.total(), 9500);
}

#[tokio::test]
async fn numeric_status_keeps_provider_message() {
    let server = MockServer::start().await;
    Mock::given(path("/twitter/user/followings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 500,
            "msg": "boom"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_following_page("alice", 20, None)
        .await
        .expect_err("api error");

    assert_eq!(err, TwitterError::Api("boom".to_string()));
}

#[tokio::test]
async fn record_with_both_spellings_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(path("/twitter/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "userName": "loxous",
                "following": 87,
                "following_count": 87,
                "followers": 1200,
                "followers_count": 1200
            }
        })))
        .mount(&server)
        .await;

    let profile = client(&server)
        .fetch_profile("loxous")
        .await
        .expect("profile");

    assert_eq!(profile.following, 87);
    assert_eq!(profile.followers, 1200);
}
