use axum::http::StatusCode;
use uuid::Uuid;

use crate::token::JwtKeys;

use super::helper::*;

#[tokio::test]
async fn test_me() {
    let mut app = setup_test_app();

    let session = session_for(&mut app, "someone@example.com").await;

    let response = me(&mut app, Some(&session)).await;

    assert_eq!(StatusCode::OK, response.status_code);
    assert_eq!(Some("Some name"), response.data()["name"].as_str());
    assert_eq!(Some("someone@example.com"), response.data()["email"].as_str());
    assert!(response.data().get("hashedPassword").is_none());
}

#[tokio::test]
async fn test_me_without_session() {
    let mut app = setup_test_app();

    let response = me(&mut app, None).await;

    assert_eq!(StatusCode::UNAUTHORIZED, response.status_code);
    assert_eq!(Some("Unauthorized"), response.error_message());
    assert_eq!(Some(false), response.body["success"].as_bool());
}

#[tokio::test]
async fn test_me_with_empty_session() {
    let mut app = setup_test_app();

    let response = me(&mut app, Some("noteSphereSession=")).await;

    assert_eq!(StatusCode::UNAUTHORIZED, response.status_code);
    assert_eq!(Some("Unauthorized"), response.error_message());
}

#[tokio::test]
async fn test_me_with_garbage_session() {
    let mut app = setup_test_app();

    let response = me(&mut app, Some("noteSphereSession=not-a-token")).await;

    assert_eq!(StatusCode::UNAUTHORIZED, response.status_code);
    assert_eq!(Some("Unauthorized"), response.error_message());
}

#[tokio::test]
async fn test_me_with_foreign_signature() {
    let mut app = setup_test_app();

    let token = JwtKeys::new(b"some other secret")
        .encode(&Uuid::new_v4())
        .unwrap();

    let response = me(&mut app, Some(&format!("noteSphereSession={token}"))).await;

    assert_eq!(StatusCode::UNAUTHORIZED, response.status_code);
}

#[tokio::test]
async fn test_me_for_unknown_user() {
    let mut app = setup_test_app();

    let token = JwtKeys::new(JWT_SECRET.as_bytes())
        .encode(&Uuid::new_v4())
        .unwrap();

    let response = me(&mut app, Some(&format!("noteSphereSession={token}"))).await;

    assert_eq!(StatusCode::NOT_FOUND, response.status_code);
    assert_eq!(Some("User not found"), response.error_message());
}

#[tokio::test]
async fn test_sign_out() {
    let mut app = setup_test_app();

    let session = session_for(&mut app, "someone@example.com").await;

    let response = sign_out(&mut app, Some(&session)).await;

    assert_eq!(StatusCode::OK, response.status_code);
    assert_eq!(
        Some("Signed out successfully"),
        response.data()["message"].as_str()
    );

    let set_cookie = response.set_cookie.clone().unwrap();
    assert!(set_cookie.starts_with("noteSphereSession=;"));
    assert!(set_cookie.contains("Max-Age=0"));

    // the browser replaces the cookie with the emptied one
    let response = me(&mut app, Some(&response.session().unwrap())).await;

    assert_eq!(StatusCode::UNAUTHORIZED, response.status_code);
}

#[tokio::test]
async fn test_sign_out_without_session() {
    let mut app = setup_test_app();

    let response = sign_out(&mut app, None).await;

    assert_eq!(StatusCode::OK, response.status_code);
    assert_eq!(
        Some("Signed out successfully"),
        response.data()["message"].as_str()
    );
    assert!(response.set_cookie.unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_sign_out_with_post() {
    let mut app = setup_test_app();

    let session = session_for(&mut app, "someone@example.com").await;

    let response = request(
        &mut app,
        axum::http::Method::POST,
        "/api/auth/sign-out",
        Some(&session),
        None,
    )
    .await;

    assert_eq!(StatusCode::OK, response.status_code);
    assert!(response.set_cookie.unwrap().contains("Max-Age=0"));
}
