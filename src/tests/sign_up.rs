use axum::http::StatusCode;

use crate::config::Config;
use crate::config::Environment;
use crate::create_router;
use crate::password;
use crate::storage::Memory;
use crate::storage::Storage;

use super::helper::*;

#[tokio::test]
async fn test_sign_up() {
    let mut app = setup_test_app();

    let response = sign_up(&mut app, "Some name", "someone@example.com", PASSWORD).await;

    assert_eq!(StatusCode::CREATED, response.status_code);
    assert_eq!(Some(true), response.body["success"].as_bool());
    assert!(response.body["error"].is_null());

    let data = response.data();
    assert!(data["id"].is_string());
    assert_eq!(Some("Some name"), data["name"].as_str());
    assert_eq!(Some("someone@example.com"), data["email"].as_str());
    assert!(data["createdAt"].is_string());
    assert!(data.get("password").is_none());
    assert!(data.get("hashedPassword").is_none());
}

#[tokio::test]
async fn test_sign_up_sets_session_cookie() {
    let mut app = setup_test_app();

    let response = sign_up(&mut app, "Some name", "someone@example.com", PASSWORD).await;
    assert_eq!(StatusCode::CREATED, response.status_code);

    let set_cookie = response.set_cookie.clone().unwrap();
    assert!(set_cookie.starts_with("noteSphereSession="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=1728000"));
    // development mode
    assert!(!set_cookie.contains("Secure"));

    let session = response.session().unwrap();
    let response = me(&mut app, Some(&session)).await;

    assert_eq!(StatusCode::OK, response.status_code);
    assert_eq!(Some("someone@example.com"), response.data()["email"].as_str());
}

#[tokio::test]
async fn test_sign_up_secure_cookie_in_production() {
    let config = Config {
        environment: Environment::Production,
        ..test_config()
    };
    let mut app = create_router(Memory::new(), &config);

    let response = sign_up(&mut app, "Some name", "someone@example.com", PASSWORD).await;
    assert_eq!(StatusCode::CREATED, response.status_code);

    let set_cookie = response.set_cookie.clone().unwrap();
    assert!(set_cookie.contains("; Secure"));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let response = sign_out(&mut app, response.session().as_deref()).await;
    assert!(response.set_cookie.unwrap().contains("; Secure"));
}

#[tokio::test]
async fn test_sign_up_stores_hashed_password() {
    let (mut app, storage) = setup_test_app_with_storage();

    let response = sign_up(&mut app, "Some name", "someone@example.com", PASSWORD).await;
    assert_eq!(StatusCode::CREATED, response.status_code);

    let user = storage
        .find_single_user_by_email("someone@example.com")
        .await
        .unwrap()
        .unwrap();

    assert_ne!(PASSWORD, user.hashed_password);
    assert!(password::verify(&user.hashed_password, PASSWORD));
}

#[tokio::test]
async fn test_sign_up_normalizes_email() {
    let mut app = setup_test_app();

    let response = sign_up(&mut app, "Some name", "  SomeOne@Example.com ", PASSWORD).await;

    assert_eq!(StatusCode::CREATED, response.status_code);
    assert_eq!(Some("someone@example.com"), response.data()["email"].as_str());
}

#[tokio::test]
async fn test_sign_up_duplicate_email() {
    let mut app = setup_test_app();

    let response = sign_up(&mut app, "Some name", "someone@example.com", PASSWORD).await;
    assert_eq!(StatusCode::CREATED, response.status_code);

    let response = sign_up(&mut app, "Other name", "someone@example.com", "otherpassword").await;

    assert_eq!(StatusCode::BAD_REQUEST, response.status_code);
    assert_eq!(Some("User already exists"), response.error_message());
    assert_eq!(Some(false), response.body["success"].as_bool());
    assert!(response.data().is_null());
    assert!(response.set_cookie.is_none());

    let response = sign_up(&mut app, "Other name", "SOMEONE@example.com", "otherpassword").await;

    assert_eq!(StatusCode::BAD_REQUEST, response.status_code);
    assert_eq!(Some("User already exists"), response.error_message());
}

#[tokio::test]
async fn test_sign_up_validation() {
    let (mut app, storage) = setup_test_app_with_storage();

    let response = sign_up(&mut app, "ab", "someone@example.com", PASSWORD).await;
    assert_eq!(StatusCode::BAD_REQUEST, response.status_code);
    assert_eq!(
        Some("name should be more than 3 characters"),
        response.error_message()
    );

    let response = sign_up(&mut app, "Some name", "not an email", PASSWORD).await;
    assert_eq!(StatusCode::BAD_REQUEST, response.status_code);
    assert_eq!(Some("Invalid email"), response.error_message());

    let response = sign_up(&mut app, "Some name", "someone@example.com", "12345").await;
    assert_eq!(StatusCode::BAD_REQUEST, response.status_code);
    assert_eq!(
        Some("password should be more than 6 characters"),
        response.error_message()
    );

    let user = storage
        .find_single_user_by_email("someone@example.com")
        .await
        .unwrap();

    assert!(user.is_none());
}
