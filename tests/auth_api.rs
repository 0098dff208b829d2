//! Authentication API Tests
//!
//! Signup, login, route protection, the `Me` routes and the password reset
//! flow under `/api/v1/users`.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{data, TestApp, PASSWORD};

// =============================================================================
// Helper Functions
// =============================================================================

fn signup_body(email: &str) -> Value {
    json!({
        "name": "Test User",
        "email": email,
        "password": PASSWORD,
        "passwordConfirm": PASSWORD,
    })
}

/// The reset token inside the last reset mail
fn reset_token_from_mail(app: &TestApp) -> String {
    let mail = app.mail.sent().pop().unwrap();
    let (_, rest) = mail.body.split_once("/resetPassword/").unwrap();
    rest.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

// =============================================================================
// Signup and Login
// =============================================================================

#[tokio::test]
async fn test_signup_returns_token_and_hides_password() {
    let app = TestApp::new();

    let response = app
        .send(Method::POST, "/api/v1/users/signup", None, Some(signup_body("New@Example.io")))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body["token"].as_str().is_some());
    let user = data(&response, "user");
    assert_eq!(user["email"], "new@example.io");
    assert_eq!(user["role"], "user");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordConfirm").is_none());
}

#[tokio::test]
async fn test_signup_cannot_choose_role() {
    let app = TestApp::new();
    let mut body = signup_body("sneaky@example.io");
    body["role"] = json!("admin");

    let response = app.send(Method::POST, "/api/v1/users/signup", None, Some(body)).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(data(&response, "user")["role"], "user");
}

#[tokio::test]
async fn test_signup_password_mismatch() {
    let app = TestApp::new();
    let mut body = signup_body("new@example.io");
    body["passwordConfirm"] = json!("different1");

    let response = app.send(Method::POST, "/api/v1/users/signup", None, Some(body)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["message"]
        .as_str()
        .unwrap()
        .contains("Passwords are not the same!"));
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let app = TestApp::new();
    app.add_user("taken@example.io", "user");

    let response = app
        .send(Method::POST, "/api/v1/users/signup", None, Some(signup_body("taken@example.io")))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["message"]
        .as_str()
        .unwrap()
        .contains("taken@example.io"));
}

#[tokio::test]
async fn test_login() {
    let app = TestApp::new();
    app.add_user("ann@example.io", "user");

    let ok = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            None,
            Some(json!({"email": "ann@example.io", "password": PASSWORD})),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(ok.body["token"].as_str().is_some());

    let wrong = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            None,
            Some(json!({"email": "ann@example.io", "password": "nottherightone"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Incorrect email or password");

    let missing = app
        .send(Method::POST, "/api/v1/users/login", None, Some(json!({"email": "ann@example.io"})))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "Please provide email and password!");
}

// =============================================================================
// Protection
// =============================================================================

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = TestApp::new();

    let response = app.send(Method::PUT, "/api/v1/users/updateMe", None, Some(json!({}))).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body["message"],
        "You are not logged in! Please log in to get access."
    );
}

#[tokio::test]
async fn test_protected_route_with_garbage_token() {
    let app = TestApp::new();

    let response = app
        .send(Method::PUT, "/api/v1/users/updateMe", Some("not.a.jwt"), Some(json!({})))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid token. Please log in again!");
}

// =============================================================================
// Me Routes
// =============================================================================

#[tokio::test]
async fn test_update_me_changes_only_profile_fields() {
    let app = TestApp::new();
    let (_, token) = app.login_as("ann@example.io", "user");

    let response = app
        .send(
            Method::PUT,
            "/api/v1/users/updateMe",
            Some(&token),
            Some(json!({"name": "Ann Lee", "role": "admin"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(data(&response, "user")["name"], "Ann Lee");
    assert_eq!(data(&response, "user")["role"], "user");
}

#[tokio::test]
async fn test_update_me_refuses_passwords() {
    let app = TestApp::new();
    let (_, token) = app.login_as("ann@example.io", "user");

    let response = app
        .send(
            Method::PUT,
            "/api/v1/users/updateMe",
            Some(&token),
            Some(json!({"password": "newpassword"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["message"],
        "This route is not for password updates. Please use /updateMyPassword"
    );
}

#[tokio::test]
async fn test_update_my_password() {
    let app = TestApp::new();
    let (_, token) = app.login_as("ann@example.io", "user");

    let wrong = app
        .send(
            Method::PUT,
            "/api/v1/users/updateMyPassword",
            Some(&token),
            Some(json!({
                "passwordCurrent": "notmypassword",
                "password": "newpassword",
                "passwordConfirm": "newpassword",
            })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Your current password is wrong.");

    let changed = app
        .send(
            Method::PUT,
            "/api/v1/users/updateMyPassword",
            Some(&token),
            Some(json!({
                "passwordCurrent": PASSWORD,
                "password": "newpassword",
                "passwordConfirm": "newpassword",
            })),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);
    assert!(changed.body["token"].as_str().is_some());

    assert!(app.state.auth.login(Some("ann@example.io"), Some("newpassword")).is_ok());
    assert!(app.state.auth.login(Some("ann@example.io"), Some(PASSWORD)).is_err());
}

#[tokio::test]
async fn test_delete_me_deactivates() {
    let app = TestApp::new();
    let (_, token) = app.login_as("ann@example.io", "user");

    let response = app.send(Method::PUT, "/api/v1/users/deleteMe", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let after = app
        .send(Method::PUT, "/api/v1/users/updateMe", Some(&token), Some(json!({"name": "Back"})))
        .await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        after.body["message"],
        "The user belonging to this token does no longer exist."
    );

    let login = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            None,
            Some(json!({"email": "ann@example.io", "password": PASSWORD})),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Password Reset
// =============================================================================

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::POST,
            "/api/v1/users/forgotPassword",
            None,
            Some(json!({"email": "nobody@example.io"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.mail.sent_count(), 0);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new();
    app.add_user("ann@example.io", "user");

    let forgot = app
        .send(
            Method::POST,
            "/api/v1/users/forgotPassword",
            None,
            Some(json!({"email": "ann@example.io"})),
        )
        .await;
    assert_eq!(forgot.status, StatusCode::OK);
    assert_eq!(forgot.body["message"], "Token sent to email!");
    assert_eq!(app.mail.sent_count(), 1);

    let token = reset_token_from_mail(&app);
    let uri = format!("/api/v1/users/resetPassword/{token}");
    let body = json!({"password": "brandnewpass", "passwordConfirm": "brandnewpass"});

    let reset = app.send(Method::PATCH, &uri, None, Some(body.clone())).await;
    assert_eq!(reset.status, StatusCode::OK);
    assert!(reset.body["token"].as_str().is_some());
    assert!(app.state.auth.login(Some("ann@example.io"), Some("brandnewpass")).is_ok());

    let reused = app.send(Method::PATCH, &uri, None, Some(body)).await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
    assert_eq!(reused.body["message"], "Token is invalid or has expired");
}

#[tokio::test]
async fn test_reset_with_unknown_token() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::PATCH,
            "/api/v1/users/resetPassword/abcdef",
            None,
            Some(json!({"password": "brandnewpass", "passwordConfirm": "brandnewpass"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Admin Routes
// =============================================================================

#[tokio::test]
async fn test_user_management_is_admin_only() {
    let app = TestApp::new();
    let (_, user) = app.login_as("ann@example.io", "user");
    let (_, admin) = app.login_as("root@example.io", "admin");

    let denied = app.send(Method::GET, "/api/v1/users", Some(&user), None).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let listed = app.send(Method::GET, "/api/v1/users?sort=email", Some(&admin), None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["results"], 2);
    let users = data(&listed, "users").as_array().unwrap();
    assert_eq!(users[0]["email"], "ann@example.io");
    assert!(users.iter().all(|u| u.get("password").is_none()));
}

#[tokio::test]
async fn test_create_user_points_to_signup() {
    let app = TestApp::new();
    let (_, admin) = app.login_as("root@example.io", "admin");

    let response = app
        .send(Method::POST, "/api/v1/users", Some(&admin), Some(signup_body("x@example.io")))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["status"], "error");
    assert_eq!(
        response.body["message"],
        "This route is not defined! Please use /signup instead"
    );
}

#[tokio::test]
async fn test_admin_updates_and_deletes_user() {
    let app = TestApp::new();
    let id = app.add_user("ann@example.io", "user");
    let (_, admin) = app.login_as("root@example.io", "admin");
    let uri = format!("/api/v1/users/{id}");

    let updated = app
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({"role": "guide"})))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(data(&updated, "user")["role"], "guide");

    let deleted = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app.send(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["message"], "No user found with that ID");
}
