use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

mod common;
use common::TestServer;

const EMAIL: &str = "shopper@example.com";
const PASSWORD: &str = "correct-horse";

#[tokio::test]
async fn health_and_root_are_public() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.send(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = server.send(Method::GET, "/", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Catalog API");
    Ok(())
}

#[tokio::test]
async fn sign_up_confirm_and_login() -> Result<()> {
    let server = TestServer::start().await?;
    let credentials = json!({ "email": EMAIL, "password": PASSWORD });

    let (status, body) = server
        .send(Method::POST, "/auth/signup", None, Some(credentials.clone()))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["message"], "Confirm code to Sign Up");

    let code = server
        .identity
        .pending_confirmation_code(EMAIL)
        .expect("sign-up issues a confirmation code");
    let (status, body) = server
        .send(Method::POST, "/auth/confirm", None, Some(json!({ "email": EMAIL, "code": code })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["message"], "Sign Up Success");

    let (status, body) = server
        .send(Method::POST, "/auth/login", None, Some(credentials))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id_token = body["data"]["idToken"].as_str().expect("idToken");
    assert!(body["data"]["accessToken"].is_string());
    assert!(body["data"]["refreshToken"].is_string());

    // Self-registered accounts carry the user role: reads allowed, writes refused
    let (status, _) = server.send(Method::GET, "/categories", Some(id_token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = server
        .send(Method::POST, "/categories", Some(id_token), Some(json!({ "category_name": "Shoes" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Don't have Permission");
    Ok(())
}

#[tokio::test]
async fn promoted_account_gets_admin_access() -> Result<()> {
    let server = TestServer::start().await?;
    let credentials = json!({ "email": EMAIL, "password": PASSWORD });

    server.send(Method::POST, "/auth/signup", None, Some(credentials.clone())).await?;
    let code = server.identity.pending_confirmation_code(EMAIL).expect("code");
    server
        .send(Method::POST, "/auth/confirm", None, Some(json!({ "email": EMAIL, "code": code })))
        .await?;
    server.identity.set_role(EMAIL, "admin")?;

    let (_, body) = server.send(Method::POST, "/auth/login", None, Some(credentials)).await?;
    let id_token = body["data"]["idToken"].as_str().expect("idToken");

    let (status, body) = server
        .send(Method::POST, "/categories", Some(id_token), Some(json!({ "category_name": "Shoes" })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    Ok(())
}

#[tokio::test]
async fn sign_up_collects_every_violation() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server
        .send(Method::POST, "/auth/signup", None, Some(json!({ "email": "nope", "password": "short" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let violations = body["violations"].as_array().expect("violations");
    let fields: Vec<&str> = violations.iter().filter_map(|v| v["field"].as_str()).collect();
    assert!(fields.contains(&"email"), "{body}");
    assert!(fields.contains(&"password"), "{body}");
    assert!(server.identity.pending_confirmation_code("nope").is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_sign_up_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let credentials = json!({ "email": EMAIL, "password": PASSWORD });

    let (status, _) = server
        .send(Method::POST, "/auth/signup", None, Some(credentials.clone()))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .send(Method::POST, "/auth/signup", None, Some(credentials))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Your username is already exists");
    Ok(())
}

#[tokio::test]
async fn confirm_rejects_wrong_code_and_unknown_user() -> Result<()> {
    let server = TestServer::start().await?;
    server
        .send(Method::POST, "/auth/signup", None, Some(json!({ "email": EMAIL, "password": PASSWORD })))
        .await?;
    let code = server.identity.pending_confirmation_code(EMAIL).expect("code");
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let (status, body) = server
        .send(Method::POST, "/auth/confirm", None, Some(json!({ "email": EMAIL, "code": wrong })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Your code is invalid");

    let (status, body) = server
        .send(
            Method::POST,
            "/auth/confirm",
            None,
            Some(json!({ "email": "stranger@example.com", "code": code })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Incorrect username");
    Ok(())
}

#[tokio::test]
async fn login_failures_are_unauthorized() -> Result<()> {
    let server = TestServer::start().await?;
    let credentials = json!({ "email": EMAIL, "password": PASSWORD });
    server.send(Method::POST, "/auth/signup", None, Some(credentials.clone())).await?;

    let (status, body) = server.send(Method::POST, "/auth/login", None, Some(credentials)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Your account is not verified!");

    let (status, body) = server
        .send(Method::POST, "/auth/login", None, Some(json!({ "email": EMAIL, "password": "wrong-password" })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect username or password");

    let (status, body) = server
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect username or password");
    Ok(())
}

#[tokio::test]
async fn invalid_bearer_token_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server
        .send(Method::GET, "/categories", Some("not-a-jwt"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn confirm_reports_only_the_first_violation() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server
        .send(Method::POST, "/auth/confirm", None, Some(json!({ "email": "nope" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let violations = body["violations"].as_array().expect("violations");
    assert_eq!(violations.len(), 1, "{body}");
    assert_eq!(violations[0]["field"], "code");
    assert_eq!(violations[0]["rule"], "any.required");
    Ok(())
}
