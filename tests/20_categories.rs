use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

mod common;
use common::TestServer;

#[tokio::test]
async fn admin_manages_categories() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin()?;

    let (status, body) = server
        .send(Method::POST, "/categories", Some(&admin), Some(json!({ "category_name": "  Shoes  " })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["data"]["category_id"].as_str().expect("category_id").to_string();

    let (status, body) = server
        .send(Method::GET, &format!("/categories/{}", id), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category_id"], id.as_str());
    assert_eq!(body["data"]["category_name"], "Shoes", "names are trimmed");

    let (status, body) = server.send(Method::GET, "/categories", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (status, body) = server
        .send(Method::DELETE, &format!("/categories/{}", id), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Delete Success");

    let (status, body) = server
        .send(Method::GET, &format!("/categories/{}", id), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found Category");
    Ok(())
}

#[tokio::test]
async fn users_read_but_cannot_write() -> Result<()> {
    let server = TestServer::start().await?;
    let id = server.create_category("Hats").await?;
    let user = server.user()?;

    let (status, _) = server.send(Method::GET, "/categories", Some(&user), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server
        .send(Method::GET, &format!("/categories/{}", id), Some(&user), None)
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .send(Method::POST, "/categories", Some(&user), Some(json!({ "category_name": "Socks" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Don't have Permission");

    let (status, _) = server
        .send(Method::DELETE, &format!("/categories/{}", id), Some(&user), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(server.store.len(&server.state.tables.categories), 1);
    Ok(())
}

#[tokio::test]
async fn anonymous_callers_are_forbidden() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.send(Method::GET, "/categories", None, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn authorization_runs_before_validation() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user()?;

    // An invalid payload from a caller without the role still reports the role failure
    let (status, _) = server
        .send(Method::POST, "/categories", Some(&user), Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn validation_stops_at_first_violation() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin()?;

    let (status, body) = server
        .send(
            Method::POST,
            "/categories",
            Some(&admin),
            Some(json!({ "category_name": "", "colour": "red" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["violations"].as_array().map(Vec::len), Some(1), "{body}");
    assert!(server.store.is_empty(&server.state.tables.categories));
    Ok(())
}

#[tokio::test]
async fn unknown_fields_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin()?;
    let id = server.create_category("Bags").await?;

    let (status, body) = server
        .send(
            Method::PUT,
            &format!("/categories/{}", id),
            Some(&admin),
            Some(json!({ "category_name": "Luggage", "category_id": "hijack" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["violations"][0]["rule"], "object.unknown");

    let (_, body) = server
        .send(Method::GET, &format!("/categories/{}", id), Some(&admin), None)
        .await?;
    assert_eq!(body["data"]["category_name"], "Bags");
    Ok(())
}

#[tokio::test]
async fn update_is_idempotent() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin()?;
    let id = server.create_category("Bags").await?;
    let path = format!("/categories/{}", id);
    let payload = json!({ "category_name": "Luggage" });

    for _ in 0..2 {
        let (status, body) = server
            .send(Method::PUT, &path, Some(&admin), Some(payload.clone()))
            .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["message"], "Update Success");
    }

    let (_, body) = server.send(Method::GET, &path, Some(&admin), None).await?;
    assert_eq!(body["data"]["category_name"], "Luggage");
    assert_eq!(body["data"]["category_id"], id.as_str());
    assert_eq!(server.store.len(&server.state.tables.categories), 1);
    Ok(())
}

#[tokio::test]
async fn missing_categories_are_not_found() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin()?;

    let (status, body) = server
        .send(Method::PUT, "/categories/missing", Some(&admin), Some(json!({ "category_name": "X" })))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found Category");
    assert!(server.store.is_empty(&server.state.tables.categories), "update never creates");

    let (status, _) = server
        .send(Method::DELETE, "/categories/missing", Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
