use std::io::Cursor;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use reqwest::{header, Method, StatusCode};
use serde_json::Value;

use catalog_api::storage::ObjectStorage;
use catalog_api::store::Store;

mod common;
use common::{eventually, TestServer};

fn png(width: u32, height: u32) -> Result<Vec<u8>> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

async fn request_upload(server: &TestServer, product_id: &str, content_type: &str) -> Result<(StatusCode, Value)> {
    let res = server
        .client
        .post(server.url(&format!("/products/{}/image", product_id)))
        .bearer_auth(server.admin()?)
        .header(header::CONTENT_TYPE, content_type)
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json().await?))
}

async fn stored_product(server: &TestServer, id: &str) -> Result<catalog_api::store::Item> {
    server
        .store
        .get(&server.state.tables.products, id)
        .await?
        .context("product missing")
}

#[tokio::test]
async fn uploaded_image_gets_a_thumbnail() -> Result<()> {
    let server = TestServer::start().await?;
    let category_id = server.create_category("Shoes").await?;
    let id = server.create_product("Runner", 59.5, &category_id).await?;

    let (status, body) = request_upload(&server, &id, "image/png").await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["data"]["url"].as_str().context("url")?.to_string();
    let key = body["data"]["key"].as_str().context("key")?.to_string();
    assert_eq!(key, format!("images/products/{}.png", id));
    assert_eq!(stored_product(&server, &id).await?["image"], key.as_str());

    let original = png(120, 80)?;
    let res = server
        .client
        .put(&url)
        .header(header::CONTENT_TYPE, "image/png")
        .body(original.clone())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let expected = format!("thumbnails/products/{}.png", id);
    let (srv, product_id, derived) = (&server, id.as_str(), expected.as_str());
    let recorded = eventually(Duration::from_secs(5), move || async move {
        Ok(stored_product(srv, product_id).await?["thumbnail"] == derived)
    })
    .await?;
    assert!(recorded, "thumbnail was never recorded on the product");

    // The listing exposes a signed thumbnail URL, sized to the configured box
    let user = server.user()?;
    let (_, body) = server.send(Method::GET, "/products", Some(&user), None).await?;
    let thumbnail_url = body["data"][0]["thumbnail"].as_str().context("thumbnail url")?;
    let res = server.client.get(thumbnail_url).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
    let thumbnail = image::load_from_memory(&res.bytes().await?)?;
    assert_eq!(thumbnail.dimensions(), (50, 50));

    // The single view exposes the signed original instead
    let (_, body) = server
        .send(Method::GET, &format!("/products/{}", id), Some(&user), None)
        .await?;
    assert!(body["data"].get("thumbnail").is_none());
    let image_url = body["data"]["image"].as_str().context("image url")?;
    let res = server.client.get(image_url).send().await?;
    assert_eq!(res.bytes().await?.as_ref(), original.as_slice());
    Ok(())
}

#[tokio::test]
async fn non_image_content_type_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let category_id = server.create_category("Shoes").await?;
    let id = server.create_product("Runner", 10.0, &category_id).await?;

    let (status, body) = request_upload(&server, &id, "text/plain").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Image Type");

    let product = stored_product(&server, &id).await?;
    assert_eq!(product["image"], "");
    assert_eq!(product["createdAt"], product["updatedAt"], "rejected upload leaves the record untouched");
    Ok(())
}

#[tokio::test]
async fn upload_for_missing_product_is_not_found() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = request_upload(&server, "ghost", "image/jpeg").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found Product");
    assert!(server.store.is_empty(&server.state.tables.products));
    Ok(())
}

#[tokio::test]
async fn storage_requires_a_valid_signature() -> Result<()> {
    let server = TestServer::start().await?;
    let category_id = server.create_category("Shoes").await?;
    let id = server.create_product("Runner", 10.0, &category_id).await?;
    let (_, body) = request_upload(&server, &id, "image/png").await?;
    let url = body["data"]["url"].as_str().context("url")?.to_string();
    let bucket = server.state.bucket().to_string();

    let unsigned = server.url(&format!("/storage/{}/images/products/{}.png", bucket, id));
    let res = server.client.put(&unsigned).body(png(10, 10)?).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let tampered = url.replace(&id, "someone-else");
    let res = server.client.put(&tampered).body(png(10, 10)?).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // A PUT grant does not allow reading
    let res = server.client.get(&url).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert_eq!(server.storage.object_count(&bucket), 0);
    Ok(())
}

#[tokio::test]
async fn reconcile_repairs_unrecorded_thumbnails() -> Result<()> {
    let server = TestServer::start().await?;
    let bucket = server.state.bucket().to_string();
    let category_id = server.create_category("Shoes").await?;

    // Derived object written but never recorded on its product
    let repaired = server.create_product("Runner", 10.0, &category_id).await?;
    request_upload(&server, &repaired, "image/png").await?;
    let derived_key = format!("thumbnails/products/{}.png", repaired);
    server
        .storage
        .put_object(&bucket, &derived_key, Bytes::from(png(50, 50)?), "image/png")
        .await?;

    // Upload URL issued, nothing ever uploaded
    let abandoned = server.create_product("Walker", 20.0, &category_id).await?;
    request_upload(&server, &abandoned, "image/jpeg").await?;

    let user = server.user()?;
    let (status, _) = server
        .send(Method::POST, "/admin/thumbnails/reconcile", Some(&user), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = server.admin()?;
    let (status, body) = server
        .send(Method::POST, "/admin/thumbnails/reconcile", Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["scanned"], 2);
    assert_eq!(body["data"]["repaired"], 1);
    assert_eq!(body["data"]["missing_source"], 1);
    assert_eq!(body["data"]["rederived"], 0);

    assert_eq!(stored_product(&server, &repaired).await?["thumbnail"], derived_key.as_str());
    assert_eq!(stored_product(&server, &abandoned).await?["thumbnail"], "");
    Ok(())
}
