mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn test_second_page_of_twenty_four() {
    let app = spawn_app().await;
    let (status, body) = app.get("/api/products?page=2&limit=12").await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<i64> = body["data"].as_array().unwrap().iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, (13..=24).collect::<Vec<_>>());
    assert_eq!(body["pagination"], json!({ "page": 2, "limit": 12, "total": 24, "totalPages": 2 }));
}

#[tokio::test]
async fn test_filter_and_sort() {
    let app = spawn_app().await;
    let (_, body) = app.get("/api/products?category=tops&sort=price-high&limit=3").await;
    let names: Vec<&str> = body["data"].as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Basic Tee Pack (3)", "Long Sleeve Shirt", "Striped Polo Shirt"]);
    assert_eq!(body["pagination"]["total"], 6);
    assert_eq!(body["pagination"]["totalPages"], 2);

    let (_, body) = app.get("/api/products?minPrice=40&maxPrice=45.99&category=all").await;
    let prices: Vec<f64> = body["data"].as_array().unwrap().iter().map(|p| p["price"].as_f64().unwrap()).collect();
    assert!(!prices.is_empty());
    assert!(prices.iter().all(|p| (40.0..=45.99).contains(p)));

    let (_, body) = app.get("/api/products?search=DRESS").await;
    assert_eq!(body["pagination"]["total"], 6);
}

#[tokio::test]
async fn test_bad_filters_rejected() {
    let app = spawn_app().await;
    let (status, body) = app.get("/api/products?minPrice=cheap").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid minPrice: cheap");
}

#[tokio::test]
async fn test_product_detail_and_categories() {
    let app = spawn_app().await;
    let (status, body) = app.get("/api/products/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Summer Dress");
    assert_eq!(body["data"]["price"], 34.99);
    assert_eq!(body["data"]["sizes"], json!(["0-6M", "6-12M", "1-2Y", "2-4Y", "4-6Y"]));
    assert_eq!(body["data"]["rating"], 0.0);

    assert_eq!(app.get("/api/products/999").await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/products/abc").await.0, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/products/categories/list").await;
    assert_eq!(body["data"], json!(["bottoms", "dresses", "new", "tops"]));
}

#[tokio::test]
async fn test_reviews_recompute_rating() {
    let app = spawn_app().await;

    let (status, body) = app.post("/api/products/5/reviews", json!({ "rating": 5, "comment": "Lovely" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["id"].as_i64().is_some());
    let (_, product) = app.get("/api/products/5").await;
    assert_eq!(product["data"]["rating"], 5.0);
    assert_eq!(product["data"]["review_count"], 1);

    app.post("/api/products/5/reviews", json!({ "rating": 3 })).await;
    let (_, product) = app.get("/api/products/5").await;
    assert_eq!(product["data"]["rating"], 4.0);
    assert_eq!(product["data"]["review_count"], 2);

    let (_, reviews) = app.get("/api/products/5/reviews").await;
    assert_eq!(reviews["data"].as_array().unwrap().len(), 2);
    assert_eq!(reviews["data"][1]["comment"], "Lovely");
}

#[tokio::test]
async fn test_review_validation() {
    let app = spawn_app().await;
    for rating in [json!(0), json!(6), json!(null)] {
        let (status, body) = app.post("/api/products/1/reviews", json!({ "rating": rating })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Rating must be between 1 and 5");
    }
    assert_eq!(app.post("/api/products/1/reviews", json!({ "rating": 4.5 })).await.0, StatusCode::BAD_REQUEST);
    assert_eq!(app.post("/api/products/999/reviews", json!({ "rating": 4 })).await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.count("reviews").await, 0);

    let (_, product) = app.get("/api/products/1").await;
    assert_eq!(product["data"]["review_count"], 0);
}

#[tokio::test]
async fn test_create_product() {
    let app = spawn_app().await;
    let (status, body) = app
        .post(
            "/api/products",
            json!({ "name": "Rain Boots", "price": 29.5, "category": "new", "stock": 12, "sizes": ["2-4Y"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["id"], 25);
    assert_eq!(body["data"]["price"], 29.5);
    assert_eq!(body["data"]["colors"], json!([]));

    let (status, _) = app.post("/api/products", json!({ "name": "Free", "price": 0, "category": "new" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
