use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use pickup_engine::{CartApi, MemoryCartCache};
use serde_json::json as body;

use super::helpers::{as_principal, json, send_request};
use crate::routes::{ClearCartRoute, MyCartRoute, RefreshCartRoute, RemoveCartLineRoute, UpsertCartLineRoute};

fn configure(cache: MemoryCartCache) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(MyCartRoute::<MemoryCartCache>::new())
            .service(UpsertCartLineRoute::<MemoryCartCache>::new())
            .service(RemoveCartLineRoute::<MemoryCartCache>::new())
            .service(ClearCartRoute::<MemoryCartCache>::new())
            .service(RefreshCartRoute::<MemoryCartCache>::new())
            .app_data(web::Data::new(CartApi::new(cache)));
    }
}

fn put_line(category: i64, quantity: f64) -> TestRequest {
    let req = TestRequest::put().uri("/cart/lines").set_json(body!({"waste_category_id": category, "quantity": quantity}));
    as_principal(req, "alice", "shopper")
}

#[actix_web::test]
async fn quantity_replaces_the_previous_one() {
    let _ = env_logger::try_init().ok();
    let cache = MemoryCartCache::new(Duration::from_secs(1800));
    let (status, res) = send_request(put_line(7, 5.0), configure(cache.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["lines"][0]["quantity"], 5.0);

    let (status, res) = send_request(put_line(7, 8.0), configure(cache.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let cart = json(&res);
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart["lines"][0]["waste_category_id"], 7);
    assert_eq!(cart["lines"][0]["quantity"], 8.0);
    assert_eq!(cart["owner_id"], "alice");

    let req = as_principal(TestRequest::get().uri("/cart"), "alice", "shopper");
    let (status, res) = send_request(req, configure(cache.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    assert_eq!(res["cart"]["lines"][0]["quantity"], 8.0);
    let remaining = res["remaining_secs"].as_u64().unwrap();
    assert!(remaining > 1790 && remaining <= 1800, "{remaining}");
}

#[actix_web::test]
async fn carts_belong_to_the_caller() {
    let _ = env_logger::try_init().ok();
    let cache = MemoryCartCache::new(Duration::from_secs(1800));
    send_request(put_line(1, 2.0), configure(cache.clone())).await;
    let req = as_principal(TestRequest::get().uri("/cart"), "bob", "shopper");
    let (status, res) = send_request(req, configure(cache.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    assert!(res["cart"].is_null());
    assert!(res["remaining_secs"].is_null());
}

#[actix_web::test]
async fn removing_the_last_line_deletes_the_cart() {
    let _ = env_logger::try_init().ok();
    let cache = MemoryCartCache::new(Duration::from_secs(1800));
    send_request(put_line(1, 2.0), configure(cache.clone())).await;
    send_request(put_line(2, 4.0), configure(cache.clone())).await;

    let req = as_principal(TestRequest::delete().uri("/cart/lines/1"), "alice", "shopper");
    let (status, res) = send_request(req, configure(cache.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["lines"].as_array().unwrap().len(), 1);

    let req = as_principal(TestRequest::delete().uri("/cart/lines/2"), "alice", "shopper");
    let (status, res) = send_request(req, configure(cache.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res, "null");
    assert!(cache.is_empty().await);
}

#[actix_web::test]
async fn clear_and_refresh() {
    let _ = env_logger::try_init().ok();
    let cache = MemoryCartCache::new(Duration::from_secs(1800));
    send_request(put_line(1, 2.0), configure(cache.clone())).await;

    let req = as_principal(TestRequest::post().uri("/cart/refresh"), "alice", "shopper");
    let (status, res) = send_request(req, configure(cache.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json(&res)["remaining_secs"].as_u64().unwrap() > 1790);

    let req = as_principal(TestRequest::delete().uri("/cart"), "alice", "shopper");
    let (status, res) = send_request(req, configure(cache.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["success"], true);
    assert!(cache.is_empty().await);

    let req = as_principal(TestRequest::post().uri("/cart/refresh"), "alice", "shopper");
    let (status, res) = send_request(req, configure(cache.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json(&res)["remaining_secs"].is_null());
}

#[actix_web::test]
async fn malformed_line() {
    let _ = env_logger::try_init().ok();
    let cache = MemoryCartCache::new(Duration::from_secs(1800));
    let req = TestRequest::put().uri("/cart/lines").set_json(body!({"waste_category_id": "plastic", "quantity": 1.0}));
    let (status, _) = send_request(as_principal(req, "alice", "shopper"), configure(cache.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(cache.is_empty().await);
}
