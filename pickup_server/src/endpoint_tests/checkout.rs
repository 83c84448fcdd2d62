use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use pickup_engine::{
    cart_objects::CartLine,
    db_types::{Address, NewPickupRequest, PickupDetails, PickupRequestItem, PickupStatus, Principal, UserId},
    helpers::geo::Coordinate,
    traits::PickupStoreError,
    CartApi,
    CheckoutApi,
    MemoryCartCache,
};
use serde_json::json as body;

use super::{
    helpers::{as_principal, json, pickup_request, send_request},
    mocks::{MockAddresses, MockPickupDb, MockRates},
};
use crate::routes::CheckoutRoute;

fn configure(
    cache: MemoryCartCache,
    rates: MockRates,
    store: MockPickupDb,
    addresses: MockAddresses,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(CheckoutRoute::<MemoryCartCache, MockRates, MockPickupDb, MockAddresses>::new())
            .app_data(web::Data::new(CheckoutApi::new(cache, rates, store, addresses)));
    }
}

/// Address 5 belongs to alice and address 6 to bob. No other address exists.
fn addresses() -> MockAddresses {
    let mut addresses = MockAddresses::new();
    addresses.expect_address_by_id().returning(|id| {
        let owner = match id {
            5 => "alice",
            6 => "bob",
            _ => return Ok(None),
        };
        Ok(Some(Address {
            id,
            owner_id: UserId::from(owner),
            label: None,
            location: Coordinate { latitude: 0.0, longitude: 0.0 },
        }))
    });
    addresses
}

fn checkout_request() -> TestRequest {
    let req = TestRequest::post().uri("/checkout").set_json(body!({"address_id": 5, "notes": "Side gate"}));
    as_principal(req, "alice", "shopper")
}

/// Category 7 costs 2.0. Nothing else is collected.
fn rates() -> MockRates {
    let mut rates = MockRates::new();
    rates.expect_price_of().returning(|c| Ok((c.value() == 7).then_some(2.0)));
    rates
}

/// What the durable store would return for a successful commit.
fn committed(request: NewPickupRequest) -> PickupDetails {
    let mut saved = pickup_request(11, request.shopper_id.as_str(), PickupStatus::WaitingCollector, None);
    saved.address_id = request.address_id;
    saved.notes = request.notes;
    saved.cart_id = Some(request.cart_id);
    let items = request
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| PickupRequestItem {
            id: i as i64 + 1,
            request_id: 11,
            waste_category_id: item.waste_category_id,
            estimated_amount: item.estimated_amount,
            estimated_unit_price: item.estimated_unit_price,
            estimated_subtotal: item.estimated_subtotal(),
            actual_amount: None,
            final_price: None,
        })
        .collect();
    PickupDetails { request: saved, items }
}

async fn cache_with_lines(lines: &[(i64, f64)]) -> MemoryCartCache {
    let cache = MemoryCartCache::new(Duration::from_secs(1800));
    let carts = CartApi::new(cache.clone());
    let alice = Principal::shopper("alice");
    for (category, quantity) in lines {
        carts.add_or_update_line(&alice, CartLine::new(*category, *quantity)).await.unwrap();
    }
    cache
}

#[actix_web::test]
async fn checkout_converts_the_cart() {
    let _ = env_logger::try_init().ok();
    let cache = cache_with_lines(&[(7, 5.0), (7, 8.0), (99, 1.0)]).await;
    let mut store = MockPickupDb::new();
    store.expect_is_cart_committed().times(1).returning(|_| Ok(false));
    store
        .expect_commit_checkout()
        .withf(|r| r.address_id == 5 && r.items.len() == 1 && r.requested_by == Principal::shopper("alice"))
        .times(1)
        .returning(|r| Ok(committed(r)));

    let (status, res) = send_request(checkout_request(), configure(cache.clone(), rates(), store, addresses())).await;
    assert_eq!(status, StatusCode::CREATED);
    let res = json(&res);
    assert_eq!(res["request"]["id"], 11);
    assert_eq!(res["request"]["status"], "waiting_collector");
    assert_eq!(res["request"]["notes"], "Side gate");
    let items = res["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["waste_category_id"], 7);
    assert_eq!(items[0]["estimated_amount"], 8.0);
    assert_eq!(items[0]["estimated_unit_price"], 2.0);
    assert_eq!(items[0]["estimated_subtotal"], 16.0);
    assert!(cache.is_empty().await, "The cart should have been evicted");
}

#[actix_web::test]
async fn empty_cart() {
    let _ = env_logger::try_init().ok();
    let cache = MemoryCartCache::new(Duration::from_secs(1800));
    let mut store = MockPickupDb::new();
    store.expect_commit_checkout().never();
    let (status, res) = send_request(checkout_request(), configure(cache, rates(), store, addresses())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(&res)["error"], "There is no cart to check out");
}

#[actix_web::test]
async fn nothing_can_be_priced() {
    let _ = env_logger::try_init().ok();
    let cache = cache_with_lines(&[(1, 3.0), (2, 4.0)]).await;
    let mut store = MockPickupDb::new();
    store.expect_is_cart_committed().returning(|_| Ok(false));
    store.expect_commit_checkout().never();
    let (status, _) = send_request(checkout_request(), configure(cache.clone(), rates(), store, addresses())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!cache.is_empty().await, "The cart must survive a failed checkout");
}

#[actix_web::test]
async fn failed_commit_keeps_the_cart() {
    let _ = env_logger::try_init().ok();
    let cache = cache_with_lines(&[(7, 2.0)]).await;
    let mut store = MockPickupDb::new();
    store.expect_is_cart_committed().returning(|_| Ok(false));
    store.expect_commit_checkout().returning(|_| Err(PickupStoreError::DatabaseError("disk full".into())));
    let (status, _) = send_request(checkout_request(), configure(cache.clone(), rates(), store, addresses())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!cache.is_empty().await, "The cart must survive a failed checkout");
}

#[actix_web::test]
async fn missing_address() {
    let _ = env_logger::try_init().ok();
    let cache = cache_with_lines(&[(7, 2.0)]).await;
    let mut store = MockPickupDb::new();
    store.expect_commit_checkout().never();
    let req = as_principal(TestRequest::post().uri("/checkout").set_json(body!({"address_id": 0})), "alice", "shopper");
    let (status, _) = send_request(req, configure(cache, rates(), store, addresses())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn collectors_cannot_check_out() {
    let _ = env_logger::try_init().ok();
    let cache = cache_with_lines(&[(7, 2.0)]).await;
    let mut store = MockPickupDb::new();
    store.expect_commit_checkout().never();
    let req = as_principal(TestRequest::post().uri("/checkout").set_json(body!({"address_id": 5})), "alice", "collector");
    let (status, _) = send_request(req, configure(cache.clone(), rates(), store, addresses())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!cache.is_empty().await);
}

#[actix_web::test]
async fn unknown_or_foreign_addresses() {
    let _ = env_logger::try_init().ok();
    for address_id in [6, 404] {
        let cache = cache_with_lines(&[(7, 2.0)]).await;
        let mut store = MockPickupDb::new();
        store.expect_commit_checkout().never();
        let req = TestRequest::post().uri("/checkout").set_json(body!({"address_id": address_id}));
        let req = as_principal(req, "alice", "shopper");
        let (status, res) = send_request(req, configure(cache.clone(), rates(), store, addresses())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let message = json(&res)["error"].as_str().unwrap().to_string();
        assert!(message.contains(&format!("Address {address_id} does not exist")), "{message}");
        assert!(!cache.is_empty().await, "The cart must survive a failed checkout");
    }
}

#[actix_web::test]
async fn unreadable_cart() {
    let _ = env_logger::try_init().ok();
    let cache = MemoryCartCache::new(Duration::from_secs(1800));
    cache.insert_raw(&UserId::from("alice"), "{not json".to_string()).await;
    let mut store = MockPickupDb::new();
    store.expect_commit_checkout().never();
    let (status, _) = send_request(checkout_request(), configure(cache.clone(), rates(), store, addresses())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(cache.is_empty().await, "The unreadable cart should have been discarded");
}
