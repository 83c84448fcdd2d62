use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use pickup_engine::{
    db_types::{Address, Collector, CollectorGuard, CollectorPrice, PickupStatus, UserId, WasteCategoryId},
    helpers::geo::Coordinate,
    traits::PickupStoreError,
    MatchingApi,
    MatchingConfig,
    PickupFlowApi,
};
use serde_json::json as body;

use super::{
    helpers::{as_principal, json, pickup_item, pickup_request, send_request},
    mocks::{MockAddresses, MockDirectory, MockPickupDb},
};
use crate::routes::{
    CancelPickupRoute,
    ConfirmPickupRoute,
    MyPickupsRoute,
    NearbyCollectorsRoute,
    NearbyRequestsRoute,
    PickupByIdRoute,
    RecordActualAmountsRoute,
};

fn configure(store: MockPickupDb, directory: MockDirectory) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(MyPickupsRoute::<MockPickupDb, MockDirectory>::new())
            .service(PickupByIdRoute::<MockPickupDb, MockDirectory>::new())
            .service(ConfirmPickupRoute::<MockPickupDb, MockDirectory>::new())
            .service(CancelPickupRoute::<MockPickupDb, MockDirectory>::new())
            .service(RecordActualAmountsRoute::<MockPickupDb, MockDirectory>::new())
            .app_data(web::Data::new(PickupFlowApi::new(store, directory)));
    }
}

fn collector(id: &str, latitude: f64, longitude: f64) -> Collector {
    Collector {
        id: UserId::from(id),
        name: id.to_uppercase(),
        location: Coordinate { latitude, longitude },
        active: true,
        prices: vec![CollectorPrice { waste_category_id: WasteCategoryId(1), unit_price: 2500.0 }],
    }
}

#[actix_web::test]
async fn my_pickups_depend_on_role() {
    let _ = env_logger::try_init().ok();
    let configure_store = || {
        let mut store = MockPickupDb::new();
        store
            .expect_pickups_for_shopper()
            .withf(|s| s.as_str() == "alice")
            .returning(|_| Ok(vec![pickup_request(1, "alice", PickupStatus::WaitingCollector, None)]));
        store.expect_pickups_for_collector().withf(|c| c.as_str() == "menteng-1").returning(|_| {
            Ok(vec![
                pickup_request(2, "bob", PickupStatus::ConfirmedByCollector, Some("menteng-1")),
                pickup_request(3, "carol", PickupStatus::Completed, Some("menteng-1")),
            ])
        });
        configure(store, MockDirectory::new())
    };
    let req = as_principal(TestRequest::get().uri("/pickups"), "alice", "shopper");
    let (status, res) = send_request(req, configure_store()).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    assert_eq!(res.as_array().unwrap().len(), 1);
    assert_eq!(res[0]["shopper_id"], "alice");

    let req = as_principal(TestRequest::get().uri("/pickups"), "menteng-1", "collector");
    let (status, res) = send_request(req, configure_store()).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    assert_eq!(res.as_array().unwrap().len(), 2);
    assert_eq!(res[1]["status"], "completed");

    let req = as_principal(TestRequest::get().uri("/pickups"), "root", "admin");
    let (status, _) = send_request(req, configure_store()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn pickup_visibility() {
    let _ = env_logger::try_init().ok();
    let configure_store = || {
        let mut store = MockPickupDb::new();
        store
            .expect_fetch_pickup()
            .returning(|id| Ok((id == 1).then(|| pickup_request(1, "alice", PickupStatus::WaitingCollector, None))));
        store.expect_fetch_pickup_items().returning(|id| Ok(vec![pickup_item(10, id, 1, 3.0, 2000.0)]));
        configure(store, MockDirectory::new())
    };
    let req = as_principal(TestRequest::get().uri("/pickups/1"), "alice", "shopper");
    let (status, res) = send_request(req, configure_store()).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    assert_eq!(res["request"]["id"], 1);
    assert_eq!(res["items"][0]["estimated_subtotal"], 6000.0);

    // Open requests are visible to every collector
    let req = as_principal(TestRequest::get().uri("/pickups/1"), "kemang-1", "collector");
    let (status, _) = send_request(req, configure_store()).await;
    assert_eq!(status, StatusCode::OK);

    let req = as_principal(TestRequest::get().uri("/pickups/1"), "bob", "shopper");
    let (status, _) = send_request(req, configure_store()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = as_principal(TestRequest::get().uri("/pickups/99"), "alice", "shopper");
    let (status, res) = send_request(req, configure_store()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&res)["error"], "The data was not found. Pickup request 99 does not exist");
}

#[actix_web::test]
async fn collector_confirms() {
    let _ = env_logger::try_init().ok();
    let mut store = MockPickupDb::new();
    store.expect_fetch_pickup().returning(|_| Ok(Some(pickup_request(1, "alice", PickupStatus::WaitingCollector, None))));
    store
        .expect_change_status()
        .withf(|c| {
            c.from == PickupStatus::WaitingCollector &&
                c.to == PickupStatus::ConfirmedByCollector &&
                c.guard == CollectorGuard::ClaimOrAssignedTo(UserId::from("menteng-1")) &&
                c.confirmed_at.is_some()
        })
        .times(1)
        .returning(|c| {
            let mut request = pickup_request(c.request_id, "alice", c.to, Some("menteng-1"));
            request.confirmed_at = c.confirmed_at;
            Ok(request)
        });
    let req = as_principal(TestRequest::post().uri("/pickups/1/confirm"), "menteng-1", "collector");
    let (status, res) = send_request(req, configure(store, MockDirectory::new())).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    assert_eq!(res["status"], "confirmed_by_collector");
    assert_eq!(res["collector_id"], "menteng-1");
}

#[actix_web::test]
async fn confirm_with_explicit_time() {
    let _ = env_logger::try_init().ok();
    let mut store = MockPickupDb::new();
    store.expect_fetch_pickup().returning(|_| Ok(Some(pickup_request(1, "alice", PickupStatus::WaitingCollector, None))));
    store
        .expect_change_status()
        .withf(|c| c.confirmed_at.map(|t| t.to_rfc3339()) == Some("2024-06-01T10:00:00+00:00".to_string()))
        .times(1)
        .returning(|c| Ok(pickup_request(c.request_id, "alice", c.to, Some("menteng-1"))));
    let req = TestRequest::post().uri("/pickups/1/confirm").set_json(body!({"confirmed_at": "2024-06-01T10:00:00Z"}));
    let (status, _) = send_request(as_principal(req, "menteng-1", "collector"), configure(store, MockDirectory::new())).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn losing_a_confirmation_race() {
    let _ = env_logger::try_init().ok();
    let mut store = MockPickupDb::new();
    store.expect_fetch_pickup().returning(|_| Ok(Some(pickup_request(1, "alice", PickupStatus::WaitingCollector, None))));
    store.expect_change_status().returning(|c| {
        Err(PickupStoreError::InvalidTransition {
            request_id: c.request_id,
            from: PickupStatus::ConfirmedByCollector,
            to: c.to,
        })
    });
    let req = as_principal(TestRequest::post().uri("/pickups/1/confirm"), "kemang-1", "collector");
    let (status, _) = send_request(req, configure(store, MockDirectory::new())).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn shoppers_cannot_confirm() {
    let _ = env_logger::try_init().ok();
    let mut store = MockPickupDb::new();
    store.expect_change_status().never();
    let req = as_principal(TestRequest::post().uri("/pickups/1/confirm"), "alice", "shopper");
    let (status, _) = send_request(req, configure(store, MockDirectory::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn cancel_a_completed_request() {
    let _ = env_logger::try_init().ok();
    let mut store = MockPickupDb::new();
    store
        .expect_fetch_pickup()
        .returning(|_| Ok(Some(pickup_request(1, "alice", PickupStatus::Completed, Some("menteng-1")))));
    store.expect_change_status().never();
    let req = as_principal(TestRequest::post().uri("/pickups/1/cancel"), "alice", "shopper");
    let (status, res) = send_request(req, configure(store, MockDirectory::new())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&res)["error"], "Pickup request 1 cannot move from completed to cancelled");
}

#[actix_web::test]
async fn record_actual_amounts() {
    let _ = env_logger::try_init().ok();
    let mut store = MockPickupDb::new();
    store
        .expect_fetch_pickup()
        .returning(|_| Ok(Some(pickup_request(1, "alice", PickupStatus::CollectorArePickingUp, Some("menteng-1")))));
    store
        .expect_fetch_pickup_items()
        .returning(|id| Ok(vec![pickup_item(10, id, 1, 2.0, 2000.0), pickup_item(11, id, 2, 1.0, 800.0)]));
    store
        .expect_record_actual_amounts()
        .withf(|id, updates| *id == 1 && updates.len() == 2)
        .times(1)
        .returning(|id, updates| {
            let items = updates
                .iter()
                .map(|u| {
                    let mut item = pickup_item(u.item_id, id, 1, 2.0, 2000.0);
                    item.actual_amount = Some(u.actual_amount);
                    item.final_price = Some(u.final_price);
                    item
                })
                .collect();
            Ok(items)
        });
    let mut directory = MockDirectory::new();
    directory.expect_collector_by_id().returning(|id| Ok(Some(collector(id.as_str(), 0.0, 0.0))));
    let amounts = body!({"items": [{"item_id": 10, "actual_amount": 1.5}, {"item_id": 11, "actual_amount": 2.0}]});
    let req = TestRequest::put().uri("/pickups/1/actual_amounts").set_json(amounts);
    let (status, res) = send_request(as_principal(req, "menteng-1", "collector"), configure(store, directory)).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    // Category 1 uses the collector's own price. Category 2 falls back to the estimate.
    assert_eq!(res[0]["final_price"], 3750.0);
    assert_eq!(res[1]["final_price"], 1600.0);
}

#[actix_web::test]
async fn record_amounts_for_a_foreign_item() {
    let _ = env_logger::try_init().ok();
    let mut store = MockPickupDb::new();
    store
        .expect_fetch_pickup()
        .returning(|_| Ok(Some(pickup_request(1, "alice", PickupStatus::ConfirmedByCollector, Some("menteng-1")))));
    store.expect_fetch_pickup_items().returning(|id| Ok(vec![pickup_item(10, id, 1, 2.0, 2000.0)]));
    store.expect_record_actual_amounts().never();
    let mut directory = MockDirectory::new();
    directory.expect_collector_by_id().returning(|id| Ok(Some(collector(id.as_str(), 0.0, 0.0))));
    let amounts = body!({"items": [{"item_id": 10, "actual_amount": 1.5}, {"item_id": 77, "actual_amount": 2.0}]});
    let req = TestRequest::put().uri("/pickups/1/actual_amounts").set_json(amounts);
    let (status, _) = send_request(as_principal(req, "menteng-1", "collector"), configure(store, directory)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//----------------------------------------------   Matching  ----------------------------------------------------

fn configure_matching(store: MockPickupDb, directory: MockDirectory) -> impl FnOnce(&mut ServiceConfig) {
    let mut addresses = MockAddresses::new();
    addresses.expect_address_by_id().returning(|id| {
        Ok(Some(Address {
            id,
            owner_id: UserId::from("alice"),
            label: None,
            location: Coordinate { latitude: 0.0, longitude: 0.0 },
        }))
    });
    move |cfg| {
        let api = MatchingApi::new(store, directory, addresses, MatchingConfig::default());
        cfg.service(NearbyCollectorsRoute::<MockPickupDb, MockDirectory, MockAddresses>::new())
            .service(NearbyRequestsRoute::<MockPickupDb, MockDirectory, MockAddresses>::new())
            .app_data(web::Data::new(api));
    }
}

fn matching_mocks() -> (MockPickupDb, MockDirectory) {
    let mut store = MockPickupDb::new();
    store.expect_fetch_pickup().returning(|id| Ok(Some(pickup_request(id, "alice", PickupStatus::WaitingCollector, None))));
    let mut directory = MockDirectory::new();
    directory.expect_active_collectors().returning(|| Ok(vec![collector("far", 1.0, 1.0), collector("near", 0.0, 0.05)]));
    (store, directory)
}

#[actix_web::test]
async fn nearby_collectors() {
    let _ = env_logger::try_init().ok();
    let (store, directory) = matching_mocks();
    let req = as_principal(TestRequest::get().uri("/pickups/1/nearby_collectors?radius_km=10"), "alice", "shopper");
    let (status, res) = send_request(req, configure_matching(store, directory)).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    assert_eq!(res.as_array().unwrap().len(), 1);
    assert_eq!(res[0]["collector"]["id"], "near");
    let distance = res[0]["distance_km"].as_f64().unwrap();
    assert!((distance - 5.56).abs() < 0.01, "{distance}");

    let (store, directory) = matching_mocks();
    let req = as_principal(TestRequest::get().uri("/pickups/1/nearby_collectors?radius_km=200"), "alice", "shopper");
    let (status, res) = send_request(req, configure_matching(store, directory)).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    assert_eq!(res[0]["collector"]["id"], "near");
    assert_eq!(res[1]["collector"]["id"], "far");
}

#[actix_web::test]
async fn nearby_collectors_with_a_bad_radius() {
    let _ = env_logger::try_init().ok();
    let (store, directory) = matching_mocks();
    let req = as_principal(TestRequest::get().uri("/pickups/1/nearby_collectors?radius_km=-1"), "alice", "shopper");
    let (status, _) = send_request(req, configure_matching(store, directory)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn only_collectors_look_for_requests() {
    let _ = env_logger::try_init().ok();
    let (store, directory) = matching_mocks();
    let req = as_principal(TestRequest::get().uri("/collector/nearby_requests"), "alice", "shopper");
    let (status, _) = send_request(req, configure_matching(store, directory)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn nearby_requests() {
    let _ = env_logger::try_init().ok();
    let mut store = MockPickupDb::new();
    store.expect_fetch_open_pickups().returning(|| {
        Ok(vec![
            pickup_request(1, "alice", PickupStatus::WaitingCollector, None),
            pickup_request(2, "bob", PickupStatus::WaitingCollector, Some("kemang-1")),
        ])
    });
    let mut directory = MockDirectory::new();
    directory.expect_collector_by_id().returning(|id| Ok(Some(collector(id.as_str(), 0.0, 0.01))));
    let req = as_principal(TestRequest::get().uri("/collector/nearby_requests"), "menteng-1", "collector");
    let (status, res) = send_request(req, configure_matching(store, directory)).await;
    assert_eq!(status, StatusCode::OK);
    let res = json(&res);
    // Request 2 is reserved for another collector
    assert_eq!(res.as_array().unwrap().len(), 1);
    assert_eq!(res[0]["request"]["id"], 1);
}
