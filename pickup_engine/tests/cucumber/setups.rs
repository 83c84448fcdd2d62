use cucumber::given;
use pickup_engine::{
    db_types::{UserId, WasteCategory, WasteCategoryId},
    helpers::geo::Coordinate,
    test_utils::fixtures::collector,
};

use crate::cucumber::{pickup_world::PickupSystem, PickupWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut PickupWorld) {
    let system = PickupSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "waste category {int} costs {float} per unit")]
async fn waste_category(world: &mut PickupWorld, id: i64, unit_price: f64) {
    let category = WasteCategory { id: WasteCategoryId(id), name: format!("Category {id}"), unit_price, active: true };
    world.system().db.upsert_waste_category(&category).await.expect("Error seeding waste category");
}

#[given(expr = "waste category {int} is no longer collected")]
async fn retired_waste_category(world: &mut PickupWorld, id: i64) {
    let category = WasteCategory { id: WasteCategoryId(id), name: format!("Category {id}"), unit_price: 1.0, active: false };
    world.system().db.upsert_waste_category(&category).await.expect("Error seeding waste category");
}

#[given(expr = "collector '{word}' is based at latitude {float} and longitude {float}")]
async fn collector_at(world: &mut PickupWorld, id: String, latitude: f64, longitude: f64) {
    let location = Coordinate::try_new(latitude, longitude).expect("Invalid collector location");
    world.system().db.upsert_collector(&collector(&id, location, &[])).await.expect("Error seeding collector");
}

#[given(expr = "shopper '{word}' has an address at latitude {float} and longitude {float}")]
async fn address_at(world: &mut PickupWorld, owner: String, latitude: f64, longitude: f64) {
    let location = Coordinate::try_new(latitude, longitude).expect("Invalid address");
    let address = world
        .system()
        .db
        .insert_address(&UserId::from(owner.as_str()), Some("home"), location)
        .await
        .expect("Error seeding address");
    world.addresses.insert(owner, address.id);
}
