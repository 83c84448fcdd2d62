//! A small, fixed catalogue around central Jakarta for tests.
use crate::{
    db_types::{Address, Collector, CollectorPrice, UserId, WasteCategory, WasteCategoryId},
    helpers::geo::Coordinate,
    SqliteDatabase,
};

pub const PLASTIC: WasteCategoryId = WasteCategoryId(1);
pub const PAPER: WasteCategoryId = WasteCategoryId(2);
pub const METAL: WasteCategoryId = WasteCategoryId(3);
/// Exists in the catalogue but is no longer collected, so it has no current rate.
pub const GLASS: WasteCategoryId = WasteCategoryId(4);

pub const MONAS: Coordinate = Coordinate { latitude: -6.1754, longitude: 106.8272 };
/// About 2km from Monas.
pub const MENTENG: Coordinate = Coordinate { latitude: -6.1950, longitude: 106.8320 };
/// About 9.6km from Monas.
pub const KEMANG: Coordinate = Coordinate { latitude: -6.2607, longitude: 106.8137 };
/// About 47km from Monas.
pub const BOGOR: Coordinate = Coordinate { latitude: -6.5950, longitude: 106.8166 };

pub async fn seed_waste_categories(db: &SqliteDatabase) {
    let categories = [
        (PLASTIC, "Plastic", 2000.0, true),
        (PAPER, "Paper", 1500.0, true),
        (METAL, "Metal", 5000.0, true),
        (GLASS, "Glass", 800.0, false),
    ];
    for (id, name, unit_price, active) in categories {
        let category = WasteCategory { id, name: name.to_string(), unit_price, active };
        db.upsert_waste_category(&category).await.expect("Error seeding waste category");
    }
}

pub fn collector(id: &str, location: Coordinate, prices: &[(WasteCategoryId, f64)]) -> Collector {
    Collector {
        id: UserId::from(id),
        name: format!("Collector {id}"),
        location,
        active: true,
        prices: prices.iter().map(|(c, p)| CollectorPrice { waste_category_id: *c, unit_price: *p }).collect(),
    }
}

/// Seeds `menteng-1` (2km from Monas), `kemang-1` (9.6km), `bogor-1` (47km) and an inactive `retired-1` at Monas.
pub async fn seed_collectors(db: &SqliteDatabase) {
    let mut retired = collector("retired-1", MONAS, &[]);
    retired.active = false;
    let collectors = [
        collector("menteng-1", MENTENG, &[(PLASTIC, 2500.0), (PAPER, 1200.0)]),
        collector("kemang-1", KEMANG, &[(PLASTIC, 2100.0)]),
        collector("bogor-1", BOGOR, &[]),
        retired,
    ];
    for c in &collectors {
        db.upsert_collector(c).await.expect("Error seeding collector");
    }
}

pub async fn seed_address(db: &SqliteDatabase, owner: &str, location: Coordinate) -> Address {
    db.insert_address(&UserId::from(owner), Some("home"), location).await.expect("Error seeding address")
}

/// Seeds the waste categories and collectors.
pub async fn seed_catalogue(db: &SqliteDatabase) {
    seed_waste_categories(db).await;
    seed_collectors(db).await;
}
