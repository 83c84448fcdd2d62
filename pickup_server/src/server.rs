use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use pickup_engine::{
    BoundedCartCache,
    CartApi,
    CartReconciler,
    CheckoutApi,
    MatchingApi,
    MemoryCartCache,
    PickupFlowApi,
    RatingApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    reconciliation_worker::{ReconciliationWorker, ServerCartCache},
    routes::{
        health,
        CancelPickupRoute,
        CheckoutRoute,
        ClearCartRoute,
        CollectorRatingRoute,
        CollectorRatingsRoute,
        CompletePickupRoute,
        ConfirmPickupRoute,
        MyCartRoute,
        MyPickupsRoute,
        NearbyCollectorsRoute,
        NearbyRequestsRoute,
        PickupByIdRoute,
        PickupHistoryRoute,
        RatePickupRoute,
        RecordActualAmountsRoute,
        RefreshCartRoute,
        RemoveCartLineRoute,
        SelectCollectorRoute,
        StartPickingUpRoute,
        UpsertCartLineRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let cache = BoundedCartCache::new(MemoryCartCache::new(config.cart_ttl), config.cache_timeout);
    let reconciler =
        CartReconciler::new(cache.clone(), db.clone(), db.clone(), config.reconciliation_config());
    let worker = ReconciliationWorker::start(reconciler, config.reconcile_interval);
    let srv = create_server_instance(config, db.clone(), cache)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("🚀️ Server has shut down. Stopping background tasks.");
    worker.stop().await;
    db.close().await;
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    cache: ServerCartCache,
) -> Result<Server, ServerError> {
    let matching_config = config.matching_config();
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(cache.clone());
        let checkout_api = CheckoutApi::new(cache.clone(), db.clone(), db.clone(), db.clone());
        let flow_api = PickupFlowApi::new(db.clone(), db.clone());
        let matching_api = MatchingApi::new(db.clone(), db.clone(), db.clone(), matching_config);
        let rating_api = RatingApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pickup::access_log"))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(matching_api))
            .app_data(web::Data::new(rating_api));
        let api_scope = web::scope("/api")
            .service(MyCartRoute::<ServerCartCache>::new())
            .service(UpsertCartLineRoute::<ServerCartCache>::new())
            .service(RemoveCartLineRoute::<ServerCartCache>::new())
            .service(ClearCartRoute::<ServerCartCache>::new())
            .service(RefreshCartRoute::<ServerCartCache>::new())
            .service(CheckoutRoute::<ServerCartCache, SqliteDatabase, SqliteDatabase, SqliteDatabase>::new())
            .service(MyPickupsRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(PickupByIdRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(PickupHistoryRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(NearbyCollectorsRoute::<SqliteDatabase, SqliteDatabase, SqliteDatabase>::new())
            .service(NearbyRequestsRoute::<SqliteDatabase, SqliteDatabase, SqliteDatabase>::new())
            .service(SelectCollectorRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(ConfirmPickupRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(StartPickingUpRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(CompletePickupRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(CancelPickupRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(RecordActualAmountsRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(RatePickupRoute::<SqliteDatabase>::new())
            .service(CollectorRatingsRoute::<SqliteDatabase>::new())
            .service(CollectorRatingRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
