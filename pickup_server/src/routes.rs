//! Request handler definitions
//!
//! Define each route and its handler here. Handlers do little more than extract the principal and parameters, call
//! into the pickup engine and serialise the result. Anything more involved belongs in the engine.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every engine call is async, so keep it that way: no blocking I/O
//! or `std::thread::sleep` in a handler.
//!
//! The caller is identified by the [`Authenticated`] extractor. Role checks that belong to a particular business rule
//! (who may confirm, who may cancel, and so on) are made by the engine. The coarse checks here only stop a principal
//! from using a surface that was not built for its role, such as a collector filling a cart.
use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use pickup_engine::{
    cart_objects::CartLine,
    db_types::{Principal, Role, UserId, WasteCategoryId},
    pickup_objects::CheckoutRequest,
    traits::{AddressBook, CartCache, CollectorDirectory, PickupStore, RateLookup, RatingStore},
    CartApi,
    CheckoutApi,
    MatchingApi,
    PickupFlowApi,
    RatingApi,
};

use crate::{
    auth::Authenticated,
    data_objects::{
        ActualAmountsParams,
        CartLineParams,
        CartResponse,
        CartTtl,
        ConfirmParams,
        JsonResponse,
        RadiusParams,
        RatingParams,
        SelectCollectorParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

fn require_role(principal: &Principal, roles: &[Role]) -> Result<(), ServerError> {
    if roles.contains(&principal.role) {
        Ok(())
    } else {
        debug!("💻️ {principal} tried to use a route reserved for {roles:?}");
        Err(ServerError::InsufficientPermissions(format!("This route is not available to a {}", principal.role)))
    }
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl CartCache);
/// Route handler for the cart endpoint
///
/// Returns the caller's cart, if there is one, along with the number of seconds before it expires.
pub async fn my_cart<C: CartCache>(
    principal: Authenticated,
    api: web::Data<CartApi<C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cart for {}", principal.id);
    require_role(&principal, &[Role::Shopper])?;
    let cart = api.get_cart(&principal).await?;
    let remaining_secs = match &cart {
        Some(_) => api.remaining_ttl(&principal).await?.map(|d| d.as_secs()),
        None => None,
    };
    Ok(HttpResponse::Ok().json(CartResponse { cart, remaining_secs }))
}

route!(upsert_cart_line => Put "/cart/lines" impl CartCache);
/// Sets the quantity for a waste category in the caller's cart. A quantity of zero (or less) removes the line.
pub async fn upsert_cart_line<C: CartCache>(
    principal: Authenticated,
    body: web::Json<CartLineParams>,
    api: web::Data<CartApi<C>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ PUT cart line {params:?} for {}", principal.id);
    require_role(&principal, &[Role::Shopper])?;
    let line = CartLine::new(params.waste_category_id, params.quantity);
    let cart = api.add_or_update_line(&principal, line).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_cart_line => Delete "/cart/lines/{category_id}" impl CartCache);
pub async fn remove_cart_line<C: CartCache>(
    principal: Authenticated,
    path: web::Path<i64>,
    api: web::Data<CartApi<C>>,
) -> Result<HttpResponse, ServerError> {
    let category = WasteCategoryId(path.into_inner());
    debug!("💻️ DELETE cart line {category} for {}", principal.id);
    require_role(&principal, &[Role::Shopper])?;
    let cart = api.remove_line(&principal, category).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(clear_cart => Delete "/cart" impl CartCache);
pub async fn clear_cart<C: CartCache>(
    principal: Authenticated,
    api: web::Data<CartApi<C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ DELETE cart for {}", principal.id);
    require_role(&principal, &[Role::Shopper])?;
    api.clear(&principal).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Cart cleared.")))
}

route!(refresh_cart => Post "/cart/refresh" impl CartCache);
/// Extends the caller's cart to the full TTL window. `remaining_secs` is null if there is no cart to refresh.
pub async fn refresh_cart<C: CartCache>(
    principal: Authenticated,
    api: web::Data<CartApi<C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST cart refresh for {}", principal.id);
    require_role(&principal, &[Role::Shopper])?;
    let ttl = api.refresh_ttl(&principal).await?;
    Ok(HttpResponse::Ok().json(CartTtl { remaining_secs: ttl.map(|d| d.as_secs()) }))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl CartCache, RateLookup, PickupStore, AddressBook);
/// Route handler for the checkout endpoint
///
/// Converts the caller's cart into a pickup request at the given address. The cart is priced at the current rates,
/// lines that cannot be priced are dropped, and the cart is removed from the cache once the request is saved.
///
/// Responds with `201 Created` and the new request with its items. An empty cart, or one where no line can be priced,
/// is rejected with `422 Unprocessable Entity` and the cart is left alone. An address the caller does not own is a
/// `404 Not Found`.
pub async fn checkout<C, R, S, A>(
    principal: Authenticated,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<C, R, S, A>>,
) -> Result<HttpResponse, ServerError>
where
    C: CartCache,
    R: RateLookup,
    S: PickupStore,
    A: AddressBook,
{
    debug!("💻️ POST checkout for {}", principal.id);
    require_role(&principal, &[Role::Shopper])?;
    let details = api.checkout(&principal, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(details))
}

//----------------------------------------------   Pickups  ----------------------------------------------------
route!(my_pickups => Get "/pickups" impl PickupStore, CollectorDirectory);
/// Shoppers receive the requests they placed. Collectors receive the requests assigned to them.
pub async fn my_pickups<S, D>(
    principal: Authenticated,
    api: web::Data<PickupFlowApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    debug!("💻️ GET pickups for {principal:?}");
    let pickups = match principal.role {
        Role::Shopper => api.pickups_for_shopper(&principal.id).await?,
        Role::Collector => api.pickups_for_collector(&principal.id).await?,
        Role::Admin => {
            return Err(ServerError::InsufficientPermissions(
                "Admins do not have pickups of their own. Fetch requests by id instead.".into(),
            ))
        },
    };
    Ok(HttpResponse::Ok().json(pickups))
}

route!(pickup_by_id => Get "/pickups/{id}" impl PickupStore, CollectorDirectory);
pub async fn pickup_by_id<S, D>(
    principal: Authenticated,
    path: web::Path<i64>,
    api: web::Data<PickupFlowApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    let id = path.into_inner();
    debug!("💻️ GET pickup request #{id} for {}", principal.id);
    let details = api.fetch_pickup_for(&principal, id).await?;
    Ok(HttpResponse::Ok().json(details))
}

route!(pickup_history => Get "/pickups/{id}/history" impl PickupStore, CollectorDirectory);
/// The status history of a pickup request, oldest first. The caller must be able to see the request itself.
pub async fn pickup_history<S, D>(
    principal: Authenticated,
    path: web::Path<i64>,
    api: web::Data<PickupFlowApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    let id = path.into_inner();
    debug!("💻️ GET history for pickup request #{id}");
    api.fetch_pickup_for(&principal, id).await?;
    let history = api.status_history(id).await?;
    Ok(HttpResponse::Ok().json(history))
}

route!(select_collector => Post "/pickups/{id}/collector" impl PickupStore, CollectorDirectory);
pub async fn select_collector<S, D>(
    principal: Authenticated,
    path: web::Path<i64>,
    body: web::Json<SelectCollectorParams>,
    api: web::Data<PickupFlowApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    let id = path.into_inner();
    let collector_id = body.into_inner().collector_id;
    debug!("💻️ POST select collector {collector_id} for pickup request #{id}");
    let request = api.select_collector(&principal, id, &collector_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(confirm_pickup => Post "/pickups/{id}/confirm" impl PickupStore, CollectorDirectory);
/// The calling collector accepts the pickup request. The body is optional and may carry the time of acceptance.
pub async fn confirm_pickup<S, D>(
    principal: Authenticated,
    path: web::Path<i64>,
    body: Option<web::Json<ConfirmParams>>,
    api: web::Data<PickupFlowApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    let id = path.into_inner();
    let confirmed_at = body.and_then(|b| b.into_inner().confirmed_at).unwrap_or_else(Utc::now);
    debug!("💻️ POST confirm pickup request #{id} by {}", principal.id);
    let request = api.confirm_by_collector(&principal, id, confirmed_at).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(start_picking_up => Post "/pickups/{id}/picking_up" impl PickupStore, CollectorDirectory);
pub async fn start_picking_up<S, D>(
    principal: Authenticated,
    path: web::Path<i64>,
    api: web::Data<PickupFlowApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    let id = path.into_inner();
    debug!("💻️ POST picking up pickup request #{id} by {}", principal.id);
    let request = api.advance_to_picking_up(&principal, id).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(complete_pickup => Post "/pickups/{id}/complete" impl PickupStore, CollectorDirectory);
pub async fn complete_pickup<S, D>(
    principal: Authenticated,
    path: web::Path<i64>,
    api: web::Data<PickupFlowApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    let id = path.into_inner();
    debug!("💻️ POST complete pickup request #{id} by {}", principal.id);
    let request = api.complete_pickup(&principal, id).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(cancel_pickup => Post "/pickups/{id}/cancel" impl PickupStore, CollectorDirectory);
pub async fn cancel_pickup<S, D>(
    principal: Authenticated,
    path: web::Path<i64>,
    api: web::Data<PickupFlowApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    let id = path.into_inner();
    debug!("💻️ POST cancel pickup request #{id} by {}", principal.id);
    let request = api.cancel_pickup(&principal, id).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(record_actual_amounts => Put "/pickups/{id}/actual_amounts" impl PickupStore, CollectorDirectory);
/// The assigned collector records what was actually weighed. Either every amount in the body is saved or none are.
pub async fn record_actual_amounts<S, D>(
    principal: Authenticated,
    path: web::Path<i64>,
    body: web::Json<ActualAmountsParams>,
    api: web::Data<PickupFlowApi<S, D>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    let id = path.into_inner();
    let amounts = body.into_inner().items;
    debug!("💻️ PUT {} actual amounts for pickup request #{id}", amounts.len());
    let items = api.record_actual_amounts(&principal, id, &amounts).await?;
    Ok(HttpResponse::Ok().json(items))
}

//----------------------------------------------   Matching  ----------------------------------------------------
route!(nearby_collectors => Get "/pickups/{id}/nearby_collectors" impl PickupStore, CollectorDirectory, AddressBook);
/// Active collectors near the pickup address, closest first. `radius_km` is optional.
pub async fn nearby_collectors<S, D, A>(
    principal: Authenticated,
    path: web::Path<i64>,
    query: web::Query<RadiusParams>,
    api: web::Data<MatchingApi<S, D, A>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
    A: AddressBook,
{
    let id = path.into_inner();
    debug!("💻️ GET nearby collectors for pickup request #{id} by {}", principal.id);
    require_role(&principal, &[Role::Shopper, Role::Admin])?;
    let matches = api.nearby_collectors(id, query.radius_km).await?;
    Ok(HttpResponse::Ok().json(matches))
}

route!(nearby_requests => Get "/collector/nearby_requests" impl PickupStore, CollectorDirectory, AddressBook);
/// Open pickup requests near the calling collector, closest first. `radius_km` is optional.
pub async fn nearby_requests<S, D, A>(
    principal: Authenticated,
    query: web::Query<RadiusParams>,
    api: web::Data<MatchingApi<S, D, A>>,
) -> Result<HttpResponse, ServerError>
where
    S: PickupStore,
    D: CollectorDirectory,
    A: AddressBook,
{
    debug!("💻️ GET nearby requests for {}", principal.id);
    require_role(&principal, &[Role::Collector])?;
    let matches = api.nearby_requests(&principal.id, query.radius_km).await?;
    Ok(HttpResponse::Ok().json(matches))
}

//----------------------------------------------   Ratings  ----------------------------------------------------
route!(rate_pickup => Post "/pickups/{id}/rating" impl RatingStore);
/// A shopper rates the collector who handled one of their pickup requests. Each shopper rates a request once.
pub async fn rate_pickup<R: RatingStore>(
    principal: Authenticated,
    path: web::Path<i64>,
    body: web::Json<RatingParams>,
    api: web::Data<RatingApi<R>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let params = body.into_inner();
    debug!("💻️ POST rating for pickup request #{id} by {}", principal.id);
    require_role(&principal, &[Role::Shopper])?;
    let rating = api.rate(&principal, id, &params.collector_id, params.rating, params.feedback).await?;
    Ok(HttpResponse::Created().json(rating))
}

route!(collector_ratings => Get "/collectors/{id}/ratings" impl RatingStore);
pub async fn collector_ratings<R: RatingStore>(
    _principal: Authenticated,
    path: web::Path<String>,
    api: web::Data<RatingApi<R>>,
) -> Result<HttpResponse, ServerError> {
    let collector_id = UserId::from(path.into_inner());
    debug!("💻️ GET ratings for collector {collector_id}");
    let ratings = api.ratings_for_collector(&collector_id).await?;
    Ok(HttpResponse::Ok().json(ratings))
}

route!(collector_rating => Get "/collectors/{id}/rating" impl RatingStore);
/// The collector's average rating and the number of ratings it is based on.
pub async fn collector_rating<R: RatingStore>(
    _principal: Authenticated,
    path: web::Path<String>,
    api: web::Data<RatingApi<R>>,
) -> Result<HttpResponse, ServerError> {
    let collector_id = UserId::from(path.into_inner());
    debug!("💻️ GET average rating for collector {collector_id}");
    let summary = api.average_rating(&collector_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}
