//! API routes

use axum::{
    routing::{get, post, MethodRouter},
    Router,
};

use crate::extractors::AppState;
use crate::handlers::{inventory, method_not_allowed, search};

/// Inventory routes, without state or fallback
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", json_405(post(inventory::register_item)))
        .route("/inventory", json_405(get(inventory::list_items)))
        .route(
            "/inventory/:id",
            json_405(
                get(inventory::get_item)
                    .put(inventory::update_item)
                    .delete(inventory::delete_item),
            ),
        )
        .route(
            "/inventory/:id/photo",
            json_405(get(inventory::get_photo).put(inventory::update_photo)),
        )
        .route("/search", json_405(post(search::search_item)))
}

/// Answer anything no route claims with the JSON 405 envelope
pub fn with_fallback<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.fallback(method_not_allowed)
}

/// Complete inventory application with state applied
pub fn app(state: AppState) -> Router {
    with_fallback(router()).with_state(state)
}

fn json_405(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_not_allowed)
}
