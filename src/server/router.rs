//! Route table for `/api/v1`.

use axum::Router;
use axum::http::Uri;
use axum::middleware;
use axum::routing::{delete, get, patch, post};
use tower_http::trace::TraceLayer;

use super::AppState;
use super::guard::{Guard, authorize};
use crate::error::AppError;
use crate::handlers::{auth, catalog, crud, users};
use crate::permissions::Permission;
use crate::resources::{Brand, Category, Product, Resource, SubCategory, UserAccount};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/products", product_routes(&state))
        .nest("/categories", category_routes(&state))
        .nest("/subcategories", resource_routes::<SubCategory>(&state, Permission::ManageCatalog))
        .nest("/brands", resource_routes::<Brand>(&state, Permission::ManageCatalog))
        .nest("/auth", auth_routes())
        .nest("/users", user_routes(&state));

    Router::new()
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Public reads, guarded writes.
fn resource_routes<R: Resource>(state: &AppState, permission: Permission) -> Router<AppState> {
    let reads = Router::new()
        .route("/", get(crud::get_all::<R>))
        .route("/:id", get(crud::get_one::<R>));

    let writes = Router::new()
        .route("/", post(crud::create_one::<R>))
        .route(
            "/:id",
            patch(crud::update_one::<R>)
                .put(crud::update_one::<R>)
                .delete(crud::delete_one::<R>),
        )
        .route_layer(middleware::from_fn_with_state(
            Guard::require(state, permission),
            authorize,
        ));

    reads.merge(writes)
}

fn product_routes(state: &AppState) -> Router<AppState> {
    resource_routes::<Product>(state, Permission::ManageCatalog)
        .route("/search", post(catalog::search_products))
}

fn category_routes(state: &AppState) -> Router<AppState> {
    let nested_create = Router::new()
        .route("/:id/subcategories", post(catalog::create_subcategory))
        .route_layer(middleware::from_fn_with_state(
            Guard::require(state, Permission::ManageCatalog),
            authorize,
        ));

    resource_routes::<Category>(state, Permission::ManageCatalog)
        .route("/:id/subcategories", get(catalog::list_subcategories))
        .merge(nested_create)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/forgotpassword", post(auth::forgot_password))
        .route("/verifyResetCode", post(auth::verify_reset_code))
        .route("/resetPassword", patch(auth::reset_password))
}

fn user_routes(state: &AppState) -> Router<AppState> {
    let own = Router::new()
        .route("/getMe", get(users::get_me))
        .route("/updateMe", patch(users::update_me))
        .route("/changeMyPassword", patch(users::change_my_password))
        .route("/deleteMe", delete(users::delete_me))
        .route_layer(middleware::from_fn_with_state(Guard::user(state), authorize));

    let admin = Router::new()
        .route("/changePassword/:id", patch(users::change_password))
        .route("/updateRole/:id", patch(users::update_role))
        .route(
            "/",
            get(crud::get_all::<UserAccount>).post(crud::create_one::<UserAccount>),
        )
        .route(
            "/:id",
            get(crud::get_one::<UserAccount>)
                .patch(crud::update_one::<UserAccount>)
                .put(crud::update_one::<UserAccount>)
                .delete(crud::delete_one::<UserAccount>),
        )
        .route_layer(middleware::from_fn_with_state(
            Guard::require(state, Permission::ManageUsers),
            authorize,
        ));

    own.merge(admin)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Can't find {} on this server", uri.path()))
}
