mod validate;

use actix_web::web::{post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/identifiers";

/// Configures and returns the Actix `Scope` for identifier routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/validate", post().to(validate::process))
}
