use actix_web::{web, HttpResponse, Responder};
use common::model::identifier;
use common::requests::{ValidateIdentifierRequest, ValidateIdentifierResponse};

/// `POST /api/identifiers/validate`. Always `200`; an unknown scheme is
/// simply not valid.
pub(crate) async fn process(payload: web::Json<ValidateIdentifierRequest>) -> impl Responder {
    let valid = identifier::validate(&payload.scheme, &payload.code);
    HttpResponse::Ok().json(ValidateIdentifierResponse { valid })
}
