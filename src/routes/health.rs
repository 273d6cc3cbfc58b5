use actix_web::{get, http::StatusCode, Responder};
use chrono::Utc;
use serde_json::json;

use crate::response::respond;

/// Liveness probe. Reachable without a token.
#[get("/health")]
pub async fn health() -> impl Responder {
    respond(
        StatusCode::OK,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_health_endpoint() {
        let app = test::init_service(actix_web::App::new().service(health)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert!(json["data"]["timestamp"].is_string());
        assert_eq!(json["data"]["version"], env!("CARGO_PKG_VERSION"));
    }
}
