pub mod account;
pub mod auth;
pub mod folders;
pub mod health;
pub mod items;

use actix_web::{error, web, HttpRequest};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Registers every `/api` route. `/auth/register`, `/auth/login`,
/// `/auth/refresh` and `/auth/logout` are public; everything else sits behind
/// `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(
            web::scope("/auth")
                .service(auth::register)
                .service(auth::login)
                .service(auth::refresh)
                .service(auth::logout)
                .service(auth::me),
        )
        .service(
            web::scope("/account")
                .wrap(AuthMiddleware)
                .service(account::get_account)
                .service(account::update_account)
                .service(account::delete_account),
        )
        .service(
            web::scope("/folders")
                .wrap(AuthMiddleware)
                .service(folders::list_folders)
                .service(folders::create_folder)
                .service(folders::update_folder)
                .service(folders::delete_folder)
                .service(folders::list_folder_items),
        )
        .service(
            web::scope("/items")
                .wrap(AuthMiddleware)
                .service(items::list_items)
                .service(items::create_item)
                .service(items::update_item)
                .service(items::delete_item),
        );
}

/// Answers undecodable JSON bodies with a 400 envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: error::JsonPayloadError, req: &HttpRequest| {
        log::debug!("bad json body on {}: {}", req.path(), err);
        AppError::BadRequest(err.to_string()).into()
    })
}

/// Answers undecodable query strings with a 400 envelope.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: error::QueryPayloadError, req: &HttpRequest| {
        log::debug!("bad query string on {}: {}", req.path(), err);
        AppError::BadRequest(err.to_string()).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, post, test, App, HttpResponse, Responder};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Named {
        #[allow(dead_code)]
        name: String,
    }

    #[post("/echo")]
    async fn echo(_body: web::Json<Named>) -> impl Responder {
        HttpResponse::Ok().finish()
    }

    #[actix_rt::test]
    async fn test_bad_json_is_enveloped() {
        let app = test::init_service(App::new().app_data(json_config()).service(echo)).await;

        let req = test::TestRequest::post()
            .uri("/echo")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"name\":")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
    }
}
