use crate::{
    auth::{AuthenticatedUser, CookiePolicy, SessionService},
    error::AppError,
    models::{AccountSummary, ProfileUpdate},
    response::{respond, Envelope},
};
use actix_web::{delete, get, http::StatusCode, put, web, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// Profile of the authenticated user.
#[get("")]
pub async fn get_account(
    sessions: web::Data<SessionService>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let account = sessions.profile(user.username()).await?;
    Ok(respond(StatusCode::OK, AccountSummary::from(&account)))
}

/// Update first name, last name or avatar. The username is fixed.
#[put("")]
pub async fn update_account(
    sessions: web::Data<SessionService>,
    user: AuthenticatedUser,
    update: web::Json<ProfileUpdate>,
) -> Result<impl Responder, AppError> {
    update.validate()?;

    let account = sessions.update_profile(user.username(), &update).await?;
    Ok(respond(StatusCode::OK, AccountSummary::from(&account)))
}

/// Delete the account with its folders and items, end every refresh session
/// and clear the refresh cookie.
#[delete("")]
pub async fn delete_account(
    sessions: web::Data<SessionService>,
    cookies: web::Data<CookiePolicy>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let revoked = sessions.delete_account(user.username()).await?;

    Ok(HttpResponse::Ok()
        .cookie(cookies.clear())
        .json(Envelope::ok(json!({ "revoked_sessions": revoked }))))
}
