use crate::{
    auth::{
        AccessTokenResponse, AuthMiddleware, AuthenticatedUser, CookiePolicy, LoginRequest,
        LoginResponse, RegisterRequest, SessionService, REFRESH_COOKIE,
    },
    error::AppError,
    models::AccountSummary,
    response::{respond, Envelope},
};
use actix_web::{get, http::StatusCode, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// Register a new user
///
/// Creates the account and returns its summary. The caller still has to log in.
#[post("/register")]
pub async fn register(
    sessions: web::Data<SessionService>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let account = sessions
        .register(&register_data.username, &register_data.password)
        .await?;

    Ok(respond(StatusCode::CREATED, AccountSummary::from(&account)))
}

/// Login user
///
/// Returns an access token in the body and sets the refresh cookie. The body
/// also carries the refresh session id, which equals the cookie value.
#[post("/login")]
pub async fn login(
    sessions: web::Data<SessionService>,
    cookies: web::Data<CookiePolicy>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let outcome = sessions
        .login(&login_data.username, &login_data.password)
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(cookies.issue(&outcome.refresh_token_id))
        .json(Envelope::ok(LoginResponse {
            access_token: outcome.access_token,
            refresh_token: outcome.refresh_token_id,
        })))
}

/// Exchange the refresh cookie for a new access token.
#[get("/refresh")]
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<impl Responder, AppError> {
    let cookie = req.cookie(REFRESH_COOKIE);
    let access_token = sessions
        .refresh(cookie.as_ref().map(|c| c.value()))
        .await?;

    Ok(respond(StatusCode::OK, AccessTokenResponse { access_token }))
}

/// Revoke the session behind the refresh cookie and clear the cookie.
#[get("/logout")]
pub async fn logout(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
    cookies: web::Data<CookiePolicy>,
) -> Result<impl Responder, AppError> {
    let cookie = req.cookie(REFRESH_COOKIE);
    sessions.logout(cookie.as_ref().map(|c| c.value())).await?;

    Ok(HttpResponse::Ok()
        .cookie(cookies.clear())
        .json(Envelope::ok_empty()))
}

/// Name of the user the access token was issued to.
#[get("/me", wrap = "AuthMiddleware")]
pub async fn me(user: AuthenticatedUser) -> impl Responder {
    respond(StatusCode::OK, json!({ "username": user.username() }))
}
