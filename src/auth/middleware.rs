use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::error::SessionError;
use crate::auth::extractors::AuthenticatedUser;
use crate::auth::session::SessionService;
use crate::error::AppError;

/// Guards a scope with bearer-token authentication.
///
/// The resolved subject is stored in the request extensions as
/// `AuthenticatedUser`. The `SessionService` is taken from app data, so the
/// middleware must wrap a scope of an app that registered one.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let sessions = match req.app_data::<web::Data<SessionService>>() {
            Some(sessions) => sessions.clone(),
            None => {
                log::error!("AuthMiddleware used without a SessionService in app data");
                let app_err = AppError::InternalServerError("session service missing".into());
                return Box::pin(async move { Err(app_err.into()) });
            }
        };

        let authenticated = match req.headers().get(header::AUTHORIZATION) {
            None => sessions.authenticate(None),
            Some(value) => match value.to_str() {
                Ok(value) => sessions.authenticate(Some(value)),
                Err(_) => Err(SessionError::MalformedHeader),
            },
        };

        match authenticated {
            Ok(subject) => {
                req.extensions_mut().insert(AuthenticatedUser(subject));
                Box::pin(self.service.call(req))
            }
            Err(session_err) => {
                log::debug!("rejected {} {}: {}", req.method(), req.path(), session_err);
                let app_err: AppError = session_err.into();
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}
