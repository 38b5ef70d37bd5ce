//! Access control list middleware for the marketplace server.
//! This middleware can be placed on any route or service.
//!
//! It checks the incoming request for a valid session token and then checks the claims in the token against the
//! required roles for the route. If the token is valid and the user has the required roles, the claims are stored in
//! the request extensions and the request is allowed to continue. A missing or invalid token gets a 401 response, and
//! missing roles get a 403.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;
use marketplace_engine::db_types::Role;

use crate::{
    auth::claims_from_request,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let claims = claims_from_request(req.request())?;
            if claims.has_roles(&required_roles) {
                req.extensions_mut().insert(claims);
                service.call(req).await
            } else {
                debug!("🔐️ {} lacks one of the roles {required_roles:?}", claims.user_id);
                let roles = required_roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
                Err(ServerError::from(AuthError::InsufficientPermissions(format!("This requires: {roles}"))).into())
            }
        })
    }
}
