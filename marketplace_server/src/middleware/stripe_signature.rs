//! Stripe signature middleware for Actix Web.
//!
//! Stripe signs every webhook delivery with the endpoint's signing secret (`MKT_STRIPE_WEBHOOK_SECRET`). The signature
//! is in the `Stripe-Signature` header and covers the timestamp and the raw request body, so the body is read here,
//! checked, and then put back for the handler.
//!
//! Wrap the Stripe webhook route with this middleware. Requests with a missing or invalid signature never reach the
//! handler and get a 400 response.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use marketplace_engine::MarketplaceError;
use mkt_common::Secret;
use provider_tools::stripe_signature::{self, SIGNATURE_HEADER};

use crate::errors::ServerError;

pub struct StripeSignatureMiddlewareFactory {
    secret: Secret<String>,
}

impl StripeSignatureMiddlewareFactory {
    pub fn new(secret: Secret<String>) -> Self {
        StripeSignatureMiddlewareFactory { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for StripeSignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = StripeSignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StripeSignatureMiddlewareService { secret: self.secret.clone(), service: Rc::new(service) }))
    }
}

pub struct StripeSignatureMiddlewareService<S> {
    secret: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for StripeSignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        Box::pin(async move {
            trace!("🔐️ Checking Stripe signature for request");
            if secret.is_empty() {
                warn!("🔐️ MKT_STRIPE_WEBHOOK_SECRET is not set. Stripe webhooks cannot be verified.");
                return Err(ServerError::ConfigurationError("Stripe webhook secret is not configured".into()).into());
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ServerError::InvalidRequestBody("Failed to extract request data.".into())
            })?;
            let header = req
                .headers()
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    warn!("🔐️ No Stripe signature found in request. Denying access.");
                    ServerError::from(MarketplaceError::WebhookSignatureInvalid("No signature found".into()))
                })?
                .to_string();
            match stripe_signature::verify(&header, data.as_ref(), &secret) {
                Ok(()) => {
                    trace!("🔐️ Stripe signature check for request ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Invalid Stripe signature found in request. Denying access. {e}");
                    Err(ServerError::from(MarketplaceError::WebhookSignatureInvalid(e.to_string())).into())
                },
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
