//! Identifies the principal behind a request.
//!
//! Tokens are verified by the authentication gateway in front of this server, which forwards the caller's identity in
//! two headers. Handlers take an [`Authenticated`] argument to require them.
use std::{
    future::{ready, Ready},
    ops::Deref,
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::*;
use pickup_engine::db_types::{Principal, Role, UserId};

use crate::errors::ServerError;

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated(pub Principal);

impl Authenticated {
    pub fn into_inner(self) -> Principal {
        self.0
    }
}

impl Deref for Authenticated {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for Authenticated {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(principal_from_request(req).map(Authenticated))
    }
}

fn principal_from_request(req: &HttpRequest) -> Result<Principal, ServerError> {
    let id = header_value(req, PRINCIPAL_ID_HEADER)?;
    if id.is_empty() {
        return Err(ServerError::AuthenticationError(format!("The {PRINCIPAL_ID_HEADER} header is empty")));
    }
    let role = header_value(req, PRINCIPAL_ROLE_HEADER)?.parse::<Role>().map_err(|e| {
        debug!("💻️ Rejecting request with an invalid role. {e}");
        ServerError::AuthenticationError(e.to_string())
    })?;
    let principal = Principal { id: UserId::from(id), role };
    trace!("💻️ Request made by {principal}");
    Ok(principal)
}

fn header_value(req: &HttpRequest, name: &str) -> Result<String, ServerError> {
    let value = req
        .headers()
        .get(name)
        .ok_or_else(|| ServerError::AuthenticationError(format!("The {name} header is missing")))?;
    let value = value
        .to_str()
        .map_err(|e| ServerError::AuthenticationError(format!("The {name} header is not valid text. {e}")))?;
    Ok(value.trim().to_string())
}
