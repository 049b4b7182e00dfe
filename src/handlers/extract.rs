//! Request extractors
//!
//! Rejections are reported as [`EventHubError::Validation`] so malformed
//! input gets the same error body as every other failure.

use axum::{
    extract::{rejection::QueryRejection, ConnectInfo, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use chrono::NaiveDateTime;
use serde::{de::DeserializeOwned, Deserialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use validator::Validate;

use crate::models::{EventSearchParameters, EventState, SortMode};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{comma_separated, option_datetime_format};

/// JSON body that has passed its `validator` rules
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = EventHubError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| EventHubError::validation(e.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string with validation-style rejections
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = EventHubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| EventHubError::validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Address reported to the statistics service.
///
/// Prefers the first `X-Forwarded-For` entry, then the peer address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ip = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Ok(Self(ip))
    }
}

fn default_size() -> i64 {
    10
}

/// `?from&size` paging parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub from: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

/// Query string of `GET /events` and `GET /admin/events`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "comma_separated")]
    pub categories: Option<Vec<i64>>,
    #[serde(default)]
    pub paid: Option<bool>,
    #[serde(default, deserialize_with = "option_datetime_format::deserialize")]
    pub range_start: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "option_datetime_format::deserialize")]
    pub range_end: Option<NaiveDateTime>,
    #[serde(default)]
    pub only_available: bool,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub from: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default, deserialize_with = "comma_separated")]
    pub users: Option<Vec<i64>>,
    #[serde(default, deserialize_with = "comma_separated")]
    pub states: Option<Vec<EventState>>,
}

impl SearchQuery {
    pub fn into_parameters(self) -> Result<EventSearchParameters> {
        let sort = self
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<SortMode>)
            .transpose()?;

        Ok(EventSearchParameters {
            text: self.text,
            categories: self.categories,
            paid: self.paid,
            range_start: self.range_start,
            range_end: self.range_end,
            only_available: self.only_available,
            sort,
            from: self.from,
            size: self.size,
            users: self.users,
            states: self.states,
        })
    }
}
