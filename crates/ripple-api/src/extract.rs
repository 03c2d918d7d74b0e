//! Extractors whose rejections render as `ApiError` JSON bodies.

use axum::Json;
use axum::extract::{Path, Query};
use axum_extra::extract::WithRejection;

use crate::error::ApiError;

pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;
pub type PathParam<T> = WithRejection<Path<T>, ApiError>;
pub type QueryParams<T> = WithRejection<Query<T>, ApiError>;
