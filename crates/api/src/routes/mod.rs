//! HTTP route handlers.

pub mod availability;
pub mod evv;
pub mod health;
pub mod openapi;
pub mod patterns;
pub mod submissions;
pub mod visits;
pub mod vmurs;
