//! HTTP implementations of the service traits in [`crate::app::repositories`].

mod auth;
mod tasks;
