//! HTTP request handlers.

pub mod health;
pub mod redirect;

pub use health::{healthz_handler, readyz_handler};
pub use redirect::redirect_handler;
