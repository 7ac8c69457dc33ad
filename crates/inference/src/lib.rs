//! REST client for the external image-restoration inference service.

pub mod api;

pub use api::RestorationApi;
