pub mod identity;
pub mod reconciler;
pub mod service;
