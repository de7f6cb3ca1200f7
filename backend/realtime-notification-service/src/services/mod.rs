pub mod notification_builder;
pub mod notification_service;

pub use notification_builder::*;
pub use notification_service::*;
