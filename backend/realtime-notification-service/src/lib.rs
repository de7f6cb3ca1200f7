pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, DeliveryFailure, Result};
pub use services::{NotificationBuilder, NotificationService, Publication};
pub use websocket::{StreamHandle, StreamId, Subscription, SubscriptionRegistry};
