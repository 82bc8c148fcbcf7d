//! HTTP API handlers for agrotwin-ai

pub mod analyze;
pub mod daily;
pub mod health;
pub mod models_info;

pub use analyze::analyze_routes;
pub use daily::daily_routes;
pub use health::{health_routes, service_routes};
pub use models_info::model_routes;
