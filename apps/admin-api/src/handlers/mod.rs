//! Handlers 模块

pub mod data_scope;
pub mod health;
pub mod metrics;
pub mod notices;
pub mod online;
pub mod ws;

pub use data_scope::*;
pub use health::*;
pub use metrics::*;
pub use notices::*;
pub use online::*;
pub use ws::*;
