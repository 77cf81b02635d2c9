//! 中间件与请求鉴权辅助函数。

mod auth;

pub use auth::*;
