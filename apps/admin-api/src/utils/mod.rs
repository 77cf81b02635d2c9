//! 工具函数模块

pub mod response;

pub use response::*;
