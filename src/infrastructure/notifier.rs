//! 面向用户的阻塞提示（浏览器中的 alert）

use std::fmt;

pub trait UserNotifier: Send + Sync + fmt::Debug {
    fn alert(&self, message: &str);
}

/// 无界面环境：提示写入日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn alert(&self, message: &str) {
        tracing::warn!(alert = %message, "User alert");
    }
}
