//! 连接投递抽象。
//!
//! `LocalConnectionHub` 为每个连接持有一个无界发送端，WebSocket 任务持有接收端。

use crate::NotifyError;
use crate::message::OutboundMessage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;

/// 按连接名投递消息。
#[async_trait]
pub trait ConnectionSender: Send + Sync {
    async fn send(&self, connection: &str, message: &OutboundMessage) -> Result<(), NotifyError>;
}

/// 空投递器（用于占位）。
#[derive(Debug, Default)]
pub struct NoopSender;

#[async_trait]
impl ConnectionSender for NoopSender {
    async fn send(&self, _connection: &str, _message: &OutboundMessage) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// 进程内连接表。
#[derive(Default)]
pub struct LocalConnectionHub {
    connections: RwLock<HashMap<String, mpsc::UnboundedSender<OutboundMessage>>>,
}

impl LocalConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册连接，返回该连接的消息接收端；同名连接会被替换。
    pub fn register(
        &self,
        connection: &str,
    ) -> Result<mpsc::UnboundedReceiver<OutboundMessage>, NotifyError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut connections = self
            .connections
            .write()
            .map_err(|_| NotifyError::Transport("lock failed".to_string()))?;
        connections.insert(connection.to_string(), tx);
        Ok(rx)
    }

    pub fn unregister(&self, connection: &str) {
        if let Ok(mut connections) = self.connections.write() {
            connections.remove(connection);
        }
    }

    pub fn len(&self) -> usize {
        self.connections.read().map(|map| map.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConnectionSender for LocalConnectionHub {
    async fn send(&self, connection: &str, message: &OutboundMessage) -> Result<(), NotifyError> {
        let connections = self
            .connections
            .read()
            .map_err(|_| NotifyError::Transport("lock failed".to_string()))?;
        let sender = connections
            .get(connection)
            .ok_or_else(|| NotifyError::Transport(format!("unknown connection {connection}")))?;
        sender
            .send(message.clone())
            .map_err(|_| NotifyError::Transport(format!("connection {connection} closed")))
    }
}
