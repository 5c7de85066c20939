// 会话变更监听
// 订阅钱包的 accountsChanged 通知，每次通知都完整重跑连接流程；
// 监听任务由 WatcherGuard 持有，guard 释放即取消订阅

use std::sync::Weak;

use ethers::types::Address;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::service::session_service::WalletSessionService;

pub struct SessionWatcher;

impl SessionWatcher {
    /// 启动监听任务
    ///
    /// 任务只持有服务的弱引用，服务释放后任务自行退出。
    pub fn spawn(
        service: Weak<WalletSessionService>,
        mut accounts_rx: broadcast::Receiver<Vec<Address>>,
    ) -> WatcherGuard {
        let handle = tokio::spawn(async move {
            loop {
                let accounts = match accounts_rx.recv().await {
                    Ok(accounts) => Some(accounts),
                    Err(RecvError::Lagged(skipped)) => {
                        // 丢失的通知无法还原，直接按钱包当前状态重连
                        tracing::warn!(skipped, "accountsChanged notifications lagged");
                        None
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(service) = service.upgrade() else {
                    break;
                };
                match accounts {
                    Some(accounts) => service.resync(accounts).await,
                    None => {
                        service.connect_wallet().await;
                    }
                }
            }
            tracing::debug!("Session watcher stopped");
        });

        WatcherGuard {
            handle: Some(handle),
        }
    }
}

/// 监听订阅的 RAII 句柄
#[derive(Debug)]
pub struct WatcherGuard {
    handle: Option<JoinHandle<()>>,
}

impl WatcherGuard {
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 取消订阅并等待任务真正结束
    ///
    /// 正在进行中的重连会被中止；会话提交是原子的，不会留下半成品状态。
    pub async fn unsubscribe(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "Session watcher task failed");
                }
            }
        }
    }
}

impl Drop for WatcherGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
