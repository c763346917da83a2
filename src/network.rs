use std::sync::Mutex;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Connectivity signal consulted by the portfolio aggregator.
pub trait NetworkAvailability: Send + Sync {
    /// Latest known connectivity, readable without waiting.
    fn is_available(&self) -> bool;

    /// Release whatever keeps the signal up to date. Must be safe to call twice.
    fn unregister(&self);
}

/// Tracks reachability of one `host:port` by periodically opening a TCP connection to it.
pub struct ConnectivityMonitor {
    status: watch::Receiver<bool>,
    probe: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    /// Start probing `target`. Reports online until the first probe says otherwise.
    /// Must be called from within a tokio runtime.
    pub fn spawn(target: String, interval: Duration, timeout: Duration) -> Self {
        let (tx, status) = watch::channel(true);

        let probe = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let online = is_reachable(&target, timeout).await;
                let changed = tx.send_if_modified(|current| {
                    let changed = *current != online;
                    *current = online;
                    changed
                });
                if changed {
                    tracing::info!("Connectivity to {} changed: online={}", target, online);
                }
                if tx.is_closed() {
                    break;
                }
            }
        });

        Self {
            status,
            probe: Mutex::new(Some(probe)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.status.clone()
    }
}

async fn is_reachable(target: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(target)).await,
        Ok(Ok(_))
    )
}

impl NetworkAvailability for ConnectivityMonitor {
    fn is_available(&self) -> bool {
        *self.status.borrow()
    }

    fn unregister(&self) {
        let handle = match self.probe.lock() {
            Ok(mut probe) => probe.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("Connectivity probe stopped");
        }
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn comes_online_when_listener_appears() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let monitor = ConnectivityMonitor::spawn(
            addr.to_string(),
            Duration::from_millis(20),
            Duration::from_millis(200),
        );
        let mut status = monitor.subscribe();
        tokio::time::timeout(Duration::from_secs(2), status.wait_for(|online| !online))
            .await
            .unwrap()
            .unwrap();
        assert!(!monitor.is_available());

        let listener = TcpListener::bind(addr).await.unwrap();
        let accept = tokio::spawn(async move {
            loop {
                if listener.accept().await.is_err() {
                    break;
                }
            }
        });

        let came_online =
            tokio::time::timeout(Duration::from_secs(2), status.wait_for(|online| *online))
                .await
                .unwrap()
                .is_ok();
        assert!(came_online);
        assert!(monitor.is_available());

        monitor.unregister();
        accept.abort();
    }

    #[tokio::test]
    async fn reports_unreachable_target() {
        // Bind then drop so the port is very likely closed.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let monitor = ConnectivityMonitor::spawn(
            addr.to_string(),
            Duration::from_millis(20),
            Duration::from_millis(200),
        );
        let mut status = monitor.subscribe();
        let went_offline =
            tokio::time::timeout(Duration::from_secs(2), status.wait_for(|online| !online))
                .await
                .unwrap()
                .is_ok();
        assert!(went_offline);
        assert!(!monitor.is_available());
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let monitor = ConnectivityMonitor::spawn(
            "127.0.0.1:9".to_string(),
            Duration::from_secs(60),
            Duration::from_millis(50),
        );
        monitor.unregister();
        monitor.unregister();
        assert!(monitor.probe.lock().unwrap().is_none());
    }
}
