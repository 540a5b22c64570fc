use std::sync::{Arc, Mutex, PoisonError};

/// Network reachability as last reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetworkStatus {
    Available,
    Unavailable,
}

pub type ConnectivityCallback = Arc<dyn Fn(NetworkStatus) + Send + Sync + 'static>;

/// Reports network changes. Observational only: it never drives a call's state.
pub trait ConnectivityMonitor: Send + Sync + 'static {
    fn add_callback(&self, callback: ConnectivityCallback);

    fn status(&self) -> NetworkStatus;
}

/// A monitor that only changes when told to, for platforms without a reachability API.
#[derive(Default)]
pub struct ManualConnectivityMonitor {
    state: Mutex<MonitorState>,
}

#[derive(Default)]
struct MonitorState {
    unavailable: bool,
    callbacks: Vec<ConnectivityCallback>,
}

impl ManualConnectivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `status` and notifies callbacks if it changed.
    pub fn set_status(&self, status: NetworkStatus) {
        let callbacks = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let unavailable = status == NetworkStatus::Unavailable;
            if state.unavailable == unavailable {
                return;
            }
            state.unavailable = unavailable;
            state.callbacks.clone()
        };
        log::debug!("network status changed to {status:?}");
        for callback in callbacks {
            callback(status);
        }
    }
}

impl ConnectivityMonitor for ManualConnectivityMonitor {
    fn add_callback(&self, callback: ConnectivityCallback) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .push(callback);
    }

    fn status(&self) -> NetworkStatus {
        if self.state.lock().unwrap_or_else(PoisonError::into_inner).unavailable {
            NetworkStatus::Unavailable
        } else {
            NetworkStatus::Available
        }
    }
}
