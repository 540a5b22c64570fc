use std::future::Future;
use std::sync::LazyLock;

use tokio::runtime::{Builder, Handle, Runtime};

static BACKGROUND_RUNTIME: LazyLock<Option<Runtime>> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("firestore-io")
        .enable_all()
        .build()
        .map_err(|err| log::error!("failed to build background tokio runtime: {err}"))
        .ok()
});

/// Spawns `future` on the current Tokio runtime, or on a shared background runtime when called
/// from outside one (for example from the worker queue).
pub fn spawn_detached<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        handle.spawn(future);
    } else if let Some(runtime) = BACKGROUND_RUNTIME.as_ref() {
        runtime.spawn(future);
    } else {
        log::error!("dropping background task: no tokio runtime available");
    }
}
