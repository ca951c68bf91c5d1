//! Background eviction of idle rate windows.
//!
//! Each swept table gets one task that sleeps for the table's current sweep
//! interval, sweeps, and repeats. The interval is re-read after every pass so
//! window changes take effect on the next cycle.
//!
//! The task runs on the ambient tokio runtime when the limiter is created
//! inside one. Otherwise it gets a dedicated thread driving a current-thread
//! runtime. Either way it holds only a weak reference to its table and exits
//! when signalled through its watch channel or when the table is gone.

use std::sync::{Arc, Weak};

use tokio::runtime::{Builder, Handle};
use tokio::sync::watch;

use crate::window::WindowTable;

/// Handle to a running sweep task. Stops the task when dropped.
#[derive(Debug)]
pub(crate) struct Sweeper {
    shutdown: watch::Sender<bool>,
}

impl Sweeper {
    /// Starts sweeping `table`.
    pub(crate) fn spawn(table: &Arc<WindowTable>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let name = table.name();
        let task = sweep_loop(Arc::downgrade(table), shutdown_rx);

        if let Ok(handle) = Handle::try_current() {
            handle.spawn(task);
        } else {
            let spawned = std::thread::Builder::new()
                .name(format!("beacon-sweep-{name}"))
                .spawn(move || match Builder::new_current_thread().enable_time().build() {
                    Ok(runtime) => runtime.block_on(task),
                    Err(error) => {
                        tracing::warn!(table = name, %error, "failed to build sweeper runtime");
                    }
                });
            if let Err(error) = spawned {
                tracing::warn!(table = name, %error, "failed to spawn sweeper thread");
            }
        }

        tracing::debug!(table = name, "rate window sweeper started");
        Self { shutdown }
    }

    /// Signals the task to exit. Idempotent.
    pub(crate) fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweep_loop(table: Weak<WindowTable>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let Some(interval) = table.upgrade().map(|t| t.sweep_interval()) else {
            break;
        };

        tokio::select! {
            _ = shutdown.changed() => break,
            () = tokio::time::sleep(interval) => {}
        }

        let Some(table) = table.upgrade() else {
            break;
        };
        table.sweep();
    }

    tracing::debug!("rate window sweeper stopped");
}
