//! Bridge between the load pipeline and the loader thread pool.
//!
//! Use [`LoaderBridge::spawn`] once when a pipeline starts. Commands go out
//! over [`LoaderBridge::tx_cmd`]; every settlement comes back over
//! [`LoaderBridge::rx_msg`] and is applied on the pipeline's thread, so
//! registries are never touched by a loader thread. Call
//! [`LoaderBridge::shutdown`] to stop and join the pool.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};

use crate::events::loading::{LoadCmd, LoadMessage};
use crate::resources::fetch::AssetFetcher;
use crate::systems::loader::loader_thread;

pub struct LoaderBridge {
    /// Sender for [`LoadCmd`] (pipeline -> loaders). Shared by all threads.
    pub tx_cmd: Sender<LoadCmd>,
    /// Receiver for [`LoadMessage`] (loaders -> pipeline).
    pub rx_msg: Receiver<LoadMessage>,
    handles: Vec<JoinHandle<()>>,
}

impl LoaderBridge {
    /// Spawn `workers` loader threads (at least one) sharing `fetcher`.
    pub fn spawn(fetcher: Arc<dyn AssetFetcher>, workers: usize) -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<LoadCmd>();
        let (tx_msg, rx_msg) = unbounded::<LoadMessage>();

        let workers = workers.max(1);
        let handles = (0..workers)
            .filter_map(|i| {
                let rx_cmd = rx_cmd.clone();
                let tx_msg = tx_msg.clone();
                let fetcher = Arc::clone(&fetcher);
                std::thread::Builder::new()
                    .name(format!("loader-{}", i))
                    .spawn(move || loader_thread(rx_cmd, tx_msg, fetcher))
                    .map_err(|e| warn!("Could not spawn loader thread {}: {}", i, e))
                    .ok()
            })
            .collect::<Vec<_>>();
        info!("Started {} loader thread(s)", handles.len());

        Self {
            tx_cmd,
            rx_msg,
            handles,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Ask every loader thread to exit once it has drained earlier commands.
    pub fn request_shutdown(&self) {
        for _ in 0..self.handles.len() {
            if self.tx_cmd.send(LoadCmd::Shutdown).is_err() {
                debug!("Loader threads already gone");
                break;
            }
        }
    }

    /// Request shutdown and join. Blocks while a thread is stuck in a fetch.
    /// Returns how many threads had panicked.
    pub fn shutdown(mut self) -> usize {
        self.request_shutdown();
        let mut panicked = 0;
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("loader").to_string();
            if handle.join().is_err() {
                warn!("Loader thread '{}' panicked", name);
                panicked += 1;
            }
        }
        panicked
    }
}

impl Drop for LoaderBridge {
    fn drop(&mut self) {
        // Threads not joined here exit on their own once they see Shutdown.
        if !self.handles.is_empty() {
            self.request_shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::fetch::MemoryFetcher;

    #[test]
    fn shutdown_joins_every_thread() {
        let bridge = LoaderBridge::spawn(Arc::new(MemoryFetcher::new()), 3);
        assert_eq!(bridge.worker_count(), 3);
        assert_eq!(bridge.shutdown(), 0);
    }

    #[test]
    fn shutdown_reports_panicked_threads() {
        let mut bridge = LoaderBridge::spawn(Arc::new(MemoryFetcher::new()), 1);
        let crashed = std::thread::Builder::new()
            .name("loader-crashed".to_string())
            .spawn(|| panic!("loader died outside a load"))
            .unwrap();
        bridge.handles.push(crashed);
        assert_eq!(bridge.shutdown(), 1);
    }
}
