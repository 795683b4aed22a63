//! Loader threads and the system that drains their results.
//!
//! - [`loader_thread`] runs on each pool thread: it blocks on the command
//!   channel, fetches and decodes one asset per [`LoadCmd::Load`], and sends
//!   back exactly one [`LoadMessage`]. It never touches a registry.
//! - [`pump_load_pipeline`] runs once per frame on the main thread and
//!   applies whatever settlements arrived since the last frame.
//!
//! A panic while loading (a misbehaving fetcher or decoder) is caught and
//! reported as a failed settlement, so a phase can never lose a count.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use bevy_ecs::prelude::ResMut;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, trace};

use crate::error::AssetError;
use crate::events::loading::{AssetKind, LoadCmd, LoadMessage, LoadedAsset};
use crate::resources::fetch::AssetFetcher;
use crate::resources::imagestore::Image;
use crate::resources::loadpipeline::LoadPipeline;
use crate::resources::soundstore::AudioClip;

/// Apply pending settlements. Never blocks.
pub fn pump_load_pipeline(mut pipeline: ResMut<LoadPipeline>) {
    pipeline.pump();
}

/// Entry point of a loader pool thread. Returns on [`LoadCmd::Shutdown`] or
/// when the pipeline side of either channel is gone.
pub fn loader_thread(
    rx_cmd: Receiver<LoadCmd>,
    tx_msg: Sender<LoadMessage>,
    fetcher: Arc<dyn AssetFetcher>,
) {
    trace!("loader thread starting ({:?})", std::thread::current().name());

    for cmd in rx_cmd.iter() {
        match cmd {
            LoadCmd::Load { kind, name, url } => {
                debug!("loading {} '{}' from '{}'", kind, name, url);
                let result = catch_unwind(AssertUnwindSafe(|| {
                    load_asset(fetcher.as_ref(), kind, &name, &url)
                }))
                .unwrap_or_else(|_| Err(AssetError::Panicked { url: url.clone() }));

                let msg = match result {
                    Ok(asset) => LoadMessage::Loaded { kind, name, asset },
                    Err(error) => LoadMessage::Failed { kind, name, error },
                };
                if tx_msg.send(msg).is_err() {
                    break;
                }
            }
            LoadCmd::Shutdown => break,
        }
    }

    trace!("loader thread exiting ({:?})", std::thread::current().name());
}

/// Fetch and decode one asset.
pub fn load_asset(
    fetcher: &dyn AssetFetcher,
    kind: AssetKind,
    name: &str,
    url: &str,
) -> Result<LoadedAsset, AssetError> {
    let bytes = fetcher.fetch(url)?;
    match kind {
        AssetKind::Image | AssetKind::SpriteSheet => {
            Image::decode(name, url, &bytes).map(|image| LoadedAsset::Image(Arc::new(image)))
        }
        AssetKind::Sound => {
            AudioClip::from_bytes(name, url, bytes).map(|clip| LoadedAsset::Sound(Arc::new(clip)))
        }
    }
}
