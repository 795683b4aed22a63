//! Messages exchanged with the loader threads.
//!
//! [`LoadCmd`] goes *to* the loader pool, [`LoadMessage`] comes *back*. Every
//! command except [`LoadCmd::Shutdown`] produces exactly one message, success
//! or failure; the pipeline's barriers count on that.

use std::sync::Arc;

use crate::error::AssetError;
use crate::resources::imagestore::Image;
use crate::resources::soundstore::AudioClip;

/// Which phase an asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    SpriteSheet,
    Sound,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AssetKind::Image => "image",
            AssetKind::SpriteSheet => "sprite sheet",
            AssetKind::Sound => "sound",
        })
    }
}

/// Commands sent *to* the loader threads.
#[derive(Debug, Clone)]
pub enum LoadCmd {
    Load {
        kind: AssetKind,
        name: String,
        url: String,
    },
    Shutdown,
}

/// A successfully loaded asset.
#[derive(Debug, Clone)]
pub enum LoadedAsset {
    Image(Arc<Image>),
    Sound(Arc<AudioClip>),
}

/// Settlements sent *back* from the loader threads.
#[derive(Debug)]
pub enum LoadMessage {
    Loaded {
        kind: AssetKind,
        name: String,
        asset: LoadedAsset,
    },
    Failed {
        kind: AssetKind,
        name: String,
        error: AssetError,
    },
}

impl LoadMessage {
    pub fn kind(&self) -> AssetKind {
        match self {
            LoadMessage::Loaded { kind, .. } | LoadMessage::Failed { kind, .. } => *kind,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LoadMessage::Loaded { name, .. } | LoadMessage::Failed { name, .. } => name,
        }
    }
}
