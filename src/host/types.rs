//! Value types exchanged between the engine and its host document.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Identity of a host element, used to compare capture holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// Modifier state carried by a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

/// A modifier+key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: Modifiers,
    /// Key value as reported by the host (`"X"`, `"Escape"`, ...)
    pub key: &'static str,
}

impl KeyChord {
    /// Whether a key event matches this chord exactly on the modifiers it requires.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        let wanted = self.modifiers;
        let got = event.modifiers;
        event.key == self.key
            && (!wanted.ctrl || got.ctrl)
            && (!wanted.shift || got.shift)
            && (!wanted.alt || got.alt)
            && (!wanted.meta || got.meta)
    }
}

impl std::fmt::Display for KeyChord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.alt {
            write!(f, "Alt+")?;
        }
        if self.modifiers.shift {
            write!(f, "Shift+")?;
        }
        if self.modifiers.meta {
            write!(f, "Meta+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// A raw keydown observed on the document.
///
/// Clones share the same default-action flag, so a listener holding a
/// broadcast copy can still suppress the host's built-in handling.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub key: String,
    pub modifiers: Modifiers,
    default_prevented: Arc<AtomicBool>,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            default_prevented: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Plain key press without modifiers.
    pub fn plain(key: impl Into<String>) -> Self {
        Self::new(key, Modifiers::default())
    }

    /// Suppress the host's default action for this event.
    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::SeqCst);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }
}

/// Raw input observed by document-wide listeners.
#[derive(Debug, Clone)]
pub enum InputEvent {
    KeyDown(KeyEvent),
    PointerMove { dx: i32, dy: i32 },
}

/// Synthetic events the engine injects at document level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyntheticEvent {
    /// Pointer moved to an absolute viewport position
    PointerMove { x: u32, y: u32 },
    /// Keydown for a key without visible effect
    KeyDown { key: String },
}

/// Kind of decoy media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Silent asset the host resolves to actual media content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSource {
    BlankVideo,
    SilentAudio,
}

/// Description of a hidden, looping media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSpec {
    pub kind: MediaKind,
    pub source: MediaSource,
    pub looped: bool,
    pub muted: bool,
    pub plays_inline: bool,
    /// Playback volume in [0, 1]
    pub volume: f32,
    /// Rendered size in pixels, `None` for non-visual media
    pub size: Option<(u32, u32)>,
    pub opacity: f32,
    pub pointer_events: bool,
}

impl MediaSpec {
    /// A 1x1, nearly transparent, muted looping video.
    pub fn hidden_video() -> Self {
        Self {
            kind: MediaKind::Video,
            source: MediaSource::BlankVideo,
            looped: true,
            muted: true,
            plays_inline: true,
            volume: 0.0,
            size: Some((1, 1)),
            opacity: 0.01,
            pointer_events: false,
        }
    }

    /// A looping audio element at near-zero volume.
    pub fn near_silent_audio() -> Self {
        Self {
            kind: MediaKind::Audio,
            source: MediaSource::SilentAudio,
            looped: true,
            muted: true,
            plays_inline: false,
            volume: 0.01,
            size: None,
            opacity: 1.0,
            pointer_events: false,
        }
    }
}

/// Failures reported by host collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("capability unsupported: {0}")]
    Unsupported(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("operation failed: {0}")]
    Failed(String),
}
