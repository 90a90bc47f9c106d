//! stream/options.rs
//! Per-call options for encode and decode.

use std::fmt;
use std::sync::Arc;

use crate::plugins::{DecodePlugin, DecodePlugins, EncodePlugin, EncodePlugins};
use crate::stream::cancel::CancellationToken;

#[derive(Clone, Default)]
pub struct EncodeOptions {
    /// Consulted in order for values the built-in encoding does not know.
    pub plugins: EncodePlugins,
    /// Races every deferred value; see [`CancellationToken`].
    pub cancellation: Option<CancellationToken>,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin<P: EncodePlugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl fmt::Debug for EncodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("plugins", &self.plugins.len())
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct DecodeOptions {
    pub plugins: DecodePlugins,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin<P: DecodePlugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }
}

impl fmt::Debug for DecodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeOptions")
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
