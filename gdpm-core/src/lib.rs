//! gdpm core library exports

pub mod addon;
pub mod error;
pub mod fsutil;
pub mod manifest;
pub mod project;
pub mod reconcile;
#[cfg(feature = "remote")]
pub mod remote;
pub mod settings;
pub mod source;
pub mod spec;

pub use error::{Error, Result};
pub use manifest::{LinkState, Manifest, PluginRecord};
pub use project::ProjectLayout;
pub use reconcile::{Change, LinkRequest, PluginState, PluginStatus, Reconciler, Report};
pub use settings::Settings;
pub use source::{Materializer, Resolution, Resolver, SourceLocator};
pub use spec::{PluginKey, PluginSpec};
