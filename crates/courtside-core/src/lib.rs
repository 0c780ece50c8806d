pub mod api;
pub mod assets;
pub mod catalog;
pub mod config;
pub mod error;
pub mod field;
pub mod match_state;
pub mod migrate;
pub mod overlay;
pub mod remap;
pub mod resolve;

#[cfg(feature = "client")]
pub mod client;

pub use config::{ConnectionState, FieldMapping, InputConfig, MirrorConfig};
pub use error::{OverlayError, SchemaError, SyncError, TransportError};
pub use field::FieldKind;
pub use match_state::MatchState;
