//! Link to the clip sequencer process over OSC.

pub mod bridge;
pub mod clip_state;
pub mod commands;
pub mod protocol;

use thiserror::Error;

pub use bridge::{CommandRecorder, SequencerBridge};
pub use clip_state::{ClipDisplay, ClipState};
pub use commands::SequencerCommand;
pub use protocol::{ClipGrid, ProtocolRevision, TransportSnapshot};

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("malformed state message: {0}")]
    Malformed(String),
    #[error("could not resolve sequencer address {0}")]
    Resolve(String),
    #[error("could not bind state receiver to port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode OSC packet: {0}")]
    Encode(String),
}
