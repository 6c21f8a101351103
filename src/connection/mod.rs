//! Connection Establisher
//!
//! Pairwise DIDComm connections between the parties:
//! - Out-of-band invitation with DID exchange
//! - Bounded wait for the active state
//! - Lookup by alias

pub mod establisher;

pub use establisher::{
    active_connection, active_connection_id, ConnectionEstablisher, ConnectionPair, ConnectionRef,
};
