//! Common primitive types shared across the node: fixed-size buffers, the DA
//! namespace identifier, genesis parameters, and the sequencer's signature
//! scheme.

pub mod buf;
pub mod crypto;
pub mod namespace;
pub mod params;
