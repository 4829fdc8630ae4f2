//! Signed binary event streams: the framed codec and the chained
//! per-event signer.

pub mod frame;
pub mod sign;

pub use frame::{Header, HeaderValue, Message};
pub use sign::{EventSigner, SignedEvent};
