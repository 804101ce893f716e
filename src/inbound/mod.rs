// Inbound side of the relay: checks applied to requests coming from Vercel.

pub mod signature;

pub use signature::{SIGNATURE_HEADER, SignatureVerifier};
