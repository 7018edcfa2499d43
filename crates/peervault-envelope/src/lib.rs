//! # Peervault Envelope
//!
//! The encrypted, multi-reader, access-controlled content container.
//!
//! An [`Envelope`] seals arbitrary content under a fresh symmetric key and
//! wraps that key once per entitled reader — individual agents and group
//! agents in separate tables. It supports optional content signing, an
//! optimistic-concurrency overwrite check, and a strict textual wire form.
//!
//! ```no_run
//! use peervault_agent::{Agent, IndividualAgent};
//! use peervault_envelope::Envelope;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let alice = Agent::Individual(IndividualAgent::create("passphrase")?);
//!
//! let mut envelope = Envelope::builder()
//!     .text("shared secret")
//!     .reader(&alice)
//!     .seal()?;
//!
//! envelope.open(&alice)?;
//! assert_eq!(envelope.content_text()?, "shared secret");
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod envelope;
pub mod error;
mod wire;

pub use content::{ContentSchema, ContentType};
pub use envelope::{Envelope, EnvelopeBuilder};
pub use error::EnvelopeError;
