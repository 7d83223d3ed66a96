//! arxiv-digest Mailer
//!
//! Renders ranked candidates into a digest and hands it to a transport.

pub mod dispatch;
pub mod render;

pub use dispatch::{Dispatcher, SmtpDispatcher, StdoutDispatcher};
pub use render::{render_digest, Digest};
