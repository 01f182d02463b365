//! Welcome core: classify joins, find the new member and compose a greeting.
//!
//! ## Flow
//!
//! 1. [`classify`] decides whether an [`InboundEvent`] announces a join
//! 2. [`assemble`] resolves the member id, compiles the template and picks
//!    an image, producing a [`MessagePlan`]
//! 3. The plan is handed to the transport (see `events::welcome`)

pub mod assembler;
pub mod classifier;
pub mod event;
pub mod media;
pub mod member;
pub mod template;

pub use assembler::{assemble, AssembleError, MessagePlan};
pub use classifier::{classify, Classification, JoinDetection};
pub use event::{Component, InboundEvent, JoinEvent, MessageEvent};
pub use media::{FileProbe, LocalFs, MediaSource, UnavailableFs};
pub use template::{Segment, WelcomeTemplate};
