//! Public runtime API surface.
//!
//! Types clients touch when they drive a session from async code: the
//! cloneable [`RuntimeHandle`], the [`SessionEvent`] stream and the error type.

pub mod errors;
pub mod events;
pub mod handle;

pub use errors::{Result, RuntimeError};
pub use events::SessionEvent;
pub use handle::RuntimeHandle;
