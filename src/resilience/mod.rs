//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Reading a request from a client:
//!     → timeouts.rs (optional read deadline)
//!     → On expiry: connection closed without a response
//! ```

pub mod timeouts;
