//! Diagnostic client for the meshmesh ESPHome API proxy.
//!
//! meshprobe connects to the proxy, sends the `INIT` handshake line, and once
//! the proxy acknowledges, sends one native API frame and dumps whatever the
//! device sends back.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connection with bounded, cancellable receives
//! - [`frame`]: ESPHome plaintext framing (hello frame, chunk reassembly)
//! - [`session`]: Handshake gate and streaming loop

/// Re-export transport types.
pub mod transport {
    pub use meshprobe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use meshprobe_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use meshprobe_session::*;
}
