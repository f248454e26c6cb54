//! Mediated access to the backend for the untrusted UI surface.
//!
//! - [`Gateway`] forwards discrete request/response calls.
//! - [`StreamingRelay`] owns the single persistent progress socket.

pub(crate) mod gateway;
pub(crate) mod relay;


pub use gateway::{Collection, Gateway, GatewayError, GatewayResult};
pub use relay::{
    ChannelPhase, ProgressEvent, RelayCommand, RelayEvent, RelayEvents, RelayHandle, StreamError,
    StreamResult, StreamingRelay,
};

pub use reqwest::Method;
