pub(crate) mod channel_state;
pub(crate) mod error;
pub(crate) mod progress_event;
pub(crate) mod relay;
pub(crate) mod relay_command;

pub use channel_state::ChannelPhase;
pub use error::{Result as StreamResult, StreamError};
pub use progress_event::ProgressEvent;
pub use relay::{RelayEvent, RelayEvents, RelayHandle, StreamingRelay};
pub use relay_command::RelayCommand;
