use crate::RelayCommand;

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Observable phase of a streaming channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    Connecting,
    Open,
    Closed,
}

/// Buffered-sender state machine: `Connecting -> Open -> Closed`.
///
/// Commands issued while connecting queue in `pending` and are flushed,
/// in order, exactly once on the transition to `Open`.
pub(crate) enum ChannelState {
    Connecting { pending: VecDeque<RelayCommand> },
    Open { outbound: mpsc::UnboundedSender<Message> },
    Closed,
}

impl ChannelState {
    pub(crate) fn connecting() -> Self {
        ChannelState::Connecting {
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn phase(&self) -> ChannelPhase {
        match self {
            ChannelState::Connecting { .. } => ChannelPhase::Connecting,
            ChannelState::Open { .. } => ChannelPhase::Open,
            ChannelState::Closed => ChannelPhase::Closed,
        }
    }
}
