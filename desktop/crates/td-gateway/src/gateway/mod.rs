pub(crate) mod collection;
pub(crate) mod error;
pub(crate) mod gateway;

pub use collection::Collection;
pub use error::{GatewayError, Result as GatewayResult};
pub use gateway::Gateway;
