mod authenticator;
mod inference_gateway;
mod session_store;

pub use authenticator::*;
pub use inference_gateway::*;
pub use session_store::*;
