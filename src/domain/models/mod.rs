mod chat_message;
mod conversation;
mod session;

pub use chat_message::*;
pub use conversation::*;
pub use session::*;
