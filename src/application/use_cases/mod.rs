mod clear_conversation;
mod send_message;
mod view_conversation;

pub use clear_conversation::*;
pub use send_message::*;
pub use view_conversation::*;
