pub mod container;
pub mod controller;
pub mod error;
pub mod router;
pub mod session;
pub mod view;

pub use container::{Container, ContainerConfig};
pub use error::ApiError;
pub use session::{RequestSession, SESSION_COOKIE};
pub use view::ChatPage;
