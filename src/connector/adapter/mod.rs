mod api_key_credential;
mod azure_inference_client;
mod managed_identity_credential;
mod mock_inference;

pub use api_key_credential::*;
pub use azure_inference_client::*;
pub use managed_identity_credential::*;
pub use mock_inference::*;
