use clap::{Parser, Subcommand};

use crate::connector::DEFAULT_MODEL;

#[derive(Parser)]
#[command(name = "storefront-chat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base URL of the chat-completions deployment
    #[arg(long, global = true, env = "AZUREAI_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Static API key; the host's managed identity is used when omitted
    #[arg(long, global = true, env = "AZUREAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, global = true, env = "AZUREAI_MODEL_NAME", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Give up on a model request after this many seconds
    #[arg(
        long,
        global = true,
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Replace the default instruction seeded into new conversations
    #[arg(long, global = true)]
    pub system_prompt: Option<String>,

    /// Answer locally without calling the endpoint
    #[arg(long, global = true)]
    pub mock_inference: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web chat front-end
    Serve {
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Bind to 0.0.0.0 instead of 127.0.0.1, exposing the server on all interfaces
        #[arg(long)]
        public: bool,

        /// Forget a visitor's conversation after this many idle seconds
        #[arg(long, default_value = "1200", value_parser = clap::value_parser!(u64).range(1..))]
        session_idle_secs: u64,

        /// Mark the session cookie Secure; use when served over HTTPS
        #[arg(long)]
        secure_cookies: bool,
    },

    /// Send one message to the model and print the reply
    Ask { message: String },
}
