use minijinja::{context, Environment};

use crate::domain::{ChatMessage, ChatRole, Conversation};

const CHAT_TEMPLATE: &str = "chat.html";

/// Renders the chat page. The system prompt is never shown to the visitor.
pub struct ChatPage {
    env: Environment<'static>,
}

impl ChatPage {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(CHAT_TEMPLATE, include_str!("templates/chat.html"))?;
        Ok(Self { env })
    }

    pub fn render(
        &self,
        conversation: &Conversation,
        model: &str,
    ) -> Result<String, minijinja::Error> {
        let messages: Vec<&ChatMessage> = conversation
            .iter()
            .filter(|m| m.role() != &ChatRole::System)
            .collect();

        self.env
            .get_template(CHAT_TEMPLATE)?
            .render(context! { messages => messages, model => model })
    }
}
