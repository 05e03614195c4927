use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyFormat {
    Plain,
    Markdown,
}

/// Inline keyboard button carrying callback data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Outgoing message, independent of the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub format: ReplyFormat,
    /// Rows of inline buttons
    pub buttons: Vec<Vec<Button>>,
    pub disable_preview: bool,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: ReplyFormat::Plain,
            buttons: Vec::new(),
            disable_preview: false,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            format: ReplyFormat::Markdown,
            ..Self::plain(text)
        }
    }

    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.buttons.push(row);
        self
    }

    pub fn without_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }
}

/// Handle to a message the bot has sent, used for later edits and deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: i32,
}

/// Outbound side of a chat channel
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, reply: Reply) -> Result<SentMessage, String>;

    async fn edit(&self, message: SentMessage, reply: Reply) -> Result<(), String>;

    async fn delete(&self, message: SentMessage) -> Result<(), String>;

    /// Answer the button press being handled, optionally with a toast text
    async fn acknowledge(&self, _text: Option<String>) -> Result<(), String> {
        Ok(())
    }
}
