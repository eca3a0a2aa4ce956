//! The editor-facing side of a participant.
//!
//! Every content mutation reports where it came from. Only
//! [`ContentChange::UserEdit`] is ever forwarded to the room; content set
//! programmatically from a remote update can never feed back into a broadcast.

/// A content mutation tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentChange {
    /// Typed by the local user.
    UserEdit(String),
    /// Applied by code, e.g. a remote update or a sync reply.
    ProgrammaticSet(String),
}

impl ContentChange {
    pub fn content(&self) -> &str {
        match self {
            ContentChange::UserEdit(content) | ContentChange::ProgrammaticSet(content) => content,
        }
    }

    pub fn into_content(self) -> String {
        match self {
            ContentChange::UserEdit(content) | ContentChange::ProgrammaticSet(content) => content,
        }
    }
}

/// Holder of the document text shown to the user.
pub trait ContentHolder: Send + 'static {
    fn content(&self) -> String;

    /// Replace the content without it counting as a user edit.
    fn set_content(&mut self, content: String) -> ContentChange;

    /// Apply an edit made by the local user.
    fn edit(&mut self, content: String) -> ContentChange;
}

/// In-memory [`ContentHolder`], used by headless participants and tests.
#[derive(Debug, Default, Clone)]
pub struct TextBuffer {
    content: String,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl ContentHolder for TextBuffer {
    fn content(&self) -> String {
        self.content.clone()
    }

    fn set_content(&mut self, content: String) -> ContentChange {
        self.content.clone_from(&content);
        ContentChange::ProgrammaticSet(content)
    }

    fn edit(&mut self, content: String) -> ContentChange {
        self.content.clone_from(&content);
        ContentChange::UserEdit(content)
    }
}
