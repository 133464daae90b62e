//! Message types for agent communication
//!
//! Messages are immutable values broadcast between agents each round. The
//! `purpose` tag doubles as the event label storing handlers report back.

use serde::{Deserialize, Serialize};

/// Sorting strategy a requester asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortTask {
    /// Lexicographic order
    SortAlpha,
    /// Shortest first, ties keep their input order
    SortLength,
}

impl SortTask {
    pub const ALL: [SortTask; 2] = [SortTask::SortAlpha, SortTask::SortLength];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortTask::SortAlpha => "sort_alpha",
            SortTask::SortLength => "sort_length",
        }
    }

    /// Sort a copy of `data`
    pub fn apply(&self, data: &[String]) -> Vec<String> {
        let mut sorted = data.to_vec();
        match self {
            SortTask::SortAlpha => sorted.sort(),
            SortTask::SortLength => sorted.sort_by_key(|item| item.len()),
        }
        sorted
    }
}

impl Default for SortTask {
    fn default() -> Self {
        SortTask::SortAlpha
    }
}

/// Messages exchanged between agents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "purpose", rename_all = "snake_case")]
pub enum Message {
    /// Request naming the function to apply
    Function {
        #[serde(rename = "for")]
        task: SortTask,
    },

    /// Data to operate on
    Elements { data: Vec<String> },

    /// Result of applying a function
    Response { data: Vec<String> },
}

impl Message {
    pub fn function(task: SortTask) -> Self {
        Message::Function { task }
    }

    pub fn elements<I, S>(data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Message::Elements {
            data: data.into_iter().map(Into::into).collect(),
        }
    }

    pub fn response(data: Vec<String>) -> Self {
        Message::Response { data }
    }

    /// Wire tag of this message
    pub fn purpose(&self) -> &'static str {
        match self {
            Message::Function { .. } => "function",
            Message::Elements { .. } => "elements",
            Message::Response { .. } => "response",
        }
    }

    /// Payload-carrying messages without items count as "sent nothing"
    pub fn is_empty(&self) -> bool {
        match self {
            Message::Function { .. } => false,
            Message::Elements { data } | Message::Response { data } => data.is_empty(),
        }
    }

    /// Items carried by the message, if any
    pub fn items(&self) -> Option<&[String]> {
        match self {
            Message::Function { .. } => None,
            Message::Elements { data } | Message::Response { data } => Some(data),
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
