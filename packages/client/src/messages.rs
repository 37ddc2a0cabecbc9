//! JSON frames exchanged over the session channel, plus the document
//! snapshot returned by the initial load.

use std::fmt;

use scribe_editor::{Operation, Permission, RawContent};
use serde::{Deserialize, Serialize};

/// User reference as the document service sends it: numeric id or username
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Id(u64),
    Name(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Id(id) => write!(f, "{}", id),
            UserId::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for UserId {
    fn from(name: &str) -> Self {
        UserId::Name(name.to_string())
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId::Id(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub user: UserId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
}

impl Collaborator {
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| self.user.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleBody {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBody {
    pub data: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorBody {
    pub user: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    UpdateDocumentTitle { access_token: String, body: TitleBody },
    UpdateDocumentContent { access_token: String, body: ContentBody },
    AddNewCollaborator { access_token: String, body: CollaboratorBody },
}

impl OutboundMessage {
    pub fn title(access_token: &str, title: &str) -> Self {
        OutboundMessage::UpdateDocumentTitle {
            access_token: access_token.to_string(),
            body: TitleBody {
                title: title.to_string(),
            },
        }
    }

    pub fn content(access_token: &str, data: Vec<Operation>) -> Self {
        OutboundMessage::UpdateDocumentContent {
            access_token: access_token.to_string(),
            body: ContentBody { data },
        }
    }

    pub fn collaborator(access_token: &str, user: UserId) -> Self {
        OutboundMessage::AddNewCollaborator {
            access_token: access_token.to_string(),
            body: CollaboratorBody { user },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    UpdateDocumentContent { body: ContentBody },
    UpdateDocumentTitle { body: TitleBody },
    AddNewCollaborators { body: Collaborator },
}

/// Document state as returned by the initial REST load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub editor_content: RawContent,

    #[serde(default)]
    pub collaborators: Vec<Collaborator>,

    pub permission: Permission,
}
