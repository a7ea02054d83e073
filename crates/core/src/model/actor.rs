use serde::Serialize;
use url::Url;

/// How the learner is identified to the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ActorIdentity {
    /// Identity issued by the LMS.
    Account { home_page: Url, id: String },
    /// Identity entered by the learner on the login form.
    Mailbox { email: String },
}

/// Learner identity, fixed for the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    name: String,
    identity: ActorIdentity,
}

impl Actor {
    #[must_use]
    pub fn account(name: impl Into<String>, home_page: Url, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: ActorIdentity::Account {
                home_page,
                id: id.into(),
            },
        }
    }

    #[must_use]
    pub fn mailbox(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: ActorIdentity::Mailbox {
                email: email.into(),
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn identity(&self) -> &ActorIdentity {
        &self.identity
    }

    /// `mailto:` IRI for mailbox actors.
    #[must_use]
    pub fn mbox(&self) -> Option<String> {
        match &self.identity {
            ActorIdentity::Mailbox { email } => Some(format!("mailto:{email}")),
            ActorIdentity::Account { .. } => None,
        }
    }
}
