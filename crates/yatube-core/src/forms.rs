//! Post form validation.
//!
//! A submitted form carries raw `text` and an optional group slug. Validation
//! trims the text, requires it to be non-empty and resolves the slug against
//! the group store. Errors are collected per field so the form can be shown
//! again with every problem at once.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::domain::{Group, Post};
use crate::error::RepoError;
use crate::ports::GroupRepository;

pub const FIELD_TEXT: &str = "text";
pub const FIELD_GROUP: &str = "group";
pub const FIELD_REVISION: &str = "revision";

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const MSG_INVALID_NUMBER: &str = "Enter a whole number.";

/// Raw post form as submitted by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    /// Group slug; blank means "no group".
    #[serde(default)]
    pub group: Option<String>,
    /// Revision the client last saw, as submitted. Only meaningful when
    /// editing; blank means "overwrite whatever is stored".
    #[serde(default, deserialize_with = "revision_as_text")]
    pub revision: Option<String>,
}

/// Url-encoded forms send the revision as text, JSON bodies as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRevision {
    Number(i64),
    Text(String),
}

fn revision_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<RawRevision>::deserialize(deserializer)?.map(|raw| match raw {
            RawRevision::Number(number) => number.to_string(),
            RawRevision::Text(text) => text,
        }),
    )
}

/// Validated form contents, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group: Option<Group>,
    pub revision: Option<i32>,
}

impl PostDraft {
    pub fn group_id(&self) -> Option<uuid::Uuid> {
        self.group.as_ref().map(|group| group.id)
    }
}

/// Field name → messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Form has invalid fields")]
    Invalid(FieldErrors),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl PostForm {
    /// Form pre-filled from an existing post.
    pub fn from_post(post: &Post, group: Option<&Group>) -> Self {
        Self {
            text: post.text.clone(),
            group: group.map(|group| group.slug.clone()),
            revision: Some(post.revision.to_string()),
        }
    }

    /// The group slug, if one was actually chosen.
    pub fn group_slug(&self) -> Option<&str> {
        self.group
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
    }

    pub async fn validate(&self, groups: &dyn GroupRepository) -> Result<PostDraft, FormError> {
        let mut errors = FieldErrors::default();

        let text = self.text.trim();
        if text.is_empty() {
            errors.add(FIELD_TEXT, MSG_REQUIRED);
        }

        let group = match self.group_slug() {
            Some(slug) => {
                let group = groups.find_by_slug(slug).await?;
                if group.is_none() {
                    errors.add(FIELD_GROUP, MSG_INVALID_CHOICE);
                }
                group
            }
            None => None,
        };

        let revision = match self.revision.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i32>() {
                Ok(revision) => Some(revision),
                Err(_) => {
                    errors.add(FIELD_REVISION, MSG_INVALID_NUMBER);
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(FormError::Invalid(errors));
        }

        Ok(PostDraft {
            text: text.to_string(),
            group,
            revision,
        })
    }
}
