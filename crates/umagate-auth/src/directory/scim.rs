//! SCIM user documents as understood by the provider's directory.

use serde::{Deserialize, Serialize};

use crate::identity::LocalUser;

/// Core SCIM user schema.
pub const CORE_USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// Provider extension schema carrying the shared secret.
pub const USER_EXTENSION_SCHEMA: &str = "urn:ietf:params:scim:schemas:extension:gluu:2.0:User";

/// Employee type written for users created from local accounts.
pub const INTERNAL_EMPLOYEE_TYPE: &str = "INTERNAL";

/// A directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    /// Directory identifier, assigned by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Resource metadata.
    #[serde(default)]
    pub meta: ScimMeta,

    /// Schemas the document conforms to.
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Login name.
    #[serde(default)]
    pub user_name: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Structured name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ScimName>,

    /// Whether the user is active.
    #[serde(default = "default_true")]
    pub active: bool,

    /// Directory password, only sent when it changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Email addresses, primary first.
    #[serde(default)]
    pub emails: Vec<ScimEmail>,

    /// Provider extension.
    #[serde(
        rename = "urn:ietf:params:scim:schemas:extension:gluu:2.0:User",
        default
    )]
    pub extension: ScimUserExtension,
}

fn default_true() -> bool {
    true
}

/// Resource metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScimMeta {
    /// Always `User`.
    pub resource_type: String,

    /// Creation timestamp, set by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    /// Modification timestamp, set by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl Default for ScimMeta {
    fn default() -> Self {
        Self {
            resource_type: "User".to_string(),
            created: None,
            last_modified: None,
        }
    }
}

/// Structured name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
    /// Full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,

    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

/// Email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimEmail {
    /// The address. Empty when the provider omits it.
    #[serde(default)]
    pub value: String,

    /// Display form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    /// Whether this is the primary address.
    #[serde(default)]
    pub primary: bool,

    /// Address type.
    #[serde(rename = "type", default = "default_email_type")]
    pub kind: String,
}

fn default_email_type() -> String {
    "other".to_string()
}

impl ScimEmail {
    /// Creates a primary address of type `other`.
    #[must_use]
    pub fn primary(address: impl Into<String>) -> Self {
        let value = address.into();
        Self {
            display: Some(value.clone()),
            value,
            primary: true,
            kind: default_email_type(),
        }
    }
}

/// Provider extension attributes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUserExtension {
    /// Employee type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_type: Option<String>,

    /// Shared secret, matched against the local password at login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_number: Option<String>,
}

impl Default for ScimUserExtension {
    fn default() -> Self {
        Self {
            employee_type: Some(INTERNAL_EMPLOYEE_TYPE.to_string()),
            employee_number: None,
        }
    }
}

impl std::fmt::Debug for ScimUserExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScimUserExtension")
            .field("employee_type", &self.employee_type)
            .field(
                "employee_number",
                &self.employee_number.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ScimUser {
    /// Builds the document written for a local user.
    ///
    /// `password` is the new directory password, if it changes. The local
    /// user's stored password becomes the shared secret in the extension.
    #[must_use]
    pub fn from_local_user(password: Option<&str>, user: &LocalUser) -> Self {
        let full_name = user.display_name();

        Self {
            id: None,
            meta: ScimMeta::default(),
            schemas: vec![
                USER_EXTENSION_SCHEMA.to_string(),
                CORE_USER_SCHEMA.to_string(),
            ],
            user_name: user.username.clone(),
            display_name: Some(full_name.clone()),
            name: Some(ScimName {
                formatted: Some(full_name),
                given_name: user.first_name.clone(),
                family_name: user.last_name.clone(),
            }),
            active: true,
            password: password.map(str::to_string),
            emails: user.email.iter().map(ScimEmail::primary).collect(),
            extension: ScimUserExtension {
                employee_type: Some(INTERNAL_EMPLOYEE_TYPE.to_string()),
                employee_number: user.password.clone(),
            },
        }
    }

    /// Returns the first listed email address that has a value.
    #[must_use]
    pub fn first_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .map(|e| e.value.as_str())
            .find(|v| !v.is_empty())
    }
}

/// Search response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Number of matches.
    #[serde(default)]
    pub total_results: u64,

    /// Number of matches in this page.
    #[serde(default)]
    pub items_per_page: u64,

    /// 1-based index of the first match in this page.
    #[serde(default)]
    pub start_index: u64,

    /// The matches.
    #[serde(rename = "Resources", default)]
    pub resources: Vec<ScimUser>,
}
