use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

// ============ Domain Models ============

/// Job category of a professional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Developer,
    Designer,
    Support,
    Tester,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Developer, Role::Designer, Role::Support, Role::Tester];

    /// Upper-case name used on the wire and in the `role` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Developer => "DEVELOPER",
            Role::Designer => "DESIGNER",
            Role::Support => "SUPPORT",
            Role::Tester => "TESTER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Case-insensitive parse of the upper-case role names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// A staff member record, owner of a collection of contacts.
#[derive(Debug, Clone, PartialEq)]
pub struct Professional {
    /// Storage-assigned identifier; `None` until first committed.
    pub id: Option<i64>,
    pub name: String,
    pub role: Role,
    pub birth_date: NaiveDate,
    /// Set once at creation and carried over unchanged by every update.
    pub created_at: DateTime<Utc>,
    /// Owned contacts, in the order they were listed when last written.
    pub contacts: Vec<Contact>,
}

impl Professional {
    pub fn new(
        id: Option<i64>,
        name: impl Into<String>,
        role: Role,
        birth_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            birth_date,
            created_at,
            contacts: Vec::new(),
        }
    }

    pub fn with_contacts(mut self, contacts: Vec<Contact>) -> Self {
        self.contacts = contacts;
        self
    }
}

/// A single way of reaching a professional (phone, email, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Storage-assigned identifier; `None` until first committed.
    pub id: Option<i64>,
    pub name: String,
    pub contact_value: String,
    /// Identifier of the owning professional.
    pub owner_id: i64,
}

impl Contact {
    pub fn new(
        id: Option<i64>,
        name: impl Into<String>,
        contact_value: impl Into<String>,
        owner_id: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            contact_value: contact_value.into(),
            owner_id,
        }
    }
}

// ============ Request Models ============

/// Incoming description of a contact, standalone or nested in a professional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    /// Must be absent on create and present on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Office phone")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "+55 11 99999-0000")]
    pub contact_value: Option<String>,
    /// Owning professional. Ignored for contacts nested in a professional request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
}

/// Incoming description of a professional and its contact list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalInput {
    /// Must be absent on create and present on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Ada Lovelace")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(
        default,
        with = "br_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, example = "20/03/1990")]
    pub birth_date: Option<NaiveDate>,
    /// Full replacement of the professional's contacts; absent means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Vec<ContactInput>>,
}

/// Query parameters for `GET /api/v1/professionals`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProfessionalNameQuery {
    /// Case-insensitive substring of the professional name.
    pub name: Option<String>,
}

/// Query parameters for `GET /api/v1/professionals/role`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProfessionalRoleQuery {
    /// Exact role, e.g. `DEVELOPER`.
    pub role: Option<String>,
}

/// Query parameters for `GET /api/v1/contacts`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ContactSearchQuery {
    /// Case-insensitive substring of the contact name. Takes priority.
    pub name: Option<String>,
    /// Case-insensitive substring of the contact value.
    pub contact_value: Option<String>,
}

// ============ Response Models ============

/// Contact as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub id: Option<i64>,
    pub name: String,
    pub contact_value: String,
    pub owner_id: i64,
}

impl From<Contact> for ContactView {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            contact_value: contact.contact_value,
            owner_id: contact.owner_id,
        }
    }
}

/// Professional with its contacts as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalView {
    pub id: Option<i64>,
    pub name: String,
    pub role: Role,
    #[serde(with = "br_date")]
    #[schema(value_type = String, example = "20/03/1990")]
    pub birth_date: NaiveDate,
    #[serde(with = "br_datetime")]
    #[schema(value_type = String, example = "18/10/2026 14:03:00")]
    pub created_at: DateTime<Utc>,
    pub contacts: Vec<ContactView>,
}

impl From<Professional> for ProfessionalView {
    fn from(professional: Professional) -> Self {
        Self {
            id: professional.id,
            name: professional.name,
            role: professional.role,
            birth_date: professional.birth_date,
            created_at: professional.created_at,
            contacts: professional
                .contacts
                .into_iter()
                .map(ContactView::from)
                .collect(),
        }
    }
}

/// Success confirmation for mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Confirmation {
    pub message: String,
    /// Identifier assigned by a create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Confirmation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

// ============ Wire Date Formats ============

/// Parses a calendar date written `dd/MM/yyyy`, falling back to ISO `yyyy-MM-dd`.
pub fn parse_br_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    let trimmed = date_str.trim();
    NaiveDate::parse_from_str(trimmed, br_date::FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
}

/// `dd/MM/yyyy` serde format for dates.
pub mod br_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d/%m/%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_br_date(&raw).map_err(de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::super::parse_br_date(&raw).map_err(de::Error::custom))
                .transpose()
        }
    }
}

/// `dd/MM/yyyy HH:mm:ss` serde format for UTC timestamps.
pub mod br_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d/%m/%Y %H:%M:%S";

    pub fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&timestamp.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(de::Error::custom)
    }
}
