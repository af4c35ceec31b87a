use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeSet;
use unic_ucd_category::GeneralCategory;
use validator::{Validate, ValidationError};

#[derive(Serialize, Deserialize, Validate, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Option<u64>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(custom(function = "validate_login"))]
    pub login: String,
    #[serde(
        default,
        serialize_with = "serialize_present",
        deserialize_with = "deserialize_nullable"
    )]
    pub name: String,
    #[validate(custom(function = "validate_birthday"))]
    pub birthday: NaiveDate,
    #[serde(default)]
    pub friends: BTreeSet<u64>,
}

impl User {
    /// Falls back to the login when no display name was given.
    pub fn with_default_name(mut self) -> Self {
        if self.name.trim().is_empty() {
            self.name = self.login.clone();
        }
        self
    }

    /// Overwrites everything except the id and the friend set.
    pub fn overwrite_profile(&mut self, other: &User) {
        self.email = other.email.clone();
        self.login = other.login.clone();
        self.name = other.name.clone();
        self.birthday = other.birthday;
    }
}

#[derive(Serialize, Deserialize, Validate, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    #[serde(default)]
    pub id: Option<u64>,
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(
        default,
        serialize_with = "serialize_present",
        deserialize_with = "deserialize_nullable"
    )]
    #[validate(length(max = 200, message = "description must not exceed 200 characters"))]
    pub description: String,
    #[validate(custom(function = "validate_release_date"))]
    pub release_date: NaiveDate,
    #[validate(range(min = 1, message = "duration must be positive"))]
    pub duration: i64,
    #[serde(default)]
    pub likes: BTreeSet<u64>,
}

impl Film {
    /// Overwrites everything except the id and the like set.
    pub fn overwrite_details(&mut self, other: &Film) {
        self.name = other.name.clone();
        self.description = other.description.clone();
        self.release_date = other.release_date;
        self.duration = other.duration;
    }
}

/// The first public film screening; nothing can be released earlier.
pub fn earliest_release_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1895, 12, 28).unwrap_or(NaiveDate::MIN)
}

pub fn is_login_character(c: char) -> bool {
    let category = GeneralCategory::of(c);
    !(category.is_separator() || category == GeneralCategory::Control)
}

// Written as an option so that stored records and JSON both read back through
// `deserialize_nullable`; JSON output is the bare string.
fn serialize_present<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_some(value)
}

/// Reads an optional string field, treating `null` as empty.
fn deserialize_nullable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_login(login: &str) -> Result<(), ValidationError> {
    if login.is_empty() {
        return Err(invalid("login_empty", "login must not be empty"));
    }
    if !login.chars().all(is_login_character) {
        return Err(invalid("login_whitespace", "login must not contain spaces"));
    }
    Ok(())
}

fn validate_birthday(birthday: &NaiveDate) -> Result<(), ValidationError> {
    if *birthday > chrono::Local::now().date_naive() {
        return Err(invalid("birthday_future", "birthday must not be in the future"));
    }
    Ok(())
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "name must not be blank"));
    }
    Ok(())
}

fn validate_release_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date < earliest_release_date() {
        return Err(invalid(
            "release_date",
            "release date must not be before 1895-12-28",
        ));
    }
    Ok(())
}
