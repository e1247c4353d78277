use std::fmt;
use std::str::FromStr;

use bson::Document;
use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

/// Opaque, database-generated record identifier. Rendered as 24 hex characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordId(ObjectId);

impl RecordId {
    pub fn generate() -> Self {
        RecordId(ObjectId::new())
    }

    pub fn as_object_id(&self) -> ObjectId {
        self.0
    }
}

impl From<ObjectId> for RecordId {
    fn from(oid: ObjectId) -> Self {
        RecordId(oid)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid record id '{0}': expected 24 hex characters")]
pub struct InvalidRecordId(pub String);

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidRecordId(s.to_string()));
        }
        ObjectId::parse_str(s)
            .map(RecordId)
            .map_err(|_| InvalidRecordId(s.to_string()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Employee as persisted in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub employee_id: String,
    pub name: String,
    pub department: String,
    pub salary: f64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub joining_date: DateTime<Utc>,
    pub skills: Vec<String>,
}

/// Employee as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "_id": "64f8b7b7e1f4b3b2c2c2c2c2",
        "employee_id": "E123",
        "name": "John Doe",
        "department": "Engineering",
        "salary": 75000.0,
        "joining_date": "2023-01-15T00:00:00Z",
        "skills": ["Python", "MongoDB"]
    })
)]
pub struct Employee {
    #[serde(rename = "_id")]
    #[schema(example = "64f8b7b7e1f4b3b2c2c2c2c2", value_type = String)]
    pub id: RecordId,

    #[schema(example = "E123")]
    pub employee_id: String,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "Engineering")]
    pub department: String,

    #[schema(example = 75000.0)]
    pub salary: f64,

    #[schema(example = "2023-01-15T00:00:00Z", value_type = String, format = DateTime)]
    pub joining_date: DateTime<Utc>,

    #[schema(example = json!(["Python", "MongoDB"]))]
    pub skills: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("stored employee '{0}' has no _id")]
pub struct MissingRecordId(pub String);

impl TryFrom<EmployeeDocument> for Employee {
    type Error = MissingRecordId;

    fn try_from(doc: EmployeeDocument) -> Result<Self, Self::Error> {
        let id = doc.id.ok_or_else(|| MissingRecordId(doc.employee_id.clone()))?;
        Ok(Employee {
            id: RecordId::from(id),
            employee_id: doc.employee_id,
            name: doc.name,
            department: doc.department,
            salary: doc.salary,
            joining_date: doc.joining_date,
            skills: doc.skills,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AverageSalaryByDepartment {
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(example = 82500.5)]
    pub avg_salary: f64,
}

/// Validated set of field changes for a partial update. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeChanges {
    pub name: Option<String>,
    pub department: Option<String>,
    pub salary: Option<f64>,
    pub joining_date: Option<DateTime<Utc>>,
    pub skills: Option<Vec<String>>,
}

impl EmployeeChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.department.is_none()
            && self.salary.is_none()
            && self.joining_date.is_none()
            && self.skills.is_none()
    }

    /// Body of a `$set` update.
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(name) = &self.name {
            set.insert("name", name.as_str());
        }
        if let Some(department) = &self.department {
            set.insert("department", department.as_str());
        }
        if let Some(salary) = self.salary {
            set.insert("salary", salary);
        }
        if let Some(joining_date) = self.joining_date {
            set.insert("joining_date", bson::DateTime::from_chrono(joining_date));
        }
        if let Some(skills) = &self.skills {
            set.insert("skills", skills.clone());
        }
        set
    }

    pub fn apply_to(&self, doc: &mut EmployeeDocument) {
        if let Some(name) = &self.name {
            doc.name = name.clone();
        }
        if let Some(department) = &self.department {
            doc.department = department.clone();
        }
        if let Some(salary) = self.salary {
            doc.salary = salary;
        }
        if let Some(joining_date) = self.joining_date {
            doc.joining_date = joining_date;
        }
        if let Some(skills) = &self.skills {
            doc.skills = skills.clone();
        }
    }
}

/// Widens a calendar date to a timestamp at midnight UTC.
pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    NaiveDateTime::new(date, NaiveTime::MIN).and_utc()
}

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp or a naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// timestamp and keeps only the calendar date.
pub fn parse_joining_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

/// Calendar date as received in `joining_date` request fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoiningDate(pub NaiveDate);

impl JoiningDate {
    pub fn at_midnight(self) -> DateTime<Utc> {
        midnight_utc(self.0)
    }
}

impl<'de> Deserialize<'de> for JoiningDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_joining_date(&raw).map(JoiningDate).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid joining_date '{}': expected YYYY-MM-DD or an ISO-8601 timestamp",
                raw
            ))
        })
    }
}

/// Rounds to 2 decimal places, half away from zero.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
