//! Canonical record types for the synced collections.
//!
//! One struct per entity (receipts, clients, employees, tasks), each with
//! a dedicated coercion function that turns a raw JSON record into the
//! canonical shape. Coercion is total: the only way a record is rejected
//! is a missing identifier. Free-text fields pass through unmodified;
//! closed-set strings become enums with a documented fallback variant.

use crate::normalize::{coerce_amount, coerce_date, coerce_id};
use crate::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record that can be folded into a [`MergedView`](crate::MergedView).
///
/// `from_raw` is the per-entity normalizer: it returns `None` only when
/// the identifier is missing, and substitutes `now` for any date field it
/// cannot make sense of.
pub trait Entity: Clone + std::fmt::Debug {
    /// Remote collection this entity syncs against.
    const COLLECTION: &'static str;

    /// Coerce one raw record into canonical shape.
    fn from_raw(raw: &Value, now: DateTime<Utc>) -> Option<Self>
    where
        Self: Sized;

    /// Merge key, compared as a string.
    fn id(&self) -> &str;

    /// Timestamp the merged view sorts by (descending).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Monetary quantity carried by the record, if any.
    fn amount(&self) -> i64 {
        0
    }
}

/// How a receipt was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Cheque,
    BankTransfer,
    Easypaisa,
    Jazzcash,
    Online,
}

impl PaymentMethod {
    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("card") => Self::Card,
            Some("cheque") => Self::Cheque,
            Some("bank_transfer") => Self::BankTransfer,
            Some("easypaisa") => Self::Easypaisa,
            Some("jazzcash") => Self::Jazzcash,
            Some("online") => Self::Online,
            _ => Self::Cash,
        }
    }
}

/// Regulatory registry a client is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClientKind {
    #[serde(rename = "IRIS")]
    Iris,
    #[serde(rename = "SECP")]
    Secp,
    #[serde(rename = "PRA")]
    Pra,
    #[default]
    Other,
}

impl ClientKind {
    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("IRIS") => Self::Iris,
            Some("SECP") => Self::Secp,
            Some("PRA") => Self::Pra,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
    Terminated,
}

impl EmployeeStatus {
    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("inactive") => Self::Inactive,
            Some("terminated") => Self::Terminated,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    #[default]
    Employee,
    Manager,
}

impl EmployeeRole {
    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("manager") => Self::Manager,
            _ => Self::Employee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    #[default]
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("medium") => Self::Medium,
            Some("high") => Self::High,
            Some("urgent") => Self::Urgent,
            _ => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("in_progress") => Self::InProgress,
            Some("completed") => Self::Completed,
            _ => Self::Pending,
        }
    }
}

/// A payment receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: RecordId,
    pub client_name: String,
    pub client_cnic: String,
    pub amount: i64,
    pub nature_of_work: String,
    pub payment_method: PaymentMethod,
    pub date: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl Entity for Receipt {
    const COLLECTION: &'static str = "receipts";

    fn from_raw(raw: &Value, now: DateTime<Utc>) -> Option<Self> {
        let id = coerce_id(raw.get("id"))?;
        Some(Self {
            id,
            client_name: text(raw, "clientName"),
            client_cnic: text(raw, "clientCnic"),
            amount: coerce_amount(raw.get("amount")),
            nature_of_work: text(raw, "natureOfWork"),
            payment_method: PaymentMethod::parse(raw.get("paymentMethod")),
            date: coerce_date(raw.get("date"), now),
            created_by: opt_text(raw, "createdBy"),
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.date
    }

    fn amount(&self) -> i64 {
        self.amount
    }
}

/// A client record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: RecordId,
    pub name: String,
    pub cnic: String,
    pub password: String,
    pub kind: ClientKind,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Client {
    const COLLECTION: &'static str = "clients";

    fn from_raw(raw: &Value, now: DateTime<Utc>) -> Option<Self> {
        let id = coerce_id(raw.get("id"))?;
        Some(Self {
            id,
            name: text(raw, "name"),
            cnic: text(raw, "cnic"),
            password: text(raw, "password"),
            kind: ClientKind::parse(raw.get("type")),
            phone: opt_text(raw, "phone"),
            email: opt_text(raw, "email"),
            notes: opt_text(raw, "notes"),
            created_at: coerce_date(raw.get("createdAt"), now),
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// An employee record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: RecordId,
    pub employee_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub salary: i64,
    pub status: EmployeeStatus,
    pub role: EmployeeRole,
    pub join_date: DateTime<Utc>,
}

impl Entity for Employee {
    const COLLECTION: &'static str = "employees";

    fn from_raw(raw: &Value, now: DateTime<Utc>) -> Option<Self> {
        let id = coerce_id(raw.get("id"))?;
        Some(Self {
            id,
            employee_id: text(raw, "employeeId"),
            name: text(raw, "name"),
            email: opt_text(raw, "email"),
            phone: opt_text(raw, "phone"),
            position: opt_text(raw, "position"),
            department: opt_text(raw, "department"),
            salary: coerce_amount(raw.get("salary")),
            status: EmployeeStatus::parse(raw.get("status")),
            role: EmployeeRole::parse(raw.get("role")),
            join_date: coerce_date(
                raw.get("joinDate").or_else(|| raw.get("createdAt")),
                now,
            ),
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.join_date
    }

    fn amount(&self) -> i64 {
        self.salary
    }
}

/// A work item assigned to an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub deadline: DateTime<Utc>,
    pub documents_required: Vec<String>,
}

impl Entity for Task {
    const COLLECTION: &'static str = "tasks";

    fn from_raw(raw: &Value, now: DateTime<Utc>) -> Option<Self> {
        let id = coerce_id(raw.get("id"))?;
        Some(Self {
            id,
            title: text(raw, "title"),
            description: text(raw, "description"),
            assigned_to: text(raw, "assignedTo"),
            priority: TaskPriority::parse(raw.get("priority")),
            status: TaskStatus::parse(raw.get("status")),
            deadline: coerce_date(raw.get("deadline"), now),
            documents_required: text_list(raw, "documentsRequired"),
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.deadline
    }
}

fn text(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_text(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn text_list(raw: &Value, key: &str) -> Vec<String> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
