//! Event orders, stored in the `orders` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::employee::Role;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Planned,
    Confirmed,
    InProgress,
    Done,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further work is expected on the order.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Planned milestones of an event day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTimes {
    pub meet: DateTime<Utc>,
    pub departure: DateTime<Utc>,
    pub show_start: DateTime<Utc>,
    pub show_end: DateTime<Utc>,
    pub returning_home: DateTime<Utc>,
}

/// Recorded milestones. Filled in as the day progresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualTimes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meet: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returning_home: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub scheduled: ScheduledTimes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<ActualTimes>,
}

/// One employee booked on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    pub rate_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_value: Option<f64>,
    #[serde(default)]
    pub hours_worked: f64,
    #[serde(default)]
    pub total_salary: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attended: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Participants {
    #[serde(default)]
    pub employees: Vec<Assignment>,
}

impl Participants {
    /// Sum of the salaries of all booked employees.
    pub fn total_salaries(&self) -> f64 {
        self.employees.iter().map(|a| a.total_salary).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financials {
    pub total_price: f64,
    /// Denormalised sum of participant salaries.
    pub total_salaries: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expenses: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
}

impl Financials {
    /// `total_price - total_salaries - expenses`, treating missing expenses as zero.
    pub fn computed_profit(&self) -> f64 {
        self.total_price - self.total_salaries - self.expenses.unwrap_or(0.0)
    }
}

/// An event order.
///
/// `date`, `created_at` and `updated_at` are stored as Unix milliseconds so
/// the store orders and range-filters them in time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    pub service_id: String,
    pub client: String,
    pub place_name: String,
    pub place_address: String,
    pub place_coordinates: Coordinates,
    pub timeline: Timeline,
    #[serde(default)]
    pub participants: Participants,
    pub financials: Financials,
    pub status: OrderStatus,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Recompute the denormalised financial fields from the participant list.
    pub fn recompute_financials(&mut self) {
        self.financials.total_salaries = self.participants.total_salaries();
        self.financials.profit = Some(self.financials.computed_profit());
    }
}
