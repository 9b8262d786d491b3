//! Domain models for Spendwise
//!
//! JSON field names are camelCase to match the documents the API has always
//! returned (`currentBalance`, `totalAmountInArray`, `budgetPerCategory`, ...).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A registered user (public profile, never carries the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration request
///
/// Required fields are optional here so that every missing one can be
/// reported at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Profile fields a user may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A global spending category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
}

/// A per-user sub-category hanging off a global category
///
/// `username` and `category_name` are snapshots taken at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: i64,
    pub sub_category_name: String,
    pub user_id: i64,
    pub username: String,
    pub category_id: i64,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One expense line inside a day bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItem {
    pub id: i64,
    #[serde(rename = "category")]
    pub category_id: i64,
    pub category_name: String,
    #[serde(rename = "subCategory")]
    pub sub_category_id: Option<i64>,
    pub sub_category_name: String,
    pub title: String,
    pub quantity: f64,
    pub amount: f64,
    pub currency: Option<String>,
    pub description: Option<String>,
    /// `quantity * amount`
    #[serde(rename = "totalAmountInArray")]
    pub total: f64,
}

/// All expense lines a user recorded for one calendar date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDay {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub date: NaiveDate,
    /// Sum of the line totals
    #[serde(rename = "totalAmountInArray")]
    pub total: f64,
    pub expenses: Vec<ExpenseItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new or edited expense line
///
/// The category is not supplied directly: it is resolved from the user's
/// sub-category named here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpenseItem {
    pub sub_category_name: String,
    #[serde(default)]
    pub title: String,
    pub quantity: f64,
    pub amount: f64,
    pub currency: Option<String>,
    pub description: Option<String>,
}

impl NewExpenseItem {
    /// Total for this line
    pub fn total(&self) -> f64 {
        line_total(self.quantity, self.amount)
    }
}

/// Line total as stored in `totalAmountInArray`
pub fn line_total(quantity: f64, amount: f64) -> f64 {
    quantity * amount
}

/// The portion of a month's budget assigned to one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAllocation {
    pub id: i64,
    pub category_id: i64,
    /// Snapshot of the category name when the allocation was made
    pub category_name: String,
    pub budget_amount: f64,
}

/// A user's budget for one calendar month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    /// First day of the budgeted month
    pub date: NaiveDate,
    pub budget: f64,
    /// `budget` minus the month's expense totals, kept by reconciliation
    pub current_balance: f64,
    pub budget_per_category: Vec<BudgetAllocation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Sum of all category allocations
    pub fn allocated(&self) -> f64 {
        self.budget_per_category
            .iter()
            .map(|a| a.budget_amount)
            .sum()
    }

    /// Unallocated part of the total budget
    pub fn savings(&self) -> f64 {
        self.budget - self.allocated()
    }

    /// Find the allocation for a category by (snapshot) name
    pub fn allocation(&self, category_name: &str) -> Option<&BudgetAllocation> {
        self.budget_per_category
            .iter()
            .find(|a| a.category_name == category_name)
    }
}

/// A budget together with its derived savings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetWithSavings {
    #[serde(flatten)]
    pub budget: Budget,
    pub savings: f64,
}

impl From<Budget> for BudgetWithSavings {
    fn from(budget: Budget) -> Self {
        let savings = budget.savings();
        Self { budget, savings }
    }
}

/// Outcome of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciliation {
    /// The budget's balance was recomputed
    Updated {
        budget_id: i64,
        expenses_total: f64,
        current_balance: f64,
    },
    /// No budget exists for the month
    NoBudget,
}
