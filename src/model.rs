//! Entity types for the back-office data set, plus the denormalized
//! transaction projection returned by the transaction endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub price: f64,
}

/// A sales transaction referencing exactly one Item and one Customer by id.
/// Wire format uses camelCase field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub item_id: i64,
    pub customer_id: i64,
    pub date: DateTime<Utc>,
    pub qty: i64,
    pub total_price: f64,
    pub discount: f64,
    pub price_after_discount: f64,
}

/// Login catalog row. Never serialized to HTTP responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
}

/// Read-only projection of a Transaction joined with the names of its
/// referenced item and customer. Constructed per response, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTransaction {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub customer_id: i64,
    pub customer_name: String,
    pub date: DateTime<Utc>,
    pub qty: i64,
    pub total_price: f64,
    pub discount: f64,
    pub price_after_discount: f64,
}

impl Entity for Customer {
    const TABLE: &'static str = "customers";
    fn id(&self) -> i64 { self.id }
    fn set_id(&mut self, id: i64) { self.id = id; }
}

impl Entity for Item {
    const TABLE: &'static str = "items";
    fn id(&self) -> i64 { self.id }
    fn set_id(&mut self, id: i64) { self.id = id; }
}

impl Entity for Transaction {
    const TABLE: &'static str = "transactions";
    fn id(&self) -> i64 { self.id }
    fn set_id(&mut self, id: i64) { self.id = id; }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    fn id(&self) -> i64 { self.id }
    fn set_id(&mut self, id: i64) { self.id = id; }
}
