use crate::error::MonitorError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Represents a positive monetary amount for transactions.
///
/// This is a wrapper around `rust_decimal::Decimal` that rejects zero and
/// negative values at construction time.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, MonitorError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(MonitorError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    /// Builds an amount from minor units (cents). Zero is bumped to one cent.
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents.max(1)), 2))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = MonitorError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    BankTransfer,
    DigitalWallet,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::BankTransfer,
        PaymentMethod::DigitalWallet,
    ];
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
    Pending,
    Retry,
}

impl TransactionStatus {
    pub fn is_success(self) -> bool {
        self == TransactionStatus::Success
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Retry => "retry",
        };
        f.write_str(s)
    }
}

/// A single synthetic payment as produced by the stream generator.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    #[serde(rename = "transaction_id")]
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub amount: Amount,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub issuer: String,
    pub processor: String,
    pub status: TransactionStatus,
    pub error_code: Option<String>,
    pub latency_ms: u64,
    #[serde(default)]
    pub retry_count: u32,
    pub region: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}
