//! Balance arithmetic of a wallet, kept apart from storage.
//!
//! Every change of balance is a signed transaction: credits are positive,
//! debits negative. The balance always equals the sum of its transactions
//! and can never drop below zero.

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransactionType {
    In,
    Out,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::In => "in",
            TransactionType::Out => "out",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The outcome of a credit or debit, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub transaction_type: TransactionType,
    /// signed amount added to the balance
    pub amount: f64,
    pub balance: f64,
}

fn positive(amount: f64) -> Result<(), ServiceError> {
    if !amount.is_finite() || amount <= 0.0 {
        bad_request!("the amount must be greater than zero");
    }

    Ok(())
}

pub fn credit(balance: f64, amount: f64) -> Result<Entry, ServiceError> {
    positive(amount)?;

    Ok(Entry {
        transaction_type: TransactionType::In,
        amount,
        balance: balance + amount,
    })
}

pub fn debit(balance: f64, amount: f64) -> Result<Entry, ServiceError> {
    positive(amount)?;

    if amount > balance {
        conflict!("insufficient funds");
    }

    Ok(Entry {
        transaction_type: TransactionType::Out,
        amount: -amount,
        balance: balance - amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_increase_the_balance() {
        let entry = credit(10.0, 5.5).unwrap();

        assert_eq!(entry.transaction_type, TransactionType::In);
        assert_eq!(entry.amount, 5.5);
        assert_eq!(entry.balance, 15.5);
    }

    #[test]
    fn credits_must_be_positive() {
        assert!(credit(10.0, 0.0).is_err());
        assert!(credit(10.0, -3.0).is_err());
        assert!(credit(10.0, f64::NAN).is_err());
        assert!(credit(10.0, f64::INFINITY).is_err());
    }

    #[test]
    fn debits_are_negative_transactions() {
        let entry = debit(10.0, 4.0).unwrap();

        assert_eq!(entry.transaction_type, TransactionType::Out);
        assert_eq!(entry.amount, -4.0);
        assert_eq!(entry.balance, 6.0);
    }

    #[test]
    fn the_whole_balance_can_be_spent() {
        assert_eq!(debit(10.0, 10.0).unwrap().balance, 0.0);
    }

    #[test]
    fn overdrafts_are_rejected() {
        assert_eq!(
            debit(10.0, 10.01).unwrap_err(),
            ServiceError::Conflict(String::from("insufficient funds"))
        );
        assert!(debit(10.0, 0.0).is_err());
    }
}
