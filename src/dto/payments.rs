use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{Card, PaymentDetails},
};

#[derive(Debug, Deserialize, Clone)]
pub struct AddPaymentMethodRequest {
    pub details: PaymentDetails,
    #[serde(default)]
    pub is_default: bool,
}

/// Raw card details as typed into a checkout form.
#[derive(Debug, Deserialize, Clone)]
pub struct CardForm {
    pub card_holder: String,
    pub card_number: String,
    /// `MM/YY` or `MMYY`.
    pub expiry: String,
    pub cvc: String,
}

impl CardForm {
    /// Validate the form and reduce it to the stored card details.
    ///
    /// A card stays valid through the last day of its expiry month.
    pub fn into_details(self, today: NaiveDate) -> AppResult<PaymentDetails> {
        if self.card_holder.trim().is_empty() {
            return Err(AppError::validation("Cardholder name is required."));
        }

        let number: String = self.card_number.chars().filter(|c| !c.is_whitespace()).collect();
        if number.len() != 16 || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::validation("Enter a valid 16-digit card number."));
        }

        let (expiry_month, expiry_year) = parse_expiry(&self.expiry)
            .ok_or_else(|| AppError::validation("Enter a valid date in MM/YY format."))?;
        if (expiry_year, expiry_month) < (today.year(), today.month()) {
            return Err(AppError::validation("Card has expired."));
        }

        if !(3..=4).contains(&self.cvc.len()) || !self.cvc.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::validation("Enter a valid CVC."));
        }

        let card = Card {
            last4: number[12..].to_string(),
            expiry_month,
            expiry_year,
        };
        Ok(if number.starts_with('4') {
            PaymentDetails::Visa(card)
        } else {
            PaymentDetails::Mastercard(card)
        })
    }
}

fn parse_expiry(expiry: &str) -> Option<(u32, i32)> {
    let expiry = expiry.trim();
    let digits = match expiry.split_once('/') {
        Some((month, year)) if month.len() == 2 && year.len() == 2 => format!("{month}{year}"),
        Some(_) => return None,
        None => expiry.to_string(),
    };
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let month: u32 = digits[..2].parse().ok()?;
    let year: i32 = digits[2..].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((month, 2000 + year))
}
