//! Line classification rules.
//!
//! Every rule looks at one line on its own and answers with:
//! - `None` when the line is not the kind of line the rule is about,
//! - `Some(Err(_))` when it is, but its date or amount did not survive parsing,
//! - `Some(Ok(fact))` otherwise.
//!
//! Keyword checks are case-insensitive substring tests, so "credited"
//! counts as "credit" and "withdrawals" as "withdrawal".

use super::amount::normalize_amount;
use super::patterns::{find_date, find_money, parse_date};
use crate::error::LineMiss;
use chrono::NaiveDate;

const AVERAGE_BALANCE_KEYWORDS: &[&str] = &["average ledger balance", "average daily balance"];
const ENDING_BALANCE_KEYWORD: &str = "ending balance";
const DEPOSIT_KEYWORDS: &[&str] = &["deposit", "credit", "from"];
const DEPOSIT_EXCLUSIONS: &[&str] = &["withdrawal", "debit"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineFact {
    AverageBalance(f64),
    EndingBalance { date: NaiveDate, amount: f64 },
    Deposit { date: NaiveDate, amount: f64 },
}

pub type RuleOutcome = Option<Result<LineFact, LineMiss>>;
pub type Rule = fn(&str) -> RuleOutcome;

/// All rules, in the order they are applied to each line.
pub const RULES: &[(&str, Rule)] = &[
    ("average_balance", average_balance),
    ("ending_balance", ending_balance),
    ("deposit", deposit),
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

pub fn average_balance(line: &str) -> RuleOutcome {
    let lower = line.to_lowercase();
    if !contains_any(&lower, AVERAGE_BALANCE_KEYWORDS) {
        return None;
    }
    let money = find_money(line)?;
    Some(
        normalize_amount(money)
            .map(LineFact::AverageBalance)
            .map_err(LineMiss::from),
    )
}

pub fn ending_balance(line: &str) -> RuleOutcome {
    if !line.to_lowercase().contains(ENDING_BALANCE_KEYWORD) {
        return None;
    }
    let date = find_date(line)?;
    let money = find_money(line)?;
    Some(parse_date_and_amount(date.as_str(), money).map(|(date, amount)| {
        LineFact::EndingBalance { date, amount }
    }))
}

pub fn deposit(line: &str) -> RuleOutcome {
    let date = find_date(line)?;
    let money = find_money(line)?;
    let lower = line.to_lowercase();
    if !contains_any(&lower, DEPOSIT_KEYWORDS) || contains_any(&lower, DEPOSIT_EXCLUSIONS) {
        return None;
    }
    Some(
        parse_date_and_amount(date.as_str(), money).and_then(|(date, amount)| {
            if amount > 0.0 {
                Ok(LineFact::Deposit { date, amount })
            } else {
                Err(LineMiss::NotPositive(amount))
            }
        }),
    )
}

fn parse_date_and_amount(date: &str, amount: &str) -> Result<(NaiveDate, f64), LineMiss> {
    Ok((parse_date(date)?, normalize_amount(amount)?))
}
