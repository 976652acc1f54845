// src/statement/mod.rs

mod amount;
mod patterns;
mod rules;

use crate::tagger::EntityTagger;
use chrono::NaiveDate;
use rules::{LineFact, RULES};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Deposits summed per calendar date, kept in date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DepositLedger(BTreeMap<NaiveDate, f64>);

impl DepositLedger {
    /// Add a positive deposit to the running total for `date`.
    pub fn add(&mut self, date: NaiveDate, amount: f64) {
        debug_assert!(amount > 0.0);
        *self.0.entry(date).or_insert(0.0) += amount;
    }

    #[cfg(test)]
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.0.get(&date).copied()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.0.iter().map(|(d, a)| (*d, *a))
    }
}

/// Everything we pull out of one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnderwritingSummary {
    pub company_name: Option<String>,
    pub deposits: DepositLedger,
    pub average_daily_balance: Option<f64>,
    /// One per negative `ending balance` line, so a repeated date counts twice.
    pub negative_balance_day_count: usize,
    /// Last ending balance seen for each date.
    pub ending_balances: BTreeMap<NaiveDate, f64>,
}

impl UnderwritingSummary {
    /// Sum of every deposit in the ledger.
    pub fn monthly_revenue(&self) -> f64 {
        self.deposits.total()
    }

    /// How many of the headline fields were found.
    pub fn coverage(&self) -> (usize, usize) {
        let filled = [
            self.company_name.is_some(),
            !self.deposits.is_empty(),
            self.average_daily_balance.is_some(),
        ]
        .iter()
        .filter(|&&v| v)
        .count();
        (filled, 3)
    }

    fn apply(&mut self, fact: LineFact) {
        match fact {
            LineFact::AverageBalance(amount) => self.average_daily_balance = Some(amount),
            LineFact::EndingBalance { date, amount } => {
                self.ending_balances.insert(date, amount);
                if amount < 0.0 {
                    self.negative_balance_day_count += 1;
                }
            }
            LineFact::Deposit { date, amount } => self.deposits.add(date, amount),
        }
    }
}

/// Turns extracted statement text into an [`UnderwritingSummary`].
pub struct StatementParser<'a> {
    tagger: &'a dyn EntityTagger,
    header_lines: usize,
}

impl<'a> StatementParser<'a> {
    pub fn new(tagger: &'a dyn EntityTagger, header_lines: usize) -> Self {
        Self {
            tagger,
            header_lines,
        }
    }

    pub fn parse(&self, text: &str) -> UnderwritingSummary {
        let lines: Vec<&str> = text.split('\n').collect();

        let mut summary = UnderwritingSummary {
            company_name: self.company_name(&lines),
            ..Default::default()
        };

        for (idx, &line) in lines.iter().enumerate() {
            for &(rule, apply) in RULES {
                match apply(line) {
                    None => {}
                    Some(Ok(fact)) => summary.apply(fact),
                    Some(Err(miss)) => debug!(line = idx, rule, %miss, "Line skipped"),
                }
            }
        }

        summary
    }

    /// First PERSON or ORG span in the header lines.
    fn company_name(&self, lines: &[&str]) -> Option<String> {
        let header = lines[..lines.len().min(self.header_lines)].join("\n");
        if header.trim().is_empty() {
            return None;
        }

        match self.tagger.tag(&header) {
            Ok(spans) => spans
                .into_iter()
                .filter(|s| !s.text.trim().is_empty())
                .find(|s| s.is_party())
                .map(|s| s.text),
            Err(e) => {
                warn!(error = %e, "Entity tagging failed — company not detected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaggerError;
    use crate::tagger::{EntitySpan, PatternTagger};
    use std::cell::RefCell;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Returns canned spans and remembers what it was asked to tag.
    struct StubTagger {
        spans: Vec<(&'static str, &'static str)>,
        seen: RefCell<Vec<String>>,
    }

    impl StubTagger {
        fn new(spans: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                spans,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl EntityTagger for StubTagger {
        fn tag(&self, text: &str) -> Result<Vec<EntitySpan>, TaggerError> {
            self.seen.borrow_mut().push(text.to_string());
            Ok(self
                .spans
                .iter()
                .map(|(text, label)| EntitySpan {
                    text: text.to_string(),
                    label: label.to_string(),
                })
                .collect())
        }
    }

    struct BrokenTagger;

    impl EntityTagger for BrokenTagger {
        fn tag(&self, _text: &str) -> Result<Vec<EntitySpan>, TaggerError> {
            Err(TaggerError::Failed("model crashed".to_string()))
        }
    }

    const STATEMENT: &str = "\
ACME CORP
Business Checking Statement
Statement Period 04/01/2024 - 04/30/2024

04/01/2024 Deposit from Globex Inc $1,200.50
04/01/2024 Mobile deposit $99.50
04/02/2024 ATM withdrawal deposit adj $40.00
04/03/2024 Card purchase $12.00
04/15/2024 ACH credit PAYROLL $2,000.00
Ending Balance 04/15/2024 -$250.00
Ending Balance 04/15/2024 -$250.00
Ending Balance 04/30/2024 $3,310.00
Average Daily Balance $1,875.25
";

    #[test]
    fn test_parse_full_statement() {
        let parser = StatementParser::new(&PatternTagger, 10);
        let s = parser.parse(STATEMENT);

        assert_eq!(s.company_name.as_deref(), Some("ACME CORP"));
        assert_eq!(s.deposits.len(), 2);
        assert_eq!(s.deposits.get(ymd(2024, 4, 1)), Some(1300.0));
        assert_eq!(s.deposits.get(ymd(2024, 4, 15)), Some(2000.0));
        assert_eq!(s.deposits.get(ymd(2024, 4, 2)), None);
        assert_eq!(s.monthly_revenue(), 3300.0);
        assert_eq!(s.average_daily_balance, Some(1875.25));
        assert_eq!(s.negative_balance_day_count, 2);
        assert_eq!(s.ending_balances.get(&ymd(2024, 4, 15)), Some(&-250.0));
        assert_eq!(s.ending_balances.get(&ymd(2024, 4, 30)), Some(&3310.0));
        assert_eq!(s.coverage(), (3, 3));
    }

    #[test]
    fn test_empty_text() {
        let tagger = StubTagger::new(vec![("Should Not Appear", "ORG")]);
        let s = StatementParser::new(&tagger, 10).parse("");
        assert_eq!(s, UnderwritingSummary::default());
        assert!(tagger.seen.borrow().is_empty());
    }

    #[test]
    fn test_single_deposit_line() {
        let s = StatementParser::new(&PatternTagger, 10)
            .parse("04/01/2024 Deposit from ACME Corp $1,200.50");
        assert_eq!(s.deposits.len(), 1);
        assert_eq!(s.deposits.get(ymd(2024, 4, 1)), Some(1200.50));
    }

    #[test]
    fn test_negative_ending_balance() {
        let s = StatementParser::new(&PatternTagger, 10).parse("Ending Balance 03/15/2024 -$250.00");
        assert_eq!(s.negative_balance_day_count, 1);
        assert_eq!(s.ending_balances.get(&ymd(2024, 3, 15)), Some(&-250.0));
        assert!(s.deposits.is_empty());
    }

    #[test]
    fn test_posting_date_digits_are_not_amounts() {
        let text = "04/01/2024 Deposit from ACME posted 04/02/2024 $1,200.50\nEnding Balance 03/14/2024 as of 03/15/2024 -$250.00";
        let s = StatementParser::new(&PatternTagger, 10).parse(text);
        assert_eq!(s.deposits.len(), 1);
        assert_eq!(s.deposits.get(ymd(2024, 4, 1)), Some(1200.50));
        assert_eq!(s.negative_balance_day_count, 1);
        assert_eq!(s.ending_balances.get(&ymd(2024, 3, 14)), Some(&-250.0));
    }

    #[test]
    fn test_hyphenated_reference_keeps_deposit_positive() {
        let s = StatementParser::new(&PatternTagger, 10)
            .parse("04/01/2024 ACH credit ref 123-456 $50.00");
        assert_eq!(s.deposits.get(ymd(2024, 4, 1)), Some(123.0));
    }

    #[test]
    fn test_ending_balance_overwrites_but_counts_lines() {
        let text = "Ending balance 03/15/2024 -$10.00\nEnding balance 03/15/2024 $25.00\nEnding balance 03/15/2024 ($5.00)";
        let s = StatementParser::new(&PatternTagger, 10).parse(text);
        assert_eq!(s.negative_balance_day_count, 2);
        assert_eq!(s.ending_balances.len(), 1);
        assert_eq!(s.ending_balances.get(&ymd(2024, 3, 15)), Some(&-5.0));
    }

    #[test]
    fn test_last_average_balance_wins() {
        let text = "Average ledger balance $100.00\nnoise\nAverage daily balance $300.00";
        let s = StatementParser::new(&PatternTagger, 10).parse(text);
        assert_eq!(s.average_daily_balance, Some(300.0));
    }

    #[test]
    fn test_company_from_first_party_span() {
        let tagger = StubTagger::new(vec![
            ("April 2024", "DATE"),
            ("Jane Doe", "PERSON"),
            ("Initech", "ORG"),
        ]);
        let s = StatementParser::new(&tagger, 10).parse("Jane Doe\nInitech");
        assert_eq!(s.company_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_no_party_span_leaves_company_unset() {
        let tagger = StubTagger::new(vec![("Ohio", "GPE"), ("", "ORG")]);
        let s = StatementParser::new(&tagger, 10).parse("Columbus, Ohio");
        assert_eq!(s.company_name, None);
    }

    #[test]
    fn test_header_is_first_lines_only() {
        let tagger = StubTagger::new(vec![]);
        let text = (1..=15)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        StatementParser::new(&tagger, 10).parse(&text);

        let seen = tagger.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].lines().count(), 10);
        assert!(seen[0].ends_with("line 10"));
    }

    #[test]
    fn test_company_beyond_header_is_ignored() {
        let text = format!("{}Globex Corp", "statement\n".repeat(10));
        let s = StatementParser::new(&PatternTagger, 10).parse(&text);
        assert_eq!(s.company_name, None);
    }

    #[test]
    fn test_tagger_failure_degrades() {
        let s = StatementParser::new(&BrokenTagger, 10)
            .parse("ACME CORP\n04/01/2024 Deposit $10.00");
        assert_eq!(s.company_name, None);
        assert_eq!(s.deposits.get(ymd(2024, 4, 1)), Some(10.0));
    }

    #[test]
    fn test_deposit_totals_ignore_line_order() {
        let lines = [
            "04/01/2024 Deposit $10.25",
            "04/02/2024 Deposit $5.00",
            "04/01/2024 credit $4.75",
            "04/02/2024 Transfer from savings $1.00",
        ];
        let forward = StatementParser::new(&PatternTagger, 10).parse(&lines.join("\n"));
        let mut reversed = lines;
        reversed.reverse();
        let backward = StatementParser::new(&PatternTagger, 10).parse(&reversed.join("\n"));

        assert_eq!(forward.deposits, backward.deposits);
        assert_eq!(forward.deposits.get(ymd(2024, 4, 1)), Some(15.0));
        assert_eq!(forward.deposits.get(ymd(2024, 4, 2)), Some(6.0));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let parser = StatementParser::new(&PatternTagger, 10);
        assert_eq!(parser.parse(STATEMENT), parser.parse(STATEMENT));
    }

    #[test]
    fn test_unparseable_dates_are_skipped() {
        let text = "4/1/24 Deposit $50.00\n13/40/2024 Deposit $60.00\nEnding balance 3/15/24 -$1.00";
        let s = StatementParser::new(&PatternTagger, 10).parse(text);
        assert!(s.deposits.is_empty());
        assert_eq!(s.negative_balance_day_count, 0);
        assert!(s.ending_balances.is_empty());
    }
}
