use crate::acquire::{AcquiredText, TextSource};
use crate::statement::UnderwritingSummary;
use serde_json::{Value, json};
use std::fmt;

/// `1234.5` -> `$1,234.50`, `-250.0` -> `-$250.00`.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

fn source_label(source: TextSource) -> &'static str {
    match source {
        TextSource::TextLayer => "PDF text layer",
        TextSource::Ocr => "OCR",
    }
}

/// Human-readable underwriting summary.
pub struct Report<'a> {
    pub filename: &'a str,
    pub summary: &'a UnderwritingSummary,
    pub acquired: &'a AcquiredText,
    pub include_raw: bool,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        writeln!(f, "Underwriting Summary: {}", self.filename)?;
        writeln!(f, "Text source:          {}", source_label(self.acquired.source))?;
        writeln!(
            f,
            "Company Name:         {}",
            summary.company_name.as_deref().unwrap_or("Not detected")
        )?;
        writeln!(
            f,
            "Monthly Revenue:      {}",
            format_currency(summary.monthly_revenue())
        )?;

        if !summary.deposits.is_empty() {
            writeln!(f, "Deposit Breakdown:")?;
            for (date, amount) in summary.deposits.iter() {
                writeln!(f, "  - {}: {}", date.format("%b %d, %Y"), format_currency(amount))?;
            }
        }

        match summary.average_daily_balance {
            Some(balance) => writeln!(f, "Avg Daily Balance:    {}", format_currency(balance))?,
            None => writeln!(f, "Avg Daily Balance:    Not found")?,
        }
        writeln!(f, "Negative Balance Days: {}", summary.negative_balance_day_count)?;

        if self.include_raw {
            writeln!(f, "\n--- Raw Extracted Text ---")?;
            writeln!(f, "{}", self.acquired.text)?;
            writeln!(f, "--- End ---")?;
        }
        Ok(())
    }
}

/// Same content as [`Report`], as JSON.
pub fn to_json(
    filename: &str,
    summary: &UnderwritingSummary,
    acquired: &AcquiredText,
    include_raw: bool,
) -> Value {
    let mut value = json!({
        "filename": filename,
        "text_source": acquired.source,
        "monthly_revenue": summary.monthly_revenue(),
        "summary": summary,
    });
    if include_raw {
        value["raw_text"] = Value::String(acquired.text.clone());
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementParser;
    use crate::tagger::PatternTagger;

    fn acquired(text: &str) -> AcquiredText {
        AcquiredText {
            text: text.to_string(),
            source: TextSource::TextLayer,
        }
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(7.5), "$7.50");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1200.5), "$1,200.50");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_currency(-250.0), "-$250.00");
        assert_eq!(format_currency(-0.001), "$0.00");
    }

    #[test]
    fn test_render_found_fields() {
        let text = "ACME CORP\n04/02/2024 Deposit $1,000.00\n04/01/2024 credit $200.50\nAverage daily balance $3,000.00\nEnding balance 04/03/2024 -$5.00";
        let summary = StatementParser::new(&PatternTagger, 10).parse(text);
        let out = Report {
            filename: "april.pdf",
            summary: &summary,
            acquired: &acquired(text),
            include_raw: false,
        }
        .to_string();

        assert!(out.contains("Company Name:         ACME CORP"));
        assert!(out.contains("Monthly Revenue:      $1,200.50"));
        let apr1 = out.find("Apr 01, 2024: $200.50").unwrap();
        let apr2 = out.find("Apr 02, 2024: $1,000.00").unwrap();
        assert!(apr1 < apr2, "breakdown sorted by date");
        assert!(out.contains("Avg Daily Balance:    $3,000.00"));
        assert!(out.contains("Negative Balance Days: 1"));
        assert!(!out.contains("Raw Extracted Text"));
    }

    #[test]
    fn test_render_missing_fields() {
        let summary = UnderwritingSummary::default();
        let out = Report {
            filename: "blank.pdf",
            summary: &summary,
            acquired: &acquired(""),
            include_raw: true,
        }
        .to_string();
        assert!(out.contains("Company Name:         Not detected"));
        assert!(out.contains("Monthly Revenue:      $0.00"));
        assert!(!out.contains("Deposit Breakdown"));
        assert!(out.contains("Avg Daily Balance:    Not found"));
        assert!(out.contains("Negative Balance Days: 0"));
        assert!(out.contains("--- Raw Extracted Text ---"));
    }

    #[test]
    fn test_json_shape() {
        let text = "04/01/2024 Deposit $10.00";
        let summary = StatementParser::new(&PatternTagger, 10).parse(text);
        let value = to_json("a.pdf", &summary, &acquired(text), true);

        assert_eq!(value["text_source"], "text_layer");
        assert_eq!(value["monthly_revenue"], 10.0);
        assert_eq!(value["summary"]["deposits"]["2024-04-01"], 10.0);
        assert_eq!(value["summary"]["company_name"], Value::Null);
        assert_eq!(value["raw_text"], text);
    }
}
