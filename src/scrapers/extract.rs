//! Heuristics for pulling financial figures out of filing documents.
//!
//! Extraction strategies are plain functions tried in order; the first one
//! that finds anything wins.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::FinancialFigures;

/// A way of reading figures out of a parsed document.
pub type ExtractionStrategy = fn(&Html) -> Option<FinancialFigures>;

/// Strategies in the order they are attempted.
pub const STRATEGIES: &[(&str, ExtractionStrategy)] = &[
    ("structured_tags", extract_tagged_figures),
    ("tabular_text", extract_table_figures),
];

/// XBRL-style concept names for each metric, most specific first.
const TAGGED_CONCEPTS: &[(Metric, &[&str])] = &[
    (Metric::Revenue, &["Revenues", "Revenue", "TotalRevenue", "NetSales"]),
    (Metric::NetIncome, &["NetIncomeLoss", "NetIncome", "NetEarnings"]),
    (Metric::TotalDebt, &["LongTermDebt", "TotalDebt", "Debt"]),
    (
        Metric::CashFlow,
        &["NetCashProvidedByUsedInOperatingActivities", "OperatingCashFlow"],
    ),
    (Metric::Assets, &["Assets", "TotalAssets"]),
    (Metric::Liabilities, &["Liabilities", "TotalLiabilities"]),
    (Metric::Equity, &["StockholdersEquity", "TotalEquity", "Equity"]),
];

static FORMATTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,$\s]").expect("valid formatting regex"));
static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("valid parentheses regex"));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number regex"));

static PERIOD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)period ended\s+(\w+\s+\d{1,2},\s+\d{4})",
        r"(?i)as of\s+(\w+\s+\d{1,2},\s+\d{4})",
        r"(\d{4}-\d{2}-\d{2})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid period regex"))
    .collect()
});

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table tr").expect("valid row selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("valid cell selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Revenue,
    NetIncome,
    TotalDebt,
    CashFlow,
    Assets,
    Liabilities,
    Equity,
}

impl Metric {
    fn set(self, figures: &mut FinancialFigures, value: f64) {
        let slot = match self {
            Metric::Revenue => &mut figures.revenue,
            Metric::NetIncome => &mut figures.net_income,
            Metric::TotalDebt => &mut figures.total_debt,
            Metric::CashFlow => &mut figures.cash_flow,
            Metric::Assets => &mut figures.assets,
            Metric::Liabilities => &mut figures.liabilities,
            Metric::Equity => &mut figures.equity,
        };
        *slot = Some(value);
    }

    /// Map a table row label to a metric.
    fn from_label(label: &str) -> Option<Self> {
        if label.contains("revenue") || label.contains("sales") {
            Some(Metric::Revenue)
        } else if label.contains("net income") || label.contains("net earnings") {
            Some(Metric::NetIncome)
        } else if label.contains("debt") {
            Some(Metric::TotalDebt)
        } else if label.contains("cash flow") {
            Some(Metric::CashFlow)
        } else if label.contains("assets") {
            Some(Metric::Assets)
        } else if label.contains("liabilities") {
            Some(Metric::Liabilities)
        } else if label.contains("equity") {
            Some(Metric::Equity)
        } else {
            None
        }
    }
}

/// Parse the first number in `text`.
///
/// Thousands separators, currency symbols and whitespace are stripped and a
/// parenthesized amount is read as negative.
pub fn extract_numeric_value(text: &str) -> Option<f64> {
    let stripped = FORMATTING.replace_all(text, "");
    let signed = PARENTHESIZED.replace_all(&stripped, "-$1");
    NUMBER
        .find(&signed)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Find the reporting period end date mentioned in `text`.
///
/// Patterns are tried in order; a pattern whose match does not parse as a
/// date is skipped.
pub fn find_period_end_date(text: &str) -> Option<NaiveDate> {
    for pattern in PERIOD_PATTERNS.iter() {
        let Some(found) = pattern.captures(text).and_then(|c| c.get(1)) else {
            continue;
        };
        let candidate = found.as_str().split_whitespace().collect::<Vec<_>>().join(" ");

        if let Ok(date) = NaiveDate::parse_from_str(&candidate, "%B %d, %Y") {
            return Some(date);
        }
        if let Ok(date) = NaiveDate::parse_from_str(&candidate, "%Y-%m-%d") {
            return Some(date);
        }
    }

    None
}

/// Find the reporting period end date in `text`, falling back to `filing_date`.
pub fn extract_period_end_date(text: &str, filing_date: NaiveDate) -> NaiveDate {
    find_period_end_date(text).unwrap_or(filing_date)
}

/// Run every strategy in order and return the first non-empty result.
pub fn extract_financial_figures(document: &Html) -> Option<(&'static str, FinancialFigures)> {
    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(document).map(|figures| (*name, figures)))
}

/// Look for text nodes naming a known concept and read the number in the
/// enclosing element.
pub fn extract_tagged_figures(document: &Html) -> Option<FinancialFigures> {
    let mut figures = FinancialFigures::default();

    for (metric, concepts) in TAGGED_CONCEPTS {
        for concept in concepts.iter() {
            let Ok(pattern) = Regex::new(&format!("(?i){}", regex::escape(concept))) else {
                continue;
            };

            let parent = document
                .root_element()
                .descendants()
                .find(|node| {
                    node.value()
                        .as_text()
                        .is_some_and(|text| pattern.is_match(text))
                })
                .and_then(|node| node.parent())
                .and_then(ElementRef::wrap);

            let value = parent.and_then(|element| {
                let text: String = element.text().collect();
                extract_numeric_value(&text)
            });

            if let Some(value) = value {
                metric.set(&mut figures, value);
                break;
            }
        }
    }

    (!figures.is_empty()).then_some(figures)
}

/// Read two-column label/value rows out of HTML tables.
pub fn extract_table_figures(document: &Html) -> Option<FinancialFigures> {
    let mut figures = FinancialFigures::default();

    for row in document.select(&ROW_SELECTOR) {
        let cells: Vec<ElementRef> = row.select(&CELL_SELECTOR).collect();
        if cells.len() < 2 {
            continue;
        }

        let label = cells[0].text().collect::<String>().trim().to_lowercase();
        let value_text = cells[1].text().collect::<String>();
        let Some(value) = extract_numeric_value(value_text.trim()) else {
            continue;
        };

        if let Some(metric) = Metric::from_label(&label) {
            metric.set(&mut figures, value);
        }
    }

    (!figures.is_empty()).then_some(figures)
}

/// Visible text of a document, for date scanning.
pub fn document_text(document: &Html) -> String {
    document.root_element().text().collect::<Vec<_>>().join(" ")
}
