//! Pure aggregation functions over transaction lists.
//!
//! Everything in this module is stateless and recomputed on demand: totals
//! and savings rates, category breakdowns, calendar-period groupings,
//! period-over-period trends, spending anomaly detection and budget alerts.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::{
    Date, Duration, Month, OffsetDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::models::{Settings, Timestamp, Transaction, TransactionKind};

const DAY_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const MONTH_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]");
const YEAR_FORMAT: &[BorrowedFormatItem] = format_description!("[year]");

/// Summary statistics for a set of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Sum of income amounts.
    pub income: f64,
    /// Sum of expense amounts.
    pub expenses: f64,
    /// Income minus expenses.
    pub net_balance: f64,
    /// Percentage of income retained after expenses.
    pub savings_rate: f64,
}

/// Sum the transaction amounts split by kind and derive the net balance and
/// savings rate.
pub fn summarize(transactions: &[Transaction]) -> Summary {
    let mut summary = Summary::default();

    for transaction in transactions {
        match transaction.kind {
            TransactionKind::Income => summary.income += transaction.amount,
            TransactionKind::Expense => summary.expenses += transaction.amount,
        }
    }

    summary.net_balance = summary.income - summary.expenses;
    summary.savings_rate = savings_rate(summary.income, summary.expenses);

    summary
}

/// The percentage of income retained after expenses, `0` when there is no
/// income (rather than dividing by zero).
pub fn savings_rate(income: f64, expenses: f64) -> f64 {
    if income > 0.0 {
        (income - expenses) / income * 100.0
    } else {
        0.0
    }
}

/// The percentage change from `previous` to `current`.
///
/// By convention the trend is `+100%` when `previous` is zero and `current`
/// is positive, and `0%` when both are zero.
pub fn trend(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 { 100.0 } else { 0.0 }
    } else {
        (current - previous) / previous * 100.0
    }
}

/// The total amount for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category label.
    pub category: String,
    /// The summed amount of the category's transactions.
    pub total: f64,
}

/// Total the amounts of `kind` transactions per category.
///
/// Categories appear in order of their first occurrence in the input; any
/// sorting for display is up to the caller.
pub fn by_category(transactions: &[Transaction], kind: TransactionKind) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for transaction in transactions.iter().filter(|row| row.kind == kind) {
        match positions.get(transaction.category.as_str()) {
            Some(&position) => totals[position].total += transaction.amount,
            None => {
                positions.insert(transaction.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: transaction.category.clone(),
                    total: transaction.amount,
                });
            }
        }
    }

    totals
}

/// A calendar bucket used for grouping and trend windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// One calendar day.
    Day,
    /// A week starting on Sunday (day index 0, not ISO week numbering).
    #[default]
    Week,
    /// One calendar month.
    Month,
    /// One calendar year.
    Year,
}

/// The transactions belonging to one calendar bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodGroup {
    /// The bucket key, e.g. `2024-01-05` for a day or `2024-01` for a month.
    pub key: String,
    /// The bucket's transactions, in input order.
    pub transactions: Vec<Transaction>,
}

/// The bucket key for `instant` at the given granularity.
///
/// Day and week keys are `YYYY-MM-DD` (the week key is the Sunday starting
/// the week), month keys are `YYYY-MM` and year keys are `YYYY`.
pub fn period_key(instant: Timestamp, period: Period) -> String {
    let date = instant.date();

    match period {
        Period::Day => date.format(DAY_FORMAT).unwrap(),
        Period::Week => {
            let days_into_week = date.weekday().number_days_from_sunday();
            let week_start = date - Duration::days(days_into_week as i64);
            week_start.format(DAY_FORMAT).unwrap()
        }
        Period::Month => date.format(MONTH_FORMAT).unwrap(),
        Period::Year => date.format(YEAR_FORMAT).unwrap(),
    }
}

/// Group transactions into calendar buckets.
///
/// Buckets appear in order of their first occurrence in the input and keep
/// their transactions in input order.
pub fn by_period(transactions: &[Transaction], period: Period) -> Vec<PeriodGroup> {
    let mut groups: Vec<PeriodGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for transaction in transactions {
        let key = period_key(transaction.date, period);

        match positions.get(&key) {
            Some(&position) => groups[position].transactions.push(transaction.clone()),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(PeriodGroup {
                    key,
                    transactions: vec![transaction.clone()],
                });
            }
        }
    }

    groups
}

/// The trailing window ending at `now` for the given period: 7 days for a
/// week, one calendar month for a month, one year for a year.
pub fn period_window(period: Period, now: Timestamp) -> (Timestamp, Timestamp) {
    let end = now.as_date_time();
    let start = window_start(period, end);

    (Timestamp::from_date_time(start), now)
}

/// The window immediately before [period_window], used for trend
/// comparisons.
pub fn previous_period_window(period: Period, now: Timestamp) -> (Timestamp, Timestamp) {
    let end = window_start(period, now.as_date_time());
    let start = window_start(period, end);

    (
        Timestamp::from_date_time(start),
        Timestamp::from_date_time(end),
    )
}

fn window_start(period: Period, end: OffsetDateTime) -> OffsetDateTime {
    match period {
        Period::Day => end - Duration::days(1),
        Period::Week => end - Duration::weeks(1),
        Period::Month => months_earlier(end, 1),
        Period::Year => months_earlier(end, 12),
    }
}

/// Shift a date-time back by whole calendar months, clamping the day to the
/// target month's length (e.g. March 31 minus one month is the last day of
/// February).
fn months_earlier(date_time: OffsetDateTime, months: i32) -> OffsetDateTime {
    let date = date_time.date();
    let total_months = date.year() * 12 + (date.month() as i32 - 1) - months;

    let year = total_months.div_euclid(12);
    let month = Month::try_from((total_months.rem_euclid(12) + 1) as u8)
        .expect("month number is always in 1..=12");
    let day = date.day().min(time::util::days_in_year_month(year, month));

    let shifted = Date::from_calendar_date(year, month, day)
        .expect("clamped day is valid for the target month");

    date_time.replace_date(shifted)
}

/// The transactions whose date falls inside the window (inclusive bounds).
pub fn in_window(transactions: &[Transaction], window: &(Timestamp, Timestamp)) -> Vec<Transaction> {
    let (start, end) = window;

    transactions
        .iter()
        .filter(|row| &row.date >= start && &row.date <= end)
        .cloned()
        .collect()
}

/// Income and expense totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyFlow {
    /// The day, as `YYYY-MM-DD`.
    pub date: String,
    /// Sum of the day's income amounts.
    pub income: f64,
    /// Sum of the day's expense amounts.
    pub expenses: f64,
}

/// Total income and expenses per calendar day, in chronological order.
pub fn daily_flow(transactions: &[Transaction]) -> Vec<DailyFlow> {
    let mut days: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for transaction in transactions {
        let entry = days
            .entry(period_key(transaction.date, Period::Day))
            .or_insert((0.0, 0.0));

        match transaction.kind {
            TransactionKind::Income => entry.0 += transaction.amount,
            TransactionKind::Expense => entry.1 += transaction.amount,
        }
    }

    days.into_iter()
        .map(|(date, (income, expenses))| DailyFlow {
            date,
            income,
            expenses,
        })
        .collect()
}

/// Average expense amount per day over the inclusive day span covered by
/// `transactions`, `0` when the list is empty.
pub fn average_daily_spending(transactions: &[Transaction]) -> f64 {
    if transactions.is_empty() {
        return 0.0;
    }

    let total_spending: f64 = transactions
        .iter()
        .filter(|row| row.kind == TransactionKind::Expense)
        .map(|row| row.amount)
        .sum();

    let first_day = transactions.iter().map(|row| row.date.date()).min().unwrap();
    let last_day = transactions.iter().map(|row| row.date.date()).max().unwrap();
    let day_span = (last_day.to_julian_day() - first_day.to_julian_day() + 1) as f64;

    total_spending / day_span
}

/// The day with the highest expense total and that total, `None` when there
/// are no expenses. Ties go to the earlier day.
pub fn max_spending_day(transactions: &[Transaction]) -> Option<(String, f64)> {
    let mut days: BTreeMap<String, f64> = BTreeMap::new();

    for transaction in transactions
        .iter()
        .filter(|row| row.kind == TransactionKind::Expense)
    {
        *days.entry(period_key(transaction.date, Period::Day)).or_insert(0.0) +=
            transaction.amount;
    }

    days.into_iter()
        .fold(None, |best: Option<(String, f64)>, (date, total)| match best {
            Some((_, best_total)) if total > best_total => Some((date, total)),
            Some(best) => Some(best),
            None => Some((date, total)),
        })
}

/// Flag expense transactions in `category` whose amount exceeds
/// `mean + 2 * stddev` of that category's expense amounts.
///
/// Requires at least 3 data points, otherwise returns an empty list.
pub fn detect_anomalies<'a>(
    transactions: &'a [Transaction],
    category: &str,
) -> Vec<&'a Transaction> {
    let category_transactions: Vec<&Transaction> = transactions
        .iter()
        .filter(|row| row.category == category && row.kind == TransactionKind::Expense)
        .collect();

    if category_transactions.len() < 3 {
        return Vec::new();
    }

    let amounts: Vec<f64> = category_transactions.iter().map(|row| row.amount).collect();
    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    let std_dev = (amounts
        .iter()
        .map(|amount| (amount - mean).powi(2))
        .sum::<f64>()
        / amounts.len() as f64)
        .sqrt();
    let threshold = mean + 2.0 * std_dev;

    category_transactions
        .into_iter()
        .filter(|row| row.amount > threshold)
        .collect()
}

/// A budget threshold that the current month's expenses have crossed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAlert {
    /// The category the alert is about, or `None` for the monthly total.
    pub category: Option<String>,
    /// The configured threshold.
    pub threshold: f64,
    /// What was actually spent this month.
    pub spent: f64,
    /// A user-facing description of the alert.
    pub message: String,
}

/// Check the current calendar month's expenses against the budgets in
/// `settings`. A zero or missing budget disables its alert.
pub fn budget_alerts(
    transactions: &[Transaction],
    settings: &Settings,
    now: Timestamp,
) -> Vec<BudgetAlert> {
    let current_month = period_key(now, Period::Month);
    let monthly_expenses: Vec<&Transaction> = transactions
        .iter()
        .filter(|row| {
            row.kind == TransactionKind::Expense
                && period_key(row.date, Period::Month) == current_month
        })
        .collect();

    let mut alerts = Vec::new();

    let total_spent: f64 = monthly_expenses.iter().map(|row| row.amount).sum();
    if settings.monthly_budget > 0.0 && total_spent > settings.monthly_budget {
        alerts.push(BudgetAlert {
            category: None,
            threshold: settings.monthly_budget,
            spent: total_spent,
            message: format!(
                "Monthly expenses have exceeded {} {}",
                settings.monthly_budget, settings.currency
            ),
        });
    }

    for (category, &threshold) in &settings.category_budgets {
        if threshold <= 0.0 {
            continue;
        }

        let spent: f64 = monthly_expenses
            .iter()
            .filter(|row| &row.category == category)
            .map(|row| row.amount)
            .sum();

        if spent > threshold {
            alerts.push(BudgetAlert {
                category: Some(category.clone()),
                threshold,
                spent,
                message: format!(
                    "{category} expenses have exceeded {threshold} {}",
                    settings.currency
                ),
            });
        }
    }

    alerts
}

#[cfg(test)]
mod analytics_tests {
    use crate::models::{Timestamp, Transaction, TransactionDraft, TransactionKind, UserId};

    use super::{
        Period, by_category, by_period, detect_anomalies, period_key, savings_rate, summarize,
        trend,
    };

    pub(super) fn transaction(
        kind: TransactionKind,
        amount: f64,
        category: &str,
        date: &str,
    ) -> Transaction {
        TransactionDraft::new(kind, amount, category, date.parse().unwrap())
            .finalise(&UserId::new("u1"))
            .unwrap()
    }

    #[test]
    fn summarize_splits_totals_by_kind() {
        let transactions = vec![
            transaction(TransactionKind::Income, 100.0, "Salary", "2024-01-05T10:00:00.000Z"),
            transaction(TransactionKind::Expense, 40.0, "Food", "2024-01-06T10:00:00.000Z"),
        ];

        let summary = summarize(&transactions);

        assert_eq!(summary.income, 100.0);
        assert_eq!(summary.expenses, 40.0);
        assert_eq!(summary.net_balance, 60.0);
        assert_eq!(summary.savings_rate, 60.0);
    }

    #[test]
    fn savings_rate_is_zero_without_income() {
        assert_eq!(savings_rate(0.0, 0.0), 0.0);
        assert_eq!(savings_rate(0.0, 50.0), 0.0);
    }

    #[test]
    fn trend_conventions() {
        assert_eq!(trend(50.0, 0.0), 100.0);
        assert_eq!(trend(0.0, 0.0), 0.0);
        assert_eq!(trend(150.0, 100.0), 50.0);
        assert_eq!(trend(50.0, 100.0), -50.0);
    }

    #[test]
    fn by_category_sums_repeated_categories() {
        let transactions = vec![
            transaction(TransactionKind::Expense, 10000.0, "Food", "2024-01-05T10:00:00.000Z"),
            transaction(TransactionKind::Expense, 10000.0, "Food", "2024-01-05T10:00:00.000Z"),
            transaction(TransactionKind::Expense, 10000.0, "Food", "2024-01-05T10:00:00.000Z"),
        ];

        let totals = by_category(&transactions, TransactionKind::Expense);

        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].category, "Food");
        assert_eq!(totals[0].total, 30000.0);
    }

    #[test]
    fn by_category_keeps_first_occurrence_order_and_filters_kind() {
        let transactions = vec![
            transaction(TransactionKind::Expense, 5.0, "Transport", "2024-01-05T10:00:00.000Z"),
            transaction(TransactionKind::Income, 999.0, "Salary", "2024-01-05T10:00:00.000Z"),
            transaction(TransactionKind::Expense, 7.0, "Food", "2024-01-06T10:00:00.000Z"),
            transaction(TransactionKind::Expense, 3.0, "Transport", "2024-01-07T10:00:00.000Z"),
        ];

        let totals = by_category(&transactions, TransactionKind::Expense);

        let categories: Vec<_> = totals.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(categories, ["Transport", "Food"]);
        assert_eq!(totals[0].total, 8.0);
    }

    #[test]
    fn period_keys_match_the_calendar_bucket() {
        // 2024-01-05 was a Friday; the week (Sunday start) began 2023-12-31.
        let instant: Timestamp = "2024-01-05T10:00:00.000Z".parse().unwrap();

        assert_eq!(period_key(instant, Period::Day), "2024-01-05");
        assert_eq!(period_key(instant, Period::Week), "2023-12-31");
        assert_eq!(period_key(instant, Period::Month), "2024-01");
        assert_eq!(period_key(instant, Period::Year), "2024");
    }

    #[test]
    fn sunday_is_its_own_week_start() {
        let sunday: Timestamp = "2024-01-07T00:00:00.000Z".parse().unwrap();

        assert_eq!(period_key(sunday, Period::Week), "2024-01-07");
    }

    #[test]
    fn by_period_groups_in_first_occurrence_order() {
        let transactions = vec![
            transaction(TransactionKind::Expense, 1.0, "Food", "2024-02-10T10:00:00.000Z"),
            transaction(TransactionKind::Expense, 2.0, "Food", "2024-01-05T10:00:00.000Z"),
            transaction(TransactionKind::Expense, 3.0, "Food", "2024-02-20T10:00:00.000Z"),
        ];

        let groups = by_period(&transactions, Period::Month);

        let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, ["2024-02", "2024-01"]);
        assert_eq!(groups[0].transactions.len(), 2);
        assert_eq!(groups[1].transactions.len(), 1);
    }

    #[test]
    fn detect_anomalies_needs_three_data_points() {
        let transactions = vec![
            transaction(TransactionKind::Expense, 10.0, "Food", "2024-01-01T10:00:00.000Z"),
            transaction(TransactionKind::Expense, 1000.0, "Food", "2024-01-02T10:00:00.000Z"),
        ];

        assert!(detect_anomalies(&transactions, "Food").is_empty());
    }

    #[test]
    fn detect_anomalies_flags_extreme_amounts() {
        let mut transactions: Vec<Transaction> = (1..=5)
            .map(|i| {
                transaction(
                    TransactionKind::Expense,
                    10.0,
                    "Food",
                    &format!("2024-01-0{i}T10:00:00.000Z"),
                )
            })
            .collect();
        transactions.push(transaction(
            TransactionKind::Expense,
            100.0,
            "Food",
            "2024-01-06T10:00:00.000Z",
        ));

        let anomalies = detect_anomalies(&transactions, "Food");

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].amount, 100.0);
    }

    #[test]
    fn detect_anomalies_ignores_uniform_spending() {
        let transactions: Vec<Transaction> = (1..=5)
            .map(|i| {
                transaction(
                    TransactionKind::Expense,
                    25.0,
                    "Food",
                    &format!("2024-01-0{i}T10:00:00.000Z"),
                )
            })
            .collect();

        assert!(detect_anomalies(&transactions, "Food").is_empty());
    }

    #[test]
    fn detect_anomalies_only_considers_matching_expense_records() {
        let mut transactions: Vec<Transaction> = (1..=5)
            .map(|i| {
                transaction(
                    TransactionKind::Expense,
                    10.0,
                    "Food",
                    &format!("2024-01-0{i}T10:00:00.000Z"),
                )
            })
            .collect();
        // Big amounts, but not Food expenses.
        transactions.push(transaction(
            TransactionKind::Income,
            5000.0,
            "Food",
            "2024-01-06T10:00:00.000Z",
        ));
        transactions.push(transaction(
            TransactionKind::Expense,
            5000.0,
            "Rent",
            "2024-01-06T10:00:00.000Z",
        ));

        assert!(detect_anomalies(&transactions, "Food").is_empty());
    }
}
