//! Analytics endpoints: summary statistics and anomaly detection.

use axum::{
    Json,
    extract::{Extension, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    analytics::{
        BudgetAlert, CategoryTotal, DailyFlow, Period, Summary, average_daily_spending,
        budget_alerts, by_category, daily_flow, detect_anomalies, in_window, max_spending_day,
        period_window, previous_period_window, summarize, trend,
    },
    models::{Timestamp, Transaction, TransactionKind, UserId},
    stores::{SettingsStore, TransactionStore, UserStore},
};

/// Query parameters for the summary endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    /// The trailing window to summarize. Defaults to a week.
    #[serde(default)]
    pub period: Period,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpendingDay {
    date: String,
    total: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryResponse {
    success: bool,
    period: Period,
    summary: Summary,
    previous_summary: Summary,
    income_trend: f64,
    expense_trend: f64,
    categories: Vec<CategoryTotal>,
    daily_flow: Vec<DailyFlow>,
    average_daily_spending: f64,
    max_spending_day: Option<SpendingDay>,
    budget_alerts: Vec<BudgetAlert>,
}

/// Handler for the analytics summary: totals, savings rate, trends against
/// the previous window, category breakdown, daily flow and budget alerts.
pub async fn get_summary<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let transactions = state.transaction_store.list_for_user(&user_id)?;
    let settings = state.settings_store.get(&user_id)?;
    let now = Timestamp::now();

    let current = in_window(&transactions, &period_window(params.period, now));
    let previous = in_window(&transactions, &previous_period_window(params.period, now));

    let summary = summarize(&current);
    let previous_summary = summarize(&previous);

    Ok(Json(SummaryResponse {
        success: true,
        period: params.period,
        summary,
        previous_summary,
        income_trend: trend(summary.income, previous_summary.income),
        expense_trend: trend(summary.expenses, previous_summary.expenses),
        categories: by_category(&current, TransactionKind::Expense),
        daily_flow: daily_flow(&current),
        average_daily_spending: average_daily_spending(&current),
        max_spending_day: max_spending_day(&current)
            .map(|(date, total)| SpendingDay { date, total }),
        budget_alerts: budget_alerts(&transactions, &settings, now),
    }))
}

/// Query parameters for the anomaly endpoint.
#[derive(Debug, Deserialize)]
pub struct AnomalyParams {
    /// The category to scan for unusually large expenses.
    pub category: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnomalyResponse {
    success: bool,
    category: String,
    anomalies: Vec<Transaction>,
}

/// Handler for spending anomaly detection within one category.
pub async fn get_anomalies<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<AnomalyParams>,
) -> Result<Json<AnomalyResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let transactions = state.transaction_store.list_for_user(&user_id)?;
    let anomalies = detect_anomalies(&transactions, &params.category)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(AnomalyResponse {
        success: true,
        category: params.category,
        anomalies,
    }))
}
