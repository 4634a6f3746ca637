//! Expense report built from an account's transaction history.
//!
//! The report keeps the transactions tagged with the `expenses` category that
//! fall inside a period, and renders them as a standalone HTML document.
//!
//! # Example
//!
//! ```no_run
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use monzo_expenses::models::AccountType;
//! use monzo_expenses::report::{select_account, ExpenseReport};
//!
//! # async fn example(client: monzo_expenses::MonzoClient) -> anyhow::Result<()> {
//! let accounts = client.accounts().list().await?;
//! let account = select_account(&accounts, AccountType::Personal)
//!     .ok_or_else(|| anyhow::anyhow!("no personal account"))?;
//! let transactions = client.transactions().list(&account.identifier).await?;
//!
//! let start = Utc.with_ymd_and_hms(2019, 3, 1, 0, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2019, 4, 1, 0, 0, 0).unwrap();
//! let today = Utc::now().date_naive();
//! let report = ExpenseReport::build(account, &transactions, start, end, today);
//! std::fs::write("expenses.html", report.render_html())?;
//! # Ok(())
//! # }
//! ```

use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{Account, AccountType, Transaction};
use crate::Result;

/// Category the report collects.
pub const EXPENSES_CATEGORY: &str = "expenses";

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Pick the account of `account_type` to report on.
///
/// Open accounts are preferred; a closed account of the type is used only when
/// there is no open one.
pub fn select_account(accounts: &[Account], account_type: AccountType) -> Option<&Account> {
    let of_type = || accounts.iter().filter(move |a| a.account_type == account_type);
    of_type().find(|a| !a.is_closed).or_else(|| of_type().next())
}

/// Keep expenses created strictly between `start` and `end`, in input order.
pub fn select_expenses<'a>(
    transactions: &'a [Transaction],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<&'a Transaction> {
    transactions
        .iter()
        .filter(|txn| txn.category == EXPENSES_CATEGORY)
        .filter(|txn| start < txn.created && txn.created < end)
        .collect()
}

/// Format an amount in pence as pounds, ignoring the sign.
///
/// ```
/// use monzo_expenses::report::format_money;
///
/// assert_eq!(format_money(-1250), "£12.50");
/// assert_eq!(format_money(5), "£0.05");
/// ```
pub fn format_money(minor_units: i64) -> String {
    let abs = minor_units.unsigned_abs();
    format!("£{}.{:02}", abs / 100, abs % 100)
}

/// Insert dashes into a six-digit sort code.
///
/// Anything other than six ASCII digits comes back unchanged.
pub fn format_sort_code(code: &str) -> String {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &code[..2], &code[2..4], &code[4..])
    } else {
        code.to_string()
    }
}

/// A single line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseLine {
    /// Transaction date, `dd/mm/YYYY`
    pub date: String,
    /// Transaction description
    pub description: String,
    /// Formatted amount
    pub amount: String,
}

/// Expense report for one account and period.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseReport {
    /// First owner's preferred name
    pub account_holder: String,
    /// Sort code with dashes
    pub sort_code: String,
    /// Account number
    pub account_number: String,
    /// Period start, `dd/mm/YYYY`
    pub start_date: String,
    /// Period end, `dd/mm/YYYY`
    pub end_date: String,
    /// Date the report was generated, `dd/mm/YYYY`
    pub generated: String,
    /// Expense lines in transaction order
    pub expenses: Vec<ExpenseLine>,
    /// Formatted absolute total
    pub total: String,
}

impl ExpenseReport {
    /// Build the report for `account` from its transactions.
    pub fn build(
        account: &Account,
        transactions: &[Transaction],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        generated: NaiveDate,
    ) -> Self {
        let selected = select_expenses(transactions, start, end);
        let total: i64 = selected.iter().map(|txn| txn.amount).sum();

        tracing::debug!(
            account = %account.identifier,
            considered = transactions.len(),
            kept = selected.len(),
            "Selected expenses"
        );

        Self {
            account_holder: account
                .primary_owner()
                .map(|owner| owner.preferred_name.clone())
                .unwrap_or_default(),
            sort_code: account
                .sort_code
                .as_deref()
                .map(format_sort_code)
                .unwrap_or_default(),
            account_number: account.account_number.clone().unwrap_or_default(),
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: end.format(DATE_FORMAT).to_string(),
            generated: generated.format(DATE_FORMAT).to_string(),
            expenses: selected
                .iter()
                .map(|txn| ExpenseLine {
                    date: txn.created.format(DATE_FORMAT).to_string(),
                    description: txn.description.clone(),
                    amount: format_money(txn.amount),
                })
                .collect(),
            total: format_money(total),
        }
    }

    /// Render the report as a standalone HTML document.
    pub fn render_html(&self) -> String {
        let mut rows = String::new();
        for line in &self.expenses {
            rows.push_str(&format!(
                "      <tr><td>{}</td><td>{}</td><td class=\"amount\">{}</td></tr>\n",
                escape_html(&line.date),
                escape_html(&line.description),
                escape_html(&line.amount)
            ));
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Expense Report</title>
  <style>
    body {{ font-family: sans-serif; margin: 2em; }}
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ border-bottom: 1px solid #ccc; padding: 0.4em; text-align: left; }}
    .amount {{ text-align: right; }}
  </style>
</head>
<body>
  <h1>Expense Report</h1>
  <dl>
    <dt>Account holder</dt><dd>{holder}</dd>
    <dt>Sort code</dt><dd>{sort_code}</dd>
    <dt>Account number</dt><dd>{account_number}</dd>
    <dt>Period</dt><dd>{start} to {end}</dd>
    <dt>Generated</dt><dd>{generated}</dd>
  </dl>
  <table>
    <thead>
      <tr><th>Date</th><th>Description</th><th class="amount">Amount</th></tr>
    </thead>
    <tbody>
{rows}    </tbody>
    <tfoot>
      <tr><th colspan="2">Total</th><th class="amount">{total}</th></tr>
    </tfoot>
  </table>
</body>
</html>
"#,
            holder = escape_html(&self.account_holder),
            sort_code = escape_html(&self.sort_code),
            account_number = escape_html(&self.account_number),
            start = escape_html(&self.start_date),
            end = escape_html(&self.end_date),
            generated = escape_html(&self.generated),
            rows = rows,
            total = escape_html(&self.total),
        )
    }

    /// Write the HTML rendering to `writer`.
    pub fn write_html<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.render_html().as_bytes())?;
        Ok(())
    }
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn account(id: &str, code: &str, closed: bool) -> Account {
        let payload = json!({
            "id": id,
            "description": "user_1",
            "created": "2018-01-01T00:00:00.000Z",
            "closed": closed,
            "type": code,
            "owners": [{
                "user_id": "user_1",
                "preferred_name": "Ada Lovelace",
                "preferred_first_name": "Ada"
            }],
            "account_number": "12345678",
            "sort_code": "040004"
        });
        Account::parse(&payload).unwrap().remove(0)
    }

    fn transaction(id: &str, created: &str, category: &str, amount: i64) -> Transaction {
        let payload = json!({
            "id": id,
            "account_id": "acc_1",
            "description": format!("Purchase {}", id),
            "amount": amount,
            "currency": "GBP",
            "category": category,
            "local_amount": amount,
            "local_currency": "GBP",
            "account_balance": 0,
            "created": created,
            "updated": created
        });
        Transaction::parse(&payload).unwrap().remove(0)
    }

    fn period() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2019, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2019, 4, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0), "£0.00");
        assert_eq!(format_money(-510), "£5.10");
        assert_eq!(format_money(123456), "£1234.56");
        assert_eq!(format_money(-7), "£0.07");
    }

    #[test]
    fn test_format_sort_code() {
        assert_eq!(format_sort_code("123456"), "12-34-56");
        assert_eq!(format_sort_code("12-34-56"), "12-34-56");
        assert_eq!(format_sort_code(""), "");
    }

    #[test]
    fn test_select_account_prefers_open() {
        let accounts = vec![
            account("acc_closed", "uk_retail", true),
            account("acc_joint", "uk_retail_joint", false),
            account("acc_open", "uk_retail", false),
        ];
        let picked = select_account(&accounts, AccountType::Personal).unwrap();
        assert_eq!(picked.identifier.as_str(), "acc_open");

        let joint = select_account(&accounts, AccountType::Joint).unwrap();
        assert_eq!(joint.identifier.as_str(), "acc_joint");

        assert!(select_account(&accounts, AccountType::Prepaid).is_none());
    }

    #[test]
    fn test_select_account_falls_back_to_closed() {
        let accounts = vec![account("acc_closed", "uk_retail", true)];
        let picked = select_account(&accounts, AccountType::Personal).unwrap();
        assert_eq!(picked.identifier.as_str(), "acc_closed");
    }

    #[test]
    fn test_select_expenses_bounds_and_category() {
        let (start, end) = period();
        let transactions = vec![
            transaction("tx_start", "2019-03-01T00:00:00Z", "expenses", -100),
            transaction("tx_in", "2019-03-15T09:00:00.500Z", "expenses", -250),
            transaction("tx_eating", "2019-03-16T09:00:00Z", "eating_out", -999),
            transaction("tx_end", "2019-04-01T00:00:00Z", "expenses", -100),
            transaction("tx_late", "2019-03-31T23:59:59Z", "expenses", -5),
        ];

        let ids: Vec<&str> = select_expenses(&transactions, start, end)
            .iter()
            .map(|txn| txn.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["tx_in", "tx_late"]);
    }

    #[test]
    fn test_build_report() {
        let (start, end) = period();
        let transactions = vec![
            transaction("tx_1", "2019-03-02T10:00:00Z", "expenses", -1250),
            transaction("tx_2", "2019-03-03T10:00:00Z", "expenses", -310),
            transaction("tx_3", "2019-03-04T10:00:00Z", "groceries", -4000),
        ];
        let generated = NaiveDate::from_ymd_opt(2019, 4, 2).unwrap();

        let report = ExpenseReport::build(
            &account("acc_1", "uk_retail", false),
            &transactions,
            start,
            end,
            generated,
        );

        assert_eq!(report.account_holder, "Ada Lovelace");
        assert_eq!(report.sort_code, "04-00-04");
        assert_eq!(report.account_number, "12345678");
        assert_eq!(report.start_date, "01/03/2019");
        assert_eq!(report.end_date, "01/04/2019");
        assert_eq!(report.generated, "02/04/2019");
        assert_eq!(report.total, "£15.60");
        assert_eq!(
            report.expenses[0],
            ExpenseLine {
                date: "02/03/2019".to_string(),
                description: "Purchase tx_1".to_string(),
                amount: "£12.50".to_string(),
            }
        );
        assert_eq!(report.expenses.len(), 2);
    }

    #[test]
    fn test_render_html_escapes_text() {
        let (start, end) = period();
        let mut transactions = vec![transaction("tx_1", "2019-03-02T10:00:00Z", "expenses", -100)];
        transactions[0].description = "<script>Fish & Chips</script>".to_string();

        let report = ExpenseReport::build(
            &account("acc_1", "uk_retail", false),
            &transactions,
            start,
            end,
            NaiveDate::from_ymd_opt(2019, 4, 2).unwrap(),
        );
        let html = report.render_html();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("&lt;script&gt;Fish &amp; Chips&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("£1.00"));
        assert!(html.contains("04-00-04"));

        let mut buffer = Vec::new();
        report.write_html(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), html);
    }

    #[test]
    fn test_empty_report() {
        let (start, end) = period();
        let report = ExpenseReport::build(
            &account("acc_1", "uk_retail", false),
            &[],
            start,
            end,
            NaiveDate::from_ymd_opt(2019, 4, 2).unwrap(),
        );
        assert!(report.expenses.is_empty());
        assert_eq!(report.total, "£0.00");
    }
}
