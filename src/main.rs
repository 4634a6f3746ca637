use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use monzo_expenses::auth::{CallbackServer, ManualBrowser};
use monzo_expenses::client::{
    DEFAULT_REDIRECT_URI, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_REDIRECT_URI,
};
use monzo_expenses::models::AccountType;
use monzo_expenses::report::{select_account, ExpenseReport};
use monzo_expenses::{ClientConfig, Credentials, MonzoClient};

const DEVELOPER_PORTAL: &str = "https://developers.monzo.com";

const DATE_FORMAT: &str = "%d/%m/%y";

#[derive(Parser, Debug)]
#[command(name = "monzo-expenses", version)]
#[command(about = "Generate an expense report from a Monzo account")]
struct Cli {
    /// Account to report on: personal, joint or prepaid.
    #[arg(short, long, default_value = "personal", value_parser = parse_account_type)]
    account: AccountType,

    /// Period start date (dd/mm/yy).
    #[arg(short, long, value_parser = parse_date)]
    from: DateTime<Utc>,

    /// Period end date (dd/mm/yy).
    #[arg(short, long, value_parser = parse_date)]
    to: DateTime<Utc>,

    /// File the HTML report is written to.
    #[arg(short, long, default_value = "expenses.html")]
    output: PathBuf,

    /// OAuth client id.
    #[arg(long, env = ENV_CLIENT_ID, hide_env_values = true)]
    client_id: Option<String>,

    /// OAuth client secret.
    #[arg(long, env = ENV_CLIENT_SECRET, hide_env_values = true)]
    client_secret: Option<String>,

    /// Redirect URI registered for the client.
    #[arg(long, env = ENV_REDIRECT_URI, default_value = DEFAULT_REDIRECT_URI)]
    redirect_uri: String,

    /// Token cache location (defaults to the user config directory).
    #[arg(long)]
    token_cache: Option<PathBuf>,

    /// Print the login link instead of opening a browser.
    #[arg(long)]
    no_browser: bool,
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("{raw:?} is not a date in format dd/mm/yy"))
}

fn parse_account_type(raw: &str) -> Result<AccountType, String> {
    raw.parse().map_err(|e: monzo_expenses::Error| e.to_string())
}

fn print_first_time_setup(redirect_uri: &str) {
    println!(
        r#"
    Welcome to Monzo Expenses!

    FIRST TIME SETUP
    ----------------

    Register a 'New Client' at
    {DEVELOPER_PORTAL}

    You'll need the following details:

    Name:               Monzo Expenses
    Logo URL:
    Redirect URLs:      {redirect_uri}
    Description:        Expense Reporting
    Confidentiality:    Confidential

    Then set the following environment variables:
        {ENV_CLIENT_ID}
        {ENV_CLIENT_SECRET}
        {ENV_REDIRECT_URI} (only if not using {DEFAULT_REDIRECT_URI})
"#
    );
}

/// Attach what the user can do about a failed API call.
fn api_context(err: monzo_expenses::Error, what: &str) -> anyhow::Error {
    if err.is_server_error() {
        anyhow::Error::new(err).context(format!("{what}: Monzo is unavailable, try again later"))
    } else {
        anyhow::Error::new(err).context(what.to_string())
    }
}

async fn sign_in(
    client: &MonzoClient,
    credentials: &Credentials,
    no_browser: bool,
) -> anyhow::Result<()> {
    if client.restore_session().await? {
        return Ok(());
    }

    if no_browser {
        let listener = CallbackServer::for_redirect(credentials).await?;
        client.authenticate_with(listener, &ManualBrowser).await?;
    } else {
        client.authenticate().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (Some(client_id), Some(client_secret)) = (cli.client_id.clone(), cli.client_secret.clone()) else {
        print_first_time_setup(&cli.redirect_uri);
        bail!("{} and {} must be set", ENV_CLIENT_ID, ENV_CLIENT_SECRET);
    };

    if cli.from >= cli.to {
        bail!("the start date must be before the end date");
    }

    let credentials = Credentials::new(client_id, client_secret, &cli.redirect_uri)?;
    let mut config = ClientConfig::default();
    if let Some(path) = &cli.token_cache {
        config = config.with_token_cache(path);
    }
    let client = MonzoClient::new(credentials.clone(), config)?;

    sign_in(&client, &credentials, cli.no_browser).await?;

    println!("Generating expense report...");

    let accounts = client
        .with_reauthentication(|client| async move { client.accounts().list().await })
        .await
        .map_err(|e| api_context(e, "could not list accounts"))?;

    let Some(account) = select_account(&accounts, cli.account) else {
        bail!("no {} account found", cli.account);
    };
    tracing::info!(account = %account.identifier, "Selected account");

    let transactions = client
        .transactions()
        .list(&account.identifier)
        .await
        .map_err(|e| api_context(e, "could not fetch transactions"))?;

    let report = ExpenseReport::build(
        account,
        &transactions,
        cli.from,
        cli.to,
        Utc::now().date_naive(),
    );

    let mut file = std::fs::File::create(&cli.output)
        .with_context(|| format!("could not create {}", cli.output.display()))?;
    report.write_html(&mut file)?;

    println!(
        "{} expenses totalling {} saved to {}",
        report.expenses.len(),
        report.total,
        cli.output.display()
    );
    Ok(())
}
