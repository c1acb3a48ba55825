//! CLI binary: runs the splitbook server and browses or edits a store.
//!
//! Record commands work against a local data directory by default, or
//! against a running server when `--server` is given.

use std::io::{self, Write as _};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde_json::Value;
use splitbook::client::SplitbookBlockingClient;
use splitbook::error::SplitbookError;
use splitbook::models::{
    Expense, ExpenseId, NewExpense, NewTopUp, NewTransfer, TopUp, Transaction, User, UserId,
};
use splitbook::server::{Backend, DEFAULT_ADDR, DEFAULT_ALLOWED_ORIGIN, ServerConfig};
use splitbook::sort::ExpenseSort;
use splitbook::storage::{BlockingStorage, FileStorage};
use splitbook::validation::{ExpenseInput, TopUpInput, TransferInput};

/// Default SQLite database URL for `serve --backend sqlite`.
const DEFAULT_SQLITE_URL: &str = "sqlite:splitbook.db";

/// Splitbook: shared expenses, top-ups and transfers.
#[derive(Debug, Parser)]
#[command(name = "splitbook", version, about)]
struct Cli {
    /// Talk to a running server instead of a local data directory.
    #[arg(long, global = true, env = "SPLITBOOK_SERVER", value_name = "URL")]
    server: Option<String>,
    /// Override the data directory (default: XDG data dir).
    #[arg(long, global = true, env = "SPLITBOOK_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Directory holding `<collection>.init.json` seed files (default: the
    /// data directory).
    #[arg(long, global = true, env = "SPLITBOOK_SEED_DIR", value_name = "DIR")]
    seed_dir: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API server.
    Serve(ServeArgs),
    /// Read or change records.
    #[command(flatten)]
    Records(RecordCommand),
}

/// Subcommands that operate on a store.
#[derive(Debug, Subcommand)]
enum RecordCommand {
    /// List expenses.
    Expenses {
        /// Presentation order.
        #[arg(long, value_enum, default_value_t = ExpenseSort::Unsorted)]
        sort: ExpenseSort,
    },
    /// Show one expense.
    Expense {
        /// Expense ID.
        id: ExpenseId,
    },
    /// Record a new expense.
    AddExpense(AddExpenseArgs),
    /// Delete an expense by ID.
    DeleteExpense {
        /// Expense ID.
        id: ExpenseId,
    },
    /// Replace all expenses with the seed dataset.
    ResetExpenses,
    /// List top-ups.
    Topups,
    /// Record a top-up.
    AddTopup {
        /// User name.
        #[arg(long)]
        user: String,
        /// Amount added.
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },
    /// List users.
    Users,
    /// Replace all users with the seed dataset.
    ResetUsers,
    /// List transactions.
    Transactions,
    /// Record a transfer between two users.
    Transfer(TransferArgs),
    /// Replace all transactions with the seed dataset.
    ResetTransactions,
}

/// Arguments for the `serve` subcommand.
#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "SPLITBOOK_ADDR", default_value_t = DEFAULT_ADDR)]
    addr: SocketAddr,
    /// Storage backend.
    #[arg(long, env = "SPLITBOOK_BACKEND", value_enum, default_value_t = BackendKind::File)]
    backend: BackendKind,
    /// Database URL for the SQLite backend.
    #[arg(long, env = "SPLITBOOK_SQLITE_URL", default_value = DEFAULT_SQLITE_URL)]
    sqlite_url: String,
    /// Origin allowed to call the API from a browser (repeatable).
    #[arg(
        long = "allowed-origin",
        env = "SPLITBOOK_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = DEFAULT_ALLOWED_ORIGIN
    )]
    allowed_origins: Vec<String>,
}

/// Storage backend choice for `serve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// JSON files in the data directory.
    File,
    /// A SQLite database.
    Sqlite,
}

/// Arguments for the `add-expense` subcommand.
#[derive(Debug, Args)]
struct AddExpenseArgs {
    /// Who paid.
    #[arg(long)]
    payer: String,
    /// Amount paid.
    #[arg(long, allow_negative_numbers = true)]
    amount: f64,
    /// What it was for.
    #[arg(long)]
    description: String,
    /// Expense date (default: today).
    #[arg(long)]
    date: Option<String>,
}

/// Arguments for the `transfer` subcommand.
#[derive(Debug, Args)]
struct TransferArgs {
    /// Sending user ID.
    #[arg(long = "from")]
    source: UserId,
    /// Receiving user ID.
    #[arg(long = "to")]
    target: UserId,
    /// Amount transferred.
    #[arg(long)]
    amount: f64,
    /// Transfer date (default: today).
    #[arg(long)]
    date: Option<String>,
}

/// Today's local date as `YYYY-MM-DD`.
fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Validates `add-expense` arguments into a [`NewExpense`].
fn build_expense(args: AddExpenseArgs) -> splitbook::error::Result<NewExpense> {
    let input = ExpenseInput {
        date: Some(args.date.unwrap_or_else(today)),
        description: Some(args.description),
        payer: Some(args.payer),
        amount: Some(Value::from(args.amount)),
    };
    Ok(NewExpense::try_from(input)?)
}

/// Validates `add-topup` arguments into a [`NewTopUp`].
fn build_topup(user: String, amount: f64) -> splitbook::error::Result<NewTopUp> {
    let input = TopUpInput {
        user: Some(user),
        amount: Some(Value::from(amount)),
    };
    Ok(NewTopUp::try_from(input)?)
}

/// Validates `transfer` arguments into a [`NewTransfer`].
fn build_transfer(args: TransferArgs) -> splitbook::error::Result<NewTransfer> {
    let input = TransferInput {
        amount: Some(Value::from(args.amount)),
        date: Some(args.date.unwrap_or_else(today)),
        source_id: Some(args.source),
        target_id: Some(args.target),
    };
    Ok(NewTransfer::try_from(input)?)
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            let config = match server_config(cli.data_dir, cli.seed_dir, args) {
                Ok(config) => config,
                Err(err) => return report("failed to configure server", &err),
            };
            cmd_serve(config)
        }
        Command::Records(command) => {
            if let Some(url) = cli.server {
                let client = match SplitbookBlockingClient::builder().base_url(url).build() {
                    Ok(client) => client,
                    Err(err) => return report("failed to build client", &err),
                };
                dispatch(&client, command)
            } else {
                let storage = match create_storage(cli.data_dir, cli.seed_dir) {
                    Ok(storage) => storage,
                    Err(err) => return report("failed to initialize storage", &err),
                };
                dispatch(&storage, command)
            }
        }
    }
}

/// Creates the file store, using `data_dir` if provided or the default
/// XDG data directory otherwise.
fn create_storage(
    data_dir: Option<PathBuf>,
    seed_dir: Option<PathBuf>,
) -> splitbook::error::Result<FileStorage> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileStorage::default_dir()?,
    };
    let storage = FileStorage::new(dir)?;
    Ok(match seed_dir {
        Some(seeds) => storage.with_seed_dir(seeds),
        None => storage,
    })
}

/// Builds the server configuration from the global and `serve` options.
fn server_config(
    data_dir: Option<PathBuf>,
    seed_dir: Option<PathBuf>,
    args: ServeArgs,
) -> splitbook::error::Result<ServerConfig> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileStorage::default_dir()?,
    };
    let backend = match args.backend {
        BackendKind::File => Backend::File {
            data_dir: dir,
            seed_dir,
        },
        BackendKind::Sqlite => Backend::Sqlite {
            url: args.sqlite_url,
            seed_dir: seed_dir.unwrap_or(dir),
        },
    };
    Ok(ServerConfig::new(backend)
        .with_addr(args.addr)
        .with_allowed_origins(args.allowed_origins))
}

/// Executes the `serve` subcommand on a fresh Tokio runtime.
fn cmd_serve(config: ServerConfig) -> io::Result<ExitCode> {
    let runtime = tokio::runtime::Runtime::new()?;
    match runtime.block_on(splitbook::server::serve(config)) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => report("server failed", &err),
    }
}

/// Dispatches to the appropriate record command handler.
fn dispatch<S: BlockingStorage>(store: &S, command: RecordCommand) -> io::Result<ExitCode> {
    match command {
        RecordCommand::Expenses { sort } => cmd_expenses(store, sort),
        RecordCommand::Expense { id } => cmd_expense(store, id),
        RecordCommand::AddExpense(args) => cmd_add_expense(store, args),
        RecordCommand::DeleteExpense { id } => cmd_delete_expense(store, id),
        RecordCommand::ResetExpenses => cmd_reset_expenses(store),
        RecordCommand::Topups => cmd_topups(store),
        RecordCommand::AddTopup { user, amount } => cmd_add_topup(store, user, amount),
        RecordCommand::Users => cmd_users(store),
        RecordCommand::ResetUsers => cmd_reset_users(store),
        RecordCommand::Transactions => cmd_transactions(store),
        RecordCommand::Transfer(args) => cmd_transfer(store, args),
        RecordCommand::ResetTransactions => cmd_reset_transactions(store),
    }
}

/// Prints `error: <context>: <err>` and returns a failing exit code.
fn report(context: &str, err: &SplitbookError) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Executes the `expenses` subcommand.
fn cmd_expenses<S: BlockingStorage>(store: &S, sort: ExpenseSort) -> io::Result<ExitCode> {
    match store.expenses() {
        Ok(expenses) => {
            print_expenses_table("Expenses", &sort.apply(&expenses))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to read expenses", &err),
    }
}

/// Executes the `expense` subcommand.
fn cmd_expense<S: BlockingStorage>(store: &S, id: ExpenseId) -> io::Result<ExitCode> {
    match store.expense(id) {
        Ok(Some(expense)) => {
            print_expenses_table("Expense", &[expense])?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            writeln!(
                io::stderr().lock(),
                "{} expense not found: {id}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
        Err(err) => report("failed to read expense", &err),
    }
}

/// Executes the `add-expense` subcommand.
fn cmd_add_expense<S: BlockingStorage>(store: &S, args: AddExpenseArgs) -> io::Result<ExitCode> {
    let expense = match build_expense(args) {
        Ok(expense) => expense,
        Err(err) => return report("invalid expense", &err),
    };
    match store.create_expense(expense) {
        Ok(stored) => {
            writeln!(
                io::stdout().lock(),
                "{} expense {}",
                "Created".green().bold(),
                stored.id
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to create expense", &err),
    }
}

/// Executes the `delete-expense` subcommand.
fn cmd_delete_expense<S: BlockingStorage>(store: &S, id: ExpenseId) -> io::Result<ExitCode> {
    match store.delete_expense(id) {
        Ok(true) => {
            writeln!(io::stdout().lock(), "{} expense {id}", "Deleted".green().bold())?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(false) => {
            writeln!(
                io::stderr().lock(),
                "{} no expense with id {id}",
                "warning:".yellow().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
        Err(err) => report("failed to delete expense", &err),
    }
}

/// Executes the `reset-expenses` subcommand.
fn cmd_reset_expenses<S: BlockingStorage>(store: &S) -> io::Result<ExitCode> {
    let spinner = make_spinner("Restoring expenses from seed...");
    let result = store.reset_expenses();
    spinner.finish_and_clear();
    match result {
        Ok(expenses) => {
            print_expenses_table("Expenses reset", &expenses)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("reset failed", &err),
    }
}

/// Executes the `topups` subcommand.
fn cmd_topups<S: BlockingStorage>(store: &S) -> io::Result<ExitCode> {
    match store.topups() {
        Ok(topups) => {
            print_topups_table(&topups)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to read top-ups", &err),
    }
}

/// Executes the `add-topup` subcommand.
fn cmd_add_topup<S: BlockingStorage>(store: &S, user: String, amount: f64) -> io::Result<ExitCode> {
    let topup = match build_topup(user, amount) {
        Ok(topup) => topup,
        Err(err) => return report("invalid top-up", &err),
    };
    match store.create_topup(topup) {
        Ok(stored) => {
            writeln!(
                io::stdout().lock(),
                "{} top-up {} for {}",
                "Created".green().bold(),
                stored.id,
                stored.user
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to create top-up", &err),
    }
}

/// Executes the `users` subcommand.
fn cmd_users<S: BlockingStorage>(store: &S) -> io::Result<ExitCode> {
    match store.users() {
        Ok(users) => {
            print_users_table("Users", &users)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to read users", &err),
    }
}

/// Executes the `reset-users` subcommand.
fn cmd_reset_users<S: BlockingStorage>(store: &S) -> io::Result<ExitCode> {
    let spinner = make_spinner("Restoring users from seed...");
    let result = store.reset_users();
    spinner.finish_and_clear();
    match result {
        Ok(users) => {
            print_users_table("Users reset", &users)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("reset failed", &err),
    }
}

/// Executes the `transactions` subcommand.
fn cmd_transactions<S: BlockingStorage>(store: &S) -> io::Result<ExitCode> {
    match store.transactions() {
        Ok(transactions) => {
            print_transactions_table("Transactions", &transactions)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to read transactions", &err),
    }
}

/// Executes the `transfer` subcommand.
fn cmd_transfer<S: BlockingStorage>(store: &S, args: TransferArgs) -> io::Result<ExitCode> {
    let transfer = match build_transfer(args) {
        Ok(transfer) => transfer,
        Err(err) => return report("invalid transfer", &err),
    };
    match store.create_transfer(transfer) {
        Ok(stored) => {
            writeln!(
                io::stdout().lock(),
                "{} {:.2} from {} to {} {}",
                "Transferred".green().bold(),
                stored.amount,
                stored.source.name,
                stored.target.name,
                format_args!("(transaction {})", stored.id).dimmed()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("transfer failed", &err),
    }
}

/// Executes the `reset-transactions` subcommand.
fn cmd_reset_transactions<S: BlockingStorage>(store: &S) -> io::Result<ExitCode> {
    let spinner = make_spinner("Restoring transactions from seed...");
    let result = store.reset_transactions();
    spinner.finish_and_clear();
    match result {
        Ok(transactions) => {
            print_transactions_table("Transactions reset", &transactions)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("reset failed", &err),
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Builds a table with the shared preset and a cyan header row.
fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(
        headers
            .iter()
            .map(|header| Cell::new(header).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

/// Prints expenses in a table.
fn print_expenses_table(title: &str, expenses: &[Expense]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if expenses.is_empty() {
        writeln!(out, "{}", "No expenses found.".dimmed())?;
        return Ok(());
    }

    let mut table = new_table(&["ID", "Date", "Description", "Payer", "Amount"]);
    for expense in expenses {
        _ = table.add_row(vec![
            Cell::new(expense.id),
            Cell::new(&expense.date),
            Cell::new(&expense.description),
            Cell::new(&expense.payer),
            Cell::new(format!("{:.2}", expense.amount)),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        title.green().bold(),
        format_args!("({})", expenses.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints top-ups in a table.
fn print_topups_table(topups: &[TopUp]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if topups.is_empty() {
        writeln!(out, "{}", "No top-ups found.".dimmed())?;
        return Ok(());
    }

    let mut table = new_table(&["ID", "Date", "User", "Amount"]);
    for topup in topups {
        let amount_cell = if topup.amount.is_legacy_text() {
            Cell::new(&topup.amount).fg(Color::Yellow)
        } else {
            Cell::new(&topup.amount)
        };
        _ = table.add_row(vec![
            Cell::new(topup.id),
            Cell::new(topup.date.format("%Y-%m-%d %H:%M")),
            Cell::new(&topup.user),
            amount_cell,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Top-ups".green().bold(),
        format_args!("({})", topups.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints users in a table.
fn print_users_table(title: &str, users: &[User]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if users.is_empty() {
        writeln!(out, "{}", "No users found.".dimmed())?;
        return Ok(());
    }

    let mut table = new_table(&["ID", "Name", "Email", "Bank account"]);
    for user in users {
        let bank_account = user.bank_account.as_deref().unwrap_or("\u{2014}");
        _ = table.add_row(vec![
            Cell::new(user.id),
            Cell::new(&user.name),
            Cell::new(&user.email),
            Cell::new(bank_account),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        title.green().bold(),
        format_args!("({})", users.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints transactions in a table.
fn print_transactions_table(title: &str, transactions: &[Transaction]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if transactions.is_empty() {
        writeln!(out, "{}", "No transactions found.".dimmed())?;
        return Ok(());
    }

    let mut table = new_table(&["ID", "Date", "Kind", "Description", "Payer", "Participants", "Amount"]);
    for transaction in transactions {
        let participants = transaction
            .participants()
            .iter()
            .map(|participant| participant.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        _ = table.add_row(vec![
            Cell::new(transaction.id()),
            Cell::new(transaction.date()),
            Cell::new(transaction.kind()),
            Cell::new(transaction.description()),
            Cell::new(&transaction.payer().name),
            Cell::new(participants),
            Cell::new(format!("{:.2}", transaction.amount())),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        title.green().bold(),
        format_args!("({})", transactions.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use splitbook::storage::InMemoryStorage;

    /// Creates a test expense.
    fn test_expense(id: i64, payer: &str, amount: f64) -> Expense {
        NewExpense {
            date: "2024-01-01".to_owned(),
            description: "Seeded".to_owned(),
            payer: payer.to_owned(),
            amount,
        }
        .into_expense(ExpenseId::new(id))
    }

    /// Creates a test user.
    fn test_user(id: i64, name: &str) -> User {
        User {
            id: UserId::new(id),
            name: name.to_owned(),
            email: format!("{}@example.com", name.to_lowercase()),
            bank_account: None,
        }
    }

    fn add_args(payer: &str, amount: f64) -> AddExpenseArgs {
        AddExpenseArgs {
            payer: payer.to_owned(),
            amount,
            description: "Lunch".to_owned(),
            date: Some("2024-02-01".to_owned()),
        }
    }

    fn transfer_args(source: i64, target: i64, amount: f64) -> TransferArgs {
        TransferArgs {
            source: UserId::new(source),
            target: UserId::new(target),
            amount,
            date: None,
        }
    }

    // ── argument parsing ─────────────────────────────────────────────

    #[test]
    fn parses_record_command_with_sort() {
        let cli = Cli::try_parse_from(["splitbook", "expenses", "--sort", "amount-desc"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Records(RecordCommand::Expenses {
                sort: ExpenseSort::AmountDesc
            })
        ));
    }

    #[test]
    fn parses_serve_defaults() {
        let cli = Cli::try_parse_from(["splitbook", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.addr, DEFAULT_ADDR);
        assert_eq!(args.backend, BackendKind::File);
        assert_eq!(args.allowed_origins, vec![DEFAULT_ALLOWED_ORIGIN.to_owned()]);
    }

    #[test]
    fn parses_transfer_ids() {
        let cli = Cli::try_parse_from([
            "splitbook", "transfer", "--from", "2", "--to", "1", "--amount", "15",
        ])
        .unwrap();
        let Command::Records(RecordCommand::Transfer(args)) = cli.command else {
            panic!("expected transfer");
        };
        assert_eq!(args.source, UserId::new(2));
        assert_eq!(args.target, UserId::new(1));
    }

    #[test]
    fn rejects_non_numeric_expense_id() {
        assert!(Cli::try_parse_from(["splitbook", "expense", "abc"]).is_err());
    }

    // ── configuration ────────────────────────────────────────────────

    #[test]
    fn create_storage_with_custom_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let seeds = tempfile::tempdir().unwrap();
        let storage = create_storage(
            Some(dir.path().to_path_buf()),
            Some(seeds.path().to_path_buf()),
        )
        .unwrap();
        assert_eq!(storage.dir(), dir.path());
        assert_eq!(storage.seed_dir(), seeds.path());
    }

    #[test]
    fn server_config_sqlite_seeds_default_to_data_dir() {
        let args = ServeArgs {
            addr: DEFAULT_ADDR,
            backend: BackendKind::Sqlite,
            sqlite_url: DEFAULT_SQLITE_URL.to_owned(),
            allowed_origins: vec!["https://example.com".to_owned()],
        };
        let config = server_config(Some(PathBuf::from("/srv/splitbook")), None, args).unwrap();
        assert_eq!(
            config.backend,
            Backend::Sqlite {
                url: DEFAULT_SQLITE_URL.to_owned(),
                seed_dir: PathBuf::from("/srv/splitbook"),
            }
        );
        assert_eq!(config.allowed_origins, vec!["https://example.com".to_owned()]);
    }

    #[test]
    fn server_config_file_backend() {
        let args = ServeArgs {
            addr: "0.0.0.0:8080".parse().unwrap(),
            backend: BackendKind::File,
            sqlite_url: DEFAULT_SQLITE_URL.to_owned(),
            allowed_origins: Vec::new(),
        };
        let config = server_config(
            Some(PathBuf::from("data")),
            Some(PathBuf::from("seed")),
            args,
        )
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(
            config.backend,
            Backend::File {
                data_dir: PathBuf::from("data"),
                seed_dir: Some(PathBuf::from("seed")),
            }
        );
    }

    // ── input validation ─────────────────────────────────────────────

    #[test]
    fn build_expense_rejects_blank_payer() {
        let err = build_expense(add_args("  ", 10.0)).unwrap_err();
        assert!(matches!(err, SplitbookError::Validation(_)));
    }

    #[test]
    fn build_expense_defaults_date_to_today() {
        let mut args = add_args("Alice", 10.0);
        args.date = None;
        let expense = build_expense(args).unwrap();
        assert_eq!(expense.date, today());
    }

    #[test]
    fn build_transfer_rejects_same_party() {
        let err = build_transfer(transfer_args(1, 1, 5.0)).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn build_transfer_rejects_non_positive_amount() {
        assert!(build_transfer(transfer_args(1, 2, 0.0)).is_err());
    }

    // ── cmd_* ────────────────────────────────────────────────────────

    #[test]
    fn make_spinner_creates_spinner() {
        let spinner = make_spinner("Testing...");
        spinner.finish_and_clear();
    }

    #[test]
    fn cmd_expenses_empty_and_sorted() {
        let store = InMemoryStorage::new();
        assert_eq!(cmd_expenses(&store, ExpenseSort::Unsorted).unwrap(), ExitCode::SUCCESS);
        let _first = store.create_expense(build_expense(add_args("Bob", 5.0)).unwrap()).unwrap();
        let _second = store.create_expense(build_expense(add_args("Alice", 9.0)).unwrap()).unwrap();
        assert_eq!(cmd_expenses(&store, ExpenseSort::Payer).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn cmd_add_expense_stores_record() {
        let store = InMemoryStorage::new();
        let code = cmd_add_expense(&store, add_args("Alice", 12.5)).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let stored = store.expenses().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].payer, "Alice");
    }

    #[test]
    fn cmd_add_expense_invalid_stores_nothing() {
        let store = InMemoryStorage::new();
        let code = cmd_add_expense(&store, add_args("", 12.5)).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(store.expenses().unwrap().is_empty());
    }

    #[test]
    fn cmd_expense_found_and_missing() {
        let store = InMemoryStorage::new();
        let stored = store
            .create_expense(build_expense(add_args("Alice", 3.0)).unwrap())
            .unwrap();
        assert_eq!(cmd_expense(&store, stored.id).unwrap(), ExitCode::SUCCESS);
        assert_eq!(cmd_expense(&store, ExpenseId::new(99)).unwrap(), ExitCode::FAILURE);
    }

    #[test]
    fn cmd_delete_expense_reports_absent_id() {
        let store = InMemoryStorage::new();
        let stored = store
            .create_expense(build_expense(add_args("Alice", 3.0)).unwrap())
            .unwrap();
        assert_eq!(cmd_delete_expense(&store, stored.id).unwrap(), ExitCode::SUCCESS);
        assert_eq!(cmd_delete_expense(&store, stored.id).unwrap(), ExitCode::FAILURE);
        assert!(store.expenses().unwrap().is_empty());
    }

    #[test]
    fn cmd_reset_expenses_with_and_without_seed() {
        let unseeded = InMemoryStorage::new();
        assert_eq!(cmd_reset_expenses(&unseeded).unwrap(), ExitCode::FAILURE);

        let seeded = InMemoryStorage::new()
            .with_seed_expenses(vec![test_expense(1, "Alice", 800.0), test_expense(2, "Bob", 24.5)]);
        assert_eq!(cmd_reset_expenses(&seeded).unwrap(), ExitCode::SUCCESS);
        assert_eq!(seeded.expenses().unwrap().len(), 2);
    }

    #[test]
    fn cmd_topups_roundtrip() {
        let store = InMemoryStorage::new();
        assert_eq!(cmd_topups(&store).unwrap(), ExitCode::SUCCESS);
        assert_eq!(
            cmd_add_topup(&store, "Bob".to_owned(), 20.0).unwrap(),
            ExitCode::SUCCESS
        );
        assert_eq!(cmd_topups(&store).unwrap(), ExitCode::SUCCESS);
        assert_eq!(store.topups().unwrap().len(), 1);
    }

    #[test]
    fn cmd_transfer_between_known_users() {
        let store = InMemoryStorage::new().with_users(vec![test_user(1, "Alice"), test_user(2, "Bob")]);
        assert_eq!(cmd_users(&store).unwrap(), ExitCode::SUCCESS);
        assert_eq!(
            cmd_transfer(&store, transfer_args(2, 1, 15.0)).unwrap(),
            ExitCode::SUCCESS
        );
        assert_eq!(
            cmd_transfer(&store, transfer_args(2, 9, 15.0)).unwrap(),
            ExitCode::FAILURE
        );
        assert_eq!(cmd_transactions(&store).unwrap(), ExitCode::SUCCESS);
        assert_eq!(store.transactions().unwrap().len(), 1);
    }

    #[test]
    fn cmd_reset_users_and_transactions() {
        let store = InMemoryStorage::new()
            .with_seed_users(vec![test_user(1, "Alice")])
            .with_seed_transactions(Vec::new());
        assert_eq!(cmd_reset_users(&store).unwrap(), ExitCode::SUCCESS);
        assert_eq!(cmd_reset_transactions(&store).unwrap(), ExitCode::SUCCESS);
        assert_eq!(store.users().unwrap().len(), 1);
    }

    #[test]
    fn cmd_fails_when_store_is_unavailable() {
        let store = InMemoryStorage::new();
        store.set_offline(true).unwrap();
        assert_eq!(cmd_users(&store).unwrap(), ExitCode::FAILURE);
        assert_eq!(cmd_topups(&store).unwrap(), ExitCode::FAILURE);
    }

    // ── dispatch ─────────────────────────────────────────────────────

    #[test]
    fn dispatch_users() {
        let store = InMemoryStorage::new();
        let code = dispatch(&store, RecordCommand::Users).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn dispatch_add_topup() {
        let store = InMemoryStorage::new();
        let code = dispatch(
            &store,
            RecordCommand::AddTopup {
                user: "Alice".to_owned(),
                amount: 7.5,
            },
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }
}
