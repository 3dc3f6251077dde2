//! Purpose: `fundpool` CLI entry point and command definitions.
//! Role: Binary crate root; parses args, runs commands, emits results on stdout.
//! Invariants: Commands emit JSON with `--json` (or when stdout is not a TTY) and human text otherwise.
//! Invariants: Errors are emitted on stderr: text on a TTY, JSON otherwise.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All ledger mutations go through `api::LedgerClient` (lock + atomic save).
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod ledger_json;

use fundpool::api::{
    Address, Amount, AuditReport, CustodyBook, Error, ErrorKind, JournalEntry, LedgerClient,
    PoolId, PoolInfo, to_exit_code,
};
use fundpool::ledger_paths::default_ledger_dir;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_env("FUNDPOOL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `fundpool --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let ledger_dir = cli.dir.unwrap_or_else(default_ledger_dir);
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command, ledger_dir, color_mode)
        .map_err(add_missing_ledger_hint)
        .map_err(|err| (err, color_mode))
}

fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let replacement = arg.to_str().and_then(|value| match value {
                "---help" => Some("--help"),
                "---version" => Some("--version"),
                _ => None,
            });
            replacement.map(OsString::from).unwrap_or(arg)
        })
        .collect()
}

#[derive(Parser)]
#[command(
    name = "fundpool",
    version,
    about = "Custodial fund pools with a persistent ledger",
    long_about = None,
    before_help = r#"Funders deposit into numbered pools; finishing a pool pays its balance to the pool owner.

Lifecycle:
  INACTIVE --launch--> ACTIVE --fund*--> ACTIVE --finish--> COMPLETED
"#,
    after_help = r#"EXAMPLES
  $ fundpool init --owner 0x1111111111111111111111111111111111111111
  $ fundpool create --owner 0x2222222222222222222222222222222222222222
  $ fundpool launch 0
  $ fundpool fund 0 --from 0x3333333333333333333333333333333333333333 --amount 0.001ether
  $ fundpool info 0
  $ fundpool finish 0
  $ fundpool total --type active

LEARN MORE
  $ fundpool <command> --help"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        env = "FUNDPOOL_DIR",
        help = "Ledger directory (default: ~/.fundpool)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Create a new ledger directory",
        after_help = r#"EXAMPLES
  $ fundpool init --owner 0x1111111111111111111111111111111111111111
  $ fundpool --dir ./ledger init --owner 0x1111111111111111111111111111111111111111

NOTES
  - Refuses to overwrite an existing ledger."#
    )]
    Init {
        #[arg(long, help = "Ledger owner address (0x + 40 hex digits)")]
        owner: String,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Create an INACTIVE pool",
        after_help = r#"EXAMPLES
  $ fundpool create --owner 0x2222222222222222222222222222222222222222"#
    )]
    Create {
        #[arg(long, help = "Pool owner address; receives the balance on finish")]
        owner: String,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(about = "Launch an INACTIVE pool so it accepts deposits")]
    Launch {
        #[arg(help = "Pool id")]
        pool: PoolId,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Deposit into an ACTIVE pool",
        after_help = r#"EXAMPLES
  $ fundpool fund 0 --from 0x3333333333333333333333333333333333333333 --amount 1000
  $ fundpool fund 0 --from 0x3333333333333333333333333333333333333333 --amount 0.001ether

NOTES
  - Amounts are base units, or a decimal with a wei|gwei|ether suffix.
  - A funder is listed once no matter how many deposits it makes."#
    )]
    Fund {
        #[arg(help = "Pool id")]
        pool: PoolId,
        #[arg(long, help = "Funder address")]
        from: String,
        #[arg(long, help = "Amount (base units or e.g. 0.001ether)")]
        amount: String,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Finish an ACTIVE pool and pay its balance to the owner",
        after_help = r#"NOTES
  - If the payout fails the pool stays ACTIVE and finish can be retried."#
    )]
    Finish {
        #[arg(help = "Pool id")]
        pool: PoolId,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(about = "Change the owner of a pool (allowed in any state)")]
    ChangeOwner {
        #[arg(help = "Pool id")]
        pool: PoolId,
        #[arg(long = "new-owner", help = "New owner address")]
        new_owner: String,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(about = "Show pool state, funders, owner, and balance")]
    Info {
        #[arg(help = "Pool id")]
        pool: PoolId,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(about = "List all pools")]
    List {
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Print a ledger total",
        after_help = r#"EXAMPLES
  $ fundpool total
  $ fundpool total --type active
  $ fundpool total --type 3"#
    )]
    Total {
        #[arg(
            long = "type",
            default_value = "collected",
            help = "collected | active | <pool id>"
        )]
        kind: String,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(about = "Show the custody book: deposits and payouts per address")]
    Accounts {
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(about = "Show the journal of committed operations")]
    History {
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Audit the ledger snapshot",
        after_help = r#"NOTES
  - Exits 7 when the ledger is corrupt."#
    )]
    Doctor {
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Print version info")]
    Version,
}

fn parse_address(input: &str) -> Result<Address, Error> {
    input.parse()
}

fn add_missing_ledger_hint(err: Error) -> Error {
    if err.kind() == ErrorKind::NotFound && err.hint().is_none() {
        return err.with_hint("Create a ledger with `fundpool init --owner <address>`.");
    }
    err
}

fn wants_json(json: bool) -> bool {
    json || !io::stdout().is_terminal()
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn format_amount(amount: Amount) -> String {
    format!("{amount} ({} ether)", amount.format_ether())
}

fn emit_pool_info_human(info: &PoolInfo) {
    let funders = info
        .funders
        .iter()
        .map(Address::to_string)
        .collect::<Vec<_>>()
        .join(",");
    println!("Pool id: {}", info.id);
    println!("Pool state: {}", info.state);
    println!("Pool funders: {}", if funders.is_empty() { "-" } else { &funders });
    println!("Pool owner: {}", info.owner);
    println!("Pool funded amount: {}", format_amount(info.balance));
}

fn emit_pool_list_table(pools: &[PoolInfo], ledger_dir: &Path) {
    if pools.is_empty() {
        println!("No pools in {}", ledger_dir.display());
        println!();
        println!("  Create one: fundpool create --owner <address>");
        return;
    }
    let rows = pools
        .iter()
        .map(|info| {
            vec![
                info.id.to_string(),
                info.state.to_string(),
                info.funders.len().to_string(),
                info.balance.format_ether(),
                info.owner.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    println!(
        "{}",
        render_table(&["ID", "STATE", "FUNDERS", "BALANCE (ETH)", "OWNER"], &rows)
    );
}

fn emit_accounts_table(book: &CustodyBook) {
    let rows = book
        .accounts()
        .map(|(addr, account)| {
            vec![
                addr.to_string(),
                account.deposited.format_ether(),
                account.paid_out.format_ether(),
            ]
        })
        .collect::<Vec<_>>();
    if rows.is_empty() {
        println!("No custody activity yet.");
        return;
    }
    println!(
        "{}",
        render_table(&["ADDRESS", "DEPOSITED (ETH)", "PAID OUT (ETH)"], &rows)
    );
}

fn emit_history_human(entries: &[JournalEntry]) {
    let rows = entries
        .iter()
        .map(|entry| {
            vec![
                entry.seq.to_string(),
                entry.time.clone(),
                entry.op.name().to_string(),
                entry
                    .op
                    .pool()
                    .map(|pool| pool.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect::<Vec<_>>();
    println!("{}", render_table(&["SEQ", "TIME", "OP", "POOL"], &rows));
}

fn emit_doctor_human(report: &AuditReport, color_mode: ColorMode) {
    let use_color = color_mode.use_color(io::stdout().is_terminal());
    match (&report.summary, &report.issue) {
        (Some(summary), _) => {
            println!(
                "{} {} ({} pools, collected {}, active {})",
                colorize_label("ok:", use_color, AnsiColor::Green),
                report.path.display(),
                summary.pool_count,
                format_amount(summary.total_collected),
                format_amount(summary.total_active),
            );
        }
        (None, Some(issue)) => {
            println!(
                "{} {} ({})",
                colorize_label(&format!("{}:", report.status.as_str()), use_color, AnsiColor::Red),
                issue.message,
                report.path.display()
            );
            if let Some(pool) = issue.pool {
                println!("  pool: {pool}");
            }
            for hint in &report.remediation_hints {
                println!("  hint: {hint}");
            }
        }
        (None, None) => println!("{}: {}", report.status.as_str(), report.path.display()),
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, width) in widths.iter_mut().enumerate() {
            let len = row.get(idx).map(|cell| cell.chars().count()).unwrap_or(0);
            *width = (*width).max(len);
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    lines.push(format_table_line(&header_cells, &widths));
    for row in rows {
        lines.push(format_table_line(row, &widths));
    }
    lines.join("\n")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        line.push_str(cell);
        let cell_len = cell.chars().count();
        if *width > cell_len {
            line.push_str(&" ".repeat(*width - cell_len));
        }
    }
    line.trim_end().to_string()
}

fn emit_version_output() {
    emit_json(json!({
        "name": "fundpool",
        "version": env!("CARGO_PKG_VERSION"),
    }));
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
    Green,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
        AnsiColor::Green => "32",
    };
    format!("\x1b[1;{code}m{label}\x1b[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::PoolNotFound => "pool not found".to_string(),
        ErrorKind::AlreadyExists => "already exists".to_string(),
        ErrorKind::Busy => "ledger is busy".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Corrupt => "corrupt ledger".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::InvalidAddress => "invalid address".to_string(),
        ErrorKind::InvalidStateTransition => "invalid state transition".to_string(),
        ErrorKind::PoolNotActive => "pool is not active".to_string(),
        ErrorKind::TransferFailed => "transfer failed".to_string(),
        ErrorKind::AmountOverflow => "amount overflow".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(pool) = err.pool() {
        inner.insert("pool".to_string(), json!(pool));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(pool) = err.pool() {
        lines.push(format!(
            "{} {pool}",
            colorize_label("pool:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
    }
    "invalid arguments".to_string()
}
