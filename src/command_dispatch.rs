//! Purpose: Hold top-level CLI command dispatch for `fundpool`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every mutating command goes through one `LedgerClient` call.
//! Invariants: Address and amount arguments are parsed here so their errors map to ledger exit codes.

use super::*;
use crate::ledger_json::{
    audit_report_json, custody_json, journal_json, payout_json, pool_info_json, summary_json,
};
use fundpool::api::{Deposit, TotalKind};

pub(super) fn dispatch_command(
    command: Command,
    ledger_dir: PathBuf,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    let client = LedgerClient::new(&ledger_dir);
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "fundpool", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Init { owner, json } => {
            let owner = parse_address(&owner)?;
            let summary = client.init(owner)?;
            if wants_json(json) {
                let mut value = summary_json(&summary);
                if let Value::Object(map) = &mut value {
                    map.insert(
                        "dir".to_string(),
                        json!(client.dir().display().to_string()),
                    );
                }
                emit_json(value);
            } else {
                println!("Initialized ledger in {}", client.dir().display());
                println!("Ledger owner: {}", summary.owner);
            }
            Ok(RunOutcome::ok())
        }
        Command::Create { owner, json } => {
            let owner = parse_address(&owner)?;
            let info = client.create_pool(owner)?;
            if wants_json(json) {
                emit_json(pool_info_json(&info));
            } else {
                println!("Created pool {} owned by {}", info.id, info.owner);
            }
            Ok(RunOutcome::ok())
        }
        Command::Launch { pool, json } => {
            let info = client.launch_pool(pool)?;
            if wants_json(json) {
                emit_json(pool_info_json(&info));
            } else {
                println!("Pool {pool} is {}", info.state);
            }
            Ok(RunOutcome::ok())
        }
        Command::Fund {
            pool,
            from,
            amount,
            json,
        } => {
            let from = parse_address(&from)?;
            let amount = Amount::parse(&amount)?;
            let info = client.deposit(pool, Deposit::new(from, amount))?;
            if wants_json(json) {
                emit_json(pool_info_json(&info));
            } else {
                println!(
                    "Funded pool {pool} with {}; balance {}",
                    format_amount(amount),
                    format_amount(info.balance)
                );
            }
            Ok(RunOutcome::ok())
        }
        Command::Finish { pool, json } => {
            let payout = client.finish_pool(pool)?;
            if wants_json(json) {
                emit_json(payout_json(&payout));
            } else {
                println!(
                    "Pool {pool} completed; paid {} to {}",
                    format_amount(payout.amount),
                    payout.to
                );
            }
            Ok(RunOutcome::ok())
        }
        Command::ChangeOwner {
            pool,
            new_owner,
            json,
        } => {
            let new_owner = parse_address(&new_owner)?;
            let previous = client.change_owner(pool, new_owner)?;
            if wants_json(json) {
                emit_json(json!({
                    "pool": pool,
                    "from": previous,
                    "to": new_owner,
                }));
            } else {
                println!("Owner changed for pool {pool}");
                println!("From: {previous}");
                println!("To: {new_owner}");
            }
            Ok(RunOutcome::ok())
        }
        Command::Info { pool, json } => {
            let info = client.pool_info(pool)?;
            if wants_json(json) {
                emit_json(pool_info_json(&info));
            } else {
                emit_pool_info_human(&info);
            }
            Ok(RunOutcome::ok())
        }
        Command::List { json } => {
            let pools = client.list_pools()?;
            if wants_json(json) {
                let pools = pools.iter().map(pool_info_json).collect::<Vec<_>>();
                emit_json(json!({ "pools": pools }));
            } else {
                emit_pool_list_table(&pools, client.dir());
            }
            Ok(RunOutcome::ok())
        }
        Command::Total { kind, json } => {
            let kind = kind.parse::<TotalKind>()?;
            let amount = client.total(kind)?;
            if wants_json(json) {
                emit_json(json!({
                    "type": total_label(kind),
                    "amount": amount,
                    "amount_ether": amount.format_ether(),
                }));
            } else {
                println!("{}", format_amount(amount));
            }
            Ok(RunOutcome::ok())
        }
        Command::Accounts { json } => {
            let book = client.custody()?;
            if wants_json(json) {
                emit_json(custody_json(&book));
            } else {
                emit_accounts_table(&book);
            }
            Ok(RunOutcome::ok())
        }
        Command::History { json } => {
            let entries = client.history()?;
            if wants_json(json) {
                emit_json(journal_json(&entries));
            } else {
                emit_history_human(&entries);
            }
            Ok(RunOutcome::ok())
        }
        Command::Doctor { json } => {
            let report = client.doctor();
            if wants_json(json) {
                emit_json(audit_report_json(&report));
            } else {
                emit_doctor_human(&report, color_mode);
            }
            let exit_code = report
                .issue
                .as_ref()
                .map(|issue| to_exit_code(issue.kind))
                .unwrap_or(0);
            Ok(RunOutcome::with_code(exit_code))
        }
    }
}

fn total_label(kind: TotalKind) -> String {
    match kind {
        TotalKind::Collected => "collected".to_string(),
        TotalKind::Active => "active".to_string(),
        TotalKind::Pool(id) => format!("pool:{id}"),
    }
}
