//! Purpose: JSON envelopes for ledger values emitted by the CLI.
//! Exports: `pool_info_json`, `summary_json`, `payout_json`, `custody_json`, `journal_json`, `audit_report_json`.
//! Role: Keep output key names consistent across commands.
//! Invariants: Amounts are decimal strings in base units; `*_ether` keys carry the ether rendering.
//! Invariants: Pool state is emitted both as a label and as its numeric code.

use fundpool::api::{
    Amount, AuditReport, CustodyBook, JournalEntry, LedgerSummary, Payout, PoolInfo,
};
use serde_json::{Map, Value, json};

fn insert_amount(map: &mut Map<String, Value>, key: &str, amount: Amount) {
    map.insert(key.to_string(), json!(amount));
    map.insert(format!("{key}_ether"), json!(amount.format_ether()));
}

pub(crate) fn pool_info_json(info: &PoolInfo) -> Value {
    let mut map = Map::new();
    map.insert("id".to_string(), json!(info.id));
    map.insert("state".to_string(), json!(info.state.as_str()));
    map.insert("state_code".to_string(), json!(info.state.code()));
    map.insert("funders".to_string(), json!(info.funders));
    map.insert("owner".to_string(), json!(info.owner));
    insert_amount(&mut map, "balance", info.balance);
    Value::Object(map)
}

pub(crate) fn summary_json(summary: &LedgerSummary) -> Value {
    let mut map = Map::new();
    map.insert("owner".to_string(), json!(summary.owner));
    map.insert("pool_count".to_string(), json!(summary.pool_count));
    insert_amount(&mut map, "total_collected", summary.total_collected);
    insert_amount(&mut map, "total_active", summary.total_active);
    Value::Object(map)
}

pub(crate) fn payout_json(payout: &Payout) -> Value {
    let mut map = Map::new();
    map.insert("pool".to_string(), json!(payout.pool));
    map.insert("to".to_string(), json!(payout.to));
    insert_amount(&mut map, "amount", payout.amount);
    Value::Object(map)
}

pub(crate) fn custody_json(book: &CustodyBook) -> Value {
    let accounts = book
        .accounts()
        .map(|(addr, account)| {
            let mut map = Map::new();
            map.insert("address".to_string(), json!(addr));
            insert_amount(&mut map, "deposited", account.deposited);
            insert_amount(&mut map, "paid_out", account.paid_out);
            Value::Object(map)
        })
        .collect::<Vec<_>>();
    json!({
        "accounts": accounts,
        "total_deposited": book.total_deposited(),
        "total_paid_out": book.total_paid_out(),
    })
}

pub(crate) fn journal_json(entries: &[JournalEntry]) -> Value {
    json!({ "entries": entries })
}

pub(crate) fn audit_report_json(report: &AuditReport) -> Value {
    let mut map = Map::new();
    map.insert("path".to_string(), json!(report.path.display().to_string()));
    map.insert("status".to_string(), json!(report.status.as_str()));
    if let Some(summary) = &report.summary {
        map.insert("summary".to_string(), summary_json(summary));
    }
    if let Some(issue) = &report.issue {
        let mut issue_map = Map::new();
        issue_map.insert("kind".to_string(), json!(format!("{:?}", issue.kind)));
        issue_map.insert("message".to_string(), json!(issue.message));
        if let Some(pool) = issue.pool {
            issue_map.insert("pool".to_string(), json!(pool));
        }
        map.insert("issue".to_string(), Value::Object(issue_map));
    }
    if !report.remediation_hints.is_empty() {
        map.insert(
            "remediation_hints".to_string(),
            json!(report.remediation_hints),
        );
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::{payout_json, pool_info_json};
    use fundpool::api::{Address, Amount, Payout, PoolInfo, PoolState};

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn pool_info_uses_state_label_code_and_string_amounts() {
        let info = PoolInfo {
            id: 4,
            state: PoolState::Active,
            funders: vec![addr(0xaa)],
            owner: addr(0x01),
            balance: Amount::new(4_000_000_000_000_000_000),
        };
        let value = pool_info_json(&info);
        assert_eq!(value["id"], 4);
        assert_eq!(value["state"], "ACTIVE");
        assert_eq!(value["state_code"], 1);
        assert_eq!(value["balance"], "4000000000000000000");
        assert_eq!(value["balance_ether"], "4.0");
        assert_eq!(
            value["funders"][0],
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        );
    }

    #[test]
    fn payout_names_recipient() {
        let payout = Payout {
            pool: 2,
            to: addr(0x02),
            amount: Amount::new(7),
        };
        let value = payout_json(&payout);
        assert_eq!(value["pool"], 2);
        assert_eq!(value["to"], "0x0202020202020202020202020202020202020202");
        assert_eq!(value["amount"], "7");
    }
}
