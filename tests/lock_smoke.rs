// Multi-process lock smoke test for deposit serialization.
use std::process::{Command, Stdio};

use fundpool::api::{Amount, LedgerClient, TotalKind};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_fundpool");
    let mut command = Command::new(exe);
    command.env_remove("FUNDPOOL_DIR");
    command
}

#[test]
fn concurrent_fund_is_serialized() {
    let temp = tempfile::tempdir().expect("tempdir");
    let ledger_dir = temp.path().join("ledger");
    let dir = ledger_dir.to_str().unwrap();

    for args in [
        vec!["init", "--owner", "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"],
        vec!["create", "--owner", "0x1111111111111111111111111111111111111111"],
        vec!["launch", "0"],
    ] {
        let output = cmd().arg("--dir").arg(dir).args(&args).output().expect("setup");
        assert!(output.status.success(), "{args:?}");
    }

    let workers = 8u128;
    let mut children = Vec::new();
    for i in 0..workers {
        let from = format!("0x{:040x}", 0x100 + i);
        let amount = (i + 1).to_string();
        let child = cmd()
            .args(["--dir", dir, "fund", "0", "--from", &from, "--amount", &amount])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn");
        children.push(child);
    }

    for mut child in children {
        let status = child.wait().expect("wait");
        assert!(status.success());
    }

    let client = LedgerClient::new(&ledger_dir);
    let info = client.pool_info(0).expect("info");
    let expected = Amount::new(workers * (workers + 1) / 2);
    assert_eq!(info.balance, expected);
    assert_eq!(info.funders.len(), workers as usize);
    assert_eq!(client.total(TotalKind::Collected).expect("total"), expected);
    assert!(client.doctor().is_ok());

    let history = client.history().expect("history");
    let seqs = history.iter().map(|entry| entry.seq).collect::<Vec<_>>();
    assert_eq!(seqs, (1..=3 + workers as u64).collect::<Vec<_>>());
}
