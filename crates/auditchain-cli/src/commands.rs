use anyhow::{anyhow, bail, Context};
use auditchain_ledger::{
    verify_entries, AuditIndex, Entry, EntryHasher, EntryStore, JsonFileStore, Ledger,
    LedgerConfig, VerificationReport,
};
use colored::Colorize;
use serde_json::{Map, Value};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    let format = cli.format;

    match cli.command {
        Command::Init(_) => cmd_init(&Ledger::open(&config), &format),
        Command::Append(args) => cmd_append(&Ledger::open(&config), &format, args),
        Command::Log(args) => cmd_log(&read_entries(&config)?, &format, args),
        Command::Show(args) => cmd_show(&read_entries(&config)?, &format, args),
        Command::Head(_) => cmd_head(&read_entries(&config)?, &format),
        Command::Verify(_) => {
            let hasher = EntryHasher::new(config.digest);
            cmd_verify(&read_entries(&config)?, &hasher, &format)
        }
        Command::Audit(args) => cmd_audit(&read_entries(&config)?, &format, args),
    }
}

/// Entries exactly as stored, for the read-only commands. Unlike
/// `Ledger::open`, a missing or unreadable file is an error and is never
/// moved aside or replaced.
pub fn read_entries(config: &LedgerConfig) -> anyhow::Result<Vec<Entry>> {
    let store = JsonFileStore::from_config(config);
    store
        .load()
        .with_context(|| format!("cannot read ledger {}", store.location()))?
        .ok_or_else(|| anyhow!("no ledger at {}", store.location()))
}

/// Config file first, then `--ledger` on top.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<LedgerConfig> {
    let mut config = match &cli.config {
        Some(path) => LedgerConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    if let Some(path) = &cli.ledger {
        config.path = path.clone();
    }
    Ok(config)
}

/// Payload for `append`: the raw JSON argument, or an object assembled from
/// `--action` and `--field key=value`. Field values that parse as JSON
/// (numbers, booleans, null) keep that type; anything else is a string.
pub fn build_payload(args: &AppendArgs) -> anyhow::Result<Value> {
    if let Some(raw) = &args.payload {
        return serde_json::from_str(raw).context("payload is not valid JSON");
    }

    let mut object = Map::new();
    if let Some(action) = &args.action {
        object.insert("action".into(), Value::String(action.clone()));
    }
    for field in &args.fields {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| anyhow!("field `{field}` is not in KEY=VALUE form"))?;
        if key.is_empty() {
            bail!("field `{field}` has an empty key");
        }
        let value = match serde_json::from_str::<Value>(value) {
            Ok(v) if !v.is_object() && !v.is_array() && !v.is_string() => v,
            _ => Value::String(value.to_string()),
        };
        object.insert(key.to_string(), value);
    }
    if object.is_empty() {
        bail!("nothing to append: pass a JSON payload or --action/--field");
    }
    Ok(Value::Object(object))
}

fn cmd_init(ledger: &Ledger, format: &OutputFormat) -> anyhow::Result<()> {
    let head = ledger.get_last_entry().ok_or_else(|| anyhow!("ledger is empty"))?;
    match format {
        OutputFormat::Json => print_json(&head)?,
        OutputFormat::Text => {
            println!("{} Ledger ready at {}", "✓".green().bold(), ledger.location().bold());
            println!("  Entries: {}", ledger.len().to_string().bold());
            println!("  Digest: {}", ledger.hasher().algorithm().to_string().cyan());
            println!("  Head: {} {}", format!("#{}", head.index).yellow(), head.hash.dimmed());
        }
    }
    Ok(())
}

fn cmd_append(ledger: &Ledger, format: &OutputFormat, args: AppendArgs) -> anyhow::Result<()> {
    let payload = build_payload(&args)?;
    let entry = ledger.append(payload)?;
    match format {
        OutputFormat::Json => print_json(&entry)?,
        OutputFormat::Text => {
            println!("{} Appended entry {}", "✓".green().bold(), format!("#{}", entry.index).yellow());
            println!("  Hash: {}", entry.hash.dimmed());
            println!("  Previous: {}", entry.previous_hash.dimmed());
        }
    }
    Ok(())
}

fn cmd_log(entries: &[Entry], format: &OutputFormat, args: LogArgs) -> anyhow::Result<()> {
    let skip = args.limit.map_or(0, |n| entries.len().saturating_sub(n));
    let shown = &entries[skip..];

    match format {
        OutputFormat::Json => print_json(&shown)?,
        OutputFormat::Text if args.oneline => {
            for entry in shown {
                println!("{} {} {}", format!("#{}", entry.index).yellow(), entry.short_hash().dimmed(), compact(&entry.data));
            }
        }
        OutputFormat::Text => {
            for entry in shown {
                print_entry(entry);
                println!();
            }
        }
    }
    Ok(())
}

fn cmd_show(entries: &[Entry], format: &OutputFormat, args: ShowArgs) -> anyhow::Result<()> {
    let entry = entries
        .iter()
        .find(|e| e.index == args.index)
        .ok_or_else(|| anyhow!("no entry #{} (ledger has {})", args.index, entries.len()))?;
    match format {
        OutputFormat::Json => print_json(entry)?,
        OutputFormat::Text => print_entry(entry),
    }
    Ok(())
}

fn cmd_head(entries: &[Entry], format: &OutputFormat) -> anyhow::Result<()> {
    let head = entries.last().ok_or_else(|| anyhow!("ledger is empty"))?;
    match format {
        OutputFormat::Json => print_json(head)?,
        OutputFormat::Text => print_entry(head),
    }
    Ok(())
}

fn cmd_verify(entries: &[Entry], hasher: &EntryHasher, format: &OutputFormat) -> anyhow::Result<()> {
    let report = verify_entries(entries, hasher);
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }
    if !report.is_valid() {
        bail!("chain verification failed with {} violation(s)", report.violations.len());
    }
    Ok(())
}

fn cmd_audit(entries: &[Entry], format: &OutputFormat, args: AuditArgs) -> anyhow::Result<()> {
    let index = AuditIndex::build(entries);
    let rows: Vec<_> = index
        .entries
        .iter()
        .filter(|row| args.action.as_deref().map_or(true, |a| row.action == a))
        .filter(|row| args.actor.as_deref().map_or(true, |a| row.actor.as_deref() == Some(a)))
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("Audit trail: no matching entries.");
                return Ok(());
            }
            for row in &rows {
                println!(
                    "{:>6}  {}  {:<22} {}",
                    format!("#{}", row.index).yellow(),
                    row.timestamp.dimmed(),
                    row.action.cyan(),
                    row.actor.as_deref().unwrap_or("-"),
                );
            }
            if args.action.is_none() && args.actor.is_none() {
                print_histogram(&index);
            }
        }
    }
    Ok(())
}

fn print_entry(entry: &Entry) {
    println!("{}  {}", format!("entry #{}", entry.index).yellow().bold(), entry.timestamp.dimmed());
    println!("  Hash:     {}", entry.hash);
    println!("  Previous: {}", entry.previous_hash);
    println!("  Data:     {}", compact(&entry.data));
}

fn print_report(report: &VerificationReport) {
    let mark = |ok: bool| if ok { "valid".green() } else { "BROKEN".red().bold() };
    if report.is_valid() {
        println!("{} Audit chain integrity verified", "✓".green().bold());
    } else {
        println!("{} Audit chain integrity check failed", "✗".red().bold());
    }
    println!("  Entries: {}", report.entry_count);
    println!("  Genesis: {}", mark(report.genesis_valid));
    println!("  Indices: {}", mark(report.indices_contiguous));
    println!("  Hash chain: {}", mark(report.hash_chain_valid));
    for violation in &report.violations {
        println!("  {} #{}: {}", "!".red(), violation.index, violation.description);
    }
}

fn print_histogram(index: &AuditIndex) {
    println!();
    for (action, count) in index.actions() {
        println!("  {:<22} {}", action.cyan(), count);
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn compact(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::json;

    use super::*;

    fn append_args(argv: &[&str]) -> AppendArgs {
        let mut full = vec!["auditchain", "append"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Append(args) => args,
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn raw_payload_is_parsed() {
        let payload = build_payload(&append_args(&[r#"{"action":"login","user":"alice"}"#])).unwrap();
        assert_eq!(payload, json!({"action": "login", "user": "alice"}));
    }

    #[test]
    fn raw_payload_may_be_any_json() {
        assert_eq!(build_payload(&append_args(&["[1,2]"])).unwrap(), json!([1, 2]));
        assert!(build_payload(&append_args(&["{oops"])).is_err());
    }

    #[test]
    fn fields_keep_scalar_types() {
        let payload = build_payload(&append_args(&[
            "--action", "order_confirmed", "-f", "order_id=7", "-f", "admin_user=root",
            "-f", "flag=true", "-f", "note=\"quoted\"",
        ]))
        .unwrap();
        assert_eq!(
            payload,
            json!({
                "action": "order_confirmed",
                "order_id": 7,
                "admin_user": "root",
                "flag": true,
                "note": "\"quoted\"",
            })
        );
    }

    #[test]
    fn malformed_fields_rejected() {
        assert!(build_payload(&append_args(&["-f", "novalue"])).is_err());
        assert!(build_payload(&append_args(&["-f", "=x"])).is_err());
        assert!(build_payload(&append_args(&[])).is_err());
    }

    #[test]
    fn ledger_flag_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("auditchain.toml");
        std::fs::write(&config_path, "path = \"from-config.json\"\ndigest = \"blake3\"\n").unwrap();
        let config_arg = config_path.to_string_lossy().into_owned();

        let cli = Cli::try_parse_from(["auditchain", "--config", &config_arg, "head"]).unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.path, std::path::PathBuf::from("from-config.json"));

        let cli = Cli::try_parse_from(["auditchain", "-c", &config_arg, "-l", "other.json", "head"]).unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.path, std::path::PathBuf::from("other.json"));
        assert_eq!(config.digest, auditchain_ledger::DigestAlgorithm::Blake3);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["auditchain", "-c", "/nonexistent/auditchain.toml", "head"]).unwrap();
        assert!(resolve_config(&cli).is_err());
    }

    fn files_in(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn run(ledger: &std::path::Path, argv: &[&str]) -> anyhow::Result<()> {
        let ledger_arg = ledger.to_string_lossy().into_owned();
        let mut full = vec!["auditchain", "--ledger", ledger_arg.as_str()];
        full.extend_from_slice(argv);
        run_command(Cli::try_parse_from(full).unwrap())
    }

    #[test]
    fn verify_fails_on_tampered_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        run(&path, &["append", "--action", "login", "-f", "user=alice"]).unwrap();
        assert!(run(&path, &["verify"]).is_ok());

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("alice", "mallory")).unwrap();
        assert!(run(&path, &["verify"]).is_err());
        assert!(run(&path, &["--format", "json", "verify"]).is_err());
    }

    #[test]
    fn verify_leaves_malformed_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let body = r#"[{"index": 1, "truncated"#;
        std::fs::write(&path, body).unwrap();

        for command in ["verify", "head", "log", "audit"] {
            assert!(run(&path, &[command]).is_err(), "{command} accepted a malformed ledger");
        }
        assert!(run(&path, &["show", "1"]).is_err());
        assert_eq!(files_in(dir.path()), vec!["ledger.json"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
    }

    #[test]
    fn read_only_commands_never_create_a_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.json");
        assert!(run(&path, &["verify"]).is_err());
        assert!(run(&path, &["head"]).is_err());
        assert!(files_in(dir.path()).is_empty());

        run(&path, &["init"]).unwrap();
        assert!(run(&path, &["verify"]).is_ok());
        assert!(run(&path, &["head"]).is_ok());
    }

    #[test]
    fn show_out_of_range_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        run(&path, &["init"]).unwrap();
        let entries = read_entries(&LedgerConfig::at(&path)).unwrap();
        assert!(cmd_show(&entries, &OutputFormat::Text, ShowArgs { index: 1 }).is_ok());
        assert!(cmd_show(&entries, &OutputFormat::Text, ShowArgs { index: 2 }).is_err());
    }
}
