//! Kill-list command implementation.
//!
//! Shows or edits the kill list from the shell using the same store the
//! server uses.

use herakles_process_control::{JsonFileStore, KillListEntry, KillListStore, ProcessId};

use crate::cli::KillListCommand;
use crate::config::Config;

/// Executes a kill-list subcommand and prints the resulting list.
pub fn command_kill_list(
    action: &KillListCommand,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileStore::new(config.kill_list_path());

    let entries = match action {
        KillListCommand::Show => store.load(),
        KillListCommand::Add { pid, label } => {
            let pid: ProcessId = pid.parse()?;
            let update = store.add(pid, label.clone())?;
            if update.changed {
                println!("✅ PID {} added to kill list", pid);
            } else {
                println!("ℹ️  PID {} is already in the kill list", pid);
            }
            update.entries
        }
        KillListCommand::Remove { pid } => {
            let pid: ProcessId = pid.parse()?;
            let update = store.remove(pid)?;
            if update.changed {
                println!("✅ PID {} removed from kill list", pid);
            } else {
                println!("ℹ️  PID {} not found in kill list", pid);
            }
            update.entries
        }
    };

    print_entries(&store, &entries);
    Ok(())
}

fn print_entries(store: &JsonFileStore, entries: &[KillListEntry]) {
    println!("\nKill list {} ({} entries)", store.path().display(), entries.len());
    println!("{:>10} | {:25} | {}", "PID", "Added", "Label");
    println!("{}", "-".repeat(60));
    for entry in entries {
        let added = entry
            .added_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:>10} | {:25} | {}",
            entry.pid,
            added,
            entry.label.as_deref().unwrap_or("")
        );
    }
}
