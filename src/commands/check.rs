//! Check command implementation.
//!
//! Validates system requirements and configuration.

use herakles_process_control::process::list_processes;
use herakles_process_control::LinuxProcessTable;
use nix::unistd::geteuid;
use std::fs;
use std::path::Path;

use crate::config::{validate_effective_config, Config};

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Herakles Process Control - System Check");
    println!("==========================================");

    let mut all_ok = true;

    // Check process table
    let proc_root = config.proc_root();
    println!("\n📁 Checking process table at {}...", proc_root.display());
    if proc_root.exists() {
        let processes = list_processes(&LinuxProcessTable::new(&proc_root));
        if processes.is_empty() {
            println!("   ❌ Cannot read any process entries");
            all_ok = false;
        } else {
            println!("   ✅ Can read {} processes", processes.len());
        }
    } else {
        println!("   ❌ {} not found", proc_root.display());
        all_ok = false;
    }

    // Check signal privileges
    println!("\n🔑 Checking privileges...");
    if geteuid().is_root() {
        println!("   ✅ Running as root - can terminate any process");
    } else {
        println!("   ⚠️  Not running as root - kills of foreign processes will be denied");
    }

    // Check kill list location
    let kill_list = config.kill_list_path();
    println!("\n💾 Checking kill list at {}...", kill_list.display());
    match check_writable_dir(kill_list.parent().unwrap_or(Path::new("."))) {
        Ok(()) => println!("   ✅ Kill list directory is writable"),
        Err(e) => {
            println!("   ❌ Kill list directory is not writable: {}", e);
            all_ok = false;
        }
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}

/// Creates the directory if needed and checks it by writing a temporary file.
fn check_writable_dir(dir: &Path) -> std::io::Result<()> {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    fs::create_dir_all(dir)?;
    tempfile::NamedTempFile::new_in(dir).map(|_| ())
}
