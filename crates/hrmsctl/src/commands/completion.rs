//! `hrmsctl completion <shell>`
//!
//! The script goes to stdout and an install hint to stderr, so
//! `hrmsctl completion zsh > _hrmsctl` captures only the script.

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;
use std::io;

pub use clap_complete::Shell;

use crate::cli::Cli;

const BIN: &str = "hrmsctl";

fn install_hint(shell: Shell) -> Option<&'static str> {
    match shell {
        Shell::Bash => Some(
            "hrmsctl completion bash > ~/.local/share/bash-completion/completions/hrmsctl",
        ),
        Shell::Zsh => Some("hrmsctl completion zsh > \"${fpath[1]}/_hrmsctl\""),
        Shell::Fish => Some("hrmsctl completion fish > ~/.config/fish/completions/hrmsctl.fish"),
        Shell::PowerShell => Some("hrmsctl completion powershell >> $PROFILE"),
        _ => None,
    }
}

pub fn execute(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, BIN, &mut io::stdout());

    if let Some(hint) = install_hint(shell) {
        eprintln!("# install with: {}", hint);
    }
    Ok(())
}
