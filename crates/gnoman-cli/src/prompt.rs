//! Terminal input for secret values and backup passphrases.

use std::io::{self, BufRead, Write};

use anyhow::bail;
use gnoman_core::SecretString;
use gnoman_secrets::{Prompter, Result as SecretResult};

/// Reads from the controlling terminal. Sensitive input is not echoed.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, message: &str, sensitive: bool) -> SecretResult<Option<SecretString>> {
        let line = if sensitive {
            SecretString::new(rpassword::prompt_password(format!("{message}: "))?)
        } else {
            eprint!("{message}: ");
            io::stderr().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            SecretString::new(line)
        };
        let line = line.trimmed();
        Ok((!line.is_empty()).then_some(line))
    }
}

/// Backup passphrase from `provided` or the terminal, confirmed when `confirm`.
pub fn passphrase(provided: Option<String>, label: &str, confirm: bool) -> anyhow::Result<SecretString> {
    if let Some(value) = provided {
        return Ok(SecretString::new(value));
    }
    let first = SecretString::new(rpassword::prompt_password(format!("{label}: "))?);
    if first.is_empty() {
        bail!("passphrase must not be empty");
    }
    if confirm {
        let second = SecretString::new(rpassword::prompt_password(format!("Confirm {label}: "))?);
        if first != second {
            bail!("passphrases do not match");
        }
    }
    Ok(first)
}
