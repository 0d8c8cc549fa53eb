//! Passwords remembered with `login --remember`, kept in the OS keychain under
//! the `eventpro` service with the account email as the entry name.

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "eventpro";

pub struct RememberedPasswords;

impl RememberedPasswords {
    pub fn remember(email: &str, password: &str) -> Result<()> {
        entry(email)?
            .set_password(password)
            .with_context(|| format!("Failed to save password for {} in keychain", email))
    }

    /// The saved password for `email`, or `None` if nothing was remembered.
    pub fn recall(email: &str) -> Result<Option<String>> {
        missing_as_none(entry(email)?.get_password())
            .with_context(|| format!("Failed to read keychain entry for {}", email))
    }

    /// Drop the saved password. Forgetting an email with no entry is a no-op.
    pub fn forget(email: &str) -> Result<()> {
        missing_as_none(entry(email)?.delete_credential())
            .with_context(|| format!("Failed to remove keychain entry for {}", email))?;
        Ok(())
    }
}

fn entry(email: &str) -> Result<Entry> {
    Entry::new(SERVICE_NAME, email).context("Failed to open keychain entry")
}

fn missing_as_none<T>(result: keyring::Result<T>) -> keyring::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e),
    }
}
