//! Resource naming helpers
//!
//! Globally-unique Azure names (SQL servers, storage accounts) are built
//! from a configured prefix plus a short random suffix.

use crate::error::{AzmError, Result};
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

pub const SUFFIX_LEN: usize = 6;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Append six random lowercase alphanumerics to `base_name`
pub fn generate_unique_name(base_name: &str) -> String {
    generate_unique_name_with(base_name, &mut rand::thread_rng())
}

pub fn generate_unique_name_with<R: Rng>(base_name: &str, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{base_name}{suffix}")
}

fn storage_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]{3,24}$").expect("static regex"))
}

fn sql_server_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("static regex"))
}

fn resource_group_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-\w\._\(\)]{1,90}$").expect("static regex"))
}

/// Storage account names: 3-24 lowercase letters and digits
pub fn validate_storage_account_name(name: &str) -> Result<()> {
    if storage_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(AzmError::invalid_argument(format!(
            "Invalid storage account name '{name}': use 3-24 lowercase letters and digits"
        )))
    }
}

/// SQL server names: lowercase letters, digits and hyphens, no leading or trailing hyphen
pub fn validate_sql_server_name(name: &str) -> Result<()> {
    if sql_server_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(AzmError::invalid_argument(format!(
            "Invalid SQL server name '{name}': use up to 63 lowercase letters, digits and hyphens"
        )))
    }
}

pub fn validate_resource_group_name(name: &str) -> Result<()> {
    if resource_group_regex().is_match(name) && !name.ends_with('.') {
        Ok(())
    } else {
        Err(AzmError::invalid_argument(format!(
            "Invalid resource group name '{name}'"
        )))
    }
}
