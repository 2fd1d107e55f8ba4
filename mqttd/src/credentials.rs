//! Password file handling for the `passwd` subcommand and for loading
//! `mqtt_broker::StaticCredentials` at startup (`auth.password_file`).

use std::collections::HashMap;
use std::io::Write;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};

/// Loads `username:hash` entries from a password file. Blank lines and lines
/// starting with `#` are ignored.
pub fn load_password_file(path: &str) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read password file `{path}`: {e}"))?;

    let mut entries = HashMap::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((username, hash)) = line.split_once(':') else {
            return Err(format!(
                "invalid format in password file `{path}` at line {}: expected `username:hash`",
                line_num + 1
            )
            .into());
        };
        entries.insert(username.to_string(), hash.to_string());
    }
    Ok(entries)
}

fn load_entries_or_empty(path: &str) -> HashMap<String, String> {
    load_password_file(path).unwrap_or_default()
}

fn write_password_file(path: &str, entries: &HashMap<String, String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "# mqttd password file")?;
    writeln!(file, "# managed by `mqttd passwd` - do not edit manually")?;
    for (username, hash) in entries {
        writeln!(file, "{username}:{hash}")?;
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, Box<dyn std::error::Error>> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("failed to hash password: {e}"))?
        .to_string();
    Ok(hash)
}

pub fn add_or_update_user(path: &str, username: &str) -> Result<(), Box<dyn std::error::Error>> {
    let password = rpassword::prompt_password(format!("Password for `{username}`: "))?;
    if password.is_empty() {
        return Err("password cannot be empty".into());
    }
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        return Err("passwords do not match".into());
    }

    let mut entries = load_entries_or_empty(path);
    entries.insert(username.to_string(), hash_password(&password)?);
    write_password_file(path, &entries)?;
    eprintln!("user `{username}` added/updated in `{path}`");
    Ok(())
}

pub fn delete_user(path: &str, username: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut entries = load_entries_or_empty(path);
    if entries.remove(username).is_none() {
        return Err(format!("user `{username}` not found in `{path}`").into());
    }
    write_password_file(path, &entries)?;
    eprintln!("user `{username}` deleted from `{path}`");
    Ok(())
}
