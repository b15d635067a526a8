//! # hash-password
//!
//! Prints an Argon2id PHC hash for seeding accounts directly in the database
//! (for example an admin user).
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p tasktrail-api --bin hash-password -- 'correct horse battery'
//! echo 'correct horse battery' | cargo run -p tasktrail-api --bin hash-password
//! ```
//!
//! ```sql
//! INSERT INTO users (email, password_hash, role)
//! VALUES ('admin@example.com', '<printed hash>', 'admin');
//! ```

use anyhow::Context;
use std::io::{self, BufRead};
use tasktrail_shared::auth::password::{CredentialStore, MIN_PASSWORD_LENGTH};

fn main() -> anyhow::Result<()> {
    let password = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => read_password_line(io::stdin().lock())?,
    };

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        anyhow::bail!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        );
    }

    let hash = CredentialStore::new()
        .hash(&password)
        .context("Failed to hash password")?;
    println!("{}", hash);

    Ok(())
}

/// Reads one line, dropping the trailing newline
fn read_password_line(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
