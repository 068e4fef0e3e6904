//! Repository management commands

use caravel_repo::{Credentials, MetadataStore, RepositoryEntry};

use crate::error::{CliError, Result};

/// Register a repository (the reachability probe fetches its index once)
pub async fn add(
    name: &str,
    url: &str,
    username: Option<&str>,
    password: Option<&str>,
    token: Option<&str>,
) -> Result<()> {
    let mut entry = RepositoryEntry::new(name, url)?;

    if username.is_some() || password.is_some() || token.is_some() {
        let credentials = if let Some(token) = token {
            Credentials::bearer(token)
        } else if let (Some(user), Some(pass)) = (username, password) {
            Credentials::basic(user, pass)
        } else {
            return Err(CliError::input(
                "Please provide both username and password, or a token",
            ));
        };
        entry.credentials = Some(credentials);
    }

    let store = MetadataStore::from_env()?;
    let extra = entry.credentials.as_ref().map(|c| (entry.url.as_str(), c));
    let client = crate::commands::sync_client(store, extra)?;

    let newly_added = client.register(entry).await?;
    if newly_added {
        println!("\"{}\" has been added to your repositories", name);
    } else {
        println!("\"{}\" has been updated in your repositories", name);
    }
    Ok(())
}

/// List registered repositories
pub async fn list() -> Result<()> {
    let store = MetadataStore::from_env()?;
    let registry = store.read_registry()?;

    if registry.repositories.is_empty() {
        println!("No repositories registered.");
        println!();
        println!("Add one with: caravel repo add <name> <url>");
        return Ok(());
    }

    println!("{:<24} {:<44} {:<20}", "NAME", "URL", "UPDATED");
    println!("{}", "-".repeat(88));
    for entry in &registry.repositories {
        let updated = entry
            .last_updated
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        let auth = if entry.credentials.is_some() {
            " (authenticated)"
        } else {
            ""
        };
        println!("{:<24} {:<44} {}{}", entry.name, entry.url, updated, auth);
    }
    Ok(())
}

/// Refresh cached indexes for one repository, or for all of them
pub async fn update(name: Option<&str>) -> Result<()> {
    let store = MetadataStore::from_env()?;
    let client = crate::commands::sync_client(store, None)?;
    let registry = client.store().read_registry()?;

    let to_update: Vec<RepositoryEntry> = match name {
        Some(name) => {
            let entry = registry
                .get(name)
                .cloned()
                .ok_or_else(|| CliError::input(format!("Repository '{}' not found", name)))?;
            vec![entry]
        }
        None => registry.repositories.clone(),
    };

    if to_update.is_empty() {
        println!("No repositories to update.");
        return Ok(());
    }

    let mut failures = 0usize;
    for entry in &to_update {
        print!("Updating {}... ", entry.name);
        match client.refresh_index(entry).await {
            Ok(index) => println!("done ({} chart versions)", index.len()),
            Err(e) => {
                failures += 1;
                println!("failed");
                eprintln!("  Error: {}", e);
            }
        }
    }

    if failures > 0 {
        return Err(CliError::Repo {
            message: format!("{} of {} repositories failed to update", failures, to_update.len()),
        });
    }
    Ok(())
}
