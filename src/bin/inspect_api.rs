use inbox_agent::api::{ApiClient, Backend};
use inbox_agent::config::Config;
use inbox_agent::timefmt::format_relative;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <search_query>", args[0]);
        eprintln!("Search query matches against Sender or Subject.");
        std::process::exit(1);
    }

    let query = args[1].to_lowercase();
    let config = Config::load();
    let client = ApiClient::new(config.api_base_url())
        .map_err(|e| anyhow::anyhow!("Failed to create API client: {}", e))?;

    let emails = client
        .list_emails()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list emails from {}: {}", client.base_url(), e))?;

    let found = emails.iter().find(|e| {
        e.sender.to_lowercase().contains(&query) || e.subject.to_lowercase().contains(&query)
    });
    let Some(found) = found else {
        println!("No emails found matching '{}'", args[1]);
        return Ok(());
    };

    let email = client.get_email(found.id).await?;
    let rule = "--------------------------------------------------------------------------------";

    println!("Found Email:");
    println!("ID: {}", email.id);
    println!("From: {}", email.sender);
    println!("To: {:?}", email.recipients);
    println!("Subject: {}", email.subject);
    match email.timestamp.as_deref() {
        Some(ts) => println!("Received: {} ({})", ts, format_relative(ts)),
        None => println!("Received: (unknown)"),
    }
    println!("Category: {}", email.category);
    println!("{}", rule);
    println!("TASKS ({}):", email.tasks.len());
    for task in &email.tasks {
        println!("{:?}", task);
    }
    println!("{}", rule);
    println!("STORED DRAFT:");
    match &email.draft {
        Some(draft) => println!("{}\n\n{}", draft.subject, draft.body),
        None => println!("(None)"),
    }
    println!("{}", rule);
    println!("BODY:");
    println!("{}", email.body);

    let drafts = client.list_drafts().await?;
    let linked: Vec<_> = drafts.iter().filter(|d| d.email_id == Some(email.id)).collect();
    println!("{}", rule);
    println!("SAVED DRAFTS FOR THIS EMAIL: {}", linked.len());
    for draft in linked {
        let when = draft.created_at.as_deref().map(format_relative).unwrap_or_default();
        println!("#{} {} {}", draft.id, draft.subject, when);
    }

    Ok(())
}
