//! Session inspection command handlers

use crate::cli::SessionCommand;
use crate::config::Config;
use crate::error::Result;
use crate::manager::ConversationManager;
use crate::store::FileStore;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle `chatvault sessions <command>`
pub async fn handle_sessions(config: Config, command: SessionCommand) -> Result<()> {
    let store = match &config.storage.data_dir {
        Some(dir) => FileStore::new_with_dir(dir)?,
        None => FileStore::new()?,
    };
    let manager = ConversationManager::new(
        store,
        config.provider.default_system_message.clone(),
        config.conversation.context_turns,
        config.conversation.max_stored_turns,
    );

    match command {
        SessionCommand::List => {
            let previews = manager.list_conversations()?;

            if previews.is_empty() {
                println!("{}", "No stored conversations found.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Messages".bold(),
                "Last Updated".bold()
            ]);

            for preview in previews {
                let id_short: String = preview.id.chars().take(8).collect();
                let updated = preview.updated_at.format("%Y-%m-%d %H:%M").to_string();

                table.add_row(prettytable::row![
                    id_short.cyan(),
                    preview.title,
                    preview.message_count,
                    updated
                ]);
            }

            println!("\nStored Conversations:");
            table.printstd();
            println!();
            println!(
                "Use {} to view a conversation.",
                "chatvault sessions show <ID>".cyan()
            );
            println!();
        }
        SessionCommand::Show { session_id } => {
            let history = manager.get_history(&session_id)?;

            if history.created_at.is_none() {
                println!("{}", format!("Conversation {} not found.", session_id).yellow());
                return Ok(());
            }

            let title = history.title.as_deref().unwrap_or("New conversation");
            println!("\n{} ({})", title.bold(), session_id.cyan());
            println!();

            for turn in &history.messages {
                println!("{}: {}", turn.role.to_string().bold(), turn.content);
                println!();
            }
        }
        SessionCommand::Delete { session_id } => {
            if manager.delete_conversation(&session_id)? {
                println!("{}", format!("Deleted conversation {}", session_id).green());
            } else {
                println!("{}", format!("Conversation {} not found.", session_id).yellow());
            }
        }
    }

    Ok(())
}
