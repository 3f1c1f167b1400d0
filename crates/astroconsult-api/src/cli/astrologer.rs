//! Astrologer availability commands.

use anyhow::{Result, bail};
use console::style;

use crate::cli::user::find_user;
use crate::state::AppState;

/// Flip the online flag that gates new consultations.
pub async fn set_online(state: &AppState, phone: &str, online: bool, json: bool) -> Result<()> {
    let user = find_user(state, phone).await?;
    if !state.users.set_online(&user.id, online).await? {
        bail!("{} has no astrologer profile", user.phone_number);
    }

    if json {
        let out = serde_json::json!({ "user_id": user.id, "is_online": online });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} is now {}",
        style("✓").green().bold(),
        style(user.full_name()).cyan(),
        if online {
            style("online").green()
        } else {
            style("offline").yellow()
        }
    );
    println!();

    Ok(())
}
