//! User registration and token issuance commands.

use anyhow::{Result, bail};
use chrono::Utc;
use console::style;
use rust_decimal::Decimal;

use astroconsult_types::user::{AstrologerProfile, User, UserId, UserRole, normalize_phone};

use crate::state::AppState;

/// Look up a user by phone number, normalizing it first.
pub async fn find_user(state: &AppState, phone: &str) -> Result<User> {
    let phone = normalize_phone(phone);
    match state.users.find_by_phone(&phone).await? {
        Some(user) => Ok(user),
        None => bail!("no user with phone number {phone}"),
    }
}

/// Rates for a new astrologer profile. The call rate defaults to twice the chat rate.
fn profile_rates(chat_rate: Option<Decimal>, call_rate: Option<Decimal>) -> (Decimal, Decimal) {
    match (chat_rate, call_rate) {
        (Some(chat), Some(call)) => (chat, call),
        (Some(chat), None) => (chat, chat * Decimal::TWO),
        (None, Some(call)) => (AstrologerProfile::DEFAULT_CHAT_RATE, call),
        (None, None) => (
            AstrologerProfile::DEFAULT_CHAT_RATE,
            AstrologerProfile::DEFAULT_CALL_RATE,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn add_user(
    state: &AppState,
    phone: &str,
    first_name: String,
    last_name: String,
    role: UserRole,
    chat_rate: Option<Decimal>,
    call_rate: Option<Decimal>,
    online: bool,
    json: bool,
) -> Result<()> {
    let phone_number = normalize_phone(phone);
    if phone_number.is_empty() {
        bail!("phone number must contain digits");
    }

    let user = state
        .users
        .create_user(&User {
            id: UserId::new(),
            phone_number,
            first_name,
            last_name,
            role,
            created_at: Utc::now(),
        })
        .await?;

    let profile = if role == UserRole::Astrologer {
        let (chat_rate, call_rate) = profile_rates(chat_rate, call_rate);
        let profile = AstrologerProfile {
            user_id: user.id,
            display_name: user.full_name(),
            chat_rate,
            call_rate,
            is_online: online,
            is_busy: false,
        };
        state.users.upsert_astrologer_profile(&profile).await?;
        Some(profile)
    } else {
        None
    };

    let token = state.identity.issue_token(&user.id).await?;

    if json {
        let out = serde_json::json!({ "user": user, "astrologer_profile": profile, "token": token });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Registered {} {}",
        style("✓").green().bold(),
        user.role,
        style(user.full_name()).cyan()
    );
    println!("  {} {}", style("Phone:").bold(), user.phone_number);
    println!("  {} {}", style("ID:").bold(), style(user.id.to_string()).dim());
    if let Some(profile) = &profile {
        println!(
            "  {} chat {}/min, call {}/min",
            style("Rates:").bold(),
            profile.chat_rate,
            profile.call_rate
        );
        println!(
            "  {} {}",
            style("Status:").bold(),
            if profile.is_online {
                style("online").green()
            } else {
                style("offline").yellow()
            }
        );
    }
    println!();
    println!(
        "  {} Token (save this -- it won't be shown again):",
        style("🔑").bold()
    );
    println!("  {}", style(&token).yellow().bold());
    println!();

    Ok(())
}

/// Issue a fresh bearer token. Only its digest is stored.
pub async fn issue_token(state: &AppState, phone: &str, json: bool) -> Result<()> {
    let user = find_user(state, phone).await?;
    let token = state.identity.issue_token(&user.id).await?;

    if json {
        let out = serde_json::json!({ "user_id": user.id, "token": token });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Token for {} (save this -- it won't be shown again):",
        style("🔑").bold(),
        style(user.full_name()).cyan()
    );
    println!();
    println!("  {}", style(&token).yellow().bold());
    println!();

    Ok(())
}
