//! Consultation listing command.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use astroconsult_types::consultation::{Consultation, ConsultationStatus};
use astroconsult_types::user::User;

use crate::cli::user::find_user;
use crate::state::AppState;

fn status_cell(status: ConsultationStatus) -> Cell {
    match status {
        ConsultationStatus::Pending => Cell::new("○ pending").fg(Color::Yellow),
        ConsultationStatus::Active => Cell::new("● active").fg(Color::Green),
        ConsultationStatus::Completed => Cell::new("✓ completed").fg(Color::Cyan),
        ConsultationStatus::Cancelled => Cell::new("◌ cancelled").fg(Color::DarkGrey),
    }
}

fn role_in(consultation: &Consultation, user: &User) -> &'static str {
    if consultation.customer_id == user.id {
        "customer"
    } else {
        "astrologer"
    }
}

/// List every consultation the user takes part in, newest first.
pub async fn list_consultations(state: &AppState, phone: &str, json: bool) -> Result<()> {
    let user = find_user(state, phone).await?;
    let consultations = state.registry.list_mine(&user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&consultations)?);
        return Ok(());
    }

    if consultations.is_empty() {
        println!();
        println!(
            "  {} No consultations for {}",
            style("i").blue().bold(),
            style(user.full_name()).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("As").fg(Color::White),
        Cell::new("Type").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Rate/min").fg(Color::White),
        Cell::new("Minutes").fg(Color::White),
        Cell::new("Free").fg(Color::White),
        Cell::new("Total").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for c in &consultations {
        let total = match c.total_cost {
            Some(cost) => Cell::new(cost.to_string()).fg(Color::Green),
            None => Cell::new("-").fg(Color::DarkGrey),
        };

        table.add_row(vec![
            Cell::new(c.id.to_string()).fg(Color::DarkGrey),
            Cell::new(role_in(c, &user)),
            Cell::new(c.consultation_type.to_string()),
            status_cell(c.status),
            Cell::new(c.rate_per_minute.to_string()),
            Cell::new(c.duration_minutes.to_string()),
            Cell::new(c.free_minutes_used.to_string()),
            total,
            Cell::new(c.created_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} consultation{}",
        style(consultations.len()).bold(),
        if consultations.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use astroconsult_types::consultation::ConsultationType;

    use super::*;
    use crate::state::test_support::{seed_pair, test_state};

    #[tokio::test]
    async fn test_lists_for_both_participants() {
        let (state, _dir) = test_state().await;
        let (customer, astrologer) = seed_pair(&state).await;
        let created = state
            .registry
            .create(&customer, &astrologer.id, ConsultationType::Chat)
            .await
            .unwrap();

        assert_eq!(role_in(&created, &customer), "customer");
        assert_eq!(role_in(&created, &astrologer), "astrologer");

        list_consultations(&state, &customer.phone_number, false).await.unwrap();
        list_consultations(&state, &astrologer.phone_number, true).await.unwrap();
    }
}
