//! CLI command definitions and dispatch for the `consultd` binary.
//!
//! Uses clap derive macros for argument parsing. Besides `serve`, the
//! commands are operator tools for seeding users, issuing tokens and
//! toggling astrologer availability on a local database.

pub mod astrologer;
pub mod consultation;
pub mod user;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use rust_decimal::Decimal;

use astroconsult_types::user::UserRole;

/// Live consultation server for the astrology marketplace.
#[derive(Parser)]
#[command(name = "consultd", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "ASTROCONSULT_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API and chat WebSocket server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Manage marketplace users.
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Change astrologer availability.
    Astrologer {
        #[command(subcommand)]
        command: AstrologerCommand,
    },

    /// List consultations a user takes part in.
    Consultations {
        /// Phone number of the participant.
        #[arg(long)]
        phone: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user and issue a first token. Astrologers also get a pricing profile.
    Add {
        /// Phone number (normalized to digits with country code).
        #[arg(long)]
        phone: String,

        #[arg(long)]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// customer, astrologer or admin.
        #[arg(long, default_value = "customer")]
        role: UserRole,

        /// Per-minute chat rate (astrologers only).
        #[arg(long)]
        chat_rate: Option<Decimal>,

        /// Per-minute call rate (astrologers only). Defaults to twice the chat rate.
        #[arg(long)]
        call_rate: Option<Decimal>,

        /// Mark the astrologer online right away.
        #[arg(long)]
        online: bool,
    },

    /// Issue an additional bearer token for a user. Shown once.
    Token {
        #[arg(long)]
        phone: String,
    },
}

#[derive(Subcommand)]
pub enum AstrologerCommand {
    /// Accept new consultations.
    Online {
        #[arg(long)]
        phone: String,
    },
    /// Stop accepting new consultations.
    Offline {
        #[arg(long)]
        phone: String,
    },
}
