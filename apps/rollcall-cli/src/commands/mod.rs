use anyhow::Result;
use attendance_sdk::ApiError;
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::messages;

mod attendance;
mod auth;
mod people;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login(auth::LoginArgs),
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List, search and add people
    People(people::PeopleArgs),
    /// Read and record attendance
    Attendance(attendance::AttendanceArgs),
    /// Print the effective configuration with secrets redacted
    Config,
}

impl Commands {
    pub async fn run(self, config: &AppConfig) -> Result<()> {
        if let Commands::Config = self {
            print!("{}", config.to_yaml()?);
            return Ok(());
        }

        let ctx = AppContext::open(config).await?;
        let result = match self {
            Commands::Login(args) => args.run(&ctx, config).await,
            Commands::Logout => {
                auth::logout(&ctx).await;
                Ok(())
            }
            Commands::Whoami => {
                auth::whoami(&ctx);
                Ok(())
            }
            Commands::People(args) => args.run(&ctx).await,
            Commands::Attendance(args) => args.run(&ctx).await,
            Commands::Config => Ok(()),
        };
        ctx.close();
        result
    }
}

/// `--date`, defaulting to today in local time.
#[derive(Args, Clone, Copy)]
pub struct DateArgs {
    /// Day in YYYY-MM-DD format [default: today]
    #[arg(long, short = 'd')]
    date: Option<NaiveDate>,
}

impl DateArgs {
    fn resolve(self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Attach the user-facing message; the raw error stays in the chain.
fn api_failure(err: ApiError) -> anyhow::Error {
    let message = messages::api_error(&err);
    tracing::debug!(code = %err.code, status = ?err.status, error = %err, "API call failed");
    anyhow::Error::new(err).context(message)
}

/// Commands that talk to the API need a session.
fn require_session(ctx: &AppContext) -> Result<()> {
    if !ctx.session.is_authenticated() {
        anyhow::bail!("You are not signed in. Run `rollcall login --email <email>` first.");
    }
    Ok(())
}
