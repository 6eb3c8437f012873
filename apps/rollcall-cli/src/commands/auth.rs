use anyhow::Result;
use clap::Args;
use rollcall_utils::SecretString;

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::messages;

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long, short = 'e')]
    email: String,

    /// Read from ROLLCALL_PASSWORD when omitted
    #[arg(long, short = 'p', env = "ROLLCALL_PASSWORD", hide_env_values = true)]
    password: String,
}

impl LoginArgs {
    pub async fn run(self, ctx: &AppContext, config: &AppConfig) -> Result<()> {
        if config.auth.api_key.as_ref().is_none_or(SecretString::is_empty) {
            anyhow::bail!(
                "auth.api_key is not configured; set it in the config file or ROLLCALL__AUTH__API_KEY"
            );
        }

        let password = SecretString::new(self.password);
        let identity = ctx
            .session
            .sign_in(&self.email, &password)
            .await
            .map_err(|e| {
                let message = messages::provider_error(&e);
                anyhow::Error::new(e).context(message)
            })?;

        println!(
            "Signed in as {}",
            identity.email.as_deref().unwrap_or(&identity.uid)
        );
        Ok(())
    }
}

pub async fn logout(ctx: &AppContext) {
    let was_signed_in = ctx.session.is_authenticated();
    // Local credentials are already gone even if the provider call failed
    if let Err(e) = ctx.session.sign_out().await {
        tracing::warn!(error = %e, "identity provider sign-out failed");
    }
    if was_signed_in {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
}

pub fn whoami(ctx: &AppContext) {
    let Some(identity) = ctx.session.identity() else {
        println!("Not signed in");
        return;
    };

    println!("uid:      {}", identity.uid);
    if let Some(email) = &identity.email {
        let verified = if identity.email_verified { "" } else { " (unverified)" };
        println!("email:    {email}{verified}");
    }
    if let Some(name) = &identity.display_name {
        println!("name:     {name}");
    }
    if let Some(photo) = &identity.photo_url {
        println!("photo:    {photo}");
    }
}
