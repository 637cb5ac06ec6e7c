use crate::chat::{completion::CompletionClient, history::ChatHistory, relay::ChatRelay};
use crate::chat::completion::OpenRouterClient;
use crate::config::AppConfig;
use crate::mail::{LettreMailer, Mailer};
use crate::users::repo::{PgUserRepository, UserRepository};
use crate::verification::repo::{PgVerificationTokenRepository, VerificationTokenRepository};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn VerificationTokenRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub chat: ChatRelay,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        // Run migrations if present
        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migrations failed; continuing");
        }

        if config.chat.api_key.is_empty() {
            tracing::warn!("OPENROUTER_API_KEY not set; chat answers will fall back");
        }

        let mailer = Arc::new(LettreMailer::new(&config.mail)?) as Arc<dyn Mailer>;
        let completions =
            Arc::new(OpenRouterClient::new(&config.chat)?) as Arc<dyn CompletionClient>;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepository::new(db.clone())),
            Arc::new(PgVerificationTokenRepository::new(db)),
            mailer,
            completions,
        ))
    }

    /// Must be called from within a Tokio runtime; the chat history task is spawned here.
    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn VerificationTokenRepository>,
        mailer: Arc<dyn Mailer>,
        completions: Arc<dyn CompletionClient>,
    ) -> Self {
        let history = ChatHistory::new(
            config.chat.system_prompt.clone(),
            config.chat.max_history,
            config.chat.max_tokens,
        );
        let chat = ChatRelay::new(history, completions, config.chat.bot_name.clone());
        Self {
            config: Arc::new(config),
            users,
            tokens,
            mailer,
            chat,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::Harness::new().state
    }
}
