use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Lifetimes of the one-time tokens that are mailed to users.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub registration_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from: String,
    /// When unset, mails are written to `outbox_dir` instead.
    pub smtp: Option<SmtpConfig>,
    pub outbox_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub bot_name: String,
    pub system_prompt: String,
    pub max_history: usize,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Base URL used to build the links inside outgoing mails.
    pub public_url: String,
    pub jwt: JwtConfig,
    pub tokens: TokenConfig,
    pub mail: MailConfig,
    pub chat: ChatConfig,
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are an enthusiastic assistant called 'FURIA IA'. \
Chat with passionate FURIA Esports fans about the team, its players and its achievements. \
Be charismatic, keep answers short and always encourage the fan to keep supporting the team.";

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let public_url = env_or("PUBLIC_URL", "http://localhost:8080")
            .trim_end_matches('/')
            .to_string();

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "usermanager"),
            audience: env_or("JWT_AUDIENCE", "usermanager-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7),
        };

        let tokens = TokenConfig {
            registration_ttl_minutes: env_parse("REGISTRATION_TOKEN_TTL_MINUTES", 60 * 24),
            reset_ttl_minutes: env_parse("RESET_TOKEN_TTL_MINUTES", 30),
        };

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: env_parse("SMTP_PORT", 587),
                username: env_or("SMTP_USERNAME", ""),
                password: env_or("SMTP_PASSWORD", ""),
            }),
            _ => None,
        };
        let mail = MailConfig {
            from: env_or("MAIL_FROM", "User Manager <no-reply@localhost>"),
            smtp,
            outbox_dir: env_or("MAIL_OUTBOX_DIR", "./outbox"),
        };

        let chat = ChatConfig {
            api_url: env_or("CHAT_API_URL", "https://openrouter.ai/api/v1/chat/completions"),
            api_key: env_or("OPENROUTER_API_KEY", ""),
            model: env_or("CHAT_MODEL", "deepseek/deepseek-chat:free"),
            bot_name: env_or("CHAT_BOT_NAME", "FURIA IA"),
            system_prompt: env_or("CHAT_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            max_history: env_parse("CHAT_MAX_HISTORY", 10),
            max_tokens: env_parse("CHAT_MAX_TOKENS", 2000),
            timeout_secs: env_parse("CHAT_TIMEOUT_SECS", 60),
        };

        Ok(Self {
            database_url,
            public_url,
            jwt,
            tokens,
            mail,
            chat,
        })
    }
}
