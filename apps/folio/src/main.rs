use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio_cache::{CacheConfig, MemoryBackend};
use folio_http::{
    build_router, init_logging, server, AppConfig, AppState, LocalStorage, LogFormat,
    LoggingConfig,
};
use folio_store::{MemoryStore, NewGroup, PgStore, PgStoreConfig, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "A small social blog: posts, groups, comments and subscriptions")]
struct Cli {
    /// PostgreSQL connection string; overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Log output format: text, pretty or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Directory uploaded images are stored in
        #[arg(long)]
        media_root: Option<PathBuf>,

        /// Apply pending migrations before serving
        #[arg(long)]
        migrate: bool,

        /// Without a database: create this user at startup and log a session token
        #[arg(long = "seed-user", value_name = "USERNAME")]
        seed_users: Vec<String>,

        /// Without a database: create a group with this slug at startup
        #[arg(long = "seed-group", value_name = "SLUG")]
        seed_groups: Vec<String>,
    },

    /// Apply pending database migrations
    Migrate,

    /// Create a user and print a session token for it
    CreateUser {
        username: String,
    },

    /// Create a group posts can be filed under
    CreateGroup {
        title: String,
        slug: String,

        #[arg(long, default_value = "")]
        description: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    let logging = LoggingConfig::production()
        .with_format(config.log_format)
        .with_service("folio");
    if let Err(e) = init_logging(logging) {
        bail!("failed to initialise logging: {}", e);
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            media_root,
            migrate,
            seed_users,
            seed_groups,
        } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(media_root) = media_root {
                config.media_root = media_root;
            }
            let seed = Seed {
                users: seed_users,
                groups: seed_groups,
            };
            serve(config, migrate, seed).await
        }
        Commands::Migrate => {
            let store = connect(&config).await?;
            store.migrate().await.context("migration failed")?;
            info!("migrations applied");
            Ok(())
        }
        Commands::CreateUser { username } => {
            let store = connect(&config).await?;
            let user = store.create_user(&username).await?;
            let token = store.create_session(user.id).await?;
            println!("created user {} (id {})", user.username, user.id);
            println!("session token: {}", token);
            Ok(())
        }
        Commands::CreateGroup {
            title,
            slug,
            description,
        } => {
            let store = connect(&config).await?;
            let group = store
                .create_group(NewGroup::new(title, slug, description))
                .await?;
            println!("created group {} at /group/{}/", group.title, group.slug);
            Ok(())
        }
    }
}

async fn connect(config: &AppConfig) -> Result<PgStore> {
    let Some(url) = config.database_url.as_deref() else {
        bail!("DATABASE_URL is not set");
    };
    PgStore::connect(url, &PgStoreConfig::default())
        .await
        .context("failed to connect to the database")
}

/// Accounts and groups created in the in-memory store at startup
#[derive(Debug, Default)]
struct Seed {
    users: Vec<String>,
    groups: Vec<String>,
}

impl Seed {
    fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }

    /// Returns each seeded username with its session token
    async fn apply(&self, store: &dyn Store) -> Result<Vec<(String, String)>> {
        let mut sessions = Vec::with_capacity(self.users.len());
        for username in &self.users {
            let user = store
                .create_user(username)
                .await
                .with_context(|| format!("failed to seed user '{}'", username))?;
            let token = store.create_session(user.id).await?;
            sessions.push((user.username, token));
        }
        for slug in &self.groups {
            store
                .create_group(NewGroup::new(slug.clone(), slug.clone(), ""))
                .await
                .with_context(|| format!("failed to seed group '{}'", slug))?;
        }
        Ok(sessions)
    }
}

async fn serve(config: AppConfig, migrate: bool, seed: Seed) -> Result<()> {
    let store: Arc<dyn Store> = if config.database_url.is_some() {
        let store = connect(&config).await?;
        if migrate {
            store.migrate().await.context("migration failed")?;
        }
        if !seed.is_empty() {
            warn!("--seed-user and --seed-group only apply to the in-memory store; use create-user and create-group instead");
        }
        Arc::new(store)
    } else {
        warn!("DATABASE_URL is not set; using the in-memory store, nothing will persist");
        if seed.is_empty() {
            warn!("create-user and create-group need a database; pass --seed-user or --seed-group to populate the in-memory store");
        }
        let store = MemoryStore::new();
        for (username, token) in seed.apply(&store).await? {
            info!(username = %username, "seeded user; sign in with cookie sessionid={}", token);
        }
        Arc::new(store)
    };

    let cache = MemoryBackend::new(
        CacheConfig::builder()
            .default_ttl_duration(config.page_cache_ttl())
            .build_config(),
    );
    let media = LocalStorage::new(config.media_root.clone());
    let address = config.bind_address();
    let state = AppState::new(config, store, Arc::new(media), Arc::new(cache))?;

    server::serve(&address, build_router(state))
        .await
        .with_context(|| format!("server on {} failed", address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_accepts_seed_flags() {
        let cli = Cli::try_parse_from([
            "folio",
            "serve",
            "--seed-user",
            "leo",
            "--seed-user",
            "auth",
            "--seed-group",
            "cats",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve {
                seed_users,
                seed_groups,
                ..
            } => {
                assert_eq!(seed_users, vec!["leo", "auth"]);
                assert_eq!(seed_groups, vec!["cats"]);
            }
            _ => panic!("expected the serve command"),
        }
    }

    #[tokio::test]
    async fn test_seed_populates_memory_store() {
        let store = MemoryStore::new();
        let seed = Seed {
            users: vec!["leo".to_string()],
            groups: vec!["cats".to_string()],
        };
        let sessions = seed.apply(&store).await.unwrap();

        assert_eq!(sessions.len(), 1);
        let (username, token) = &sessions[0];
        assert_eq!(username, "leo");
        let user_id = store.session_user(token).await.unwrap().unwrap();
        let user = store.user_by_username("leo").await.unwrap().unwrap();
        assert_eq!(user.id, user_id);
        assert!(store.group_by_slug("cats").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_seeding_a_duplicate_user_fails() {
        let store = MemoryStore::new();
        let seed = Seed {
            users: vec!["leo".to_string(), "leo".to_string()],
            groups: Vec::new(),
        };
        assert!(seed.apply(&store).await.is_err());
    }
}
