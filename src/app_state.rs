use std::sync::Arc;

use crate::{
    config::Config,
    database::SocialDatabase,
    media::{FsMediaStore, MediaStore},
    services::{AccountService, ChatService, SocialService},
};

#[derive(Clone)]
pub struct AppState {
    pub db: SocialDatabase,
    pub accounts: AccountService,
    pub social: SocialService,
    pub chats: ChatService,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let database = if config.database.url.contains(":memory:") {
            SocialDatabase::new_in_memory().await?
        } else {
            let database = SocialDatabase::new(&config.database.url).await?;
            database.init().await?;
            database
        };

        tokio::fs::create_dir_all(&config.media.root).await?;
        let media: Arc<dyn MediaStore> = Arc::new(FsMediaStore::new(&config.media.root));

        Ok(Self::with_parts(database, media, config))
    }

    /// Wires the services over an existing database and media store.
    pub fn with_parts(db: SocialDatabase, media: Arc<dyn MediaStore>, config: Config) -> Self {
        Self {
            accounts: AccountService::new(db.clone(), media.clone()),
            social: SocialService::new(db.clone(), media.clone()),
            chats: ChatService::new(db.clone(), media),
            db,
            config,
        }
    }
}
