#![allow(dead_code)]

use sqlx::{FromRow, SqlitePool};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use vote_ledger::{
    VoteLedger,
    config::VoteConfig,
    database::create_pool,
    models::{Model, ModelRegistry},
};

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
}

impl Model for User {
    const MORPH_TYPE: &'static str = "user";
    const TABLE: &'static str = "users";

    fn key(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
}

impl Model for Post {
    const MORPH_TYPE: &'static str = "post";
    const TABLE: &'static str = "posts";

    fn key(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub body: String,
}

impl Model for Comment {
    const MORPH_TYPE: &'static str = "comment";
    const TABLE: &'static str = "comments";

    fn key(&self) -> Uuid {
        self.id
    }
}

/// Not the configured voter type; never registered.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Team {
    pub id: Uuid,
}

impl Model for Team {
    const MORPH_TYPE: &'static str = "team";
    const TABLE: &'static str = "teams";

    fn key(&self) -> Uuid {
        self.id
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry
        .register::<User>()
        .register::<Post>()
        .register::<Comment>();
    registry
}

pub async fn memory_pool() -> SqlitePool {
    init_tracing();

    let pool = create_pool("sqlite::memory:", 1).await.unwrap();

    for statement in [
        "CREATE TABLE users (id BLOB PRIMARY KEY NOT NULL, name TEXT NOT NULL)",
        "CREATE TABLE posts (id BLOB PRIMARY KEY NOT NULL, title TEXT NOT NULL)",
        "CREATE TABLE comments (id BLOB PRIMARY KEY NOT NULL, body TEXT NOT NULL)",
    ] {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    pool
}

pub async fn setup() -> VoteLedger {
    setup_with(VoteConfig::default()).await
}

pub async fn setup_with(config: VoteConfig) -> VoteLedger {
    let pool = memory_pool().await;
    let ledger = VoteLedger::new(pool, config, registry()).unwrap();
    ledger.install_schema().await.unwrap();
    ledger
}

pub async fn create_user(ledger: &VoteLedger, name: &str) -> User {
    let user = User {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };

    sqlx::query("INSERT INTO users (id, name) VALUES (?, ?)")
        .bind(user.id)
        .bind(&user.name)
        .execute(&ledger.db)
        .await
        .unwrap();

    user
}

pub async fn create_post(ledger: &VoteLedger, title: &str) -> Post {
    let post = Post {
        id: Uuid::new_v4(),
        title: title.to_string(),
    };

    sqlx::query("INSERT INTO posts (id, title) VALUES (?, ?)")
        .bind(post.id)
        .bind(&post.title)
        .execute(&ledger.db)
        .await
        .unwrap();

    post
}

pub async fn create_comment(ledger: &VoteLedger, body: &str) -> Comment {
    let comment = Comment {
        id: Uuid::new_v4(),
        body: body.to_string(),
    };

    sqlx::query("INSERT INTO comments (id, body) VALUES (?, ?)")
        .bind(comment.id)
        .bind(&comment.body)
        .execute(&ledger.db)
        .await
        .unwrap();

    comment
}

pub async fn vote_rows_for_pair(ledger: &VoteLedger, user: &User, post: &Post) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM votes WHERE user_id = ? AND voteable_type = ? AND voteable_id = ?",
    )
    .bind(user.id)
    .bind(Post::MORPH_TYPE)
    .bind(post.id)
    .fetch_one(&ledger.db)
    .await
    .unwrap()
}
