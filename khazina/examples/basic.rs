//! Basic example of a configuration-driven Khazina container.
//!
//! Run with `RUST_LOG=debug cargo run --example basic` to watch the
//! container bind and resolve.

use std::sync::Arc;

use khazina::prelude::*;
use serde_json::{Value, json};
use tracing::info;

// === Services ===

#[derive(Default, Invokable)]
#[invokable(name = "app.ConsoleLogger")]
struct ConsoleLogger;

impl ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Database {
    url: String,
    logger: Arc<ConsoleLogger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

// === Factories ===

#[derive(Default)]
struct DatabaseFactory;

#[factory(name = "app.DatabaseFactory")]
impl DatabaseFactory {
    fn invoke(
        &self,
        #[named] config: Arc<Value>,
        #[service("logger")] logger: Arc<ConsoleLogger>,
    ) -> Result<Database, String> {
        let url = config["database"]["url"]
            .as_str()
            .ok_or("database.url is not set")?;
        Ok(Database {
            url: url.to_string(),
            logger,
        })
    }
}

#[derive(Default)]
struct UserRepositoryFactory;

#[factory(name = "app.UserRepositoryFactory")]
impl UserRepositoryFactory {
    fn invoke(&self, #[service("db")] db: Arc<Database>) -> UserRepository {
        UserRepository { db }
    }
}

fn main() -> Result<(), KhazinaError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let container = Container::new(json!({
        "database": { "url": "postgres://localhost/app" },
        "dependencies": {
            "factories": { "db": "app.DatabaseFactory" },
            "invokables": { "logger": "app.ConsoleLogger" }
        },
        "users": {
            "dependencies": {
                "factories": { "users": "app.UserRepositoryFactory" }
            }
        }
    }))?;

    container.validate()?;
    info!(?container, "Container ready");

    let users: Arc<UserRepository> = container.get_as("users")?;
    println!("{}", users.find_user(42));

    let again: Arc<UserRepository> = container.get_as("users")?;
    println!("Same instance: {}", Arc::ptr_eq(&users, &again));
    println!("Tier of db after resolve: {:?}", container.tier("db"));

    Ok(())
}
