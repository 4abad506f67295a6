use figment::{
    providers::{Format, Toml},
    Figment,
};
use sea_orm_migration::sea_orm;
use sea_orm_migration::MigratorTrait;
use serde::Deserialize;
use staking_db_migration::Migrator;

#[derive(Deserialize)]
struct Config {
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config: Config = Figment::new().merge(Toml::file("App.toml")).extract()?;
    let db = sea_orm::Database::connect(config.database_url).await?;
    Migrator::up(&db, None).await?;
    println!("migrations applied");
    Ok(())
}
