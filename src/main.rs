mod config;
mod database;
mod error;
mod films;
mod memory;
mod model;
mod routes;
mod users;

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use config::{Backend, Config};
use database::Storage;
use log::info;
use memory::MemoryDb;

async fn serve<D: Storage>(db: D, bind: &str) -> std::io::Result<()> {
    let db = web::Data::new(db);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db.clone())
            .app_data(routes::json_config())
            .configure(routes::configure::<D>)
    })
    .bind(bind)?
    .run()
    .await
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("filmorate=info,actix_web=info"),
    )
    .init();

    let config = Config::parse();
    info!("Starting with {:?} storage on {}", config.storage, config.bind);

    match config.storage {
        Backend::Memory => serve(MemoryDb::new(), &config.bind).await,
        Backend::Sled => {
            let db = config
                .open_sled()
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
            serve(db, &config.bind).await
        }
    }
}
