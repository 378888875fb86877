use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use imagelens::server::{self, Server};
use imagelens::settings::Settings;
use imagelens::util::init_tracing;
use std::{env, process};
use tracing::info;

const USAGE: &str = "usage: ./imagelens [settings file]";

fn get_args() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        println!("{USAGE}");
        process::exit(1);
    }

    args.get(1).cloned()
}

#[actix_web::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings_file = get_args();
    let settings = Settings::load(settings_file.as_deref())?;
    let server = web::Data::new(Server::new(&settings)?);

    info!(
        host = %settings.host,
        port = settings.port,
        models = server.catalog.len(),
        default_model = %server.default_model,
        "starting image analyzer"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(server::configure(server.clone()))
    })
    .bind(settings.bind_addr())
    .with_context(|| format!("failed to bind {}:{}", settings.host, settings.port))?
    .run()
    .await
    .context("server terminated unexpectedly")
}
