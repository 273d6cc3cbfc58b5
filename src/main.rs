use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use taskfolio::auth::{
    BcryptHasher, CookiePolicy, MemorySessionStore, PgAccountDirectory, RedisSessionStore,
    SessionService, SessionStore,
};
use taskfolio::{db, routes, Config};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let pool = db::connect(&config.database_url)
        .await
        .map_err(|e| startup_error("failed to connect to database", e))?;
    db::migrate(&pool)
        .await
        .map_err(|e| startup_error("failed to run migrations", e))?;

    let store: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisSessionStore::connect(url, config.max_sessions_per_user)
                .await
                .map_err(|e| startup_error("failed to connect to redis", e))?,
        ),
        None => {
            log::warn!("REDIS_URL not set; refresh sessions are kept in memory and lost on restart");
            Arc::new(MemorySessionStore::new(config.max_sessions_per_user))
        }
    };

    let sessions = web::Data::new(SessionService::from_config(
        &config,
        Arc::new(PgAccountDirectory::new(pool.clone())),
        Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        store,
    ));
    let cookies = web::Data::new(CookiePolicy::from_config(&config));
    let pool = web::Data::new(pool);

    log::info!("Starting taskfolio server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(pool.clone())
            .app_data(sessions.clone())
            .app_data(cookies.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(web::scope("/api").configure(routes::config))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
