use std::error::Error;

use foodgram_sdk::{routes::routes, Config, State};
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = Config::load()?;
    let port = config.port;

    let state = State::connect(config).await?;

    sqlx::migrate!("./migrations").run(&state.pool).await?;
    log::info!("> Migrations applied");

    log::info!("> Listening on port {port}");
    warp::serve(routes(state).with(warp::log("foodgram")))
        .run(([0, 0, 0, 0], port))
        .await;

    Ok(())
}
