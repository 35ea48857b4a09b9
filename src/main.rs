use std::sync::Arc;

use dotenv::dotenv;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

mod app;
mod card_api;
mod cli;
mod config;
mod context;
mod models;
mod opt;

use app::DraftSession;
use card_api::ScryfallClient;
use config::DraftPolicy;
use opt::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let policy = DraftPolicy::from_env()?;
    policy.dbg_if(DbgFlg::Draft);

    let context = context::create_context()?;
    let api = ScryfallClient::new(&config::api_base_url())?;

    let rng: Box<dyn RngCore> = match config::seed()? {
        Some(seed) => {
            println!("Using seed {}", seed);
            Box::new(StdRng::seed_from_u64(seed))
        }
        None => Box::new(StdRng::from_entropy()),
    };

    let mut session = DraftSession::new(Arc::new(api), policy, rng);
    if let Some(count) = context.desired_land_count() {
        session.set_desired_land_count(count);
    }
    if context.show_edhrec_rank() {
        session.toggle_edhrec_rank();
    }

    cli::main(&mut session, &context).await
}
