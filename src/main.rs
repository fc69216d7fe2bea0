use anyhow::Result;
use duelcore::{Console, SessionConfig};

fn main() -> Result<()> {
    env_logger::init();

    let mut config = SessionConfig::default();
    if let Some(seed) = std::env::args().nth(1) {
        config = config.with_seed(seed.parse()?);
    }

    Console::new(config).run()
}
