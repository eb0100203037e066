use log::info;
use osh::config::{Args, Config};
use osh::{Interpreter, logging};

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    let config = Config::from(args);
    logging::init(&config);
    info!("session started with {:?}", config);

    Interpreter::new(config)
        .repl()
        .map_err(|e| anyhow::anyhow!("line editor failed: {e}"))?;

    info!("session ended");
    Ok(())
}
