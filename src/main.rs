use std::collections::HashMap;

use confidence_client::{logging, Config, ConfigurationError, EvaluationContext, FlagClient, IdGenerator, UuidGenerator};

const FLAG_KEY: &str = "hawkflag.color";

#[tokio::main]
async fn main() -> Result<(), ConfigurationError> {
    logging::init("info");

    let config = Config::from_env()?;
    let root = FlagClient::initialize(config)?;

    // one targeting key for the whole run
    let targeting_key = UuidGenerator.generate();

    show_flag(&root, &targeting_key).await;
    println!("Finished resolving, resolving again");
    show_flag(&root, &targeting_key).await;

    root.flush().await;

    Ok(())
}

async fn show_flag(root: &FlagClient, targeting_key: &str) {
    let client = root.with_context(EvaluationContext::new().with_targeting_key(targeting_key));
    client.track("navigate", HashMap::new());

    let value = client.resolve_string(FLAG_KEY, "false").await;
    println!("Flag value: {}", value);
}
