use open_feature::{EvaluationContext, OpenFeature};

use confidence_client::{
    logging, Config, ConfigurationError, FlagClient, IdGenerator, OpenFeatureProvider, RandomNumberGenerator,
};

const FLAG_KEY: &str = "hawkflag.message";

#[tokio::main]
async fn main() -> Result<(), ConfigurationError> {
    logging::init("info");

    let config = Config::from_env()?;
    let provider = OpenFeatureProvider::new(FlagClient::initialize(config)?);

    let client = {
        let mut api = OpenFeature::singleton_mut().await;
        api.set_provider(provider).await;
        api.create_client()
    };

    let visitor_id = RandomNumberGenerator.generate();
    let context = EvaluationContext::default()
        .with_custom_field("visitor_id", visitor_id)
        .with_custom_field("user_id", "1111111111");

    match client.get_string_details(FLAG_KEY, Some(&context), None).await {
        Ok(details) => println!("Flag value: {} ({:?})", details.value, details.reason),
        Err(error) => println!("Could not resolve {}: {:?}", FLAG_KEY, error),
    }

    Ok(())
}
