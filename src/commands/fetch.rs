use crate::commands::Outcome;
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::fetch_model;
use crate::models::staging::StagingDir;

/// Run the asset fetcher.
///
/// A failed fetch only changes the exit code when `fetcher.strict_exit` is set.
pub async fn run(config: &Config) -> Outcome {
    println!("📦 Setting up AI model for Visual Scanner...");

    let staging = StagingDir::new(&config.output.dir);
    if let Err(e) = staging.ensure() {
        tracing::error!("Cannot create {}: {e}", config.output.dir.display());
        println!("\n❌ Error creating output directory: {e}");
        return Outcome::Failed { signal: true };
    }

    match execute(config, &staging).await {
        Ok(()) => Outcome::Completed,
        Err(e) => {
            tracing::error!("Fetch failed: {e}");
            println!("\n❌ Error downloading model: {e}");
            println!("\n💡 The mock model will continue working for your demo.");
            println!("For production, consider using a medically-trained model.");
            Outcome::Failed {
                signal: config.fetcher.strict_exit,
            }
        }
    }
}

async fn execute(config: &Config, staging: &StagingDir) -> Result<()> {
    config.validate_fetcher()?;
    let report = fetch_model(&config.fetcher, staging).await?;

    println!("\n✅ Model successfully downloaded!");
    tracing::debug!(
        "{} + {} weight file(s)",
        report.manifest.display(),
        report.weight_files.len()
    );
    staging.print_contents()?;

    println!("\n⚠️  NOTE: This is MobileNet trained on general images.");
    println!("For medical accuracy, it would need fine-tuning on skin disease data.");
    println!("\n🚀 Your Visual Scanner will now use real AI predictions!");

    Ok(())
}
