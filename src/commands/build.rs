use crate::builder::{self, check_capabilities, MissingCapability, Toolchain};
use crate::commands::Outcome;
use crate::config::Config;
use crate::error::Result;
use crate::models::staging::StagingDir;

/// Run the synthetic-model builder.
///
/// Missing capabilities end the run before anything is written.
pub async fn run(config: &Config, toolchain: &Toolchain) -> Outcome {
    let missing = check_capabilities(toolchain);
    if !missing.is_empty() {
        print_install_guidance(&missing);
        return Outcome::MissingDependencies;
    }
    println!("✓ Dependencies available");

    match execute(config, toolchain).await {
        Ok(()) => Outcome::Completed,
        Err(e) => {
            tracing::error!("Build failed: {e}");
            print_fallback(config, &e.to_string());
            Outcome::Failed { signal: true }
        }
    }
}

async fn execute(config: &Config, toolchain: &Toolchain) -> Result<()> {
    let base = config.validate_builder()?;

    println!("\n📦 Building skin condition classification model...");
    println!("Repository: {}", base.hf_repo);
    println!("Output directory: {}", config.output.dir.display());

    println!("\n🔄 Using {} as base model (pre-trained on ImageNet)", base.name);
    println!(
        "   {}, {} parameters, native {}px",
        base.description, base.parameters, base.native_resolution
    );
    if config.builder.input_size != base.native_resolution {
        tracing::warn!(
            "{} was trained at {}px, building for {}px input",
            base.name,
            base.native_resolution,
            config.builder.input_size
        );
    }
    println!("Note: This will provide general image classification. For medical accuracy,");
    println!("a model specifically trained on skin disease dataset is recommended.");

    println!("\n💾 Converting to TensorFlow.js format...");
    let report = builder::build(config, toolchain).await?;

    println!("\n✅ Model successfully saved!");
    println!(
        "   {} features -> {} -> {} classes, {} trainable parameters, {} files",
        report.feature_dim,
        config.builder.hidden_units,
        config.builder.num_classes,
        report.trainable_params,
        report.files.len()
    );
    StagingDir::new(&config.output.dir).print_contents()?;

    println!("\n⚠️  IMPORTANT NOTE:");
    println!("This model uses {} pre-trained on general images (ImageNet).", report.base.name);
    println!("For accurate medical diagnosis, you would need a model specifically");
    println!("trained on skin disease images with proper medical datasets.");
    println!("Predictions should be considered illustrative only.");

    println!("\n🚀 You can now use the real model in your Visual Scanner!");
    println!("The app will automatically load it when analyzing images.");

    Ok(())
}

fn print_install_guidance(missing: &[MissingCapability]) {
    println!("Required capabilities are not available:");
    for item in missing {
        println!("  ✗ {}: {}", item.capability, item.reason);
        println!("    → {}", item.capability.install_hint());
    }
    println!("\nPlease run this command again after fixing the above.");
}

fn print_fallback(config: &Config, error: &str) {
    println!("\n❌ Error: {error}");
    println!("\nFor best results with actual skin disease detection:");
    println!("1. Find a pre-trained TensorFlow model on skin diseases");
    println!(
        "2. Convert using: tensorflowjs_converter --input_format=tf_saved_model [model_path] [output_path]"
    );
    println!(
        "3. Place model.json and weight files in {}/",
        config.output.dir.display()
    );
    println!("\n💡 For now, the mock model will continue to work for demonstration purposes.");
}
