use anyhow::Result;
use clap::Parser;

use vellum_cli::{
    cli::{Cli, Commands, LogLevel},
    commands,
    config::CliConfig,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging: explicit level wins, --verbose means debug,
    // default keeps only warnings so hook output stays clean.
    let level = match (cli.log_level, cli.verbose) {
        (Some(level), _) => level,
        (None, true) => LogLevel::Debug,
        (None, false) => LogLevel::Warn,
    };
    let directive = level.as_directive();
    let env_filter = tracing_subscriber::EnvFilter::new(format!(
        "vellum_core={directive},vellum_graph={directive},vellum_migrate={directive},vellum_cli={directive}"
    ));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::load(cli.config, cli.vault)?;

    match cli.command {
        Commands::Index => commands::index::execute(&config),
        Commands::Surface { project } => {
            // Surfacing is hook-invoked: it must never fail or block.
            commands::surface::execute(&config, project);
            Ok(())
        }
        Commands::Maintain => commands::maintain::execute(&config),
        Commands::Prefilter {
            source,
            tier,
            output,
        } => commands::prefilter::execute(source, tier.into(), output),
        Commands::Partition {
            tier,
            max_domain_size,
            source_path,
            input,
        } => commands::partition::execute(tier.into(), max_domain_size, source_path, input),
        Commands::Migrate {
            dry_run,
            batch_size,
            catalog,
        } => commands::migrate::execute(&config, dry_run, batch_size, catalog),
        Commands::MergeLinks { dry_run } => commands::merge_links::execute(&config, dry_run),
    }
}
