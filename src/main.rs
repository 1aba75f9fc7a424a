use clap::Parser;
use keystore::cli::{commands, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Logs go to stderr so command output on stdout stays pipeable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keystore=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Set {
            ref namespace,
            ref key,
            ref value,
            ref value_type,
            ref metadata,
        } => commands::set::execute(
            &cli,
            namespace,
            key,
            value.as_deref(),
            value_type,
            metadata.as_deref(),
        ),
        Commands::Get {
            ref namespace,
            ref key,
        } => commands::get::execute(&cli, namespace, key),
        Commands::Delete {
            ref namespace,
            ref key,
            force,
        } => commands::delete::execute(&cli, namespace, key, force),
        Commands::List { ref namespace } => commands::list::execute(&cli, namespace),
        Commands::Namespaces => commands::namespaces::execute(&cli),
        Commands::Keys { ref action } => commands::keys::execute(&cli, action),
        Commands::App => commands::app::execute(&cli),
        Commands::GenKey => commands::gen_key::execute(&cli),
    };

    if let Err(e) = result {
        keystore::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
