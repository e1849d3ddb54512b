use clap::Parser;
use passvault::cli::commands::add::AddArgs;
use passvault::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Init { ref key_id } => passvault::cli::commands::init::execute(&cli, key_id),
        Commands::Add {
            ref name,
            ref group,
            ref username,
            ref uri,
            ref comment,
            generate,
            length,
            ref classes,
        } => passvault::cli::commands::add::execute(
            &cli,
            &AddArgs {
                name,
                group: group.as_deref(),
                username: username.as_deref(),
                uri: uri.as_deref(),
                comment: comment.as_deref(),
                generate,
                length,
                classes: classes.as_deref(),
            },
        ),
        Commands::Get {
            ref name,
            ref group,
            echo,
            silent,
            no_clipboard,
        } => passvault::cli::commands::get::execute(
            &cli,
            name,
            group.as_deref(),
            echo,
            silent,
            no_clipboard,
        ),
        Commands::Del {
            ref name,
            ref group,
            yes,
        } => passvault::cli::commands::del::execute(&cli, name, group.as_deref(), yes),
        Commands::List {
            ref groups,
            lenient,
        } => passvault::cli::commands::list::execute(&cli, groups, lenient),
        Commands::Generate { length, ref classes } => {
            passvault::cli::commands::generate::execute(&cli, length, classes.as_deref())
        }
        Commands::Completions { shell } => passvault::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        passvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
