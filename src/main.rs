use clap::Parser;
use tracing_subscriber::EnvFilter;
use vaultkeep::cli::commands::{self, add::AddArgs};
use vaultkeep::cli::{output, Cli, Commands};

/// Log filter variable; defaults to warnings only.
const LOG_ENV: &str = "VAULTKEEP_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Status => commands::status::execute(&cli),
        Commands::Add {
            ref app,
            ref password,
            ref username,
            ref url,
            ref notes,
            ref tags,
            favorite,
        } => commands::add::execute(
            &cli,
            AddArgs {
                app,
                password: password.as_deref(),
                username: username.as_deref(),
                url: url.as_deref(),
                notes: notes.as_deref(),
                tags,
                favorite,
            },
        ),
        Commands::Get { ref query, copy } => commands::get::execute(&cli, query, copy),
        Commands::List { ref tag, favorites } => {
            commands::list::execute(&cli, tag.as_deref(), favorites)
        }
        Commands::Delete { ref query, force } => commands::delete::execute(&cli, query, force),
        Commands::Note { ref action } => commands::note::execute(&cli, action),
        Commands::Settings { ref action } => commands::settings_cmd::execute(&cli, action),
        Commands::ChangeSecret => commands::change_secret::execute(&cli),
        Commands::Export { ref output } => commands::export::execute(&cli, output.as_deref()),
        Commands::Import {
            ref file,
            policy,
        } => commands::import_cmd::execute(&cli, file, policy),
        Commands::Reset { force } => commands::reset::execute(&cli, force),
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        Commands::Completions { ref shell } => commands::completions::execute(shell.as_deref()),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
