use crate::inspect::{run_catalog, run_classify, run_steps, ClassifyArgs, StepsArgs};
use crate::server;
use carelink::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "CareLink",
    about = "Run the CareLink marketplace API and inspect its compliance rules",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect the compliance catalog and wizard rules without a running server
    Compliance {
        #[command(subcommand)]
        command: ComplianceCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ComplianceCommand {
    /// List the document catalog and the services that extend it
    Catalog,
    /// Print the onboarding wizard generated for a set of services
    Steps(StepsArgs),
    /// Show which dashboard bucket a requirement type lands in
    Classify(ClassifyArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Compliance { command } => match command {
            ComplianceCommand::Catalog => {
                run_catalog();
                Ok(())
            }
            ComplianceCommand::Steps(args) => run_steps(args),
            ComplianceCommand::Classify(args) => {
                run_classify(args);
                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["carelink"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn steps_accepts_repeated_services() {
        let cli = Cli::try_parse_from([
            "carelink",
            "compliance",
            "steps",
            "--service",
            "nursing",
            "--service",
            "transport",
            "--json",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Compliance {
                command: ComplianceCommand::Steps(args),
            }) => {
                assert_eq!(args.services, vec!["nursing", "transport"]);
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn classify_rejects_unknown_categories() {
        let result = Cli::try_parse_from([
            "carelink",
            "compliance",
            "classify",
            "passport",
            "--category",
            "TERTIARY",
        ]);
        assert!(result.is_err());
    }
}
