use crate::demo::{run_dashboard_report, run_demo, DashboardReportArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use courrier::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Courrier",
    about = "Run the courrier registry service or inspect its dashboard from the command line",
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
    /// Compute the dashboard from CSV exports
    Dashboard {
        #[command(subcommand)]
        command: DashboardCommand,
    },
    /// Register, route and answer a handful of courriers against in-memory storage
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum DashboardCommand {
    /// Print the statistics, alerts and recent activity of an export
    Report(DashboardReportArgs),
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
        Command::Dashboard {
            command: DashboardCommand::Report(args),
        } => run_dashboard_report(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["courrier-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn dashboard_report_requires_a_courrier_export() {
        assert!(Cli::try_parse_from(["courrier-api", "dashboard", "report"]).is_err());

        let cli = Cli::try_parse_from([
            "courrier-api",
            "dashboard",
            "report",
            "--courriers",
            "courriers.csv",
            "--utc-offset",
            "+01:00",
            "--json",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Dashboard {
                command: DashboardCommand::Report(args),
            }) => {
                assert!(args.json);
                assert_eq!(args.utc_offset.map(|o| o.local_minus_utc()), Some(3600));
                assert!(args.users.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn malformed_instants_are_rejected() {
        assert!(Cli::try_parse_from([
            "courrier-api",
            "dashboard",
            "report",
            "--courriers",
            "courriers.csv",
            "--now",
            "yesterday",
        ])
        .is_err());
    }
}
