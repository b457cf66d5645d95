use clap::Parser;
use indictl_cli::cli::Cli;
use indictl_cli::error::CliError;
use indictl_cli::output::{self, OutputFormat, ResultBuilder};
use indictl_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		handle_error(command, err, format);
		std::process::exit(1);
	}
}

fn handle_error(command: &'static str, err: CliError, format: OutputFormat) {
	let cmd_error = err.to_command_error();
	output::print_error_stderr(&cmd_error);

	if format == OutputFormat::Json {
		let result = ResultBuilder::<()>::new(command)
			.error(cmd_error.code, cmd_error.message)
			.build();
		output::print_result(&result, format);
	}
}
