use std::process::ExitCode;

fn main() -> ExitCode {
    matchday_cli::run()
}
