use std::process::ExitCode;

fn main() -> ExitCode {
    lotbridge_cli::run()
}
