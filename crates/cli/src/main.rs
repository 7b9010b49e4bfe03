use std::process::ExitCode;

fn main() -> ExitCode {
    tarifa_cli::run()
}
