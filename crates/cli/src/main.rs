use std::process::ExitCode;

fn main() -> ExitCode {
    selector_cli::run()
}
