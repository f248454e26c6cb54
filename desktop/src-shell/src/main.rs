use std::process::ExitCode;

fn main() -> ExitCode {
    app_lib::run()
}
