use std::process::ExitCode;

fn main() -> ExitCode {
    match sales_report::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
