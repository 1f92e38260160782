use std::process::ExitCode;

fn main() -> ExitCode {
    match stroke_ehr_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("stroke-ehr: {e}");
            ExitCode::FAILURE
        }
    }
}
