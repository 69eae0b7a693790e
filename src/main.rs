use std::process::ExitCode;

fn main() -> ExitCode {
    match unreal_device::cli::run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
