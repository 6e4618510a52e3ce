//! collabdoc binary entry point.

fn main() {
    if let Err(err) = collabdoc::cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
