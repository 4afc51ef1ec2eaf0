fn main() {
    if let Err(err) = ollachat::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
