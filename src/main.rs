fn main() {
    if let Err(err) = assayer::run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
