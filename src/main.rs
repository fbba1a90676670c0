fn main() {
    if let Err(err) = hookguard::run() {
        eprintln!("hookguard: {}", err);
        std::process::exit(1);
    }
}
