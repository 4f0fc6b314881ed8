fn main() {
    if let Err(e) = nooc_drv::main() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
