fn main() {
    if let Err(err) = onspd_enrich::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
