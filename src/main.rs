fn main() {
    if let Err(err) = query_fanout::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
