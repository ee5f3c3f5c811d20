fn main() {
    if let Err(e) = solvelink::run_cli() {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}
