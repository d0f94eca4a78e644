fn main() {
    if let Err(err) = pie_labeller::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
