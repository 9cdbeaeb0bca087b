fn main() {
    if let Err(err) = story_print_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
