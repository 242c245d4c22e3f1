fn main() {
    if let Err(e) = clinical_assertion::run() {
        eprintln!("clinical-assertion: {e}");
        std::process::exit(1);
    }
}
