fn main() {
    spectral_pipeline::cli::run();
}
