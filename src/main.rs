fn main() {
    polyblocks::cli::run();
}
