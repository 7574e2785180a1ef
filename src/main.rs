fn main() {
    still_lib::run()
}
