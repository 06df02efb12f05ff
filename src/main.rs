fn main() -> std::io::Result<()> {
    casegen_lib::run()
}
