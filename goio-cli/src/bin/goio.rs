fn main() -> anyhow::Result<()> {
    goio_cli::run()
}
