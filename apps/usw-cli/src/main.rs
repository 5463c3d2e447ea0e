fn main() -> anyhow::Result<()> {
    usw_cli::run()
}
