use anyhow::Result;

fn main() -> Result<()> {
    scour_cli::run_cli()
}
