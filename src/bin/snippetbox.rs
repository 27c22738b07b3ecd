use anyhow::Result;

fn main() -> Result<()> {
    snippetbox::cli::run()
}
