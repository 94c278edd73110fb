use anyhow::Result;

fn main() -> Result<()> {
    redtrace::run()
}
