use moodlist::cli::run;

fn main() -> anyhow::Result<()> {
    run()
}
