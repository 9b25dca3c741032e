use clap::Parser;
use dmt::cli::{Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => dmt::cli::commands::init::run(args),
        Commands::Part(cmd) => dmt::cli::commands::part::run(cmd, &global),
        Commands::Import(args) => dmt::cli::commands::import::run(args, &global),
        Commands::Export(args) => dmt::cli::commands::export::run(args, &global),
        Commands::Schema(cmd) => dmt::cli::commands::schema::run(cmd, &global),
        Commands::Search(args) => dmt::cli::commands::search::run(args, &global),
        Commands::Completions(args) => dmt::cli::commands::completions::run(args),
    }
}
