use clap::Parser;
use miette::Result;

use elca::cli::{helpers::discover_project, Cli};
use elca::core::{logging, Config};

fn main() -> Result<()> {
    // Terminate silently when stdout is closed early (e.g. piping into `head`)
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

    let project = discover_project(&cli.global).ok();
    let config = Config::load_for(project.as_ref());
    logging::init(cli.global.verbose, &config);

    elca::cli::dispatch(cli)
}
