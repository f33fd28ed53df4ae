use clap::{Parser, Subcommand};

mod convert;

/// Convert Wii U GX2 (`.gtx`/`.gsh`) textures to and from DDS/PNG.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import one or more DDS/image files into a GFD container.
    Import(convert::ImportArgs),
    /// Export the textures in a GFD container to DDS or PNG.
    Export(convert::ExportArgs),
}

fn main() {
    simple_logger::SimpleLogger::new().init().unwrap();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Import(args) => convert::run_import(&args),
        Command::Export(args) => convert::run_export(&args),
    };

    if let Err(error) = result {
        log::error!("{error:#}");
        std::process::exit(1);
    }
}
