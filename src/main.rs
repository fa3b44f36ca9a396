use colored::Colorize;

fn main() {
    let command_line_interface = shapegen::cli::CommandLineInterface::load();
    if let Err(error) = command_line_interface.run() {
        // fail the build loudly; the partial artifact was never published
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
