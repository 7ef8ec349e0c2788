use clap::Parser;
use eforth::frontend::ReaderSource;
use eforth::runtime::{APP_NAME, Vm, VmConfig};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eforth")]
#[command(about = "eForth virtual machine")]
struct CliArgs {
    /// Source files to load before reading input
    files: Vec<PathBuf>,

    /// Trace dictionary lookups and primitive dispatch to stderr
    #[arg(long)]
    trace: bool,

    /// Suppress the `ok` prompt when input is piped
    #[arg(long, short)]
    quiet: bool,

    /// Seed for `rnd`
    #[arg(long)]
    seed: Option<u64>,

    /// Deeper limits need a larger native stack than the default thread has
    #[arg(long, default_value_t = VmConfig::default().max_call_depth)]
    max_call_depth: usize,

    #[arg(long, default_value_t = 10_000)]
    max_stack_size: usize,
}

fn main() {
    let args = CliArgs::parse();
    let interactive = io::stdin().is_terminal();

    let config = VmConfig {
        max_call_depth: args.max_call_depth,
        max_stack_size: args.max_stack_size,
        // the line editor draws its own prompt
        prompt: !interactive && !args.quiet,
        trace: args.trace,
        seed: args.seed,
        ..VmConfig::default()
    };
    let mut vm = Vm::with_config(config);

    for file in &args.files {
        vm.load(&file.to_string_lossy());
        if !vm.is_running() {
            return;
        }
    }

    if interactive {
        if let Err(e) = repl(&mut vm) {
            eprintln!("Error: {:?}", e);
            std::process::exit(1);
        }
    } else {
        vm.set_input(Box::new(ReaderSource::new(io::stdin().lock())));
        vm.run();
    }
}

fn repl(vm: &mut Vm) -> rustyline::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".eforth_history");
        p
    });

    if let Some(ref path) = history_file {
        let _ = rl.load_history(path);
    }

    vm.ok(true);
    loop {
        match rl.readline(&vm.prompt()) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if !vm.eval(&line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_file {
        let _ = rl.save_history(path);
    }
    println!("\n{} Done.", APP_NAME);
    Ok(())
}
