use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, ExitCode, ExitStatus, Stdio},
    thread,
};

use clap::{Parser, ValueEnum};
use nsl::{
    arena,
    util::fmt::diagnostic::{self, Severity},
    CompileError, Options, Source,
};

#[derive(Parser)]
#[command(name = "nslc", version)]
#[command(about = "Compiles a source file to a native executable through QBE")]
struct Args {
    /// Path to the source file to compile
    input: PathBuf,

    /// Where to write the output; `-` writes textual stages to stdout
    #[arg(short, long, default_value = "a.out")]
    output: PathBuf,

    /// Which stage output to produce
    #[arg(long, value_enum, default_value_t = Emit::Exe)]
    emit: Emit,

    /// QBE executable, fed the IR on stdin
    #[arg(long, default_value = "qbe")]
    qbe: PathBuf,

    /// C compiler driver used to assemble and link
    #[arg(long, default_value = "cc")]
    cc: PathBuf,

    /// Hard limit, in bytes, for the compilation arena
    #[arg(long, default_value_t = arena::DEFAULT_CAPACITY)]
    arena_capacity: usize,

    /// Print a line for each pipeline stage
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    Ir,
    Exe,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        // Diagnostics were already printed.
        Err(Error::Compile) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let text = fs::read_to_string(&args.input).map_err(|source| Error::Read {
        path: args.input.display().to_string(),
        source,
    })?;
    let name = args.input.display().to_string();
    let source = Source {
        name: &name,
        text: &text,
    };
    let options = Options {
        arena_capacity: args.arena_capacity,
        ..Options::default()
    };

    let output = match args.emit {
        Emit::Tokens => nsl::dump_tokens(&source, &options),
        Emit::Ast => nsl::dump_ast(&source, &options),
        Emit::Ir | Emit::Exe => nsl::compile(&source, &options).map(|compiled| {
            for warning in &compiled.warnings {
                let rendered =
                    diagnostic::render_located_string(Severity::Warning, &name, &text, warning);
                eprint!("{rendered}");
            }
            if args.verbose {
                let stats = compiled.stats;
                eprintln!("lexed {} tokens", stats.tokens);
                eprintln!("parsed {} statements", stats.statements);
                eprintln!("type checked");
                eprintln!("generated {} bytes of IR", compiled.ir.len());
                eprintln!("arena used {} of {} bytes", stats.arena_used, options.arena_capacity);
            }
            compiled.ir
        }),
    }
    .map_err(|error| report(&error, &source))?;

    if args.emit == Emit::Exe {
        build_executable(args, &output)
    } else {
        write_output(&args.output, output.as_bytes())
    }
}

fn report(error: &CompileError, source: &Source<'_>) -> Error {
    eprint!("{}", error.render(source));
    Error::Compile
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let result = if path == Path::new("-") {
        io::stdout().lock().write_all(bytes)
    } else {
        fs::write(path, bytes)
    };
    result.map_err(|source| Error::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Pipes the IR through QBE into the C compiler driver; no temporary files.
fn build_executable(args: &Args, ir: &str) -> Result<(), Error> {
    if args.verbose {
        eprintln!("running {}", args.qbe.display());
    }
    let asm = run_tool(Command::new(&args.qbe), ir.as_bytes())?;

    if args.verbose {
        eprintln!("running {}", args.cc.display());
    }
    let mut cc = Command::new(&args.cc);
    cc.args(["-x", "assembler", "-", "-o"]).arg(&args.output);
    run_tool(cc, &asm)?;
    Ok(())
}

/// Runs the tool with `input` on its stdin, returning its stdout.
fn run_tool(mut command: Command, input: &[u8]) -> Result<Vec<u8>, Error> {
    let tool = command.get_program().to_string_lossy().into_owned();
    let spawn_error = |source| Error::Spawn {
        tool: tool.clone(),
        source,
    };

    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(spawn_error)?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| spawn_error(io::Error::other("stdin was not captured")))?;

    // Feed stdin from another thread so a tool that writes before it has read
    // everything can't fill the stdout pipe and stall.
    let (written, output) = thread::scope(|s| {
        let writer = s.spawn(move || stdin.write_all(input));
        let output = child.wait_with_output();
        (writer.join(), output)
    });
    let output = output.map_err(spawn_error)?;
    if !output.status.success() {
        return Err(Error::Tool {
            tool: tool.clone(),
            status: output.status,
        });
    }
    written
        .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")))
        .map_err(spawn_error)?;
    Ok(output.stdout)
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("could not read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("failed to run {tool}: {source}")]
    Spawn { tool: String, source: io::Error },
    #[error("{tool} failed ({status})")]
    Tool { tool: String, status: ExitStatus },
    #[error("compilation failed")]
    Compile,
}
