// ============================================================================
// Headless batch mode — replay command scripts on image files
// ============================================================================
//
// Usage examples:
//   GMPhotoEditor --input photo.png --script signature.txt --output signed.png
//   GMPhotoEditor -i *.jpg --script watermark.txt --output-dir out/ --format png
//   GMPhotoEditor -i sketch.gmp -o flat.jpg --quality 85
//
// A script holds one command per line, the same identifiers the GUI
// dispatches: `new-layer`, `brush`, `eraser`, `color 255 0 0`, `size 5`,
// `down 10 10`, `move 20 20`, `up`, `resize 50 50`, `select 0`, `hide 1`.
// Pointer coordinates are in display space; the surface is reset to the
// image's native size on every open, so coordinates are pixels unless
// `resize` changes it.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::commands::{Command, Editor, NullSurface};
use crate::error::{EditorError, EditorResult};
use crate::io::SaveFormat;

/// GM Photo Editor headless processor.
#[derive(Parser, Debug)]
#[command(
    name = "GMPhotoEditor",
    about = "Paint on images from a command script without opening the GUI"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Command script replayed on each input.
    #[arg(short, long, value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// Output file path (single input only).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, gmp. Inferred from --output when omitted.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Echo the session log to stderr and print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when the process was started with an input flag.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

/// Run all CLI processing and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    crate::logger::set_echo(args.verbose);

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }
    if inputs.len() > 1 && args.output.is_some() {
        eprintln!(
            "error: {} input files given but --output takes a single file; use --output-dir.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match resolve_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let script = match &args.script {
        Some(path) => match std::fs::read_to_string(path).map_err(EditorError::from).and_then(|src| parse_script(&src)) {
            Ok(commands) => commands,
            Err(e) => {
                eprintln!("error: script '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Vec::new(),
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let mut any_failure = false;
    for (idx, input) in inputs.iter().enumerate() {
        if inputs.len() > 1 || args.verbose {
            println!("[{}/{}] {}", idx + 1, inputs.len(), input.display());
        }
        let started = Instant::now();
        let output = build_output_path(input, args.output.as_deref(), args.output_dir.as_deref(), format);

        match run_one(input, &output, &script, format, args.quality) {
            Ok(()) => {
                if args.verbose || inputs.len() > 1 {
                    println!(
                        "  → {} ({:.0}ms)",
                        output.display(),
                        started.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// Parse every line of a script, reporting the first bad line by number.
pub fn parse_script(source: &str) -> EditorResult<Vec<Command>> {
    let mut commands = Vec::new();
    for (n, line) in source.lines().enumerate() {
        match Command::parse(line) {
            Ok(Some(cmd)) => commands.push(cmd),
            Ok(None) => {}
            Err(e) => {
                return Err(EditorError::invalid_argument(format!("line {}: {}", n + 1, e)));
            }
        }
    }
    Ok(commands)
}

/// Open `input`, replay `script` on a native-size surface and save.
pub fn run_one(
    input: &Path,
    output: &Path,
    script: &[Command],
    format: SaveFormat,
    quality: u8,
) -> EditorResult<()> {
    let mut editor = Editor::new();
    editor.jpeg_quality = quality.clamp(1, 100);
    let mut surface = NullSurface;

    editor.dispatch(Command::Open(input.to_path_buf()), &mut surface)?;
    native_surface(&mut editor, &mut surface)?;
    for cmd in script {
        let opens = matches!(cmd, Command::Open(_));
        editor.dispatch(cmd.clone(), &mut surface)?;
        if opens {
            native_surface(&mut editor, &mut surface)?;
        }
    }
    editor.dispatch(
        Command::Save {
            path: output.to_path_buf(),
            format,
        },
        &mut surface,
    )
}

/// Size the surface to the open image so display coordinates are pixels.
fn native_surface(editor: &mut Editor, surface: &mut NullSurface) -> EditorResult<()> {
    match editor.document().and_then(|d| d.stack.base_size()) {
        Some((w, h)) => editor.dispatch(Command::SurfaceResized(w, h), surface),
        None => Ok(()),
    }
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }
        match glob::glob(pattern) {
            Ok(entries) => {
                let before = result.len();
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                }
                if result.len() == before {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => eprintln!("warning: invalid glob '{}': {}", pattern, e),
        }
    }
    result
}

/// `--format` wins, then the `--output` extension, then PNG.
fn resolve_format(format_arg: Option<&str>, output: Option<&Path>) -> EditorResult<SaveFormat> {
    if let Some(name) = format_arg {
        return SaveFormat::from_name(name)
            .ok_or_else(|| EditorError::invalid_argument(format!("unknown format '{}'", name)));
    }
    Ok(output.and_then(SaveFormat::from_path).unwrap_or_default())
}

/// Explicit `--output`, else `<dir>/<stem>.<ext>`, else next to the input
/// (with an `_out` suffix when that would overwrite it).
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>, format: SaveFormat) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }
    let ext = format.extension();
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    if let Some(dir) = output_dir {
        return dir.join(format!("{}.{}", stem, ext));
    }
    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));
    if candidate == input {
        parent.join(format!("{}_out.{}", stem, ext))
    } else {
        candidate
    }
}
