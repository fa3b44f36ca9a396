//! Minimal CLI: extract → (render | schema)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rayon::prelude::*;

use crate::codegen::{Backend, Renderer};
use crate::{decl, extract, ir, schema};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// extract shape declarations to IR and render IR into typed source
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// extract a declaration module into IR json
    Extract(ExtractOut),
    /// render extracted IR through a target-language backend
    Render(RenderOut),
    /// emit a json-schema view of extracted IR
    Schema(SchemaOut),
}

#[derive(Args, Debug)]
struct ExtractOut {
    /// declaration-bearing json file
    decl: PathBuf,

    /// already-extracted IR of a dependency module (repeatable)
    #[arg(long = "dep")]
    deps: Vec<PathBuf>,

    /// output .ir.json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderOut {
    /// one or more IR files. May be literal paths or quoted glob patterns
    #[arg(num_args = 1.., required = true)]
    ir: Vec<String>,

    /// target-language backend
    #[arg(long, value_enum)]
    backend: BackendArg,

    /// directory of <name>.tera files overriding the embedded templates
    #[arg(long)]
    templates: Option<PathBuf>,

    /// output file for a single input, output directory for several
    /// (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaOut {
    /// extracted IR file
    ir: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum BackendArg {
    Rust,
    Python,
}

impl From<BackendArg> for Backend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Rust => Backend::Rust,
            BackendArg::Python => Backend::Python,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Extract(target) => run_extract(target),
            Command::Render(target) => run_render(target),
            Command::Schema(target) => run_schema(target),
        }
    }
}

fn run_extract(cmd: &ExtractOut) -> anyhow::Result<()> {
    let deps = cmd
        .deps
        .iter()
        .map(|p| load_ir(p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let module = decl::load_module_file(&cmd.decl, &deps)
        .with_context(|| format!("while loading {}", cmd.decl.display()))?;
    let ir = extract::extract_module(&module)
        .with_context(|| format!("while extracting {}", cmd.decl.display()))?;
    let text = serde_json::to_string_pretty(&ir).expect("ir serializes");
    publish(cmd.out.as_deref(), &text)
}

fn run_render(cmd: &RenderOut) -> anyhow::Result<()> {
    let inputs = resolve_file_path_patterns(&cmd.ir)?;
    let renderer = Renderer::new(cmd.backend.into(), cmd.templates.as_deref())?;

    if inputs.len() == 1 {
        let module = load_ir(&inputs[0])?;
        let code = renderer.render_module(&module)?;
        return publish(cmd.out.as_deref(), &code);
    }

    // several independent modules: each renders on its own, in parallel;
    // outputs go into a directory, one file per module
    let Some(out_dir) = cmd.out.as_deref() else {
        bail!("--out must be a directory when rendering more than one IR file");
    };
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("while creating {}", out_dir.display()))?;
    let ext = match Backend::from(cmd.backend) {
        Backend::Rust => "rs",
        Backend::Python => "py",
    };
    inputs
        .par_iter()
        .map(|path| {
            let module = load_ir(path)?;
            let code = renderer.render_module(&module)?;
            publish(Some(&out_dir.join(format!("{}.{ext}", module.name))), &code)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(())
}

fn run_schema(cmd: &SchemaOut) -> anyhow::Result<()> {
    let module = load_ir(&cmd.ir)?;
    let doc = schema::schema_for_module(&module);
    let text = serde_json::to_string_pretty(&doc).expect("schema serializes");
    publish(cmd.out.as_deref(), &text)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_ir(path: &Path) -> anyhow::Result<ir::Module> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("while reading {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&text);
    match serde_path_to_error::deserialize::<_, ir::Module>(de) {
        Ok(m) => Ok(m),
        Err(err) => {
            let json_path = err.path().to_string();
            bail!(
                "failed to parse IR {} at JSON path {json_path}: {}",
                path.display(),
                err.into_inner()
            )
        }
    }
}

/// Write to a temporary sibling then rename into place, so a failed run
/// never leaves a partial artifact behind. Stdout when no path was given.
fn publish(out: Option<&Path>, text: &str) -> anyhow::Result<()> {
    let Some(out) = out else {
        println!("{text}");
        return Ok(());
    };
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("while creating {}", parent.display()))?;
        }
    }
    let mut tmp = out.as_os_str().to_owned();
    tmp.push(format!(".tmp.{}", std::process::id()));
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, text).with_context(|| format!("while writing {}", tmp.display()))?;
    std::fs::rename(&tmp, out)
        .with_context(|| format!("while publishing {}", out.display()))?;
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // an explicit glob that matches nothing is an input error,
                // not an empty work list
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }
    Ok(out)
}
