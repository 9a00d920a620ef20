mod backends;

use anyhow::{Context, Result, bail};
use chunkmark_config::Config;
use chunkmark_engine::formula::{
    FormulaRenderer, MathRenderer, SvgConverter, SvgSizeProbe, Unavailable,
};
use chunkmark_engine::{Chunk, RenderPipeline, StreamingSession};
use std::{env, path::PathBuf, process, sync::Arc};

use backends::{CommandConverter, MathMlRenderer};

const DEFAULT_STEP: usize = 4;

#[derive(Debug, PartialEq)]
enum Command {
    Render { file: PathBuf },
    Stream { file: PathBuf, step: usize },
}

fn usage(program: &str) -> String {
    format!("Usage: {program} render <file>\n       {program} stream <file> [--step N]")
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args {
        [_, command, file] if command == "render" => Ok(Command::Render {
            file: PathBuf::from(file),
        }),
        [_, command, file] if command == "stream" => Ok(Command::Stream {
            file: PathBuf::from(file),
            step: DEFAULT_STEP,
        }),
        [_, command, file, flag, step] if command == "stream" && flag == "--step" => {
            let step: usize = step
                .parse()
                .with_context(|| format!("--step expects a number, got '{step}'"))?;
            if step == 0 {
                bail!("--step must be at least 1");
            }
            Ok(Command::Stream {
                file: PathBuf::from(file),
                step,
            })
        }
        _ => bail!("unrecognised arguments"),
    }
}

fn load_config() -> Config {
    let config_path = Config::config_path();
    match Config::load() {
        Ok(Some(config)) => {
            log::info!("Loaded config from {}", config_path.display());
            config
        }
        Ok(None) => {
            log::info!("No config at {}, using defaults", config_path.display());
            Config::default()
        }
        Err(e) => {
            log::warn!("Ignoring config file: {e}");
            Config::default()
        }
    }
}

fn build_pipeline(config: &Config) -> RenderPipeline {
    config.cache.apply();

    let fast: Arc<dyn MathRenderer> = Arc::new(MathMlRenderer);
    let converter: Arc<dyn SvgConverter> = match config
        .formula
        .svg_command
        .as_deref()
        .and_then(CommandConverter::parse)
    {
        Some(command) => Arc::new(command),
        None => Arc::new(Unavailable),
    };
    let formulas = FormulaRenderer::new(fast, converter, Arc::new(SvgSizeProbe))
        .with_max_dimension(config.formula.max_raster_dimension);

    RenderPipeline::new(config.style.clone(), config.segmenter.clone()).with_formulas(formulas)
}

fn describe(chunk: &Chunk) -> String {
    let size = chunk.measured_size();
    format!(
        "{:>4} {:<14} {:>5}x{:<5} {} | {}",
        chunk.index(),
        chunk.kind(),
        size.width.ceil(),
        size.height.ceil(),
        chunk.fingerprint(),
        chunk.rendered_text().first_line()
    )
}

/// Splits `text` into tokens of `step` characters.
fn tokens(text: &str, step: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(step)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        out.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    out
}

fn render(pipeline: &RenderPipeline, text: &str) {
    let chunks = pipeline.render(text);
    for chunk in &chunks {
        println!("{}", describe(chunk));
    }
    log::info!("{} chunks", chunks.len());
}

fn stream(pipeline: RenderPipeline, text: &str, step: usize) -> Result<()> {
    let mut session = StreamingSession::new(pipeline)?;
    let mut applied = 0;
    let mut rerendered = 0;

    for token in tokens(text, step) {
        session.push_str(token)?;
        if let Some(update) = session.poll()? {
            applied += 1;
            rerendered += update.diff.changed.len();
            println!(
                "v{:<6} {:>4} chunks {:>4} reused {:>4} re-rendered",
                update.version,
                update.chunks.len(),
                update.diff.reused.len(),
                update.diff.changed.len()
            );
        }
    }

    let last = session.wait_latest()?;
    applied += 1;
    rerendered += last.diff.changed.len();
    for chunk in &last.chunks {
        println!("{}", describe(chunk));
    }
    println!(
        "{} versions pushed, {applied} updates applied, {rerendered} chunk renders",
        last.version
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("chunkmark-cli");
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{}", usage(program));
            process::exit(1);
        }
    };

    let config = load_config();
    let pipeline = build_pipeline(&config);

    match command {
        Command::Render { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            render(&pipeline, &text);
        }
        Command::Stream { file, step } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            stream(pipeline, &text, step)?;
        }
    }
    Ok(())
}
