use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::fs::File;

use chip8_term::assets::{AssetStore, DirAssets};
use chip8_term::config::Config;
use chip8_term::display::{Palette, RenderSink, Resolution, TermSurface};
use chip8_term::engine::EngineAdapter;
use chip8_term::host::Host;
use chip8_term::input::TermInput;
use chip8_term::loader::ModuleLoader;
use chip8_term::sound::{Mute, SimpleBeep, Sound, ToneSink};
use chip8_term::{HEIGHT, WIDTH};

fn init_logging(config: &Config) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters("chip8_term=info,engine=info");
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if let Some(path) = &config.log_file {
        let file = File::create(path)
            .with_context(|| format!("unable to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config)?;

    let assets = DirAssets::new(&config.assets);
    let engine_path = config
        .engine
        .clone()
        .unwrap_or_else(|| assets.default_engine_path());

    // nothing works without the engine, so this is the end of the road
    let handle = match ModuleLoader::new(&engine_path).load() {
        Ok(handle) => handle,
        Err(e) => {
            error!("{}", e);
            return Err(e).context("unable to start the execution engine; fix it and restart");
        }
    };

    let programs = assets.programs().unwrap_or_else(|e| {
        warn!("unable to list {}: {}", assets.roms_dir().display(), e);
        Vec::new()
    });
    info!("found {} program(s) in {}", programs.len(), assets.root().display());

    let mut engine = EngineAdapter::new(handle, Box::new(assets));

    let resolution = Resolution(WIDTH, HEIGHT);
    let (width, height) = resolution.surface_size(config.pixel_size());
    let surface = TermSurface::new(width, height)?;
    let mut sink = RenderSink::new(surface, resolution, config.pixel_size(), Palette::default());
    // show the window before the first frame arrives
    sink.clear()?;
    engine.on_draw(move |frame| {
        if let Err(e) = sink.render(frame) {
            warn!("dropped frame: {}", e);
        }
    });

    let speaker: Box<dyn Sound> = if config.mute {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new())
    };
    let mut tone = ToneSink::new(speaker);
    engine.on_sound(move |on| tone.tone(on));

    let input = TermInput::new(config.key_hold())?;
    let mut host = Host::new(engine, input, config.tick_policy(), programs);
    host.open(config.rom.as_deref(), config.autoplay);
    host.run()?;
    Ok(())
}
