#![forbid(unsafe_code)]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use concentration::game::audio::SilentAudio;
use concentration::game::board::{ClickOutcome, Resolution};
use concentration::game::card::CardPhase;
use concentration::game::score::ScoreEvent;
use concentration::game::session_save::FileStore;
use concentration::{Game, GameConfig, GridPos, GridPreset, GridSize};

#[derive(Parser, Debug)]
#[command(name = "concentration", version, about = "Pair-matching card game in the terminal")]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save file (defaults to the user config dir)
    #[arg(long)]
    save: Option<PathBuf>,

    /// Grid preset: 2x2, 3x4, 4x4 or 5x6
    #[arg(long, conflicts_with_all = ["width", "height"])]
    grid: Option<String>,

    #[arg(long, requires = "height")]
    width: Option<u32>,

    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Seed for reproducible deals
    #[arg(long)]
    seed: Option<u64>,

    /// trace, debug, info, warn or error (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    /// Resume the saved game instead of dealing a new one
    #[arg(long)]
    resume: bool,
}

fn init_logging(cli_level: Option<&str>) -> Result<()> {
    let raw = match cli_level {
        Some(level) => level.to_string(),
        None => std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
    };
    let log_level = match raw.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "info" => TraceLevel::INFO,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn parse_size(raw: &str) -> Result<GridSize> {
    if let Some(preset) = GridPreset::from_str(raw) {
        return Ok(preset.size());
    }
    let (w, h) = raw
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WxH, got '{raw}'"))?;
    let width = w.parse().with_context(|| format!("bad width '{w}'"))?;
    let height = h.parse().with_context(|| format!("bad height '{h}'"))?;
    Ok(GridSize::new(width, height))
}

fn render(game: &Game, out: &mut impl Write) -> io::Result<()> {
    let engine = game.engine();
    if !engine.has_grid() {
        return writeln!(out, "(no game, type 'new')");
    }
    let size = engine.size();
    for y in 0..size.height {
        let mut row = String::new();
        for x in 0..size.width {
            let cell = match engine.card_at(GridPos::new(x, y)) {
                Some(card) => match card.phase() {
                    CardPhase::Matched => format!("[{}]", engine.palette().face_of(card.value())),
                    CardPhase::FaceUp => format!(" {} ", engine.palette().face_of(card.value())),
                    CardPhase::Flipping | CardPhase::FaceDown => " ## ".to_string(),
                },
                None => "    ".to_string(),
            };
            row.push_str(&cell);
        }
        writeln!(out, "{row}")?;
    }
    let score = game.score();
    writeln!(
        out,
        "score {}  moves {}  combo {}  pairs {}/{}  time {:.1}s{}",
        score.score(),
        score.total_moves(),
        score.combo(),
        engine.matched_pairs(),
        engine.total_pairs(),
        score.game_time(),
        if game.is_paused() { "  (paused)" } else { "" }
    )
}

fn report_events(game: &mut Game, out: &mut impl Write) -> io::Result<()> {
    let events: Vec<ScoreEvent> = game.drain_events().collect();
    for event in events {
        match event {
            ScoreEvent::ComboBonus(combo) => writeln!(out, "combo x{combo}!")?,
            ScoreEvent::GameCompleted(stats) => writeln!(
                out,
                "all pairs found: {} points in {} moves ({:.1}s){}",
                stats.final_score,
                stats.total_moves,
                stats.total_time,
                if stats.perfect_game { ", perfect game" } else { "" }
            )?,
            _ => {}
        }
    }
    Ok(())
}

/// Plays out the pending resolution so the next prompt sees a settled board.
fn settle(game: &mut Game, out: &mut impl Write) -> io::Result<()> {
    let delay = game.config().rules.match_check_delay.max(game.config().rules.flip_duration);
    if let Some(resolution) = game.tick(delay + f32::EPSILON) {
        match resolution {
            Resolution::Match { completed: false, .. } => writeln!(out, "match!")?,
            Resolution::Match { completed: true, .. } => writeln!(out, "you win!")?,
            Resolution::Mismatch { .. } => writeln!(out, "no match")?,
        }
    }
    Ok(())
}

fn run_command(game: &mut Game, rng: &mut Option<StdRng>, line: &str, out: &mut impl Write) -> Result<bool> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(true);
    };
    match command {
        "flip" | "f" => {
            let x: u32 = words.next().context("usage: flip X Y")?.parse()?;
            let y: u32 = words.next().context("usage: flip X Y")?.parse()?;
            let flip_time = game.config().rules.flip_duration + f32::EPSILON;
            match game.click_at(GridPos::new(x, y)) {
                ClickOutcome::Accepted { resolving: true } => {
                    game.tick(flip_time);
                    render(game, out)?;
                    settle(game, out)?;
                }
                ClickOutcome::Accepted { resolving: false } => {
                    game.tick(flip_time);
                }
                ClickOutcome::Ignored(reason) => writeln!(out, "ignored: {reason:?}")?,
            }
        }
        "tick" => {
            let dt: f32 = words.next().unwrap_or("1").parse()?;
            game.tick(dt);
        }
        "pause" => game.pause(),
        "resume" => game.resume(),
        "save" => writeln!(out, "{:?}", game.save()?)?,
        "load" => {
            let report = game.continue_saved()?;
            writeln!(out, "resumed {} game saved {}", report.size, report.saved_at)?;
        }
        "delete" => game.delete_save()?,
        "new" => {
            let size = match rng {
                Some(rng) => game.new_game_with_rng(rng)?,
                None => game.new_game()?,
            };
            writeln!(out, "new {size} game")?;
        }
        "restart" => {
            game.restart()?;
        }
        "resize" => {
            let size = parse_size(words.next().context("usage: resize WxH")?)?;
            writeln!(out, "{:?}", game.resize(size)?)?;
        }
        "menu" => game.return_to_menu(),
        "show" => {}
        "quit" | "q" => return Ok(false),
        other => bail!("unknown command '{other}'"),
    }
    report_events(game, out)?;
    render(game, out)?;
    Ok(true)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    let config_path = cli.config.clone().or_else(GameConfig::default_path);
    let mut config = match &config_path {
        Some(path) => GameConfig::load_or_default(path),
        None => {
            warn!("no config directory available, using defaults");
            GameConfig::default()
        }
    };
    if let Some(grid) = &cli.grid {
        config.default_grid = parse_size(grid)?;
    } else if let (Some(width), Some(height)) = (cli.width, cli.height) {
        config.default_grid = GridSize::new(width, height);
    }

    let save_path = cli
        .save
        .clone()
        .or_else(FileStore::default_path)
        .context("no config directory available for the save file")?;
    info!(save = %save_path.display(), grid = %config.default_grid, "starting");

    let mut rng = cli.seed.map(StdRng::seed_from_u64);
    let mut game = Game::new(config, Box::new(FileStore::new(save_path)), Box::new(SilentAudio));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.resume && game.has_save() {
        match game.continue_saved() {
            Ok(report) => {
                writeln!(out, "resumed game saved {}", report.saved_at)?;
                game.drain_events().for_each(drop);
                render(&game, &mut out)?;
            }
            Err(err) => {
                writeln!(out, "could not resume: {err}")?;
                run_command(&mut game, &mut rng, "new", &mut out)?;
            }
        }
    } else {
        run_command(&mut game, &mut rng, "new", &mut out)?;
    }

    for line in io::stdin().lock().lines() {
        let line = line?;
        match run_command(&mut game, &mut rng, &line, &mut out) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => writeln!(out, "error: {err:#}")?,
        }
        out.flush()?;
    }

    game.shutdown();
    Ok(())
}
