use std::path::PathBuf;

use anyhow::{anyhow, Context as _};
use clap::Parser;

use chipsynth::output::StereoDuplicate;
use chipsynth::{Context, OutputDepth, OutputSample, Synth};

mod demo;
mod instrumentation;
mod player;
mod score;
mod wav;

use score::{Bank, Score, Timed};
use wav::WavSink;

/// Render a score through the chipsynth engine into a WAV file
#[derive(Parser, Debug)]
#[command(name = "chipsynth-render", version)]
struct Args {
    /// Score to render (JSON).  Plays the built-in demo if omitted.
    score: Option<PathBuf>,

    /// Output file
    #[arg(short, long, default_value = "chipsynth.wav")]
    out: PathBuf,

    /// Output sample rate, in Hz
    #[arg(short, long, default_value_t = 48000)]
    sample_rate: u32,

    /// Control-rate tick frequency, in Hz
    #[arg(short, long, default_value_t = chipsynth::DEFAULT_CONTROL_RATE_HZ)]
    control_rate: u16,

    /// Samples per rendered block
    #[arg(short, long, default_value_t = 256)]
    block: usize,

    /// Output bit depth: 8 (crushed), 16, or 32
    #[arg(short, long, default_value_t = 16)]
    depth: u8,

    /// Master volume (255 is unity)
    #[arg(short, long, default_value_t = 255)]
    master: u8,

    /// Write two identical channels instead of one
    #[arg(long)]
    stereo: bool,

    /// Silence to render after the last event, in ms (overrides the score)
    #[arg(short, long)]
    tail_ms: Option<u32>,

    /// Seed for the noise generators
    #[arg(long)]
    seed: Option<u64>,

    /// Print the demo score as JSON and exit
    #[arg(long)]
    print_demo: bool,
}

fn render<'a, S>(
    args: &Args,
    synth: &mut Synth<'a>,
    schedule: &[Timed<'a>],
    total: u64,
    bits: u16,
) -> anyhow::Result<()>
where
    S: OutputSample + hound::Sample,
    WavSink<std::io::BufWriter<std::fs::File>>: chipsynth::OutputSink<S, Error = hound::Error>,
{
    let channels = if args.stereo { 2 } else { 1 };
    let mut sink = WavSink::create(&args.out, synth.sample_rate(), channels, bits)
        .with_context(|| format!("creating {}", args.out.display()))?;
    if args.stereo {
        let mut stereo = StereoDuplicate::new(sink);
        player::play::<S, _, { chipsynth::MAX_VOICES }>(synth, schedule, total, args.block, &mut stereo)?;
        sink = stereo.into_inner();
    } else {
        player::play::<S, _, { chipsynth::MAX_VOICES }>(synth, schedule, total, args.block, &mut sink)?;
    }
    log::debug!("{} samples written", sink.samples_written());
    sink.finalize()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    colog::init();
    let args = Args::parse();

    if args.print_demo {
        println!("{}", serde_json::to_string_pretty(&demo::score())?);
        return Ok(());
    }

    let depth = OutputDepth::try_from(args.depth).map_err(anyhow::Error::msg)?;
    let ctx = Context::maybe_create(args.sample_rate)
        .ok_or_else(|| anyhow!("unsupported sample rate {}", args.sample_rate))?
        .with_control_rate(args.control_rate)
        .with_output_depth(depth);

    let mut score = match &args.score {
        Some(path) => Score::load(path)?,
        None => {
            log::info!("no score given, playing the demo");
            demo::score()
        }
    };
    if let Some(tail) = args.tail_ms {
        score.tail_ms = tail;
    }
    let bank = Bank::new(&score);
    let mut synth: Synth = match args.seed {
        Some(seed) => Synth::with_seed(ctx, seed),
        None => Synth::new(ctx),
    };
    synth.set_master_volume(args.master);
    score.register(&mut synth)?;
    let schedule = score.schedule(&bank, ctx.sample_rate())?;
    let total = score.duration_ms() as u64 * ctx.sample_rate() as u64 / 1000;
    log::info!(
        "{} events over {}ms at {}Hz, control rate {}Hz",
        schedule.len(),
        score.duration_ms(),
        ctx.sample_rate(),
        ctx.control_rate()
    );

    match depth {
        OutputDepth::Bits32 => render::<i32>(&args, &mut synth, &schedule, total, 32)?,
        OutputDepth::Bits8 | OutputDepth::Bits16 => render::<i16>(&args, &mut synth, &schedule, total, 16)?,
    }
    for (n, v) in synth.voices().iter().enumerate().filter(|(_, v)| v.is_active()) {
        log::debug!(
            "voice {} still sounding: {} {}.{:02}Hz, env {}",
            n,
            v.wave().to_str(),
            v.frequency() / 100,
            v.frequency() % 100,
            v.env_8bit()
        );
    }
    instrumentation::report(ctx.sample_rate());
    Ok(())
}
