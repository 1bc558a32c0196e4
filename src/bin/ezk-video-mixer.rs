use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use ezk_video_mixer::{
    Driver, FixedClock, FrameWriter, PipelineConfig, VideoTiming, YCbCr422Frame, mix_frame,
    render_frame,
};

/// Render one mixed frame of two test patterns through the pixel pipeline
#[derive(Parser, Debug)]
#[command(name = "ezk-video-mixer", version)]
struct Args {
    /// Active width in pixels.
    #[arg(long, default_value_t = 640)]
    width: usize,

    /// Active height in lines.
    #[arg(long, default_value_t = 480)]
    height: usize,

    /// Pipeline configuration JSON, command line values override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source index of both mixer branches.
    #[arg(long, value_delimiter = ',', num_args = 2)]
    select: Option<Vec<usize>>,

    /// Gain of both mixer branches.
    #[arg(long, value_delimiter = ',', num_args = 2)]
    gain: Option<Vec<f64>>,

    /// Pixels per packed word.
    #[arg(long)]
    pack_factor: Option<usize>,

    /// Also run the untimed model and fail if it disagrees.
    #[arg(long, default_value_t = false)]
    verify: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let timing = VideoTiming {
        h_active: args.width,
        v_active: args.height,
        ..VideoTiming::VGA
    };

    let writer = FrameWriter::new(config.layout()?, timing)?;
    let mut driver = Driver::new(&config, FixedClock::new(FixedClock::VGA_HZ))?;

    let bits = config.bits_per_component;
    let mut sources = vec![
        YCbCr422Frame::from_rgb(args.width, args.height, config.color, bits, |x, _| {
            color_bar(x * 8 / args.width.max(1))
        }),
        YCbCr422Frame::from_rgb(args.width, args.height, config.color, bits, |x, y| {
            let fx = x as f64 / args.width.max(1) as f64;
            let fy = y as f64 / args.height.max(1) as f64;
            [fx, fy, 1.0 - fx]
        }),
    ];

    // Any further sources repeat the patterns
    while sources.len() < config.sources {
        sources.push(sources[sources.len() % 2].clone());
    }
    sources.truncate(config.sources);

    let capture = render_frame(&mut driver, &writer, &sources)?;
    let stats = driver.stats();

    tracing::info!(
        cycles = stats.cycles,
        words = stats.words,
        underflows = stats.underflows,
        latency = driver.latency(),
        "frame rendered"
    );

    if args.verify {
        let expected = mix_frame(&config, &config.initial_settings()?, &sources)?;

        anyhow::ensure!(
            capture.frame() == &expected,
            "pipeline output differs from the untimed model"
        );
    }

    let frame = capture.into_frame();

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.to_rgb8(bits),
        frame.width() as u32,
        frame.height() as u32,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            PipelineConfig::from_json(&json)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(select) = &args.select {
        config.mix.select = [select[0], select[1]];
    }

    if let Some(gain) = &args.gain {
        config.mix.gain = [gain[0], gain[1]];
    }

    if let Some(pack_factor) = args.pack_factor {
        config.pack_factor = pack_factor;
    }

    config.validate()?;

    Ok(config)
}

/// White, yellow, cyan, green, magenta, red, blue, black
fn color_bar(index: usize) -> [f64; 3] {
    let bar = 7 - index.min(7);

    [
        ((bar >> 1) & 1) as f64,
        ((bar >> 2) & 1) as f64,
        (bar & 1) as f64,
    ]
}
