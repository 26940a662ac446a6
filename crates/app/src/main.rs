use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use animal_explorer_core::{
    compose, AppConfig, AudioController, Catalogue, MediaResolver, Navigator, Page, PlaybackFailure,
    PlaybackOutcome, Router, SoundAction, SoundSource, Surface,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Shown to the user whenever the dataset cannot be loaded.
const LOAD_FAILURE: &str = "Failed to load data.";

fn main() -> animal_explorer_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Show {
            dataset,
            location,
            play,
            fail,
        } => run_show(&config, dataset.as_deref(), &location, play, fail),
        Commands::Route { dataset, locations } => run_route(&config, dataset.as_deref(), &locations),
        Commands::Back { dataset, location } => run_back(&config, dataset.as_deref(), &location),
        Commands::Tone { output, muted } => run_tone(&config, &output, muted),
    }
}

fn load_router(config: &AppConfig, dataset: Option<&Path>) -> animal_explorer_core::Result<Router> {
    let path = dataset
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.dataset));

    match Catalogue::from_path(&path) {
        Ok(catalogue) => Ok(Router::new(Navigator::new(Arc::new(catalogue)))),
        Err(err) => {
            if err.is_content_error() {
                tracing::error!(path = %path.display(), error = %err, "dataset is malformed");
            } else {
                tracing::error!(path = %path.display(), error = %err, "failed to read dataset");
            }
            eprintln!("{LOAD_FAILURE}");
            Err(err)
        }
    }
}

fn run_show(
    config: &AppConfig,
    dataset: Option<&Path>,
    location: &str,
    play: bool,
    fail: Option<FailureArg>,
) -> animal_explorer_core::Result<()> {
    let mut router = load_router(config, dataset)?;
    let change = router.on_location_change(location);
    tracing::info!(
        location = %change.text,
        redirected = change.redirected,
        "showing location"
    );

    let media = MediaResolver::new(config.media.clone());
    let page = compose(router.navigator(), &media);
    let mut surface = TextSurface::new(std::io::stdout());
    surface.draw(&page)?;

    if !play {
        return Ok(());
    }
    let navigator = router.navigator();
    let Some(animal) = navigator
        .location()
        .animal_id()
        .and_then(|id| navigator.catalogue().find(id))
    else {
        println!("nothing to play at {}", change.text);
        return Ok(());
    };

    let audio = AudioController::new(&config.audio);
    let request = audio.request(animal, navigator.catalogue())?;
    match &request.action {
        SoundAction::Play { url, gain } => {
            println!("play {url} (gain {gain})");
            let outcome = match fail {
                Some(failure) => PlaybackOutcome::Failed(failure.into()),
                None => PlaybackOutcome::Started,
            };
            if let Some(tone) = audio.on_playback_outcome(request.ticket, outcome)? {
                println!(
                    "fallback tone: {} samples at {} Hz (gain {})",
                    tone.samples.len(),
                    tone.sample_rate,
                    tone.gain
                );
            }
        }
        SoundAction::Tone(tone) => {
            println!(
                "tone: {} samples at {} Hz (gain {})",
                tone.samples.len(),
                tone.sample_rate,
                tone.gain
            );
        }
    }
    Ok(())
}

fn run_route(
    config: &AppConfig,
    dataset: Option<&Path>,
    locations: &[String],
) -> animal_explorer_core::Result<()> {
    let mut router = load_router(config, dataset)?;
    for location in locations {
        let change = router.on_location_change(location);
        if change.redirected {
            println!("{location} -> {}", change.text);
        } else {
            println!("{}", change.text);
        }
    }
    Ok(())
}

fn run_back(config: &AppConfig, dataset: Option<&Path>, location: &str) -> animal_explorer_core::Result<()> {
    let mut router = load_router(config, dataset)?;
    router.on_location_change(location);
    println!("{}", router.go_back().text);
    Ok(())
}

fn run_tone(config: &AppConfig, output: &Path, muted: bool) -> animal_explorer_core::Result<()> {
    let audio = AudioController::new(&config.audio);
    audio.set_muted(muted)?;
    let tone = audio.synthesize_tone()?;
    tracing::info!(?output, samples = tone.samples.len(), "writing fallback tone");
    std::fs::write(output, tone.to_le_bytes())?;
    Ok(())
}

/// Plain text rendering of a [`Page`].
struct TextSurface<W: Write> {
    out: W,
}

impl<W: Write> TextSurface<W> {
    fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Surface for TextSurface<W> {
    fn draw(&mut self, page: &Page) -> animal_explorer_core::Result<()> {
        let trail: Vec<&str> = page.breadcrumbs.iter().map(|c| c.label.as_str()).collect();
        writeln!(self.out, "{}", trail.join(" / "))?;
        writeln!(self.out, "# {}", page.title)?;
        if !page.status.is_empty() {
            writeln!(self.out, "{}", page.status)?;
        }
        for card in &page.cards {
            writeln!(self.out, "- {} [{}] {}", card.label, card.badge, card.link)?;
            if let Some(image) = card.images.first() {
                writeln!(self.out, "    image: {image}")?;
            }
        }
        if let Some(detail) = &page.detail {
            writeln!(self.out)?;
            writeln!(self.out, "## {} ({})", detail.title, detail.category)?;
            for paragraph in &detail.paragraphs {
                writeln!(self.out, "{paragraph}")?;
            }
            for (index, image) in detail.images.iter().enumerate() {
                writeln!(self.out, "  image[{index}]: {image}")?;
            }
            match &detail.sound {
                SoundSource::Recording(url) => writeln!(self.out, "  sound: {url}")?,
                SoundSource::Tone => writeln!(self.out, "  sound: synthesized tone")?,
            }
        }
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse the animal catalogue from the terminal", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the page for a location.
    Show {
        /// Dataset to load instead of the configured one.
        #[arg(short, long)]
        dataset: Option<PathBuf>,
        /// Location such as `/category/birds`.
        #[arg(default_value = "/")]
        location: String,
        /// Request the sound of the opened animal.
        #[arg(long)]
        play: bool,
        /// Pretend playback failed this way.
        #[arg(long, value_enum, requires = "play")]
        fail: Option<FailureArg>,
    },
    /// Print the canonical form of each location.
    Route {
        #[arg(short, long)]
        dataset: Option<PathBuf>,
        #[arg(required = true)]
        locations: Vec<String>,
    },
    /// Print where going back from a location leads.
    Back {
        #[arg(short, long)]
        dataset: Option<PathBuf>,
        location: String,
    },
    /// Render the fallback tone as raw little-endian f32 samples.
    Tone {
        output: PathBuf,
        #[arg(long)]
        muted: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FailureArg {
    Network,
    Decode,
    Blocked,
}

impl From<FailureArg> for PlaybackFailure {
    fn from(value: FailureArg) -> Self {
        match value {
            FailureArg::Network => PlaybackFailure::Network,
            FailureArg::Decode => PlaybackFailure::Decode,
            FailureArg::Blocked => PlaybackFailure::AutoplayBlocked,
        }
    }
}
