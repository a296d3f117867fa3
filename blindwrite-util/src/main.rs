mod cli;

use blindwrite_image::{Disc, MediaTag, VerifyStatus};
use blindwrite_util::{ConsoleProgress, DiscExporter, SectorProgress, SilentProgress, hex};
use clap::Parser;
use cli::{Cli, Command};
use snafu::{ResultExt, Snafu};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level application errors for blindwrite-util.
#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to open image '{}'", path.display()))]
    OpenImage {
        path: PathBuf,
        source: blindwrite_util::OpenDiscError,
    },

    #[snafu(display("failed to export"))]
    Export {
        source: blindwrite_util::ExportError,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[snafu::report]
fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Info { image } => cmd_info(&image),
        Command::Tags {
            image,
            output,
            force,
        } => cmd_tags(&image, &output, force),
        Command::Dump {
            image,
            track,
            output,
            long,
            force,
            quiet,
        } => cmd_dump(&image, track, &output, long, force, quiet),
        Command::Hash { image } => cmd_hash(&image),
        Command::Verify { image, quiet } => cmd_verify(&image, quiet),
    }
}

fn open(path: &Path) -> Result<Arc<Disc>> {
    unsafe { blindwrite_util::open_disc(path).context(OpenImageSnafu { path }) }
}

fn cmd_info(path: &Path) -> Result<()> {
    let disc = open(path)?;
    let info = disc.info();

    println!("Image: {}", path.display());
    println!();
    println!(
        "Application:    {} {}",
        info.application, info.application_version
    );
    println!(
        "Profile:        {} (0x{:04X})",
        info.profile,
        info.profile.as_u16()
    );
    println!("Media Type:     {}", info.media_type);

    if let Some(manufacturer) = &info.media_manufacturer {
        println!("Manufacturer:   {manufacturer}");
    }

    if let Some(mcn) = &info.mcn {
        println!("MCN:            {mcn}");
    }

    println!(
        "Drive:          {} {} {} ({})",
        info.drive_manufacturer, info.drive_model, info.drive_firmware, info.drive_serial
    );
    println!("Volume ID:      {}", info.volume_id);
    println!("Sectors:        {}", info.sectors);
    println!("Sector Size:    {}", info.sector_size);
    println!("Data Path:      {}", disc.descriptor().data_path());

    let tags: Vec<String> = MediaTag::ALL
        .iter()
        .filter(|t| info.readable_media_tags.contains(t.flag()))
        .map(ToString::to_string)
        .collect();
    println!("Media Tags:     {}", tags.join(", "));
    println!();

    println!("{:>7}  {:>5}  {:>10}  {:>10}  {:>6}  Type", "Session", "Track", "Start", "End", "Pregap");
    println!("{:-<7}  {:-<5}  {:-<10}  {:-<10}  {:-<6}  {:-<20}", "", "", "", "", "", "");

    for session in disc.sessions() {
        for track in disc.session_tracks(session.sequence) {
            println!(
                "{:>7}  {:>5}  {:>10}  {:>10}  {:>6}  {}",
                session.sequence,
                track.sequence(),
                track.start(),
                track.end(),
                track.pregap(),
                track.kind()
            );
        }
    }

    Ok(())
}

fn cmd_tags(path: &Path, output: &Path, force: bool) -> Result<()> {
    let disc = open(path)?;
    let exporter = DiscExporter::new(&disc, SilentProgress, force);
    let written = exporter.export_tags(output).context(ExportSnafu)?;

    for file in &written {
        println!("{}", file.display());
    }

    println!("Wrote {} media tag(s).", written.len());

    Ok(())
}

fn cmd_dump(
    path: &Path,
    track: u32,
    output: &Path,
    long: bool,
    force: bool,
    quiet: bool,
) -> Result<()> {
    let disc = open(path)?;
    let start = std::time::Instant::now();

    let written = if quiet {
        DiscExporter::new(&disc, SilentProgress, force).dump_track(track, output, long)
    } else {
        DiscExporter::new(&disc, ConsoleProgress::new(), force).dump_track(track, output, long)
    }
    .context(ExportSnafu)?;

    if !quiet {
        println!(
            "Wrote {written} bytes to {} in {:.2}s.",
            output.display(),
            start.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

fn cmd_hash(path: &Path) -> Result<()> {
    let disc = open(path)?;
    let exporter = DiscExporter::new(&disc, SilentProgress, false);

    for track in disc.tracks() {
        let digest = exporter
            .hash_track(track.sequence())
            .context(ExportSnafu)?;

        println!("{:>5}  {}", track.sequence(), hex(&digest));
    }

    Ok(())
}

fn cmd_verify(path: &Path, quiet: bool) -> Result<()> {
    let disc = open(path)?;

    let report = if quiet {
        verify_with(&disc, SilentProgress)
    } else {
        verify_with(&disc, ConsoleProgress::new())
    }?;

    for address in &report.failing {
        println!("Sector {address}: failed");
    }

    for address in &report.unknown {
        println!("Sector {address}: could not be checked");
    }

    let status = report.status();

    println!(
        "Result: {status} ({} failing, {} unchecked)",
        report.failing.len(),
        report.unknown.len()
    );

    if status == VerifyStatus::Fail {
        std::process::exit(1);
    }

    Ok(())
}

fn verify_with(disc: &Disc, progress: impl SectorProgress) -> Result<blindwrite_image::VerifyReport> {
    DiscExporter::new(disc, progress, false)
        .verify()
        .context(ExportSnafu)
}
