use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use virtcam::{
    platform, DeviceIdConstraint, JsonFileStore, MediaDevices, MediaStreamConstraints,
    RegistryClient, VirtcamConfig, VirtualCameraShim,
};

const USAGE: &str = "Usage: virtcam-cli <list-devices|capture|watch> [--registry <file>] [--json] \
[--device <id>] [--frames <n>] [--output <file>]";

/// Time allowed for one frame before `capture` gives up.
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Options {
    registry: Option<PathBuf>,
    json: bool,
    device: Option<String>,
    frames: u32,
    output: Option<PathBuf>,
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut options = Options {
        frames: 1,
        ..Options::default()
    };

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        let mut value = |name: &str| -> Result<String> {
            args.next()
                .cloned()
                .with_context(|| format!("{} needs a value", name))
        };
        match arg.as_str() {
            "--registry" => options.registry = Some(PathBuf::from(value("--registry")?)),
            "--device" => options.device = Some(value("--device")?),
            "--frames" => {
                options.frames = value("--frames")?
                    .parse()
                    .context("--frames must be a positive number")?;
            }
            "--output" => options.output = Some(PathBuf::from(value("--output")?)),
            "--json" => options.json = true,
            other => bail!("Unknown argument: {}\n{}", other, USAGE),
        }
    }

    if options.frames == 0 {
        bail!("--frames must be a positive number");
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> Result<()> {
    virtcam::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let config = VirtcamConfig::load_layered(VirtcamConfig::default_path())?;
    let options = parse_options(&args[2..])?;

    match args[1].as_str() {
        "list-devices" => cmd_list_devices(&config, &options).await,
        "capture" => cmd_capture(&config, &options).await,
        "watch" => cmd_watch(&config, &options).await,
        command => {
            eprintln!("Unknown command: {}\n{}", command, USAGE);
            std::process::exit(1);
        }
    }
}

fn open_store(config: &VirtcamConfig, options: &Options) -> Arc<JsonFileStore> {
    let store = match &options.registry {
        Some(path) => JsonFileStore::new(path).with_max_image_bytes(config.registry.max_image_bytes),
        None => JsonFileStore::from_config(&config.registry),
    };
    Arc::new(store)
}

async fn open_shim(
    config: &VirtcamConfig,
    store: Arc<JsonFileStore>,
) -> Result<Arc<VirtualCameraShim>> {
    let registry = RegistryClient::connect(store.clone());
    // Load explicitly so a broken registry file is reported instead of ignored.
    registry
        .refresh(store.as_ref())
        .await
        .with_context(|| format!("Failed to load registry {:?}", store.path()))?;

    Ok(virtcam::global::install(
        platform::default_media_devices(),
        registry,
        config.synthetic.clone(),
    ))
}

async fn print_devices(shim: &VirtualCameraShim, json: bool) -> Result<()> {
    let devices = shim.enumerate_devices().await?;
    if json {
        let values: Vec<_> = devices.iter().map(|d| d.to_json()).collect();
        println!("{}", serde_json::to_string(&values)?);
    } else {
        for d in devices {
            println!("{} [{}] {}", d.device_id, d.kind.as_str(), d.label);
        }
    }
    Ok(())
}

async fn cmd_list_devices(config: &VirtcamConfig, options: &Options) -> Result<()> {
    let shim = open_shim(config, open_store(config, options)).await?;
    print_devices(&shim, options.json).await
}

fn frame_path(output: &Path, index: u32, total: u32) -> PathBuf {
    if total == 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    output.with_file_name(format!("{}-{}.{}", stem, index, ext))
}

async fn cmd_capture(config: &VirtcamConfig, options: &Options) -> Result<()> {
    let shim = open_shim(config, open_store(config, options)).await?;

    let constraints = match &options.device {
        Some(id) => MediaStreamConstraints::video_device(DeviceIdConstraint::exact(id.clone())),
        None => MediaStreamConstraints::video(),
    };
    let stream = shim.get_user_media(&constraints).await?;
    let track = stream
        .first_video_track()
        .context("Stream has no video track")?
        .clone();

    let settings = track.get_settings();
    if options.json {
        println!("{}", serde_json::to_string(&settings)?);
    } else {
        println!(
            "Capturing {} frame(s) from '{}' ({}, {}x{})",
            options.frames,
            track.label(),
            settings.device_id.as_deref().unwrap_or("unknown"),
            settings.width.unwrap_or(0),
            settings.height.unwrap_or(0)
        );
    }

    let mut frames = track.frames();
    for i in 0..options.frames {
        let frame = if i == 0 {
            frames.borrow_and_update().clone()
        } else {
            None
        };
        let frame = match frame {
            Some(frame) => frame,
            None => {
                tokio::time::timeout(FRAME_TIMEOUT, frames.changed())
                    .await
                    .context("Timed out waiting for a frame")?
                    .context("Track ended")?;
                frames
                    .borrow_and_update()
                    .clone()
                    .context("Track produced no frame")?
            }
        };

        if !options.json {
            println!(
                "frame {} seq={} t={}us {}x{}",
                i, frame.sequence, frame.timestamp_us, frame.width, frame.height
            );
        }
        if let Some(output) = &options.output {
            let path = frame_path(output, i, options.frames);
            frame.save(&path)?;
            log::info!("Saved frame {} to {:?}", frame.sequence, path);
        }
    }

    stream.stop();
    Ok(())
}

async fn cmd_watch(config: &VirtcamConfig, options: &Options) -> Result<()> {
    let store = open_store(config, options);
    let shim = open_shim(config, store.clone()).await?;

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("Failed to install Ctrl-C handler")?;

    println!("Watching {:?} (Ctrl-C to stop)", store.path());
    print_devices(&shim, options.json).await?;

    let mut snapshots = shim.registry().subscribe();
    let mut shown = snapshots.borrow_and_update().clone();
    let mut poll = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = poll.tick() => {
                if let Err(e) = store.reload().await {
                    log::warn!("Failed to reload registry: {}", e);
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                // Every reload publishes; only print real changes.
                if snapshot == shown {
                    continue;
                }
                println!("Registry changed: {} camera(s)", snapshot.len());
                shown = snapshot;
                print_devices(&shim, options.json).await?;
            }
        }
    }

    Ok(())
}
